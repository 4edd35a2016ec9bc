//! Application state management.

use anyhow::Context;
use appidx_core::scan::{self, LoggingProgress};
use appidx_core::{Config, Index, IndexStats, IndexStore};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;

/// Shared application state.
pub struct App {
    /// Configuration
    pub config: Config,

    /// Index persistence
    pub store: IndexStore,
}

/// Outcome of [`App::rebuild_index`].
pub struct BuildSummary {
    pub stats: IndexStats,
    pub skipped: usize,
    pub shadowed: usize,
    pub elapsed: Duration,
}

impl App {
    /// Create a new application instance.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let store = config.store()?;
        Ok(App { config, store })
    }

    /// Use `path` as the index file instead of the configured one.
    pub fn with_index_path(mut self, path: PathBuf) -> Self {
        self.store = IndexStore::at_path(path);
        self
    }

    /// Open the stored index.
    pub fn open_index(&self) -> anyhow::Result<Index> {
        let path = self.store.index_path().display().to_string();
        self.store
            .open()
            .with_context(|| format!("cannot open index at {path}; run 'appidx build' first"))
    }

    /// Scan `dirs` (or the configured directories), build and save the index.
    pub fn rebuild_index(&self, dirs: &[PathBuf], strict: bool) -> anyhow::Result<BuildSummary> {
        let start = Instant::now();

        let dirs = if dirs.is_empty() {
            &self.config.sources.dirs[..]
        } else {
            dirs
        };

        let mut options = self.config.scan_options()?;
        options.strict |= strict;

        let report = scan::scan_dirs(dirs, &options, &LoggingProgress)?;
        let skipped = report.errors.len();
        let shadowed = report.shadowed;

        let bytes = report.into_builder(self.config.build_options()).build()?;
        self.store.save(&bytes)?;

        let stats = Index::from_bytes(bytes)?.stats();
        info!(
            path = %self.store.index_path().display(),
            apps = stats.apps,
            skipped,
            "Index rebuilt"
        );

        Ok(BuildSummary {
            stats,
            skipped,
            shadowed,
            elapsed: start.elapsed(),
        })
    }
}
