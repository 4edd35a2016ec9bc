//! Source directory scanning.
//!
//! A scan walks one or more application directories, picks the files with
//! the configured suffix and parses them in parallel. Files in
//! subdirectories get ids with `/` replaced by `-`
//! (`kde/konsole.desktop` becomes `kde-konsole.desktop`). When the same id
//! appears in several directories the first directory wins.
//!
//! Unreadable directories and malformed files do not stop a lenient scan;
//! they are logged and collected in [`ScanReport::errors`].

use crate::builder::{BuildOptions, IndexBuilder};
use crate::error::{IndexError, Result};
use crate::keyfile::Keyfile;
use glob::Pattern;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Progress reporting for scan operations
pub trait ScanProgress: Send + Sync {
    /// Called after each directory has been listed
    fn on_progress(&self, files_found: u64, dirs_scanned: u64);

    /// Called when parsing is complete
    fn on_complete(&self, parsed: u64, failed: u64);
}

/// A simple progress reporter that logs to tracing
pub struct LoggingProgress;

impl ScanProgress for LoggingProgress {
    fn on_progress(&self, files_found: u64, dirs_scanned: u64) {
        debug!(files = files_found, dirs = dirs_scanned, "Scanning progress");
    }

    fn on_complete(&self, parsed: u64, failed: u64) {
        tracing::info!(parsed, failed, "Scan complete");
    }
}

/// Which files a scan picks up.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Required file name suffix
    pub suffix: String,

    /// File names matching any of these are skipped
    pub exclude: Vec<Pattern>,

    /// Fail on the first unreadable or malformed file
    pub strict: bool,
}

impl ScanOptions {
    /// Compile `exclude` glob patterns.
    pub fn new(suffix: impl Into<String>, exclude: &[String], strict: bool) -> Result<Self> {
        let exclude = exclude
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|e| IndexError::Config {
                    reason: format!("invalid exclude pattern {p:?}: {e}"),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ScanOptions {
            suffix: suffix.into(),
            exclude,
            strict,
        })
    }

    fn is_excluded(&self, name: &str) -> bool {
        self.exclude.iter().any(|p| p.matches(name))
    }
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            suffix: ".desktop".to_string(),
            exclude: Vec::new(),
            strict: false,
        }
    }
}

/// Result of a scan
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Parsed files as (app id, keyfile), ascending by app id
    pub keyfiles: Vec<(String, Keyfile)>,

    /// Unreadable directory entries, then per-file failures in app id order
    pub errors: Vec<IndexError>,

    /// Files hidden by a file with the same id in an earlier directory
    pub shadowed: usize,
}

impl ScanReport {
    /// Feed every parsed file into a new builder.
    pub fn into_builder(self, options: BuildOptions) -> IndexBuilder {
        let mut builder = IndexBuilder::with_options(options);
        for (app, keyfile) in self.keyfiles {
            builder.add_keyfile(app, keyfile);
        }
        builder
    }
}

/// A file selected for parsing.
struct Candidate {
    app_id: String,
    path: PathBuf,
}

/// Scan `dirs` in order and parse every matching file.
pub fn scan_dirs(
    dirs: &[PathBuf],
    options: &ScanOptions,
    progress: &dyn ScanProgress,
) -> Result<ScanReport> {
    let mut candidates = Vec::new();
    let mut errors = Vec::new();
    let mut seen = HashSet::new();
    let mut shadowed = 0;
    let mut dirs_scanned = 0u64;

    for dir in dirs {
        if !dir.is_dir() {
            if options.strict {
                return Err(IndexError::Read {
                    path: dir.clone(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
                });
            }
            warn!(dir = %dir.display(), "Skipping missing source directory");
            continue;
        }

        let mut found = Vec::new();
        let mut walk = Walk {
            root: dir,
            options,
            found: &mut found,
            errors: &mut errors,
            dirs_scanned: &mut dirs_scanned,
        };
        walk.collect_dir(dir)?;
        for candidate in found {
            if seen.insert(candidate.app_id.clone()) {
                candidates.push(candidate);
            } else {
                debug!(path = %candidate.path.display(), "Shadowed by an earlier directory");
                shadowed += 1;
            }
        }
        progress.on_progress(candidates.len() as u64, dirs_scanned);
    }

    candidates.sort_by(|a, b| a.app_id.cmp(&b.app_id));

    let parsed: Vec<(String, Result<Keyfile>)> = candidates
        .into_par_iter()
        .map(|c| {
            let result = Keyfile::from_file(&c.path);
            (c.app_id, result)
        })
        .collect();

    let mut report = ScanReport {
        shadowed,
        errors,
        ..Default::default()
    };
    for (app_id, result) in parsed {
        match result {
            Ok(keyfile) => report.keyfiles.push((app_id, keyfile)),
            Err(e) if options.strict => return Err(e),
            Err(e) => {
                warn!(app = %app_id, error = %e, "Skipping file");
                report.errors.push(e);
            }
        }
    }

    progress.on_complete(report.keyfiles.len() as u64, report.errors.len() as u64);
    Ok(report)
}

/// State of one recursive walk below `root`.
struct Walk<'a> {
    root: &'a Path,
    options: &'a ScanOptions,
    found: &'a mut Vec<Candidate>,
    errors: &'a mut Vec<IndexError>,
    dirs_scanned: &'a mut u64,
}

impl Walk<'_> {
    fn collect_dir(&mut self, dir: &Path) -> Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(source) => return self.skip(dir, source),
        };
        *self.dirs_scanned += 1;

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(source) => {
                    self.skip(dir, source)?;
                    continue;
                }
            };
            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(source) => {
                    self.skip(&path, source)?;
                    continue;
                }
            };

            if file_type.is_dir() {
                self.collect_dir(&path)?;
                continue;
            }

            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                warn!(path = %path.display(), "Skipping non-UTF-8 file name");
                continue;
            };
            if !name.ends_with(&self.options.suffix) || self.options.is_excluded(name) {
                continue;
            }

            if let Some(app_id) = app_id(self.root, &path) {
                self.found.push(Candidate { app_id, path });
            }
        }

        Ok(())
    }

    /// Fail a strict scan; otherwise record the error and keep walking.
    fn skip(&mut self, path: &Path, source: std::io::Error) -> Result<()> {
        let err = IndexError::Read {
            path: path.to_path_buf(),
            source,
        };
        if self.options.strict {
            return Err(err);
        }
        warn!(error = %err, "Skipping unreadable entry");
        self.errors.push(err);
        Ok(())
    }
}

/// Id of the file at `path` below `root`: its relative path joined with `-`.
fn app_id(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Option<Vec<&str>> = relative.iter().map(|c| c.to_str()).collect();
    Some(parts?.join("-"))
}
