//! On-disk storage for built indexes.
//!
//! The store owns one index file (`index.cache` under its base directory by
//! default). Saving writes a temporary file next to it and renames it into
//! place, keeping the previous file as `<name>.bak`; readers that mapped the
//! old file keep a valid mapping.

use crate::error::{IndexError, Result};
use crate::reader::Index;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default index file name
pub const INDEX_FILE_NAME: &str = "index.cache";

/// Manages saving and opening the index file.
///
/// ## Example
///
/// ```rust,no_run
/// use appidx_core::{IndexBuilder, IndexStore};
///
/// let store = IndexStore::new("/var/cache/appidx");
/// store.save(&IndexBuilder::new().build()?)?;
///
/// let index = store.open()?;
/// println!("{} apps", index.stats().apps);
/// # Ok::<(), appidx_core::IndexError>(())
/// ```
#[derive(Debug, Clone)]
pub struct IndexStore {
    path: PathBuf,
}

impl IndexStore {
    /// Store `index.cache` inside `base_dir`.
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        IndexStore {
            path: base_dir.as_ref().join(INDEX_FILE_NAME),
        }
    }

    /// Store the index at exactly `path`.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        IndexStore { path: path.into() }
    }

    /// Path of the index file.
    pub fn index_path(&self) -> &Path {
        &self.path
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from(INDEX_FILE_NAME));
        name.push(suffix);
        self.path.with_file_name(name)
    }

    /// Path of the previous index, kept by [`IndexStore::save`].
    pub fn backup_path(&self) -> PathBuf {
        self.sibling(".bak")
    }

    fn temp_path(&self) -> PathBuf {
        self.sibling(".tmp")
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Size of the index file, if it exists.
    pub fn file_size(&self) -> Option<u64> {
        fs::metadata(&self.path).ok().map(|m| m.len())
    }

    /// Atomically replace the index file with `bytes`.
    pub fn save(&self, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        info!(path = %self.path.display(), bytes = bytes.len(), "Saving index");

        let temp_path = self.temp_path();
        {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            writer.write_all(bytes)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }

        if self.path.exists() {
            let backup_path = self.backup_path();
            let _ = fs::remove_file(&backup_path);
            if let Err(e) = fs::rename(&self.path, &backup_path) {
                warn!(error = %e, "Failed to keep backup of previous index");
            }
        }

        fs::rename(&temp_path, &self.path)?;
        debug!("Index saved");
        Ok(())
    }

    /// Map and validate the index file.
    pub fn open(&self) -> Result<Index> {
        Index::open(&self.path)
    }

    /// Replace a damaged index file with the backup and open it.
    pub fn restore_from_backup(&self) -> Result<Index> {
        let backup_path = self.backup_path();
        if !backup_path.exists() {
            return Err(IndexError::IndexNotFound { path: backup_path });
        }

        fs::copy(&backup_path, &self.path)?;
        warn!(path = %self.path.display(), "Restored index from backup");
        self.open()
    }

    /// Delete the index file and its backup.
    pub fn clear(&self) -> Result<()> {
        for path in [self.path.clone(), self.backup_path(), self.temp_path()] {
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}
