//! Configuration management for appidx.
//!
//! This module provides configuration loading, saving, and defaults.
//! Configuration is stored in TOML format in a platform-appropriate location.

use crate::builder::{BuildOptions, DEFAULT_FIELDS, DEFAULT_GROUP};
use crate::error::{IndexError, Result};
use crate::scan::ScanOptions;
use crate::store::{IndexStore, INDEX_FILE_NAME};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main configuration structure for appidx.
///
/// ## Example Configuration File (appidx.toml)
///
/// ```toml
/// [general]
/// index_path = "/var/cache/appidx/index.cache"
/// log_level = "info"
///
/// [sources]
/// dirs = ["/usr/share/applications"]
/// suffix = ".desktop"
/// exclude = ["*-preview.desktop"]
///
/// [build]
/// strict = false
/// group = "Desktop Entry"
/// fields = ["Name", "GenericName", "X-GNOME-FullName", "Comment", "Keywords"]
///
/// [query]
/// max_results = 100
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Where metadata files are read from
    pub sources: SourcesConfig,

    /// What the text indexes cover
    pub build: BuildConfig,

    /// Query defaults
    pub query: QueryConfig,
}

/// General configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Index file location (None = default location)
    pub index_path: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            index_path: None,
            log_level: "info".to_string(),
        }
    }
}

/// Source directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Directories to scan, highest precedence first
    pub dirs: Vec<PathBuf>,

    /// File name suffix of metadata files
    pub suffix: String,

    /// Glob patterns of file names to skip
    pub exclude: Vec<String>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        SourcesConfig {
            dirs: vec![PathBuf::from("/usr/share/applications")],
            suffix: ".desktop".to_string(),
            exclude: Vec::new(),
        }
    }
}

/// Build configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Fail on the first malformed file instead of skipping it
    pub strict: bool,

    /// Group whose fields are indexed
    pub group: String,

    /// Keys whose values are tokenized
    pub fields: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            strict: false,
            group: DEFAULT_GROUP.to_string(),
            fields: DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// Query configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Maximum number of results printed
    pub max_results: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        QueryConfig { max_results: 100 }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default config if no config file exists.
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Config::default());
        }

        info!(path = %path.display(), "Loading configuration");
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents).map_err(|e| IndexError::Config {
            reason: format!("Failed to parse config: {}", e),
        })?;

        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path()?;
        self.save_to(&config_path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        info!(path = %path.display(), "Saving configuration");
        let contents = toml::to_string_pretty(self).map_err(|e| IndexError::Config {
            reason: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(path, contents)?;
        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("", "", "appidx").ok_or_else(|| IndexError::Config {
            reason: "Could not determine project directories".to_string(),
        })
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("appidx.toml"))
    }

    /// Get the default cache directory path.
    pub fn default_cache_dir() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.cache_dir().to_path_buf())
    }

    /// Get the index file path (from config or default).
    pub fn index_path(&self) -> Result<PathBuf> {
        match &self.general.index_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::default_cache_dir()?.join(INDEX_FILE_NAME)),
        }
    }

    /// Store for the configured index file.
    pub fn store(&self) -> Result<IndexStore> {
        Ok(IndexStore::at_path(self.index_path()?))
    }

    pub fn scan_options(&self) -> Result<ScanOptions> {
        ScanOptions::new(
            self.sources.suffix.clone(),
            &self.sources.exclude,
            self.build.strict,
        )
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            group: self.build.group.clone(),
            fields: self.build.fields.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.query.max_results, 100);
        assert_eq!(config.sources.suffix, ".desktop");
        assert_eq!(config.build_options(), BuildOptions::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let mut config = Config::default();
        config.query.max_results = 5;
        config.sources.dirs = vec![PathBuf::from("/opt/apps")];
        config.build.fields = vec!["Name".to_string()];

        config.save_to(&config_path).unwrap();
        let loaded = Config::load_from(&config_path).unwrap();

        assert_eq!(loaded.query.max_results, 5);
        assert_eq!(loaded.sources.dirs, vec![PathBuf::from("/opt/apps")]);
        assert_eq!(loaded.build.fields, vec!["Name".to_string()]);
    }

    #[test]
    fn test_load_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.query.max_results, 100); // Default value
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("partial.toml");
        fs::write(&config_path, "[build]\nstrict = true\n").unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert!(config.build.strict);
        assert_eq!(config.build.group, "Desktop Entry");
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bad.toml");
        fs::write(&config_path, "[query]\nmax_results = \"many\"\n").unwrap();

        assert!(matches!(
            Config::load_from(&config_path),
            Err(IndexError::Config { .. })
        ));
    }

    #[test]
    fn test_explicit_index_path() {
        let mut config = Config::default();
        config.general.index_path = Some(PathBuf::from("/tmp/apps.idx"));
        assert_eq!(config.index_path().unwrap(), PathBuf::from("/tmp/apps.idx"));
        assert_eq!(config.store().unwrap().index_path(), Path::new("/tmp/apps.idx"));
    }

    #[test]
    fn test_scan_options_from_config() {
        let mut config = Config::default();
        config.sources.exclude = vec!["*-preview.desktop".to_string()];
        config.build.strict = true;

        let options = config.scan_options().unwrap();
        assert!(options.strict);
        assert_eq!(options.exclude.len(), 1);
    }
}
