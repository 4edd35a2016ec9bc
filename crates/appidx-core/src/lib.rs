//! # appidx Core Library
//!
//! This crate builds and reads a compact, immutable index of application
//! metadata files (`.desktop` files). An index is one little-endian buffer
//! holding sorted name lists, every file's groups and key/value items, and
//! per-locale full-text indexes over the human-readable fields.
//!
//! ## Architecture
//!
//! - **Keyfile** (`keyfile`): parser and in-memory shape of one metadata file
//! - **Tokenizer** (`tokenizer`): splits and folds text into search tokens
//! - **Locale** (`locale`): locale fallback chains
//! - **Builder** (`builder`): interns strings and serializes the buffer
//! - **Reader** (`reader`): validating, bounds-checked views over a buffer
//! - **Store** (`store`): atomic on-disk persistence of the buffer
//! - **Scan** (`scan`): parallel directory scan feeding the builder
//! - **Config** (`config`): configuration management
//!
//! ## Example
//!
//! ```rust,no_run
//! use appidx_core::{scan, Config, Index};
//!
//! let config = Config::load()?;
//! let report = scan::scan_dirs(
//!     &config.sources.dirs,
//!     &config.scan_options()?,
//!     &scan::LoggingProgress,
//! )?;
//! let bytes = report.into_builder(config.build_options()).build()?;
//!
//! let index = Index::from_bytes(bytes)?;
//! for triple in index.search_text(Some("fr"), "éditeur") {
//!     println!("{}", index.resolve(triple).app);
//! }
//! # Ok::<(), appidx_core::IndexError>(())
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod format;
pub mod keyfile;
pub mod locale;
pub mod reader;
pub mod scan;
pub mod store;
pub mod tokenizer;
pub mod types;

// Re-export commonly used types
pub use builder::{BuildOptions, IndexBuilder};
pub use config::Config;
pub use error::{IndexError, Result};
pub use keyfile::Keyfile;
pub use reader::{Index, KeyfileView, Postings, StringListView, TextIndexView};
pub use scan::{ScanOptions, ScanReport};
pub use store::IndexStore;
pub use types::{Id, IdTriple, IndexStats, ResolvedTriple, NO_ID};
