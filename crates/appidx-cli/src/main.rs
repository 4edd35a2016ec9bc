//! # appidx CLI
//!
//! Command-line interface for the application metadata index.
//!
//! ## Commands
//!
//! - `appidx build` - Scan source directories and write the index
//! - `appidx query <text>` - Full-text search, optionally per locale
//! - `appidx get <app> <key>` - Look up one value with locale fallback
//! - `appidx dump [app]` - Print stored keyfiles
//! - `appidx status` - Show index status and statistics
//! - `appidx clear` - Delete the index file
//!
//! ## Example Usage
//!
//! ```bash
//! # Index the system applications
//! appidx build /usr/share/applications
//!
//! # Search French names and keywords
//! appidx query éditeur -l fr_FR.UTF-8
//!
//! # Localized name of one app
//! appidx get org.gnome.gedit.desktop Name -l de_DE
//! ```

mod app;
mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// appidx - Application metadata index
#[derive(Parser)]
#[command(name = "appidx")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "APPIDX_CONFIG")]
    config: Option<PathBuf>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan metadata files and write the index
    Build {
        /// Source directories, highest precedence first (default: from config)
        dirs: Vec<PathBuf>,

        /// Write the index here instead of the configured location
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Fail on the first unreadable or malformed file
        #[arg(long)]
        strict: bool,
    },

    /// Full-text search over names, comments and keywords
    Query {
        /// Text to search for
        text: String,

        /// Search the translations for this locale (e.g. fr_FR.UTF-8)
        #[arg(short, long)]
        locale: Option<String>,

        /// Maximum number of results to show (default: from config)
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// Look up a single value
    Get {
        /// Application id (e.g. firefox.desktop)
        app: String,

        /// Key name
        key: String,

        /// Group to read from
        #[arg(short, long, default_value = "Desktop Entry")]
        group: String,

        /// Locale to resolve translations for
        #[arg(short, long)]
        locale: Option<String>,
    },

    /// Print stored keyfiles
    Dump {
        /// Only this application
        app: Option<String>,
    },

    /// Show index status and statistics
    Status,

    /// Delete the index file and its backup
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => appidx_core::Config::load_from(path)?,
        None => appidx_core::Config::load()?,
    };

    // Setup logging
    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => config.general.log_level.as_str(),
            1 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .init();

    // Execute command
    match cli.command {
        Commands::Build {
            dirs,
            output,
            strict,
        } => commands::build::run(config, dirs, output, strict),
        Commands::Query {
            text,
            locale,
            limit,
            output,
        } => commands::query::run(config, &text, locale.as_deref(), limit, output),
        Commands::Get {
            app,
            key,
            group,
            locale,
        } => commands::get::run(config, &app, &key, &group, locale.as_deref()),
        Commands::Dump { app } => commands::dump::run(config, app.as_deref()),
        Commands::Status => commands::status::run(config),
        Commands::Clear { yes } => commands::clear::run(config, yes),
    }
}
