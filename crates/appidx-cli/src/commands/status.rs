//! Status command - show index status and statistics.

use crate::app::App;
use appidx_core::Config;
use chrono::{DateTime, Local};

/// Run the status command.
pub fn run(config: Config) -> anyhow::Result<()> {
    let app = App::new(config)?;

    println!("appidx Index Status");
    println!("===================");
    println!();

    if !app.store.exists() {
        println!("No index found. Run 'appidx build' to build the index.");
        return Ok(());
    }

    let index = app.open_index()?;
    let stats = index.stats();

    println!("Summary:");
    println!("  Applications:  {}", stats.apps);
    println!("  Keys:          {}", stats.keys);
    println!("  Locales:       {}", stats.locales);
    println!("  Groups:        {}", stats.groups);
    println!("  Tokens:        {}", stats.global_tokens);
    println!(
        "  Index size:    {} bytes ({:.1} KiB)",
        stats.size_bytes,
        stats.size_bytes as f64 / 1024.0
    );
    println!("  Index version: {}", stats.version);

    if let Ok(modified) = std::fs::metadata(app.store.index_path()).and_then(|m| m.modified()) {
        let updated: DateTime<Local> = modified.into();
        println!("  Last built:    {}", updated.format("%Y-%m-%d %H:%M:%S"));
    }

    println!();
    println!("Sources:");
    for dir in &app.config.sources.dirs {
        let mark = if dir.is_dir() { "✓" } else { "⚠ missing" };
        println!("  {} {}", dir.display(), mark);
    }

    println!();
    println!("Index file: {}", app.store.index_path().display());

    Ok(())
}
