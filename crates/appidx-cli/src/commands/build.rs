//! Build command - scan metadata files and write the index.

use crate::app::App;
use appidx_core::Config;
use std::path::PathBuf;

/// Run the build command.
pub fn run(
    config: Config,
    dirs: Vec<PathBuf>,
    output: Option<PathBuf>,
    strict: bool,
) -> anyhow::Result<()> {
    let mut app = App::new(config)?;
    if let Some(path) = output {
        app = app.with_index_path(path);
    }

    println!("Building application index...");

    let summary = app.rebuild_index(&dirs, strict)?;
    let stats = &summary.stats;

    println!();
    println!("Indexing complete!");
    println!("  Applications: {}", stats.apps);
    println!("  Keys:         {}", stats.keys);
    println!("  Locales:      {}", stats.locales);
    println!("  Tokens:       {}", stats.global_tokens);
    println!("  Size:         {} bytes", stats.size_bytes);
    if summary.skipped > 0 {
        println!("  Skipped:      {} (see warnings above)", summary.skipped);
    }
    if summary.shadowed > 0 {
        println!("  Shadowed:     {}", summary.shadowed);
    }
    println!("  Time:         {:.2}s", summary.elapsed.as_secs_f64());
    println!("  Written to:   {}", app.store.index_path().display());

    Ok(())
}
