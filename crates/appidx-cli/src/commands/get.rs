//! Get command - look up one value.

use crate::app::App;
use appidx_core::{locale, Config};

/// Run the get command.
pub fn run(
    config: Config,
    app_id: &str,
    key: &str,
    group: &str,
    locale_tag: Option<&str>,
) -> anyhow::Result<()> {
    let app = App::new(config)?;
    let index = app.open_index()?;

    let Some(keyfile) = index.keyfile_by_name(app_id) else {
        anyhow::bail!("no application {app_id:?} in the index");
    };

    let variants = locale_tag.map(locale::variants).unwrap_or_default();
    match keyfile.get_value(&locale::as_refs(&variants), group, key) {
        Some(value) => {
            println!("{value}");
            Ok(())
        }
        None => anyhow::bail!("{app_id} has no key {key:?} in group {group:?}"),
    }
}
