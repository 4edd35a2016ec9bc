//! Query command - full-text search.

use crate::app::App;
use crate::OutputFormat;
use appidx_core::{locale, Config, Index, ResolvedTriple};
use serde::Serialize;
use std::time::Instant;

/// One printed search hit
#[derive(Debug, Serialize)]
struct QueryHit<'a> {
    app: &'a str,
    group: &'a str,
    key: &'a str,
    value: Option<&'a str>,
}

/// Resolve the matched value of `names` through the locale chain.
fn hit<'a>(index: &'a Index, names: ResolvedTriple<'a>, chain: &[&str]) -> QueryHit<'a> {
    let value = index
        .keyfile_by_name(names.app)
        .and_then(|kf| kf.get_value(chain, names.group, names.key));
    QueryHit {
        app: names.app,
        group: names.group,
        key: names.key,
        value,
    }
}

/// Run the query command.
pub fn run(
    config: Config,
    text: &str,
    locale_tag: Option<&str>,
    limit: Option<usize>,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let limit = limit.unwrap_or(config.query.max_results);
    let app = App::new(config)?;
    let index = app.open_index()?;

    let variants = locale_tag.map(locale::variants).unwrap_or_default();
    let chain = locale::as_refs(&variants);

    let start = Instant::now();
    // Use the most specific variant the index has a text index for.
    let search_locale = chain
        .iter()
        .copied()
        .find(|tag| index.locale_names().lookup(tag).is_some());
    let results = index.search_text(search_locale, text);
    let elapsed = start.elapsed();

    let hits: Vec<QueryHit<'_>> = results
        .iter()
        .take(limit)
        .map(|triple| hit(&index, index.resolve(*triple), &chain))
        .collect();

    match output {
        OutputFormat::Text => {
            for h in &hits {
                println!(
                    "{}  [{}] {}={}",
                    h.app,
                    h.group,
                    h.key,
                    h.value.unwrap_or("")
                );
            }

            eprintln!();
            eprintln!(
                "Found {} results in {:.3}ms",
                results.len(),
                elapsed.as_secs_f64() * 1000.0
            );
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&hits)?);
        }
    }

    Ok(())
}
