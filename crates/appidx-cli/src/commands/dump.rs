//! Dump command - print stored keyfiles.

use crate::app::App;
use appidx_core::{Config, KeyfileView};

fn print_keyfile(app_id: &str, keyfile: &KeyfileView<'_>) {
    println!("# {app_id}");
    for group in keyfile.groups() {
        println!("[{}]", group.name);
        for item in group.items.clone().filter_map(|i| keyfile.item(i)) {
            match item.locale {
                Some(locale) => println!("{}[{}]={}", item.key, locale, item.value),
                None => println!("{}={}", item.key, item.value),
            }
        }
    }
    println!();
}

/// Run the dump command.
pub fn run(config: Config, app_id: Option<&str>) -> anyhow::Result<()> {
    let app = App::new(config)?;
    let index = app.open_index()?;

    match app_id {
        Some(app_id) => {
            let Some(keyfile) = index.keyfile_by_name(app_id) else {
                anyhow::bail!("no application {app_id:?} in the index");
            };
            print_keyfile(app_id, &keyfile);
        }
        None => {
            for (id, name) in index.app_names().iter().enumerate() {
                if let Some(keyfile) = index.keyfile(id as u16) {
                    print_keyfile(name, &keyfile);
                }
            }
        }
    }

    Ok(())
}
