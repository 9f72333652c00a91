//! `liveres list`: print the resource table.

use std::io::{Write, stdout};
use std::path::Path;

use anyhow::Result;
use owo_colors::OwoColorize;

use crate::config::Config;
use crate::log;
use crate::manifest;
use crate::resource::{Filters, ResourceEntry, ResourceTable};

pub fn list_resources(config: &Config) -> Result<()> {
    let manifest_path = config.manifest_path();
    let filters = config.manifest.filters();
    crate::debug!("manifest"; "{}", describe_filters(&filters));
    let entries = manifest::parse(&manifest_path, &filters)?;
    let table = ResourceTable::from_entries(entries);

    let mut out = stdout().lock();
    for entry in table.entries() {
        writeln!(out, "{}", render_entry(entry, config.get_root()))?;
    }
    out.flush()?;

    log!(
        "manifest";
        "{}: {} entries, {} watched",
        relative(config.get_root(), &manifest_path).display(),
        table.len(),
        table.watch_set().len()
    );
    Ok(())
}

fn render_entry(entry: &ResourceEntry, root: &Path) -> String {
    let state = if entry.ignored {
        "ignored".dimmed().to_string()
    } else {
        "watched".green().to_string()
    };
    format!(
        "{state}  {} -> {}",
        entry.virtual_path,
        relative(root, &entry.local_path).display()
    )
}

fn describe_filters(filters: &Filters) -> String {
    let join = |items: Vec<&str>| if items.is_empty() { "-".to_string() } else { items.join(" ") };
    format!(
        "suffixes: {}; ignore: {}; ignore prefixes: {}",
        join(filters.suffixes().iter().map(String::as_str).collect()),
        join(filters.ignore_filters().collect()),
        join(filters.prefix_ignore_filters().collect()),
    )
}

/// `path` relative to `root` when it lives under it.
fn relative<'a>(root: &Path, path: &'a Path) -> &'a Path {
    path.strip_prefix(root).unwrap_or(path)
}
