pub mod apply;
pub mod history;
pub mod init;
pub mod inspect;
pub mod replay;

pub use apply::{apply, ApplyArgs};
pub use history::{history, HistoryArgs};
pub use init::{init, InitArgs};
pub use inspect::{inspect, InspectArgs};
pub use replay::{replay, ReplayArgs};

use crate::config::Config;
use anyhow::{anyhow, Result};
use colored::Colorize;
use scriptorium_editor::{DocumentValue, EventLog};
use std::fs;
use std::path::Path;

/// Open a markup file, or an event log when the file is `.json`
pub(crate) fn open_document(path: &Path, config: &Config) -> Result<DocumentValue> {
    let source = fs::read_to_string(path)
        .map_err(|e| anyhow!("Cannot read {}: {}", path.display(), e))?;

    if path.extension().and_then(|s| s.to_str()) == Some("json") {
        return open_log(path, &source);
    }

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document");
    DocumentValue::load_markup(name, &source, &config.load)
        .map_err(|e| anyhow!("{}: {}", path.display(), e))
}

/// Parse and replay an event log file
pub(crate) fn open_log(path: &Path, source: &str) -> Result<DocumentValue> {
    let log = EventLog::from_json(source).map_err(|e| anyhow!("{}: {}", path.display(), e))?;
    DocumentValue::from_log(log).map_err(|e| anyhow!("{}: {}", path.display(), e))
}

/// Shorten passage text for one-line display
pub(crate) fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", cut)
}

/// Print metadata, passages with their tags, and the cast
pub(crate) fn print_document(doc: &DocumentValue) {
    let state = doc.state();
    for (key, value) in &state.metadata {
        println!("   {} {}", format!("{}:", key).dimmed(), value);
    }
    println!(
        "   {} {} (baseline {})",
        "Revision:".dimmed(),
        doc.revision(),
        doc.baseline()
    );
    println!();

    println!("{}", "Passages".bold());
    for passage in doc.passages() {
        println!(
            "  {} {}",
            passage.id.as_str().cyan(),
            preview(&passage.text(), 60)
        );
        for tag in doc.tags_in(&passage.id) {
            let speaker = doc
                .speaker_of(&tag.id)
                .map(|c| format!(" ← {}", c.name.yellow()))
                .unwrap_or_default();
            println!(
                "    <{}> {}..{}{}",
                tag.tag_type.green(),
                tag.range.start,
                tag.range.end,
                speaker
            );
        }
    }

    if !doc.characters().is_empty() {
        println!();
        println!("{}", "Cast".bold());
        for character in doc.characters() {
            println!(
                "  {} {} ({})",
                "•".cyan(),
                character.name,
                character.external_key.dimmed()
            );
            for rel in doc.relationships_for(&character.id) {
                if rel.from != character.id {
                    continue;
                }
                let other = doc
                    .character(&rel.to)
                    .map_or(rel.to.as_str(), |c| c.name.as_str());
                let arrow = if rel.mutual { "↔" } else { "→" };
                println!("      {} {} {}", rel.relation_type.dimmed(), arrow, other);
            }
        }
    }
}
