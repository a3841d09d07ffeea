use super::open_log;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use scriptorium_editor::DocumentEvent;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Event log to list
    pub log: PathBuf,

    /// Show event timestamps
    #[arg(short, long)]
    pub timestamps: bool,
}

pub fn history(args: HistoryArgs, _cwd: &str) -> Result<()> {
    let source = fs::read_to_string(&args.log)
        .map_err(|e| anyhow!("Cannot read {}: {}", args.log.display(), e))?;
    let doc = open_log(&args.log, &source)?;

    println!("📜 {} {}", "History of".green().bold(), args.log.display());
    for event in doc.events() {
        println!("  {}", format_event(event, args.timestamps));
    }
    println!();
    println!(
        "   {} events, revisions {}..={}",
        doc.events().len(),
        doc.baseline(),
        doc.revision()
    );
    Ok(())
}

fn format_event(event: &DocumentEvent, timestamps: bool) -> String {
    let kind = if event.is_loaded() {
        event.kind().bright_blue().to_string()
    } else {
        event.kind().cyan().to_string()
    };
    let when = if timestamps {
        format!(" {}", event.timestamp().format("%Y-%m-%d %H:%M:%S").to_string().dimmed())
    } else {
        String::new()
    };
    format!("{:>4}{} {} {}", event.revision(), when, kind, event.describe())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptorium_editor::{DocumentValue, LoadOptions};

    #[test]
    fn test_format_event() {
        colored::control::set_override(false);
        let doc = DocumentValue::load_markup("t", "<p>Hi</p>", &LoadOptions::default()).unwrap();
        let line = format_event(doc.events().last().unwrap(), false);
        assert_eq!(line, "   0 loaded loaded 1 passages, 0 characters");
    }
}
