use super::{open_log, print_document};
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use scriptorium_editor::history::time_travel;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Event log to replay
    pub log: PathBuf,

    /// Revision to stop at (defaults to the latest)
    #[arg(short, long)]
    pub revision: Option<u64>,

    /// Print the replayed document as TEI
    #[arg(long)]
    pub tei: bool,
}

pub fn replay(args: ReplayArgs, _cwd: &str) -> Result<()> {
    let source = fs::read_to_string(&args.log)
        .map_err(|e| anyhow!("Cannot read {}: {}", args.log.display(), e))?;
    let latest = open_log(&args.log, &source)?;

    let doc = match args.revision {
        Some(revision) => time_travel(&latest, latest.events(), revision)?,
        None => latest,
    };

    if args.tei {
        println!("{}", doc.to_tei());
        return Ok(());
    }

    println!(
        "⏪ {} {} at revision {}",
        "Replaying".green().bold(),
        args.log.display(),
        doc.revision()
    );
    print_document(&doc);
    Ok(())
}
