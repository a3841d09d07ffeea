use super::{open_document, print_document};
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Markup file or event log to inspect
    pub file: PathBuf,

    /// Print the document as TEI instead of a summary
    #[arg(long)]
    pub tei: bool,
}

pub fn inspect(args: InspectArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let doc = open_document(&args.file, &config)?;

    if args.tei {
        println!("{}", doc.to_tei());
        return Ok(());
    }

    println!("🔍 {} {}", "Inspecting".green().bold(), args.file.display());
    print_document(&doc);
    println!();
    println!(
        "   {} passages, {} tags, {} characters, {} relationships",
        doc.passages().len(),
        doc.tags().len(),
        doc.characters().len(),
        doc.relationships().len()
    );
    Ok(())
}
