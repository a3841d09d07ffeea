use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Directory event logs are written to
    #[arg(short, long)]
    pub out_dir: Option<String>,

    /// Undoable edits kept when a log is written
    #[arg(short, long)]
    pub compact_after: Option<usize>,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!(
        "{}",
        "📝 Initializing Scriptorium project...".bright_blue().bold()
    );

    if let Some(dir) = &args.out_dir {
        let out_dir = PathBuf::from(cwd).join(dir);
        if !out_dir.exists() {
            fs::create_dir_all(&out_dir)?;
            println!("  {} Created {}/", "✓".green(), dir);
        }
    }

    let config = Config {
        compact_after: args.compact_after,
        out_dir: args.out_dir,
        ..Config::default()
    };
    fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;
    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);

    println!();
    println!("{}", "✨ Project initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. {} to see passages and cast", "scriptorium inspect <file>".cyan());
    println!(
        "  2. {} to record edits",
        "scriptorium apply <file> <requests.json>".cyan()
    );

    Ok(())
}
