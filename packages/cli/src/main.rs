mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    apply, history, init, inspect, replay, ApplyArgs, HistoryArgs, InitArgs, InspectArgs,
    ReplayArgs,
};

/// Scriptorium CLI - annotate literary texts with an undoable edit history
#[derive(Parser, Debug)]
#[command(name = "scriptorium")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a scriptorium.config.json
    Init(InitArgs),

    /// Show passages, tags and cast of a document
    Inspect(InspectArgs),

    /// Apply a JSON list of edit requests and write the event log
    Apply(ApplyArgs),

    /// Rebuild a document from its event log
    Replay(ReplayArgs),

    /// List the events of a log
    History(HistoryArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir.display().to_string(),
        Err(err) => {
            eprintln!("{} Cannot get current directory: {}", "Error:".red().bold(), err);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Init(args) => init(args, &cwd),
        Command::Inspect(args) => inspect(args, &cwd),
        Command::Apply(args) => apply(args, &cwd),
        Command::Replay(args) => replay(args, &cwd),
        Command::History(args) => history(args, &cwd),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
