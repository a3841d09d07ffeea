use super::open_document;
use crate::config::Config;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use scriptorium_editor::{DocumentError, DocumentValue, EditRequest};
use std::fs;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Markup file or event log to edit
    pub file: PathBuf,

    /// JSON array of edit requests
    pub requests: PathBuf,

    /// Where to write the event log (defaults to <file>.log.json)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Skip rejected requests instead of stopping
    #[arg(short, long)]
    pub keep_going: bool,
}

/// Result of running a batch of requests against a document
#[derive(Debug)]
pub struct Outcome {
    pub doc: DocumentValue,
    pub applied: usize,
    pub rejected: Vec<(usize, DocumentError)>,
}

/// Apply `requests` in order, stopping at the first rejection unless `keep_going`
pub fn apply_requests(doc: DocumentValue, requests: &[EditRequest], keep_going: bool) -> Outcome {
    let mut outcome = Outcome {
        doc,
        applied: 0,
        rejected: Vec::new(),
    };

    for (i, request) in requests.iter().enumerate() {
        match outcome.doc.apply(request) {
            Ok(next) => {
                outcome.doc = next;
                outcome.applied += 1;
            }
            Err(err) => {
                outcome.rejected.push((i, err));
                if !keep_going {
                    break;
                }
            }
        }
    }
    outcome
}

pub fn apply(args: ApplyArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let doc = open_document(&args.file, &config)?;

    let source = fs::read_to_string(&args.requests)
        .map_err(|e| anyhow!("Cannot read {}: {}", args.requests.display(), e))?;
    let requests: Vec<EditRequest> = serde_json::from_str(&source)
        .map_err(|e| anyhow!("{}: {}", args.requests.display(), e))?;

    println!(
        "{} {} requests to {}",
        "✏️ ".bright_blue(),
        requests.len(),
        args.file.display()
    );

    let outcome = apply_requests(doc, &requests, args.keep_going);
    for (i, request) in requests.iter().enumerate() {
        match outcome.rejected.iter().find(|(at, _)| *at == i) {
            Some((_, err)) => eprintln!(
                "  {} #{} {} - {}",
                "✗".red(),
                i,
                request.name(),
                err.to_string().red()
            ),
            None if i < outcome.applied + outcome.rejected.len() => {
                println!("  {} #{} {}", "✓".green(), i, request.name())
            }
            None => {}
        }
    }

    if !args.keep_going {
        if let Some((i, err)) = outcome.rejected.first() {
            return Err(anyhow!("Request #{} rejected: {}", i, err));
        }
    }

    let mut doc = outcome.doc;
    if let Some(keep) = config.compact_after {
        doc = doc.compact_keeping(keep)?;
    }

    let output = args
        .output
        .unwrap_or_else(|| config.log_path_for(&args.file, cwd));
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&output, doc.events().to_json()?)?;
    info!(path = %output.display(), events = doc.events().len(), "Wrote event log");

    println!();
    println!(
        "{} Applied {} of {} requests → {} (revision {})",
        "✅".green(),
        outcome.applied,
        requests.len(),
        output.display(),
        doc.revision()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptorium_editor::{Attributes, ErrorKind, LoadOptions, Selection};

    fn requests(passage: &str) -> Vec<EditRequest> {
        vec![
            EditRequest::AddCharacter {
                external_key: "jane".to_string(),
                name: "Jane".to_string(),
                attributes: Attributes::new(),
            },
            // Stale: made against revision 0
            EditRequest::AddTag {
                selection: Selection::new(passage.into(), 0..5, 0),
                tag_type: "hi".to_string(),
                attributes: Attributes::new(),
            },
            EditRequest::AddTag {
                selection: Selection::new(passage.into(), 6..11, 1),
                tag_type: "q".to_string(),
                attributes: Attributes::new().with("who", "#jane"),
            },
        ]
    }

    fn doc() -> DocumentValue {
        DocumentValue::load_markup("t", "<p>Hello world</p>", &LoadOptions::default()).unwrap()
    }

    #[test]
    fn test_apply_stops_at_first_rejection() {
        let doc = doc();
        let passage = doc.passages()[0].id.to_string();
        let outcome = apply_requests(doc, &requests(&passage), false);

        assert_eq!(outcome.applied, 1);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].0, 1);
        assert_eq!(outcome.rejected[0].1.kind(), ErrorKind::StaleSelection);
        assert_eq!(outcome.doc.revision(), 1);
    }

    #[test]
    fn test_apply_keep_going() {
        let doc = doc();
        let passage = doc.passages()[0].id.to_string();
        let outcome = apply_requests(doc, &requests(&passage), true);

        assert_eq!(outcome.applied, 2);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.doc.revision(), 2);
        let q = &outcome.doc.tags()[0];
        assert_eq!(outcome.doc.speaker_of(&q.id).unwrap().name, "Jane");
    }
}
