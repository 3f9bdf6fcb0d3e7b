use std::collections::HashSet;
use std::fs;
use std::io::Read;
use std::path::Path;

use colored::Colorize;
use serde::Serialize;

use crate::error::{Result, TaskpadError};
use crate::model::Task;
use crate::output::Format;
use crate::store;

#[derive(Debug, Serialize)]
struct ImportReport {
    dry_run: bool,
    source: String,
    merge: bool,
    incoming: usize,
    added: usize,
    skipped: usize,
    total: usize,
}

/// Load a JSON array of tasks, either replacing the collection or (with
/// `merge`) appending records whose ids are not present yet.
pub fn run(
    data_dir: &Path,
    source: String,
    merge: bool,
    dry_run: bool,
    format: Format,
) -> Result<()> {
    let raw = read_source(&source)?;
    let incoming = parse_document(&source, &raw)?;
    let incoming_len = incoming.len();

    let mut store = store::open(data_dir)?;
    let combined = if merge {
        merge_into(store.tasks(), incoming)
    } else {
        incoming
    };
    let existing = if merge { store.tasks().len() } else { 0 };

    let total = if dry_run {
        normalized_len(&combined)
    } else {
        store.replace_all(combined)?
    };

    let added = total.saturating_sub(existing);
    let report = ImportReport {
        dry_run,
        source,
        merge,
        incoming: incoming_len,
        added,
        skipped: incoming_len.saturating_sub(added),
        total,
    };
    print_report(&report, format)
}

/// Print the stored collection in its wire form.
pub fn export(data_dir: &Path) -> Result<()> {
    let store = store::open(data_dir)?;
    println!("{}", serde_json::to_string_pretty(store.tasks())?);
    Ok(())
}

fn read_source(source: &str) -> Result<String> {
    if source == "-" {
        let mut contents = String::new();
        std::io::stdin().read_to_string(&mut contents)?;
        return Ok(contents);
    }

    Ok(fs::read_to_string(source)?)
}

fn parse_document(source: &str, raw: &str) -> Result<Vec<Task>> {
    if raw.trim().is_empty() {
        return Err(TaskpadError::InvalidImport(format!(
            "source '{source}' is empty"
        )));
    }
    serde_json::from_str(raw).map_err(|err| {
        TaskpadError::InvalidImport(format!(
            "failed to parse '{source}' as a JSON task array: {err}"
        ))
    })
}

fn merge_into(existing: &[Task], incoming: Vec<Task>) -> Vec<Task> {
    let mut combined = existing.to_vec();
    let known: HashSet<u64> = existing.iter().map(|t| t.id).collect();
    combined.extend(incoming.into_iter().filter(|t| !known.contains(&t.id)));
    combined
}

/// Size the collection would have after `replace_all` drops blank and
/// duplicate records.
fn normalized_len(tasks: &[Task]) -> usize {
    let mut seen = HashSet::new();
    tasks
        .iter()
        .filter(|t| !t.text.trim().is_empty() && seen.insert(t.id))
        .count()
}

fn print_report(report: &ImportReport, format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(report)?),
        Format::Pretty | Format::Minimal => {
            let verb = if report.dry_run {
                "would import"
            } else {
                "imported"
            };
            println!(
                "{} {} of {} task(s) from {} ({} skipped)",
                verb.green(),
                report.added,
                report.incoming,
                report.source,
                report.skipped
            );
            println!("  {} {}", "total:".dimmed(), report.total);
        }
    }
    Ok(())
}
