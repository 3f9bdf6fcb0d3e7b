use chrono::{Local, NaiveDate};
use clap::ValueEnum;
use colored::Colorize;

use crate::error::Result;
use crate::model::{Counts, Task, Theme};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Pretty,
    Minimal,
}

/// Due-date badge text, if the task has a due date.
pub fn due_badge(task: &Task, today: NaiveDate) -> Option<String> {
    let due = task.due_date?;
    if task.is_overdue(today) {
        Some(format!("Overdue: {due}"))
    } else {
        Some(format!("Due: {due}"))
    }
}

/// Creation date in local time; records without one show today.
pub fn created_label(task: &Task) -> String {
    let created = task.display_created_at().with_timezone(&Local);
    format!("Created: {}", created.format("%Y-%m-%d"))
}

pub fn pretty_lines(task: &Task, today: NaiveDate) -> Vec<String> {
    let check = if task.completed { "[x]" } else { "[ ]" };
    let title = if task.completed {
        task.text.strikethrough().dimmed().to_string()
    } else {
        task.text.bold().to_string()
    };

    let mut lines = vec![format!("{} {} {}", task.id.to_string().dimmed(), check, title)];

    let mut meta = vec![
        format!("{} {}", "category:".dimmed(), task.category),
        format!("{} {}", "priority:".dimmed(), task.priority),
    ];
    if let Some(badge) = due_badge(task, today) {
        if task.is_overdue(today) {
            meta.push(badge.red().to_string());
        } else {
            meta.push(badge);
        }
    }
    meta.push(created_label(task).dimmed().to_string());
    lines.push(format!("  {}", meta.join(" | ")));

    if !task.notes.trim().is_empty() {
        for note_line in task.notes.lines() {
            lines.push(format!("  > {note_line}"));
        }
    }
    lines
}

pub fn print_task(task: &Task, format: Format, today: NaiveDate) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(task)?),
        Format::Pretty => {
            for line in pretty_lines(task, today) {
                println!("{line}");
            }
        }
        Format::Minimal => println!("{}", minimal_row(task, today)),
    }
    Ok(())
}

pub fn minimal_row(task: &Task, today: NaiveDate) -> String {
    let done = if task.completed { "x" } else { " " };
    let due = match task.due_date {
        Some(d) if task.is_overdue(today) => format!("!{d}"),
        Some(d) => d.to_string(),
        None => "-".to_string(),
    };
    format!(
        "{:>13} [{}] {:6} {:11} {:10} {}",
        task.id,
        done,
        task.priority,
        due,
        truncate_title(&task.category, 10),
        truncate_title(&task.text, 40),
    )
}

pub fn truncate_title(title: &str, max_len: usize) -> String {
    if title.chars().count() > max_len {
        let truncated: String = title.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    } else {
        title.to_string()
    }
}

pub fn print_tasks(tasks: &[&Task], format: Format, today: NaiveDate) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(tasks)?),
        Format::Pretty => {
            if tasks.is_empty() {
                println!("{}", "No tasks.".dimmed());
            }
            for task in tasks {
                print_task(task, Format::Pretty, today)?;
                println!();
            }
        }
        Format::Minimal => {
            println!(
                "{:>13} {:3} {:6} {:11} {:10} TEXT",
                "ID", "", "PRIO", "DUE", "CATEGORY"
            );
            println!("{}", "-".repeat(60));
            for task in tasks {
                println!("{}", minimal_row(task, today));
            }
        }
    }
    Ok(())
}

pub fn counts_line(counts: Counts) -> String {
    format!(
        "Total: {}  Completed: {}  Pending: {}",
        counts.total, counts.completed, counts.pending
    )
}

pub fn print_counts(counts: Counts, format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(&counts)?),
        Format::Pretty | Format::Minimal => println!("{}", counts_line(counts)),
    }
    Ok(())
}

pub fn print_theme(theme: Theme, format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::json!({ "theme": theme.as_str() })),
        Format::Pretty | Format::Minimal => println!("{theme}"),
    }
    Ok(())
}
