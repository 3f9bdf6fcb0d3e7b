use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand};
use taskpad::commands::theme::ThemeAction;
use taskpad::error::TaskpadError;
use taskpad::model::{FilterMode, Priority, SortMode};
use taskpad::output::Format;

#[derive(Parser)]
#[command(name = "taskpad", version, about = "Local task list with a terminal UI")]
struct Cli {
    /// Output format
    #[arg(long, global = true, value_enum, default_value = "pretty")]
    format: Format,
    /// Shorthand for --format pretty
    #[arg(long, global = true, hide = true)]
    pretty: bool,
    /// Directory holding tasks.json and the theme preference
    #[arg(long, global = true, value_name = "PATH")]
    data_dir: Option<PathBuf>,
    /// More log output on stderr (repeatable)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    /// Less log output on stderr (repeatable)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    quiet: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a task
    Add {
        /// Task title
        text: String,
        /// Category label (defaults to "Other")
        #[arg(long, short)]
        category: Option<String>,
        /// Task priority
        #[arg(long, short, value_enum)]
        priority: Option<Priority>,
        /// Due date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_due_date)]
        due: Option<NaiveDate>,
        /// Free-form notes
        #[arg(long, short)]
        notes: Option<String>,
    },
    /// List tasks through a filter, search, and sort
    List {
        #[arg(long, short, value_enum, default_value = "all")]
        filter: FilterMode,
        /// Case-insensitive match on title or notes
        #[arg(long, short)]
        search: Option<String>,
        #[arg(long, value_enum, default_value = "created-desc")]
        sort: SortMode,
    },
    /// Display a single task
    Show {
        id: u64,
    },
    /// Flip a task between pending and completed
    Toggle {
        id: u64,
    },
    /// Edit a task's title and notes
    Edit {
        id: u64,
        /// New title (required for the edit to apply)
        #[arg(long)]
        title: Option<String>,
        /// New notes; omit to keep the current notes
        #[arg(long, short)]
        notes: Option<String>,
    },
    /// Delete a task
    Delete {
        id: u64,
    },
    /// Show total, completed, and pending counts
    Stats,
    /// Show or change the light/dark theme
    Theme {
        #[arg(value_enum, default_value = "show")]
        action: ThemeAction,
    },
    /// Load tasks from a JSON array (use - for stdin)
    Import {
        source: String,
        /// Append records with unseen ids instead of replacing
        #[arg(long)]
        merge: bool,
        /// Report what would happen without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the stored collection as JSON
    Export,
    /// Interactive terminal UI
    Tui {
        #[arg(long, short, value_enum, default_value = "all")]
        filter: FilterMode,
        #[arg(long, value_enum, default_value = "created-desc")]
        sort: SortMode,
        #[arg(long, short)]
        search: Option<String>,
    },
}

fn parse_due_date(raw: &str) -> Result<NaiveDate, TaskpadError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| TaskpadError::InvalidDate(raw.to_string()))
}

fn run(cli: Cli, format: Format) -> taskpad::error::Result<()> {
    let data_dir = taskpad::config::resolve_data_dir(cli.data_dir)?;

    match cli.command {
        Commands::Add {
            text,
            category,
            priority,
            due,
            notes,
        } => taskpad::commands::add::run(&data_dir, text, category, priority, due, notes, format),
        Commands::List {
            filter,
            search,
            sort,
        } => taskpad::commands::list::run(&data_dir, filter, search, sort, format),
        Commands::Show { id } => taskpad::commands::show::run(&data_dir, id, format),
        Commands::Toggle { id } => taskpad::commands::lifecycle::toggle(&data_dir, id, format),
        Commands::Edit { id, title, notes } => {
            taskpad::commands::edit::run(&data_dir, id, title, notes, format)
        }
        Commands::Delete { id } => taskpad::commands::delete::run(&data_dir, id, format),
        Commands::Stats => taskpad::commands::stats::run(&data_dir, format),
        Commands::Theme { action } => taskpad::commands::theme::run(&data_dir, action, format),
        Commands::Import {
            source,
            merge,
            dry_run,
        } => taskpad::commands::import::run(&data_dir, source, merge, dry_run, format),
        Commands::Export => taskpad::commands::import::export(&data_dir),
        Commands::Tui {
            filter,
            sort,
            search,
        } => taskpad::commands::tui::run(&data_dir, filter, sort, search),
    }
}

fn main() {
    let cli = Cli::parse();
    let format = if cli.pretty {
        Format::Pretty
    } else {
        cli.format
    };

    // Log lines would tear the alternate screen.
    let quiet = if matches!(cli.command, Commands::Tui { .. }) {
        cli.quiet.max(2)
    } else {
        cli.quiet
    };
    taskpad::config::init_tracing(cli.verbose, quiet);

    if let Err(e) = run(cli, format) {
        match format {
            Format::Json => {
                eprintln!(
                    "{}",
                    serde_json::json!({
                        "error": e.code(),
                        "message": e.to_string()
                    })
                );
            }
            _ => eprintln!("error: {e}"),
        }
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_date_parser_accepts_iso_dates() {
        assert_eq!(
            parse_due_date("2024-06-01").unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
        );
        assert!(matches!(
            parse_due_date("06/01/2024"),
            Err(TaskpadError::InvalidDate(_))
        ));
    }

    #[test]
    fn cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "taskpad", "list", "--filter", "pending", "--format", "json", "-vv",
        ])
        .unwrap();
        assert_eq!(cli.format, Format::Json);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Commands::List {
                filter: FilterMode::Pending,
                sort: SortMode::CreatedDesc,
                ..
            }
        ));
    }
}
