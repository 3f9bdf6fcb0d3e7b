use std::io::IsTerminal;
use std::path::PathBuf;

use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::error::{Result, TaskpadError};

pub const DATA_DIR_ENV: &str = "TASKPAD_DIR";

/// `TASKPAD_DIR`, ignored when empty.
pub fn env_data_dir() -> Option<PathBuf> {
    std::env::var_os(DATA_DIR_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// `--data-dir`, then `TASKPAD_DIR`, then `<platform data dir>/taskpad`.
pub fn resolve_data_dir(cli_override: Option<PathBuf>) -> Result<PathBuf> {
    let dir = cli_override
        .or_else(env_data_dir)
        .or_else(|| dirs::data_dir().map(|base| base.join("taskpad")))
        .ok_or(TaskpadError::NoDataDir)?;
    debug!(data_dir = %dir.display(), "resolved data directory");
    Ok(dir)
}

/// Log level implied by `-v`/`-q` counts when `RUST_LOG` is unset.
pub fn default_log_level(verbose: u8, quiet: u8) -> &'static str {
    if quiet >= 2 {
        "off"
    } else if quiet == 1 {
        "error"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    }
}

pub fn init_tracing(verbose: u8, quiet: u8) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_level(verbose, quiet)));

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }
}
