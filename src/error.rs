use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskpadError {
    #[error("task {0} not found")]
    TaskNotFound(u64),

    #[error("invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("no data directory could be determined (pass --data-dir or set TASKPAD_DIR)")]
    NoDataDir,

    #[error("corrupt store file '{0}': {1}")]
    CorruptStore(String, String),

    #[error("invalid import: {0}")]
    InvalidImport(String),

    #[error("locked by another process: {0}")]
    Locked(String),

    #[error("terminal error: {0}")]
    Terminal(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TaskpadError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::TaskNotFound(_) => "task_not_found",
            Self::InvalidDate(_) => "invalid_date",
            Self::NoDataDir => "no_data_dir",
            Self::CorruptStore(_, _) => "corrupt_store",
            Self::InvalidImport(_) => "invalid_import",
            Self::Locked(_) => "locked",
            Self::Terminal(_) => "terminal_error",
            Self::Io(_) => "io_error",
            Self::Json(_) => "json_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, TaskpadError>;
