use std::path::PathBuf;

use thiserror::Error;

use crate::storage::models::ProcessingTaskKey;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Blob encoding error: {0}")]
    Blob(#[from] bincode::Error),

    #[error("Invalid output pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Unknown processing method: {0}")]
    UnknownMethod(String),

    #[error("Unknown {table} value: {value}")]
    UnknownLookup { table: &'static str, value: String },

    #[error("Processing task not found: {0}")]
    TaskNotFound(ProcessingTaskKey),

    #[error("Path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),

    #[error("{} is not under root data directory {}", path.display(), root.display())]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("{stage} is already populated for {key}")]
    AlreadyPopulated {
        stage: &'static str,
        key: ProcessingTaskKey,
    },

    #[error("{stage} requires {upstream} for {key}")]
    MissingUpstream {
        stage: &'static str,
        upstream: &'static str,
        key: ProcessingTaskKey,
    },

    #[error("Invalid record: {0}")]
    Invalid(String),
}
