use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("API request to {url} failed with status {status}")]
    Remote { url: String, status: u16 },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected API response: {0}")]
    Protocol(String),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Evaluation failed: {0}")]
    Evaluation(String),

    #[error("Cache artifact {} could not be decoded: {source}", path.display())]
    Cache {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;
