use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LyrireelError {
    #[error("Search backend {backend} unavailable: {reason}")]
    SearchUnavailable { backend: String, reason: String },

    #[error("Clip fetch failed for {resource_id}: {reason}")]
    ClipFetchFailed { resource_id: String, reason: String },

    #[error("Clip {index} exhausted all candidates after {attempts} attempts: {reason}")]
    AllCandidatesExhausted {
        index: usize,
        attempts: u32,
        reason: String,
    },

    #[error("Placeholder generation failed for {target}: {reason}")]
    PlaceholderFailed { target: PathBuf, reason: String },

    #[error("Encoding failed for {output}: {reason}")]
    EncodeFailed { output: PathBuf, reason: String },

    #[error("Invalid line {line}: {reason}")]
    InvalidLine { line: usize, reason: String },

    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },

    #[error("Render cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Missing API key: {env_var} environment variable is not set")]
    MissingApiKey { env_var: String },
}

pub type Result<T> = std::result::Result<T, LyrireelError>;
