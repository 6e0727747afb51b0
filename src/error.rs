use std::path::PathBuf;

use thiserror::Error;

/// Failures while obtaining text or rows from an upstream source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to read input: {0}")]
    Read(#[from] std::io::Error),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Upstream returned HTTP {0}")]
    Status(u16),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Parse failed: {0}")]
    Parse(String),
}

impl SourceError {
    /// Short category name, used in logs and error bodies.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Read(_) => "read",
            Self::Network(_) | Self::Status(_) => "network",
            Self::InvalidUrl(_) => "request",
            Self::Parse(_) => "parse",
        }
    }
}

/// Failures of the external text-generation call.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Text generation rejected the credentials")]
    Auth,
    #[error("Text generation quota exhausted")]
    Quota,
    #[error("Text generation network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Text generation returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Unexpected text generation response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("History IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("History serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration in {}: {reason}", .path.display())]
    Config { path: PathBuf, reason: String },

    #[error("Invalid extractor settings: {0}")]
    InvalidSettings(String),

    #[error("No menu items to analyze")]
    NothingToAnalyze,

    #[error("Invalid currency marker pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    History(#[from] HistoryError),
}

pub type Result<T> = std::result::Result<T, Error>;
pub type SourceResult<T> = std::result::Result<T, SourceError>;
pub type AnalysisResult<T> = std::result::Result<T, AnalysisError>;
pub type HistoryResult<T> = std::result::Result<T, HistoryError>;
