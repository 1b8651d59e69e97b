use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid OCR document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed fragment '{id}': {reason}")]
    MalformedFragment { id: String, reason: String },

    #[error("invalid anchor pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("invalid region: {0}")]
    InvalidRegion(String),

    #[error("invalid page selection: {0}")]
    InvalidPageSelection(String),

    #[error("invalid option: {0}")]
    InvalidOption(String),
}

impl ExtractError {
    pub(crate) fn malformed(id: &str, reason: impl Into<String>) -> Self {
        Self::MalformedFragment {
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}
