//! Error types for the coordination engine.

use std::time::Duration;

/// A run was rejected before any board was created.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("request is empty")]
    EmptyRequest,
    #[error("invalid run configuration: {0}")]
    InvalidConfig(String),
}

/// The generation collaborator failed during an act.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("malformed stream: {0}")]
    Stream(String),
    #[error("generator produced no text")]
    Empty,
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),
    #[error("{0}")]
    Other(String),
}
