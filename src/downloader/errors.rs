// Error types for the download core

use thiserror::Error;

/// Failure classes surfaced by the extraction engine and the orchestrator.
#[derive(Debug, Clone, Error)]
pub enum DownloadError {
    /// The engine's distinguished download-class failure: network trouble,
    /// unavailable video, access restriction. Carries the raw engine message.
    #[error("Download Error: {0}")]
    Download(String),

    /// Extraction engine binary missing from the system
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Failed to parse the engine's metadata output
    #[error("Parse error: {0}")]
    Parse(String),

    /// Could not spawn or talk to the engine process
    #[error("Execution error: {0}")]
    Execution(String),

    /// Filesystem trouble around the destination directory
    #[error("I/O error: {0}")]
    Io(String),

    /// Anything else
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<std::io::Error> for DownloadError {
    fn from(err: std::io::Error) -> Self {
        DownloadError::Io(err.to_string())
    }
}

/// True when an engine error message looks like an access/verification
/// restriction, i.e. the download would likely succeed with authentication.
pub fn is_restriction_error(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("age") || lower.contains("sign in") || lower.contains("verify")
}
