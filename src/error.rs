use thiserror::Error;

/// Failures reported by an injected summarization capability.
///
/// These never reach callers of the analyzer; they only select the fallback text.
#[derive(Debug, Error)]
pub enum SummarizerError {
    #[error("summarizer unavailable: {0}")]
    Unavailable(String),
    #[error("summarizer request failed: {0}")]
    Failed(String),
    #[error("summarizer returned an empty summary")]
    EmptySummary,
}

/// Errors surfaced by intent analysis.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntentError {
    #[error("intent analysis cancelled")]
    Cancelled,
}

/// Errors while loading triage request files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}
