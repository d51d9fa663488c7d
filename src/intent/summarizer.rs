use async_trait::async_trait;

use crate::error::SummarizerError;

/// Text used when neither a summarizer nor a subject is available
pub const FALLBACK_SUMMARY: &str = "Conversation";

/// Injected capability that turns a thread's subjects into a short description.
///
/// Implementations may call a model service or run inference locally. Errors
/// are absorbed by the analyzer and replaced with fallback text.
#[async_trait]
pub trait ThreadSummarizer: Send + Sync {
    async fn summarize_thread(&self, subjects: &[String]) -> Result<String, SummarizerError>;
}

/// Summary used when the summarizer is missing or fails: the first non-blank
/// subject, or [`FALLBACK_SUMMARY`].
pub fn fallback_summary(subjects: &[String]) -> String {
    subjects
        .iter()
        .map(|subject| subject.trim())
        .find(|subject| !subject.is_empty())
        .unwrap_or(FALLBACK_SUMMARY)
        .to_string()
}
