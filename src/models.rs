use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::threading::normalize::normalize_identifier;

// ===== Message Models =====

/// A single email as handed over by the ingestion layer.
///
/// Records are treated as immutable. The thread builder never edits a message
/// in place; it produces a copy with `thread_id` filled in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Raw Message-ID header value
    pub id: String,
    #[serde(default)]
    pub normalized_id: String,
    #[serde(default)]
    pub mailbox_id: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub from: String,
    /// Comma separated recipient list, as found in the `To` header
    #[serde(default)]
    pub to: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub is_unread: bool,
    #[serde(default)]
    pub in_reply_to: Option<String>,
    /// Oldest ancestor first
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(default)]
    pub thread_id: Option<String>,
}

impl Message {
    /// Create a message with only the fields the threading stage needs.
    pub fn new(id: impl Into<String>, subject: impl Into<String>, date: DateTime<Utc>) -> Self {
        let id = id.into();
        let normalized_id = normalize_identifier(&id);
        Message {
            id,
            normalized_id,
            mailbox_id: String::new(),
            subject: subject.into(),
            from: String::new(),
            to: String::new(),
            date,
            snippet: String::new(),
            is_unread: false,
            in_reply_to: None,
            references: Vec::new(),
            thread_id: None,
        }
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = snippet.into();
        self
    }

    pub fn with_sender(mut self, from: impl Into<String>) -> Self {
        self.from = from.into();
        self
    }

    pub fn with_recipients(mut self, to: impl Into<String>) -> Self {
        self.to = to.into();
        self
    }

    pub fn with_in_reply_to(mut self, in_reply_to: impl Into<String>) -> Self {
        self.in_reply_to = Some(in_reply_to.into());
        self
    }

    pub fn with_references<I, S>(mut self, references: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.references = references.into_iter().map(Into::into).collect();
        self
    }

    pub fn unread(mut self, is_unread: bool) -> Self {
        self.is_unread = is_unread;
        self
    }

    /// Canonical identifier used as the threading key.
    ///
    /// Prefers the stored normalized id and falls back to normalizing the raw
    /// header. Empty when neither yields anything usable.
    pub fn identity(&self) -> String {
        let stored = normalize_identifier(&self.normalized_id);
        if stored.is_empty() {
            normalize_identifier(&self.id)
        } else {
            stored
        }
    }

    /// True when the message carries no reply linkage at all.
    pub fn has_reply_headers(&self) -> bool {
        let replies = self
            .in_reply_to
            .as_deref()
            .map(|value| !value.trim().is_empty())
            .unwrap_or(false);
        replies || self.references.iter().any(|r| !r.trim().is_empty())
    }

    /// Copy of this message stamped with its thread id.
    pub fn assigned_to(&self, thread_id: &str) -> Self {
        Message {
            thread_id: Some(thread_id.to_string()),
            ..self.clone()
        }
    }
}
