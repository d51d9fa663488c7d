use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::embedding::Embedding;
use super::participants::Participant;
use super::signals::{Badge, IntentSignals};

/// Everything derived about one thread in an analysis pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentMetadata {
    pub thread_id: String,
    pub summary: String,
    pub topic_tag: Option<String>,
    pub participants: Vec<Participant>,
    pub badges: Vec<Badge>,
    pub intent_signals: IntentSignals,
    pub is_waiting_on_me: bool,
    pub has_active_task: bool,
    pub embedding: Embedding,
    /// Lowercased participant emails, for overlap checks
    pub participant_lookup: HashSet<String>,
    pub last_updated: DateTime<Utc>,
    pub unread_count: usize,
    /// Position of the thread in the analyzed input
    pub chronological_index: usize,
}

impl IntentMetadata {
    pub fn involves_vip(&self) -> bool {
        self.badges.contains(&Badge::Vip)
    }
}
