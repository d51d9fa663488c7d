use serde::{Deserialize, Serialize};

use crate::intent::IntentMetadata;
use crate::threading::ThreadNode;

/// User decision about a suggested cross-thread merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeState {
    #[default]
    Suggested,
    /// Always merge this thread with whatever it is compared against
    Accepted,
    /// May be shown as related, but never folded away for good
    Reverted,
}

/// Why a thread was attached to another one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadMergeReason {
    /// Thread id of the related conversation
    pub id: String,
    pub description: String,
    pub similarity: f32,
    pub shared_participants: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadRelatedConversation {
    pub id: String,
    pub summary: String,
    pub node: ThreadNode,
}

/// A root thread plus the conversations merged into it, before display assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadGroupSeed {
    pub metadata: IntentMetadata,
    pub root: ThreadNode,
    pub related: Vec<ThreadRelatedConversation>,
    pub merge_reasons: Vec<ThreadMergeReason>,
}

impl ThreadGroupSeed {
    pub fn id(&self) -> &str {
        &self.metadata.thread_id
    }

    pub fn related_ids(&self) -> impl Iterator<Item = &str> {
        self.related.iter().map(|conversation| conversation.id.as_str())
    }
}
