//! Display assembly and ordering of thread groups
//!
//! Pinned groups come first. Inside each partition, groups are ordered by a
//! weighted priority score, highest first, and then by their original
//! chronological position.

use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::intent::{Badge, IntentMetadata, IntentSignals};
use crate::merge::{MergeState, ThreadGroupSeed, ThreadMergeReason, ThreadRelatedConversation};
use crate::threading::ThreadNode;

const RELEVANCE_WEIGHT: f64 = 0.2;
const URGENCY_WEIGHT: f64 = 0.4;
const PERSONAL_PRIORITY_WEIGHT: f64 = 0.25;
const TIMELINESS_WEIGHT: f64 = 0.15;
const ACTIVE_TASK_BONUS: f64 = 0.1;
const WAITING_ON_ME_BONUS: f64 = 0.15;

/// A displayable conversation group.
///
/// Equality and hashing only look at `id`, so snapshots of the same
/// conversation from different runs compare equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadGroup {
    pub id: String,
    pub root: ThreadNode,
    pub related: Vec<ThreadRelatedConversation>,
    pub merge_reasons: Vec<ThreadMergeReason>,
    pub merge_state: MergeState,
    pub pinned: bool,
    pub chronological_index: usize,
    pub metadata: IntentMetadata,
}

impl ThreadGroup {
    /// Assemble a group from a merge seed plus the user's state for it.
    pub fn from_seed(seed: ThreadGroupSeed, merge_state: MergeState, pinned: bool) -> Self {
        ThreadGroup {
            id: seed.metadata.thread_id.clone(),
            chronological_index: seed.metadata.chronological_index,
            root: seed.root,
            related: seed.related,
            merge_reasons: seed.merge_reasons,
            merge_state,
            pinned,
            metadata: seed.metadata,
        }
    }

    pub fn summary(&self) -> &str {
        &self.metadata.summary
    }

    pub fn badges(&self) -> &[Badge] {
        &self.metadata.badges
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.metadata.last_updated
    }

    pub fn priority_score(&self) -> f64 {
        priority_score(
            &self.metadata.intent_signals,
            self.metadata.has_active_task,
            self.metadata.is_waiting_on_me,
        )
    }
}

impl PartialEq for ThreadGroup {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ThreadGroup {}

impl Hash for ThreadGroup {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Weighted blend of the intent signals plus flat bonuses for open work.
pub fn priority_score(signals: &IntentSignals, has_active_task: bool, is_waiting_on_me: bool) -> f64 {
    let mut score = RELEVANCE_WEIGHT * signals.intent_relevance
        + URGENCY_WEIGHT * signals.urgency_score
        + PERSONAL_PRIORITY_WEIGHT * signals.personal_priority_score
        + TIMELINESS_WEIGHT * signals.timeliness_score;

    if has_active_task {
        score += ACTIVE_TASK_BONUS;
    }
    if is_waiting_on_me {
        score += WAITING_ON_ME_BONUS;
    }
    score
}

/// Order groups for display.
///
/// A group counts as pinned when its own flag is set or its id is in `pins`;
/// the returned groups carry the resolved flag.
pub fn order_groups(groups: Vec<ThreadGroup>, pins: &HashSet<String>) -> Vec<ThreadGroup> {
    let mut ordered: Vec<(f64, ThreadGroup)> = groups
        .into_iter()
        .map(|mut group| {
            group.pinned = group.pinned || pins.contains(&group.id);
            (group.priority_score(), group)
        })
        .collect();

    ordered.sort_by(|(score_a, a), (score_b, b)| {
        b.pinned
            .cmp(&a.pinned)
            .then_with(|| score_b.total_cmp(score_a))
            .then_with(|| a.chronological_index.cmp(&b.chronological_index))
    });

    ordered.into_iter().map(|(_, group)| group).collect()
}
