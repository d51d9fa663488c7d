//! Keyword heuristics behind the per-thread intent signals.
//!
//! Every function here takes already-lowercased text.

use chrono::Duration;
use serde::{Deserialize, Serialize};

const URGENT_TERMS: &[&str] = &["urgent", "asap"];
const SOON_TERMS: &[&str] = &["today", "eod"];
const PLANNING_TERMS: &[&str] = &["plan", "schedule", "travel"];
const WAITING_TERMS: &[&str] = &["waiting on you", "need your response", "awaiting reply"];
const TASK_TERMS: &[&str] = &["action required", "todo", "please review"];

/// Checked in order, first hit wins
const TOPIC_TAGS: &[(&str, &str)] = &[
    ("travel", "Travel Plans"),
    ("invoice", "Finance"),
    ("meeting", "Meetings"),
];

/// Urgent badge cut-off on the urgency score
pub const URGENT_BADGE_THRESHOLD: f64 = 0.6;

/// Numeric signals feeding the priority score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentSignals {
    pub urgency_score: f64,
    pub timeliness_score: f64,
    pub personal_priority_score: f64,
    pub intent_relevance: f64,
}

/// Display badges, declared in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Badge {
    Urgent,
    AwaitingReply,
    Task,
    Vip,
}

fn contains_any(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|term| text.contains(term))
}

pub fn urgency_score(text: &str) -> f64 {
    if contains_any(text, URGENT_TERMS) {
        0.95
    } else if contains_any(text, SOON_TERMS) {
        0.7
    } else {
        0.2
    }
}

/// Score by how long ago the thread last moved. Future dates count as fresh.
pub fn timeliness_score(age: Duration) -> f64 {
    if age < Duration::hours(12) {
        0.8
    } else if age < Duration::hours(48) {
        0.5
    } else {
        0.2
    }
}

pub fn personal_priority_score(involves_vip: bool) -> f64 {
    if involves_vip { 0.9 } else { 0.2 }
}

pub fn intent_relevance(text: &str) -> f64 {
    if contains_any(text, PLANNING_TERMS) {
        0.7
    } else {
        0.3
    }
}

pub fn is_waiting_on_me(text: &str) -> bool {
    contains_any(text, WAITING_TERMS)
}

pub fn has_active_task(text: &str) -> bool {
    contains_any(text, TASK_TERMS)
}

/// Topic tag derived from subject text only.
pub fn topic_tag(subject_text: &str) -> Option<String> {
    TOPIC_TAGS
        .iter()
        .find(|(keyword, _)| subject_text.contains(keyword))
        .map(|(_, tag)| tag.to_string())
}

pub fn badges_for(
    signals: &IntentSignals,
    waiting_on_me: bool,
    active_task: bool,
    involves_vip: bool,
) -> Vec<Badge> {
    let mut badges = Vec::new();
    if signals.urgency_score >= URGENT_BADGE_THRESHOLD {
        badges.push(Badge::Urgent);
    }
    if waiting_on_me {
        badges.push(Badge::AwaitingReply);
    }
    if active_task {
        badges.push(Badge::Task);
    }
    if involves_vip {
        badges.push(Badge::Vip);
    }
    badges
}
