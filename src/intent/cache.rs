//! Summary cache shared by intent analysis runs
//!
//! Keyed by thread id. A hit short-circuits the summarizer call but never the
//! numeric signals, which are recomputed on every pass. DashMap's per-shard
//! locking serializes concurrent lookups and upserts for the same key; the
//! last writer wins.

use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use super::signals::{Badge, IntentSignals};

static SHARED_CACHE: OnceLock<Arc<IntentCache>> = OnceLock::new();

/// What the analyzer remembers about a summarized thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentCacheRecord {
    pub summary: String,
    pub topic_tag: Option<String>,
    pub intent_signals: IntentSignals,
    pub badges: Vec<Badge>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct IntentCache {
    records: DashMap<String, IntentCacheRecord>,
}

impl IntentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide cache instance.
    pub fn shared() -> Arc<IntentCache> {
        SHARED_CACHE
            .get_or_init(|| Arc::new(IntentCache::new()))
            .clone()
    }

    pub fn get(&self, thread_id: &str) -> Option<IntentCacheRecord> {
        self.records.get(thread_id).map(|entry| entry.value().clone())
    }

    pub fn summary(&self, thread_id: &str) -> Option<String> {
        self.records
            .get(thread_id)
            .map(|entry| entry.value().summary.clone())
    }

    pub fn upsert(&self, thread_id: &str, record: IntentCacheRecord) {
        self.records.insert(thread_id.to_string(), record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&self) {
        self.records.clear();
    }
}
