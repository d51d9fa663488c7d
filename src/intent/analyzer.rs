//! Per-thread intent enrichment
//!
//! Each thread root is analyzed in its own tokio task. Results are gathered as
//! they finish and then put back in input order by `chronological_index`.
//! A task that panics is logged and dropped rather than replaced.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::cache::{IntentCache, IntentCacheRecord};
use super::embedding::Embedding;
use super::participants::collect_participants;
use super::signals::{self, Badge, IntentSignals};
use super::summarizer::{ThreadSummarizer, fallback_summary};
use super::types::IntentMetadata;
use crate::error::{IntentError, SummarizerError};
use crate::threading::ThreadNode;

#[derive(Clone)]
pub struct IntentAnalyzer {
    summarizer: Option<Arc<dyn ThreadSummarizer>>,
    cache: Arc<IntentCache>,
    vip_addresses: Arc<HashSet<String>>,
    reference_time: Option<DateTime<Utc>>,
}

impl IntentAnalyzer {
    /// Analyzer backed by the process-wide cache and no summarizer.
    pub fn new(vip_addresses: HashSet<String>) -> Self {
        let vip_addresses = vip_addresses
            .into_iter()
            .map(|address| address.trim().to_lowercase())
            .collect();

        Self {
            summarizer: None,
            cache: IntentCache::shared(),
            vip_addresses: Arc::new(vip_addresses),
            reference_time: None,
        }
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn ThreadSummarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn with_cache(mut self, cache: Arc<IntentCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Pin "now" for timeliness scoring instead of reading the clock.
    pub fn with_reference_time(mut self, now: DateTime<Utc>) -> Self {
        self.reference_time = Some(now);
        self
    }

    pub fn cache(&self) -> &Arc<IntentCache> {
        &self.cache
    }

    /// Analyze every node. Dropping the returned future aborts all tasks.
    pub async fn analyze(&self, nodes: &[ThreadNode]) -> Vec<IntentMetadata> {
        self.analyze_with_cancellation(nodes, &CancellationToken::new())
            .await
            .unwrap_or_default()
    }

    /// Analyze every node, giving up as a whole once `cancel` fires.
    ///
    /// Cancellation aborts every outstanding task and discards results that
    /// already finished.
    pub async fn analyze_with_cancellation(
        &self,
        nodes: &[ThreadNode],
        cancel: &CancellationToken,
    ) -> Result<Vec<IntentMetadata>, IntentError> {
        if cancel.is_cancelled() {
            return Err(IntentError::Cancelled);
        }

        let now = self.reference_time.unwrap_or_else(Utc::now);
        let mut tasks = JoinSet::new();

        for (index, node) in nodes.iter().enumerate() {
            let analyzer = self.clone();
            let node = node.clone();
            tasks.spawn(async move { analyzer.analyze_node(&node, index, now).await });
        }

        let mut results = Vec::with_capacity(nodes.len());
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tasks.abort_all();
                    log::debug!(
                        "intent analysis cancelled with {} of {} threads finished",
                        results.len(),
                        nodes.len()
                    );
                    return Err(IntentError::Cancelled);
                }
                joined = tasks.join_next() => match joined {
                    Some(Ok(metadata)) => results.push(metadata),
                    Some(Err(err)) => log::warn!("intent analysis task failed: {}", err),
                    None => break,
                },
            }
        }

        results.sort_by_key(|metadata| metadata.chronological_index);
        log::debug!("intent analysis: {} of {} threads enriched", results.len(), nodes.len());
        Ok(results)
    }

    /// Derive the metadata for a single thread root.
    pub async fn analyze_node(
        &self,
        node: &ThreadNode,
        chronological_index: usize,
        now: DateTime<Utc>,
    ) -> IntentMetadata {
        let thread_id = node.thread_id().to_string();
        let subjects: Vec<String> = node.iter().map(|n| n.message.subject.clone()).collect();
        let text = signal_text(node);

        let participants = collect_participants(node);
        let involves_vip = participants
            .iter()
            .any(|participant| self.vip_addresses.contains(&participant.email));

        let last_updated = node.last_updated();
        let intent_signals = IntentSignals {
            urgency_score: signals::urgency_score(&text),
            timeliness_score: signals::timeliness_score(now - last_updated),
            personal_priority_score: signals::personal_priority_score(involves_vip),
            intent_relevance: signals::intent_relevance(&text),
        };
        let is_waiting_on_me = signals::is_waiting_on_me(&text);
        let has_active_task = signals::has_active_task(&text);
        let topic_tag = signals::topic_tag(&subjects.join(" ").to_lowercase());
        let badges =
            signals::badges_for(&intent_signals, is_waiting_on_me, has_active_task, involves_vip);

        let summary = self
            .summary_for(
                &thread_id,
                &subjects,
                &topic_tag,
                &intent_signals,
                &badges,
                last_updated,
            )
            .await;

        IntentMetadata {
            thread_id,
            summary,
            topic_tag,
            participant_lookup: participants.iter().map(|p| p.email.clone()).collect(),
            participants,
            badges,
            intent_signals,
            is_waiting_on_me,
            has_active_task,
            embedding: Embedding::from_texts(subjects.iter().map(String::as_str)),
            last_updated,
            unread_count: node.unread_count(),
            chronological_index,
        }
    }

    /// Cached summary, else a fresh one from the summarizer, else the fallback.
    async fn summary_for(
        &self,
        thread_id: &str,
        subjects: &[String],
        topic_tag: &Option<String>,
        intent_signals: &IntentSignals,
        badges: &[Badge],
        last_updated: DateTime<Utc>,
    ) -> String {
        if let Some(summary) = self.cache.summary(thread_id) {
            return summary;
        }

        let subjects: Vec<String> = subjects
            .iter()
            .filter(|subject| !subject.trim().is_empty())
            .cloned()
            .collect();

        let Some(summarizer) = self.summarizer.as_ref() else {
            return fallback_summary(&subjects);
        };
        if subjects.is_empty() {
            return fallback_summary(&subjects);
        }

        let outcome = summarizer
            .summarize_thread(&subjects)
            .await
            .and_then(|text| {
                let text = text.trim().to_string();
                if text.is_empty() {
                    Err(SummarizerError::EmptySummary)
                } else {
                    Ok(text)
                }
            });

        match outcome {
            Ok(summary) => {
                self.cache.upsert(
                    thread_id,
                    IntentCacheRecord {
                        summary: summary.clone(),
                        topic_tag: topic_tag.clone(),
                        intent_signals: *intent_signals,
                        badges: badges.to_vec(),
                        last_updated,
                    },
                );
                summary
            }
            Err(err) => {
                log::warn!("summarizer failed for thread {}: {}", thread_id, err);
                fallback_summary(&subjects)
            }
        }
    }
}

/// Lowercased subjects and snippets of every message in the thread.
fn signal_text(node: &ThreadNode) -> String {
    let mut text = String::new();
    for member in node.iter() {
        for part in [&member.message.subject, &member.message.snippet] {
            if !part.is_empty() {
                text.push_str(part);
                text.push(' ');
            }
        }
    }
    text.to_lowercase()
}
