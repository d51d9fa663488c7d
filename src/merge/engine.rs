//! Greedy clustering of structurally separate threads
//!
//! Threads are folded into a group when their subject embeddings are close
//! and they share enough people, or when the user accepted the merge. Each
//! thread is claimed by at most one group, except reverted threads, which can
//! be offered to several roots without being consumed.

use std::collections::{HashMap, HashSet};

use super::types::{MergeState, ThreadGroupSeed, ThreadMergeReason, ThreadRelatedConversation};
use crate::config::MergeConfig;
use crate::intent::IntentMetadata;
use crate::threading::ThreadNode;

#[derive(Debug, Clone, Default)]
pub struct MergeEngine {
    config: MergeConfig,
}

impl MergeEngine {
    pub fn new(config: MergeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Cluster analyzed threads into group seeds.
    ///
    /// ## Algorithm
    ///
    /// 1. Visit threads with an `accepted` override first, otherwise in input order
    /// 2. For each unvisited root, scan every other unvisited thread (input order)
    /// 3. A candidate joins when either side is accepted, or when similarity and
    ///    participant overlap both reach their thresholds
    /// 4. Joined candidates are marked visited unless they are reverted
    ///
    /// Metadata whose node is missing from `nodes` is skipped.
    pub fn merge(
        &self,
        nodes: &[ThreadNode],
        metadata: &[IntentMetadata],
        overrides: &HashMap<String, MergeState>,
        ignored_participants: &HashSet<String>,
    ) -> Vec<ThreadGroupSeed> {
        let state_of = |thread_id: &str| overrides.get(thread_id).copied().unwrap_or_default();
        let ignored: HashSet<String> = ignored_participants
            .iter()
            .map(|address| address.trim().to_lowercase())
            .collect();

        let mut ordered: Vec<&IntentMetadata> = metadata.iter().collect();
        ordered.sort_by_key(|entry| state_of(&entry.thread_id) != MergeState::Accepted);

        let node_lookup: HashMap<&str, &ThreadNode> =
            nodes.iter().map(|node| (node.thread_id(), node)).collect();

        let mut visited: HashSet<&str> = HashSet::new();
        let mut seeds = Vec::new();

        for current in ordered {
            let current_id = current.thread_id.as_str();
            if visited.contains(current_id) {
                continue;
            }

            let Some(root) = node_lookup.get(current_id) else {
                log::debug!("merge: no thread node for {}, skipping", current_id);
                visited.insert(current_id);
                continue;
            };
            let current_accepted = state_of(current_id) == MergeState::Accepted;

            let mut related = Vec::new();
            let mut merge_reasons = Vec::new();

            for candidate in metadata {
                let candidate_id = candidate.thread_id.as_str();
                if candidate_id == current_id || visited.contains(candidate_id) {
                    continue;
                }
                let Some(candidate_node) = node_lookup.get(candidate_id) else {
                    continue;
                };

                let candidate_state = state_of(candidate_id);
                let similarity = current.embedding.cosine_similarity(&candidate.embedding);
                let shared = shared_participants(current, candidate, &ignored);

                let forced = current_accepted || candidate_state == MergeState::Accepted;
                let similar = similarity >= self.config.similarity_threshold
                    && shared.len() >= self.config.participant_overlap_threshold;
                if !forced && !similar {
                    continue;
                }

                merge_reasons.push(ThreadMergeReason {
                    id: candidate.thread_id.clone(),
                    description: describe(similar, similarity, shared.len()),
                    similarity,
                    shared_participants: shared,
                });
                related.push(ThreadRelatedConversation {
                    id: candidate.thread_id.clone(),
                    summary: candidate.summary.clone(),
                    node: (*candidate_node).clone(),
                });

                if candidate_state != MergeState::Reverted {
                    visited.insert(candidate_id);
                }
            }

            visited.insert(current_id);
            seeds.push(ThreadGroupSeed {
                metadata: current.clone(),
                root: (*root).clone(),
                related,
                merge_reasons,
            });
        }

        log::debug!(
            "merge: {} threads grouped into {} seeds",
            metadata.len(),
            seeds.len()
        );

        seeds
    }
}

/// Participants both threads have in common, minus ignored addresses, sorted.
fn shared_participants(
    left: &IntentMetadata,
    right: &IntentMetadata,
    ignored: &HashSet<String>,
) -> Vec<String> {
    let mut shared: Vec<String> = left
        .participant_lookup
        .intersection(&right.participant_lookup)
        .filter(|address| !ignored.contains(*address))
        .cloned()
        .collect();
    shared.sort();
    shared
}

fn describe(similar: bool, similarity: f32, shared: usize) -> String {
    if similar {
        format!(
            "Similar conversation ({:.0}% match, {} shared participant{})",
            similarity * 100.0,
            shared,
            if shared == 1 { "" } else { "s" }
        )
    } else {
        "Accepted by user".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::{Embedding, IntentSignals};
    use crate::models::Message;
    use chrono::{TimeZone, Utc};

    fn node(id: &str) -> ThreadNode {
        let date = Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).unwrap();
        ThreadNode::leaf(id, Message::new(id, id, date))
    }

    fn metadata(id: &str, index: usize, vector: Vec<f32>, people: &[&str]) -> IntentMetadata {
        IntentMetadata {
            thread_id: id.to_string(),
            summary: format!("summary {id}"),
            topic_tag: None,
            participants: Vec::new(),
            badges: Vec::new(),
            intent_signals: IntentSignals {
                urgency_score: 0.2,
                timeliness_score: 0.2,
                personal_priority_score: 0.2,
                intent_relevance: 0.3,
            },
            is_waiting_on_me: false,
            has_active_task: false,
            embedding: Embedding::from_vector(vector),
            participant_lookup: people.iter().map(|p| p.to_string()).collect(),
            last_updated: Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).unwrap(),
            unread_count: 0,
            chronological_index: index,
        }
    }

    #[test]
    fn test_similar_threads_merge() {
        let nodes = vec![node("a"), node("b")];
        let meta = vec![
            metadata("a", 0, vec![1.0, 0.0], &["x@corp.com"]),
            metadata("b", 1, vec![0.99, 0.1], &["x@corp.com", "y@corp.com"]),
        ];

        let seeds = MergeEngine::default().merge(&nodes, &meta, &HashMap::new(), &HashSet::new());

        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].id(), "a");
        assert_eq!(seeds[0].related_ids().collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(seeds[0].merge_reasons[0].shared_participants, vec!["x@corp.com"]);
    }

    fn unit_at_cosine(cosine: f32) -> Vec<f32> {
        vec![cosine, (1.0 - cosine * cosine).sqrt()]
    }

    #[test]
    fn test_similarity_just_below_threshold_stays_apart() {
        let nodes = vec![node("a"), node("b")];
        let meta = vec![
            metadata("a", 0, vec![1.0, 0.0], &["x@corp.com"]),
            metadata("b", 1, unit_at_cosine(0.81), &["x@corp.com"]),
        ];

        let seeds = MergeEngine::default().merge(&nodes, &meta, &HashMap::new(), &HashSet::new());

        assert_eq!(seeds.len(), 2);
        assert!(seeds.iter().all(|seed| seed.related.is_empty()));
    }

    #[test]
    fn test_similarity_just_above_threshold_merges() {
        let nodes = vec![node("a"), node("b")];
        let meta = vec![
            metadata("a", 0, vec![1.0, 0.0], &["x@corp.com"]),
            metadata("b", 1, unit_at_cosine(0.83), &["x@corp.com"]),
        ];

        let seeds = MergeEngine::default().merge(&nodes, &meta, &HashMap::new(), &HashSet::new());

        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].related_ids().collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(
            seeds[0].merge_reasons[0].description,
            "Similar conversation (83% match, 1 shared participant)"
        );
    }

    #[test]
    fn test_ignored_participants_block_overlap() {
        let nodes = vec![node("a"), node("b")];
        let meta = vec![
            metadata("a", 0, vec![1.0, 0.0], &["list@corp.com"]),
            metadata("b", 1, vec![1.0, 0.0], &["list@corp.com"]),
        ];
        let ignored: HashSet<String> = ["LIST@corp.com".to_string()].into_iter().collect();

        let seeds = MergeEngine::default().merge(&nodes, &meta, &HashMap::new(), &ignored);
        assert_eq!(seeds.len(), 2);
    }

    #[test]
    fn test_accepted_override_forces_merge_and_leads() {
        let nodes = vec![node("a"), node("b")];
        let meta = vec![
            metadata("a", 0, vec![1.0, 0.0], &[]),
            metadata("b", 1, vec![0.0, 1.0], &[]),
        ];
        let overrides: HashMap<String, MergeState> =
            [("b".to_string(), MergeState::Accepted)].into_iter().collect();

        let seeds = MergeEngine::default().merge(&nodes, &meta, &overrides, &HashSet::new());

        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].id(), "b");
        assert_eq!(seeds[0].merge_reasons[0].description, "Accepted by user");
    }

    #[test]
    fn test_reverted_thread_is_offered_but_not_consumed() {
        let nodes = vec![node("a"), node("b"), node("r")];
        let meta = vec![
            metadata("a", 0, vec![1.0, 0.0], &["x@corp.com"]),
            metadata("b", 1, vec![0.0, 1.0], &["z@corp.com"]),
            metadata("r", 2, vec![1.0, 0.0], &["x@corp.com"]),
        ];
        let overrides: HashMap<String, MergeState> =
            [("r".to_string(), MergeState::Reverted)].into_iter().collect();

        let seeds = MergeEngine::default().merge(&nodes, &meta, &overrides, &HashSet::new());

        let ids: Vec<&str> = seeds.iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec!["a", "b", "r"]);
        assert_eq!(seeds[0].related_ids().collect::<Vec<_>>(), vec!["r"]);
    }

    #[test]
    fn test_missing_node_is_skipped() {
        let nodes = vec![node("a")];
        let meta = vec![
            metadata("a", 0, vec![1.0, 0.0], &["x@corp.com"]),
            metadata("ghost", 1, vec![1.0, 0.0], &["x@corp.com"]),
        ];

        let seeds = MergeEngine::default().merge(&nodes, &meta, &HashMap::new(), &HashSet::new());
        assert_eq!(seeds.len(), 1);
        assert!(seeds[0].related.is_empty());
    }
}
