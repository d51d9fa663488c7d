//! End-to-end triage: thread, analyze, merge, assemble and order.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::config::{ThreadingConfig, TriageConfig};
use crate::error::{ConfigError, IntentError};
use crate::intent::IntentAnalyzer;
use crate::merge::{MergeEngine, MergeState};
use crate::models::Message;
use crate::ordering::{ThreadGroup, order_groups};
use crate::threading::{Thread, build_threads_with_config};

/// Per-call user state: merge decisions, pins and extra ignored addresses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TriageRequest {
    pub merge_overrides: HashMap<String, MergeState>,
    pub pinned: HashSet<String>,
    pub ignored_participants: HashSet<String>,
}

impl TriageRequest {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
            path: display,
            source,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageOutcome {
    pub threads: Vec<Thread>,
    pub message_thread_map: HashMap<String, String>,
    /// Display order
    pub groups: Vec<ThreadGroup>,
}

pub struct TriagePipeline {
    threading: ThreadingConfig,
    analyzer: IntentAnalyzer,
    merge_engine: MergeEngine,
    ignored_participants: HashSet<String>,
}

impl TriagePipeline {
    pub fn new(config: TriageConfig) -> Self {
        Self {
            threading: config.threading,
            analyzer: IntentAnalyzer::new(config.vip_addresses),
            merge_engine: MergeEngine::new(config.merge),
            ignored_participants: config.ignored_participants,
        }
    }

    /// Replace the analyzer, e.g. to inject a summarizer or a private cache.
    pub fn with_analyzer(mut self, analyzer: IntentAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn analyzer(&self) -> &IntentAnalyzer {
        &self.analyzer
    }

    pub async fn run(
        &self,
        messages: Vec<Message>,
        request: &TriageRequest,
    ) -> Result<TriageOutcome, IntentError> {
        self.run_with_cancellation(messages, request, &CancellationToken::new())
            .await
    }

    pub async fn run_with_cancellation(
        &self,
        messages: Vec<Message>,
        request: &TriageRequest,
        cancel: &CancellationToken,
    ) -> Result<TriageOutcome, IntentError> {
        let message_count = messages.len();
        let threading = build_threads_with_config(messages, &self.threading);

        let metadata = self
            .analyzer
            .analyze_with_cancellation(&threading.roots, cancel)
            .await?;

        let ignored: HashSet<String> = self
            .ignored_participants
            .union(&request.ignored_participants)
            .cloned()
            .collect();
        let seeds = self.merge_engine.merge(
            &threading.roots,
            &metadata,
            &request.merge_overrides,
            &ignored,
        );

        let groups: Vec<ThreadGroup> = seeds
            .into_iter()
            .map(|seed| {
                let state = request
                    .merge_overrides
                    .get(seed.id())
                    .copied()
                    .unwrap_or_default();
                let pinned = request.pinned.contains(seed.id());
                ThreadGroup::from_seed(seed, state, pinned)
            })
            .collect();
        let groups = order_groups(groups, &request.pinned);

        log::info!(
            "triage: {} messages, {} threads, {} groups",
            message_count,
            threading.threads.len(),
            groups.len()
        );

        Ok(TriageOutcome {
            threads: threading.threads,
            message_thread_map: threading.message_thread_map,
            groups,
        })
    }
}
