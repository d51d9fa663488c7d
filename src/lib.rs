//! Inbox triage: rebuild email threads, enrich them with intent signals,
//! merge related conversations and order the result for display.

pub mod config;
pub mod error;
pub mod intent;
pub mod merge;
pub mod models;
pub mod ordering;
pub mod pipeline;
pub mod threading;

pub use config::{MergeConfig, ThreadingConfig, TriageConfig};
pub use error::{ConfigError, IntentError, SummarizerError};
pub use intent::{IntentAnalyzer, IntentMetadata, ThreadSummarizer};
pub use merge::{MergeEngine, MergeState, ThreadGroupSeed};
pub use models::Message;
pub use ordering::{ThreadGroup, order_groups, priority_score};
pub use pipeline::{TriageOutcome, TriagePipeline, TriageRequest};
pub use threading::{Thread, ThreadNode, ThreadingResult, build_threads};
