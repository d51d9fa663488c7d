//! Intent enrichment: signals, participants, embeddings and summaries per thread.

pub mod analyzer;
pub mod cache;
pub mod embedding;
pub mod participants;
pub mod signals;
pub mod summarizer;
pub mod types;

pub use analyzer::IntentAnalyzer;
pub use cache::{IntentCache, IntentCacheRecord};
pub use embedding::{EMBEDDING_DIMENSIONS, Embedding};
pub use participants::{Participant, ParticipantRole};
pub use signals::{Badge, IntentSignals};
pub use summarizer::ThreadSummarizer;
pub use types::IntentMetadata;
