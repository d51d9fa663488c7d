//! Cross-thread merging of related conversations.

pub mod engine;
pub mod types;

pub use engine::MergeEngine;
pub use types::{MergeState, ThreadGroupSeed, ThreadMergeReason, ThreadRelatedConversation};
