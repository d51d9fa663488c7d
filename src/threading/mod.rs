//! Email threading module
//!
//! This module implements the JWZ (Jamie Zawinski) threading algorithm for organizing
//! email messages into conversation threads. The implementation is based on the algorithm
//! from https://www.jwz.org/doc/threading.html with one inbox-specific addition.
//!
//! ## Threading Strategy
//!
//! 1. **References Header**: The full ancestor chain, oldest first, links parents to children
//! 2. **In-Reply-To Header**: Appended as the closest ancestor
//! 3. **Subject Merge**: Roots without any reply headers that share a canonical subject,
//!    sit within a week of each other and overlap in content are folded into one thread
//!
//! ## Module Structure
//!
//! - `normalize`: Identifier and subject canonicalization
//! - `container`: Container arena and finished thread types
//! - `subject_matching`: Content tokens and the subject-only root merge
//! - `jwz_algorithm`: Core JWZ threading implementation

pub mod container;
pub mod jwz_algorithm;
pub mod normalize;
pub mod subject_matching;

// Re-export main types and functions
pub use container::{Thread, ThreadNode, ThreadingResult};
pub use jwz_algorithm::{build_threads, build_threads_with_config};
pub use normalize::{canonical_subject, normalize_identifier};
