//! Subject and content matching for headerless thread roots
//!
//! Some clients drop In-Reply-To and References entirely, which splits one
//! conversation into several roots. Roots without any reply headers that share
//! a canonical subject, were sent close together and talk about the same
//! things are grafted back into a single thread here.
//!
//! Reply headers always win: a root that carries any linkage is never touched.

use std::collections::{HashMap, HashSet};

use chrono::Duration;

use super::container::ThreadNode;
use super::normalize::canonical_subject;

/// Minimum token length considered meaningful content
const MIN_TOKEN_LEN: usize = 3;

/// Common filler words ignored when comparing message content
const STOP_WORDS: &[&str] = &[
    "about", "after", "again", "all", "also", "and", "any", "are", "because", "been", "before",
    "but", "can", "could", "did", "does", "for", "from", "had", "has", "have", "her", "here",
    "him", "his", "how", "into", "its", "just", "let", "like", "more", "not", "now", "our",
    "out", "over", "please", "she", "should", "some", "than", "thanks", "that", "the", "their",
    "them", "then", "there", "these", "they", "this", "those", "via", "was", "were", "what",
    "when", "where", "which", "who", "will", "with", "would", "you", "your",
];

/// Lowercase alphanumeric tokens of at least three characters, minus stop words.
pub fn tokenize_content(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() >= MIN_TOKEN_LEN)
        .filter(|token| !STOP_WORDS.contains(token))
        .map(str::to_string)
        .collect()
}

/// Content fingerprint of a root: snippet tokens, or canonical subject tokens
/// when the snippet has nothing usable.
pub fn content_tokens(node: &ThreadNode) -> HashSet<String> {
    let tokens = tokenize_content(&node.message.snippet);
    if tokens.is_empty() {
        tokenize_content(&canonical_subject(&node.message.subject))
    } else {
        tokens
    }
}

/// Jaccard similarity of two token sets (0 when both are empty).
pub fn jaccard_similarity(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Merge headerless roots that look like one conversation.
///
/// ## Algorithm
///
/// 1. Roots with reply headers or an empty canonical subject pass through
/// 2. The rest are bucketed by canonical subject
/// 3. Inside a bucket, two roots are linked when they are at most `window`
///    apart and either both lack content tokens or their Jaccard similarity
///    reaches `min_jaccard`
/// 4. Every connected component with more than one root collapses into its
///    earliest root; the others become direct children of it
///
/// The returned order is unspecified; callers sort afterwards.
pub fn merge_subject_roots(
    roots: Vec<ThreadNode>,
    window: Duration,
    min_jaccard: f64,
) -> Vec<ThreadNode> {
    let mut merged = Vec::with_capacity(roots.len());
    let mut buckets: Vec<Vec<ThreadNode>> = Vec::new();
    let mut bucket_index: HashMap<String, usize> = HashMap::new();

    for root in roots {
        if root.message.has_reply_headers() {
            merged.push(root);
            continue;
        }

        let subject = canonical_subject(&root.message.subject);
        if subject.is_empty() {
            merged.push(root);
            continue;
        }

        let slot = *bucket_index.entry(subject).or_insert_with(|| {
            buckets.push(Vec::new());
            buckets.len() - 1
        });
        buckets[slot].push(root);
    }

    for bucket in buckets {
        if bucket.len() == 1 {
            merged.extend(bucket);
            continue;
        }
        merged.extend(merge_bucket(bucket, window, min_jaccard));
    }

    merged
}

/// Collapse the connected components of one subject bucket.
fn merge_bucket(bucket: Vec<ThreadNode>, window: Duration, min_jaccard: f64) -> Vec<ThreadNode> {
    let tokens: Vec<HashSet<String>> = bucket.iter().map(content_tokens).collect();
    let mut components = DisjointSet::new(bucket.len());

    for i in 0..bucket.len() {
        for j in (i + 1)..bucket.len() {
            let gap = (bucket[i].date() - bucket[j].date()).abs();
            if gap > window {
                continue;
            }

            let both_empty = tokens[i].is_empty() && tokens[j].is_empty();
            if both_empty || jaccard_similarity(&tokens[i], &tokens[j]) >= min_jaccard {
                components.union(i, j);
            }
        }
    }

    // Group members by component, keeping first-seen order
    let mut groups: Vec<Vec<ThreadNode>> = Vec::new();
    let mut group_of: HashMap<usize, usize> = HashMap::new();
    for (i, node) in bucket.into_iter().enumerate() {
        let leader = components.find(i);
        let slot = *group_of.entry(leader).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(node);
    }

    groups.into_iter().filter_map(graft_component).collect()
}

/// Fold a component into its earliest-dated member.
fn graft_component(mut members: Vec<ThreadNode>) -> Option<ThreadNode> {
    let earliest = members
        .iter()
        .enumerate()
        .min_by_key(|(i, node)| (node.date(), *i))
        .map(|(i, _)| i)?;

    let mut root = members.remove(earliest);
    if !members.is_empty() {
        log::debug!(
            "grafting {} headerless roots into thread {}",
            members.len(),
            root.id
        );
        root.children.extend(members);
        root.children.sort_by_key(|node| node.date());
    }
    Some(root)
}

/// Minimal union-find over bucket positions
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(size: usize) -> Self {
        DisjointSet {
            parent: (0..size).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Lower index leads so component order follows input order
            let (lead, follow) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[follow] = lead;
        }
    }
}
