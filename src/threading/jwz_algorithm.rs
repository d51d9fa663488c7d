//! Core JWZ (Jamie Zawinski) threading algorithm implementation
//!
//! This module implements the main threading algorithm as described at:
//! https://www.jwz.org/doc/threading.html
//!
//! ## Algorithm Overview
//!
//! 1. **Build Container Tree**: One container per message, plus placeholders for
//!    every ancestor named in References / In-Reply-To
//! 2. **Link Ancestors**: Chain the ancestors oldest to newest, then hang the
//!    message under the last one. Later headers may re-parent earlier links.
//! 3. **Find Roots**: Containers with no parent
//! 4. **Flatten**: Drop placeholders, promoting their children
//! 5. **Subject Merge**: Re-join headerless roots split by broken clients
//! 6. **Annotate**: Stamp thread ids and aggregate per-thread counters

use std::collections::HashMap;

use rayon::prelude::*;
use uuid::Uuid;

use super::container::{ContainerTable, Thread, ThreadNode, ThreadingResult};
use super::normalize::normalize_identifier;
use super::subject_matching::merge_subject_roots;
use crate::config::ThreadingConfig;
use crate::models::Message;

/// Build threads with the default subject-merge tuning.
pub fn build_threads(messages: Vec<Message>) -> ThreadingResult {
    build_threads_with_config(messages, &ThreadingConfig::default())
}

/// Build email threads using the JWZ algorithm
///
/// ## Returns
///
/// Root nodes sorted newest first (ties by case-insensitive subject), one
/// `Thread` summary per root in the same order, and a map from every input
/// message's identity to its thread id.
///
/// Never fails: messages without an identifier get a generated one and end
/// up in their own thread unless the subject merge picks them up.
pub fn build_threads_with_config(
    messages: Vec<Message>,
    config: &ThreadingConfig,
) -> ThreadingResult {
    let message_count = messages.len();

    // Step 1-2: containers and ancestor links
    let mut table = ContainerTable::new();
    for message in messages {
        link_message(&mut table, message);
    }

    // Step 3-4: root set, flattened into finished nodes
    let mut roots: Vec<ThreadNode> = Vec::new();
    for root in table.roots() {
        roots.extend(table.flatten(root));
    }

    log::debug!(
        "threading: {} messages, {} containers, {} roots before subject merge",
        message_count,
        table.len(),
        roots.len()
    );

    // Step 5: subject-only merge of headerless roots
    let mut roots = merge_subject_roots(
        roots,
        config.subject_merge_window,
        config.subject_merge_jaccard,
    );

    roots.sort_by(|a, b| {
        b.date()
            .cmp(&a.date())
            .then_with(|| {
                a.message
                    .subject
                    .to_lowercase()
                    .cmp(&b.message.subject.to_lowercase())
            })
    });

    // Step 6: annotate every root (order preserved by rayon's indexed collect)
    let annotated: Vec<(ThreadNode, Thread, Vec<String>)> =
        roots.into_par_iter().map(annotate_thread).collect();

    let mut result = ThreadingResult {
        roots: Vec::with_capacity(annotated.len()),
        threads: Vec::with_capacity(annotated.len()),
        message_thread_map: HashMap::with_capacity(message_count),
    };

    for (root, thread, members) in annotated {
        for member in members {
            result.message_thread_map.insert(member, thread.id.clone());
        }
        result.roots.push(root);
        result.threads.push(thread);
    }

    log::debug!("threading: {} threads identified", result.threads.len());

    result
}

/// Register a message and link it below its ancestors
///
/// ## Example
///
/// ```text
/// References: <m1> <m2>, In-Reply-To: <m3>
///
/// Creates links:
///   m1 (parent) → m2 (child)
///   m2 (parent) → m3 (child)
///   m3 (parent) → this message (child)
/// ```
fn link_message(table: &mut ContainerTable, message: Message) {
    let mut identity = message.identity();
    if identity.is_empty() {
        identity = generated_identifier();
        log::debug!(
            "message with subject {:?} has no usable id, using {}",
            message.subject,
            identity
        );
    }

    let own = table.get_or_create(&identity);

    let ancestors: Vec<String> = message
        .references
        .iter()
        .map(String::as_str)
        .chain(message.in_reply_to.as_deref())
        .map(normalize_identifier)
        .filter(|id| !id.is_empty())
        .collect();

    table.attach_message(own, message);

    let mut previous: Option<usize> = None;
    for ancestor in &ancestors {
        let current = table.get_or_create(ancestor);
        if let Some(prev) = previous {
            if prev != current {
                table.adopt(prev, current);
            }
        }
        previous = Some(current);
    }

    if let Some(last) = previous {
        if last != own {
            table.adopt(last, own);
        }
    }
}

/// Stamp the thread id through a root's tree and summarize it.
///
/// Returns the stamped root, its summary and every member identity.
fn annotate_thread(mut root: ThreadNode) -> (ThreadNode, Thread, Vec<String>) {
    let thread_id = root.id.clone();
    let mut members = Vec::new();
    stamp_thread_id(&mut root, &thread_id, &mut members);

    let root_message_id = Some(root.message.id.trim())
        .filter(|id| !id.is_empty())
        .map(str::to_string);

    let thread = Thread {
        id: thread_id,
        root_message_id,
        subject: root.message.subject.clone(),
        last_updated: root.last_updated(),
        unread_count: root.unread_count(),
        message_count: root.message_count(),
    };

    (root, thread, members)
}

/// Pre-order walk with an explicit stack; rayon workers run with small stacks.
fn stamp_thread_id(root: &mut ThreadNode, thread_id: &str, members: &mut Vec<String>) {
    let mut stack: Vec<&mut ThreadNode> = vec![root];
    while let Some(node) = stack.pop() {
        node.message = node.message.assigned_to(thread_id);
        members.push(node.id.clone());
        stack.extend(node.children.iter_mut().rev());
    }
}

fn generated_identifier() -> String {
    format!("generated-{}", Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_simple_thread() {
        let messages = vec![
            Message::new("<msg1@x>", "Plan", at(1, 9)),
            Message::new("<msg2@x>", "Re: Plan", at(1, 10))
                .with_in_reply_to("<msg1@x>")
                .unread(true),
        ];

        let result = build_threads(messages);

        assert_eq!(result.threads.len(), 1);
        assert_eq!(result.threads[0].id, "msg1@x");
        assert_eq!(result.threads[0].message_count, 2);
        assert_eq!(result.threads[0].unread_count, 1);
        assert_eq!(result.threads[0].last_updated, at(1, 10));
        assert_eq!(result.roots[0].children[0].message.thread_id.as_deref(), Some("msg1@x"));
    }

    #[test]
    fn test_placeholder_root_promotes_children() {
        // Both replies point at a message we never received
        let messages = vec![
            Message::new("<a@x>", "Re: Lost", at(2, 9)).with_references(["<missing@x>"]),
            Message::new("<b@x>", "Re: Lost", at(2, 11)).with_references(["<missing@x>"]),
        ];

        let result = build_threads(messages);

        assert_eq!(result.roots.len(), 2);
        assert!(!result.message_thread_map.contains_key("missing@x"));
        assert_eq!(result.message_thread_map.len(), 2);
    }

    #[test]
    fn test_reference_chain_links_through_placeholders() {
        let messages = vec![
            Message::new("<root@x>", "Topic", at(3, 8)),
            Message::new("<leaf@x>", "Re: Topic", at(3, 12))
                .with_references(["<root@x>", "<gone@x>"])
                .with_in_reply_to("<gone@x>"),
        ];

        let result = build_threads(messages);

        assert_eq!(result.roots.len(), 1);
        assert_eq!(result.roots[0].id, "root@x");
        assert_eq!(result.roots[0].children[0].id, "leaf@x");
    }

    #[test]
    fn test_later_headers_reparent_placeholder() {
        // "mid" first appears as a root-level placeholder, then a later message
        // reveals it belongs under "top"
        let messages = vec![
            Message::new("<top@x>", "Design", at(4, 8)),
            Message::new("<c1@x>", "Re: Design", at(4, 10)).with_in_reply_to("<mid@x>"),
            Message::new("<c2@x>", "Re: Design", at(4, 11)).with_references(["<top@x>", "<mid@x>"]),
        ];

        let result = build_threads(messages);

        assert_eq!(result.roots.len(), 1);
        assert_eq!(result.threads[0].message_count, 3);
    }

    #[test]
    fn test_missing_identifiers_get_fallbacks() {
        let messages = vec![
            Message::new("", "First orphan", at(5, 8)),
            Message::new("  ", "Second orphan", at(5, 9)),
        ];

        let result = build_threads(messages);

        assert_eq!(result.roots.len(), 2);
        assert_eq!(result.message_thread_map.len(), 2);
        for root in &result.roots {
            assert!(root.id.starts_with("generated-"));
            assert_eq!(root.message.thread_id.as_deref(), Some(root.id.as_str()));
        }
    }

    #[test]
    fn test_reference_cycle_keeps_every_message() {
        let messages = vec![
            Message::new("<a@x>", "Loop", at(6, 8)).with_in_reply_to("<b@x>"),
            Message::new("<b@x>", "Loop", at(6, 9)).with_in_reply_to("<a@x>"),
        ];

        let result = build_threads(messages);

        let total: usize = result.threads.iter().map(|t| t.message_count).sum();
        assert_eq!(total, 2);
        assert_eq!(result.message_thread_map.len(), 2);
    }

    #[test]
    fn test_roots_sorted_newest_first_then_subject() {
        let messages = vec![
            Message::new("<old@x>", "Zulu", at(7, 8)),
            Message::new("<new-b@x>", "bravo", at(8, 8)),
            Message::new("<new-a@x>", "Alpha", at(8, 8)),
        ];

        let result = build_threads(messages);
        let ids: Vec<&str> = result.threads.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["new-a@x", "new-b@x", "old@x"]);
    }

    #[test]
    fn test_deep_reply_chain_stays_one_thread() {
        let depth = 10_000;
        let start = at(9, 8);
        let messages: Vec<Message> = (0..depth)
            .map(|i| {
                let message = Message::new(
                    format!("<chain-{i}@x>"),
                    "Re: Long haul",
                    start + chrono::Duration::seconds(i as i64),
                );
                if i == 0 {
                    message
                } else {
                    message.with_in_reply_to(format!("<chain-{}@x>", i - 1))
                }
            })
            .collect();

        let result = build_threads(messages);

        assert_eq!(result.threads.len(), 1);
        assert_eq!(result.threads[0].id, "chain-0@x");
        assert_eq!(result.threads[0].message_count, depth);
        assert_eq!(result.message_thread_map.len(), depth);
        assert_eq!(result.message_thread_map["chain-9999@x"], "chain-0@x");
    }
}
