//! Container data structures for the JWZ threading algorithm
//!
//! The JWZ algorithm uses a "container" abstraction to represent both real messages
//! and placeholder messages (messages referenced but never seen in this batch).
//! Containers live in an arena and point at each other by index, so re-parenting
//! never leaves dangling references behind.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Message;

/// A container represents a node in the thread tree while it is being built.
///
/// ## Placeholder Containers
///
/// Containers without a message stand in for ancestors that appear in a
/// References or In-Reply-To header but are not part of the input. They keep
/// siblings together until the tree is flattened.
#[derive(Debug, Clone)]
pub struct Container {
    /// Normalized identifier this container is keyed under
    pub message_id: String,

    /// The message, if it was part of the input (None for placeholders)
    pub message: Option<Message>,

    /// Arena index of the parent container. Only used for re-parenting.
    pub parent: Option<usize>,

    /// Arena indices of child containers
    pub children: Vec<usize>,
}

impl Container {
    fn new(message_id: String) -> Self {
        Container {
            message_id,
            message: None,
            parent: None,
            children: Vec::new(),
        }
    }
}

/// Arena of containers keyed by normalized identifier.
///
/// Insertion order is preserved, which keeps root discovery deterministic.
#[derive(Debug, Default)]
pub struct ContainerTable {
    containers: Vec<Container>,
    index: HashMap<String, usize>,
}

impl ContainerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    pub fn get(&self, idx: usize) -> &Container {
        &self.containers[idx]
    }

    /// Return the container registered for `message_id`, creating a placeholder if needed.
    pub fn get_or_create(&mut self, message_id: &str) -> usize {
        if let Some(&idx) = self.index.get(message_id) {
            return idx;
        }

        let idx = self.containers.len();
        self.containers.push(Container::new(message_id.to_string()));
        self.index.insert(message_id.to_string(), idx);
        idx
    }

    /// Attach a message to a container. The last message attached wins.
    pub fn attach_message(&mut self, idx: usize, message: Message) {
        self.containers[idx].message = Some(message);
    }

    /// Make `parent` adopt `child`, detaching it from any previous parent first.
    ///
    /// Returns false when nothing changed: self-adoption, an existing link, or a
    /// link that would turn `child` into its own ancestor.
    pub fn adopt(&mut self, parent: usize, child: usize) -> bool {
        if parent == child {
            return false;
        }

        if self.containers[parent].children.contains(&child) {
            return false;
        }

        if self.is_ancestor(child, parent) {
            log::debug!(
                "skipping link {} -> {}: would create a cycle",
                self.containers[parent].message_id,
                self.containers[child].message_id
            );
            return false;
        }

        if let Some(old_parent) = self.containers[child].parent.take() {
            self.containers[old_parent].children.retain(|&c| c != child);
        }

        self.containers[child].parent = Some(parent);
        self.containers[parent].children.push(child);
        true
    }

    /// Check whether `candidate` appears on the parent chain starting at `start`.
    ///
    /// `start` itself counts as part of the chain. A container without
    /// children can only be on the chain as `start` itself.
    fn is_ancestor(&self, candidate: usize, start: usize) -> bool {
        if candidate == start {
            return true;
        }
        if self.containers[candidate].children.is_empty() {
            return false;
        }

        let mut current = self.containers[start].parent;
        let mut steps = 0;
        while let Some(idx) = current {
            if idx == candidate || steps > self.containers.len() {
                return true;
            }
            steps += 1;
            current = self.containers[idx].parent;
        }

        false
    }

    /// Arena indices of all containers without a parent, in insertion order.
    pub fn roots(&self) -> Vec<usize> {
        self.containers
            .iter()
            .enumerate()
            .filter(|(_, container)| container.parent.is_none())
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Convert the subtree at `idx` into finished thread nodes.
    ///
    /// A container with a message becomes one node whose children are sorted
    /// by date. A placeholder dissolves and hands its flattened children up
    /// as siblings. The container's message is moved out, so each subtree can
    /// only be flattened once.
    ///
    /// Walks with an explicit stack, so reply chains of any depth are safe.
    pub fn flatten(&mut self, idx: usize) -> Vec<ThreadNode> {
        // Pre-order; every container comes after its ancestors
        let mut order = Vec::new();
        let mut stack = vec![idx];
        while let Some(current) = stack.pop() {
            order.push(current);
            stack.extend(self.containers[current].children.iter().copied());
        }

        let mut finished: HashMap<usize, Vec<ThreadNode>> = HashMap::with_capacity(order.len());
        for &current in order.iter().rev() {
            let children = std::mem::take(&mut self.containers[current].children);

            let mut flattened: Vec<ThreadNode> = Vec::with_capacity(children.len());
            for child in children {
                if let Some(nodes) = finished.remove(&child) {
                    flattened.extend(nodes);
                }
            }

            let nodes = match self.containers[current].message.take() {
                Some(message) => {
                    flattened.sort_by_key(|node| node.message.date);
                    vec![ThreadNode {
                        id: self.containers[current].message_id.clone(),
                        message,
                        children: flattened,
                    }]
                }
                None => flattened,
            };
            finished.insert(current, nodes);
        }

        finished.remove(&idx).unwrap_or_default()
    }
}

/// Finished node of a thread tree.
///
/// `id` is the normalized identifier of the node's own message, or the
/// generated fallback identity when the message had none.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadNode {
    pub id: String,
    pub message: Message,
    pub children: Vec<ThreadNode>,
}

impl ThreadNode {
    pub fn leaf(id: impl Into<String>, message: Message) -> Self {
        ThreadNode {
            id: id.into(),
            message,
            children: Vec::new(),
        }
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.message.date
    }

    /// Thread id stamped by the builder, or the node's own id before stamping.
    pub fn thread_id(&self) -> &str {
        self.message.thread_id.as_deref().unwrap_or(&self.id)
    }

    /// Iterate over this node and every descendant, depth-first, pre-order.
    pub fn iter(&self) -> ThreadNodeIter<'_> {
        ThreadNodeIter { stack: vec![self] }
    }

    pub fn message_count(&self) -> usize {
        self.iter().count()
    }

    pub fn unread_count(&self) -> usize {
        self.iter().filter(|node| node.message.is_unread).count()
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.iter()
            .map(|node| node.message.date)
            .max()
            .unwrap_or(self.message.date)
    }
}

impl Clone for ThreadNode {
    /// Rebuilds the tree bottom-up with an explicit stack of partly cloned nodes.
    fn clone(&self) -> Self {
        let mut frames: Vec<(&ThreadNode, Vec<ThreadNode>)> = Vec::new();
        let mut current = (self, Vec::with_capacity(self.children.len()));

        loop {
            let (source, children) = current;
            if let Some(next) = source.children.get(children.len()) {
                frames.push((source, children));
                current = (next, Vec::with_capacity(next.children.len()));
                continue;
            }

            let node = ThreadNode {
                id: source.id.clone(),
                message: source.message.clone(),
                children,
            };
            match frames.pop() {
                Some((parent, mut siblings)) => {
                    siblings.push(node);
                    current = (parent, siblings);
                }
                None => return node,
            }
        }
    }
}

impl Drop for ThreadNode {
    fn drop(&mut self) {
        // Detach descendants first so dropping a deep chain does not recurse
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Pre-order traversal over a thread tree using an explicit stack.
pub struct ThreadNodeIter<'a> {
    stack: Vec<&'a ThreadNode>,
}

impl<'a> Iterator for ThreadNodeIter<'a> {
    type Item = &'a ThreadNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        // Reverse so children come out left-to-right
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Summary of one finished thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: String,
    pub root_message_id: Option<String>,
    pub subject: String,
    pub last_updated: DateTime<Utc>,
    pub unread_count: usize,
    pub message_count: usize,
}

/// Output of one threading run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadingResult {
    /// Root nodes, newest first
    pub roots: Vec<ThreadNode>,
    /// One summary per root, same order as `roots`
    pub threads: Vec<Thread>,
    /// Message identity -> thread id
    pub message_thread_map: HashMap<String, String>,
}
