//! Owned, numbered conversation forest handed to renderers
//!
//! Besides the roots themselves, a forest keeps a flat index so that
//! navigation by display number or id needs no re-derivation of structure.

use std::collections::HashMap;

use serde::Serialize;

use super::numbering;
use super::types::Message;

/// Flat per-node record used for navigation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSummary {
    pub id: String,
    pub display_number: u32,
    pub depth: u32,
    pub parent_number: Option<u32>,
    pub is_ghost: bool,
}

/// A reconstructed forest with its navigation index
#[derive(Debug, Clone, Default)]
pub struct ThreadForest {
    roots: Vec<Message>,
    summaries: Vec<NodeSummary>,
    numbers_by_id: HashMap<String, u32>,
}

impl ThreadForest {
    /// Wrap roots that were numbered by the tree builder
    pub fn from_roots(roots: Vec<Message>) -> Self {
        let mut summaries = Vec::new();
        let mut numbers_by_id = HashMap::new();
        let mut stack: Vec<(&Message, Option<u32>)> =
            roots.iter().rev().map(|root| (root, None)).collect();

        while let Some((message, parent_number)) = stack.pop() {
            summaries.push(NodeSummary {
                id: message.id.clone(),
                display_number: message.display_number,
                depth: message.depth,
                parent_number,
                is_ghost: message.is_ghost,
            });
            numbers_by_id
                .entry(message.id.clone())
                .or_insert(message.display_number);
            stack.extend(
                message
                    .children
                    .iter()
                    .rev()
                    .map(|child| (child, Some(message.display_number))),
            );
        }

        Self {
            roots,
            summaries,
            numbers_by_id,
        }
    }

    /// Unthreaded view: every message is a root, ordered by time
    ///
    /// Used when reconstruction fails; no coalescing or ghost synthesis happens.
    pub fn flat(messages: Vec<Message>) -> Self {
        let mut roots = messages;
        roots.sort_by_key(|message| message.timestamp);

        for (position, message) in roots.iter_mut().enumerate() {
            message.children.clear();
            message.parent_id = None;
            message.is_ghost = false;
            message.depth = 0;
            message.display_number = position as u32 + 1;
        }

        Self::from_roots(roots)
    }

    pub fn roots(&self) -> &[Message] {
        &self.roots
    }

    pub fn into_roots(self) -> Vec<Message> {
        self.roots
    }

    /// Total node count, ghosts included
    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }

    pub fn ghost_count(&self) -> usize {
        self.summaries.iter().filter(|node| node.is_ghost).count()
    }

    pub fn real_count(&self) -> usize {
        self.len() - self.ghost_count()
    }

    /// Navigation records in display order
    pub fn summaries(&self) -> &[NodeSummary] {
        &self.summaries
    }

    /// All nodes in display order
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        numbering::preorder(&self.roots).into_iter()
    }

    pub fn summary(&self, display_number: u32) -> Option<&NodeSummary> {
        let position = display_number.checked_sub(1)? as usize;
        self.summaries.get(position)
    }

    pub fn number_of(&self, id: &str) -> Option<u32> {
        self.numbers_by_id.get(id).copied()
    }

    pub fn get_by_id(&self, id: &str) -> Option<&Message> {
        self.get_by_number(self.number_of(id)?)
    }

    /// Find a node by its display number
    pub fn get_by_number(&self, display_number: u32) -> Option<&Message> {
        if display_number == 0 || display_number as usize > self.len() {
            return None;
        }

        // Within any sibling list numbers ascend, and a subtree spans from its
        // own number up to the next sibling's number
        let mut siblings = self.roots.as_slice();
        loop {
            let after = siblings.partition_point(|node| node.display_number <= display_number);
            let candidate = siblings.get(after.checked_sub(1)?)?;
            if candidate.display_number == display_number {
                return Some(candidate);
            }
            siblings = &candidate.children;
        }
    }

    pub fn next_number(&self, display_number: u32) -> Option<u32> {
        let next = display_number.checked_add(1)?;
        self.summary(next).map(|node| node.display_number)
    }

    pub fn previous_number(&self, display_number: u32) -> Option<u32> {
        let previous = display_number.checked_sub(1)?;
        self.summary(previous).map(|node| node.display_number)
    }

    pub fn parent_number(&self, display_number: u32) -> Option<u32> {
        self.summary(display_number)?.parent_number
    }
}
