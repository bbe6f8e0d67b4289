//! Parent resolution and ghost synthesis
//!
//! Messages are placed one by one in timestamp order. A message attaches to a
//! node that is already placed, and a ghost that gets filled in may only move
//! under a node outside its own subtree, so the result is always a forest.

use std::collections::HashMap;

use super::numbering;
use super::preview;
use super::types::{
    GHOST_TIMESTAMP_OFFSET_MS, Message, ParentPreview, ThreadingConfig, ThreadingError,
};

/// A node while the forest is being linked; links are arena indices
#[derive(Debug)]
pub(crate) struct ArenaNode {
    pub message: Message,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

/// Flat working representation of a forest
#[derive(Debug, Default)]
pub(crate) struct ForestArena {
    pub nodes: Vec<ArenaNode>,
    pub roots: Vec<usize>,
    pub index: HashMap<String, usize>,
}

impl ForestArena {
    fn push(&mut self, message: Message) -> usize {
        self.nodes.push(ArenaNode {
            message,
            parent: None,
            children: Vec::new(),
        });
        self.nodes.len() - 1
    }

    fn attach(&mut self, parent: usize, child: usize) {
        let parent_id = self.nodes[parent].message.id.clone();
        self.nodes[child].message.parent_id = Some(parent_id);
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
    }

    /// Register a root ghost standing in for `parent_id`
    fn insert_ghost(
        &mut self,
        parent_id: String,
        preview: Option<&ParentPreview>,
        child_timestamp: i64,
    ) -> usize {
        let (author, content) = preview::ghost_identity(preview);
        let ghost = self.push(new_ghost(parent_id.clone(), author, content, child_timestamp));
        self.roots.push(ghost);
        self.index.insert(parent_id, ghost);
        ghost
    }

    /// Whether `node` is `ancestor` or sits somewhere below it
    fn is_within(&self, node: usize, ancestor: usize) -> bool {
        let mut current = Some(node);
        while let Some(idx) = current {
            if idx == ancestor {
                return true;
            }
            current = self.nodes[idx].parent;
        }
        false
    }

    pub fn ghost_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.message.is_ghost).count()
    }

    /// Assemble owned subtrees, consuming the arena
    pub fn into_roots(self) -> Vec<Message> {
        let mut built: Vec<Option<Message>> = Vec::with_capacity(self.nodes.len());
        let mut child_lists: Vec<Vec<usize>> = Vec::with_capacity(self.nodes.len());
        for node in self.nodes {
            built.push(Some(node.message));
            child_lists.push(node.children);
        }

        // Preorder from the roots; walking it backwards finishes every child before its parent
        let mut order = Vec::with_capacity(built.len());
        let mut stack: Vec<usize> = self.roots.clone();
        while let Some(idx) = stack.pop() {
            order.push(idx);
            stack.extend(child_lists[idx].iter().copied());
        }

        for &idx in order.iter().rev() {
            let children: Vec<Message> = child_lists[idx]
                .iter()
                .filter_map(|&child| built[child].take())
                .collect();
            if let Some(message) = built[idx].as_mut() {
                message.children = children;
            }
        }

        self.roots
            .iter()
            .filter_map(|&root| built[root].take())
            .collect()
    }
}

/// Build a numbered forest from coalesced messages
///
/// Returns the roots ordered by timestamp. Every node carries its resolved
/// `parent_id`, `depth` and `display_number`.
pub fn build_tree(
    messages: Vec<Message>,
    config: &ThreadingConfig,
) -> Result<Vec<Message>, ThreadingError> {
    if messages.is_empty() {
        return Ok(Vec::new());
    }

    let mut arena = link_messages(messages, config)?;
    let total = numbering::assign_display_order(&mut arena);

    if config.enable_debug_logging {
        tracing::debug!(
            "Linked {} nodes ({} ghosts) into {} roots",
            total,
            arena.ghost_count(),
            arena.roots.len()
        );
    }

    let roots = arena.into_roots();
    numbering::verify_forest(&roots)?;
    Ok(roots)
}

/// Resolve explicit and implicit parents, synthesizing ghosts where needed
pub(crate) fn link_messages(
    messages: Vec<Message>,
    config: &ThreadingConfig,
) -> Result<ForestArena, ThreadingError> {
    let mut sorted_messages = messages;
    sorted_messages.sort_by_key(|message| message.timestamp);

    let mut arena = ForestArena::default();
    // Most recently placed real node; ghosts never act as implicit parents
    let mut last_real: Option<usize> = None;

    for mut message in sorted_messages {
        if message.id.is_empty() {
            return Err(ThreadingError::InvalidMessage {
                reason: format!(
                    "message by '{}' at {} has an empty id",
                    message.author, message.timestamp
                ),
            });
        }
        if message.explicit_parent_id.as_deref() == Some(message.id.as_str()) {
            return Err(ThreadingError::SelfReply(message.id));
        }

        message.children.clear();
        message.parent_id = None;
        message.is_ghost = false;

        if let Some(&existing) = arena.index.get(&message.id) {
            if !arena.nodes[existing].message.is_ghost {
                return Err(ThreadingError::DuplicateId(message.id));
            }
            let declared_parent = message.explicit_parent_id.clone();
            let timestamp = message.timestamp;
            let parent_preview = message.parent_preview.clone();
            replace_ghost(&mut arena.nodes[existing].message, message, config);
            if let Some(parent_id) = declared_parent {
                adopt_declared_parent(
                    &mut arena,
                    existing,
                    parent_id,
                    parent_preview.as_ref(),
                    timestamp,
                    config,
                )?;
            }
            last_real = Some(existing);
            continue;
        }

        let candidate_parent = match message.explicit_parent_id.clone() {
            Some(parent_id) => Some(parent_id),
            None => last_real
                .map(|idx| &arena.nodes[idx].message)
                .filter(|previous| {
                    message.timestamp.saturating_sub(previous.timestamp)
                        <= config.implicit_link_window_ms
                })
                .map(|previous| previous.id.clone()),
        };

        let timestamp = message.timestamp;
        let parent_preview = message.parent_preview.clone();
        let id = message.id.clone();

        let parent = match candidate_parent {
            Some(parent_id) => Some(match arena.index.get(&parent_id) {
                Some(&parent) => parent,
                None => {
                    if config.enable_debug_logging {
                        tracing::debug!(
                            "Parent {} of message {} not loaded, synthesizing ghost",
                            parent_id,
                            id
                        );
                    }
                    arena.insert_ghost(parent_id, parent_preview.as_ref(), timestamp)
                }
            }),
            None => None,
        };

        let idx = arena.push(message);
        match parent {
            Some(parent) => arena.attach(parent, idx),
            None => arena.roots.push(idx),
        }

        arena.index.insert(id, idx);
        last_real = Some(idx);
    }

    Ok(arena)
}

fn new_ghost(id: String, author: String, content: String, child_timestamp: i64) -> Message {
    let mut ghost = Message::new(
        id,
        author,
        child_timestamp.saturating_sub(GHOST_TIMESTAMP_OFFSET_MS),
        content,
    );
    ghost.rich_body = String::new();
    ghost.is_ghost = true;
    ghost
}

/// Fill a ghost with the real message that finally showed up
///
/// The node keeps its arena slot and its children.
fn replace_ghost(ghost: &mut Message, message: Message, config: &ThreadingConfig) {
    if config.enable_debug_logging {
        tracing::debug!("Real message {} replaces its ghost", message.id);
    }

    ghost.author = message.author;
    ghost.timestamp = message.timestamp;
    ghost.content = message.content;
    ghost.rich_body = message.rich_body;
    ghost.explicit_parent_id = message.explicit_parent_id;
    ghost.parent_preview = message.parent_preview;
    ghost.merged_ids = message.merged_ids;
    ghost.is_ghost = false;
}

/// Move a filled-in ghost under the parent its real message declares
///
/// A parent that is not loaded gets a ghost of its own. A parent inside the
/// node's subtree would close a cycle and is rejected.
fn adopt_declared_parent(
    arena: &mut ForestArena,
    node: usize,
    parent_id: String,
    parent_preview: Option<&ParentPreview>,
    timestamp: i64,
    config: &ThreadingConfig,
) -> Result<(), ThreadingError> {
    let parent = match arena.index.get(&parent_id) {
        Some(&parent) if arena.is_within(parent, node) => {
            return Err(ThreadingError::InvariantViolation(format!(
                "message {} replies to {}, which is already one of its replies",
                arena.nodes[node].message.id, parent_id
            )));
        }
        Some(&parent) => parent,
        None => arena.insert_ghost(parent_id, parent_preview, timestamp),
    };

    if config.enable_debug_logging {
        tracing::debug!(
            "Message {} moves under its declared parent {}",
            arena.nodes[node].message.id,
            arena.nodes[parent].message.id
        );
    }

    arena.roots.retain(|&root| root != node);
    arena.attach(parent, node);
    Ok(())
}
