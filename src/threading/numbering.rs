//! Display numbering and structural checks
//!
//! Numbers follow a preorder walk: roots by ascending timestamp, then each
//! subtree depth first with children by ascending timestamp. Walks are
//! iterative so long implicit reply chains cannot exhaust the stack.

use std::collections::HashSet;

use super::tree_builder::ForestArena;
use super::types::{Message, ThreadingError};

/// Order the arena and assign `display_number` and `depth` to every node
///
/// Returns the number of nodes numbered.
pub(crate) fn assign_display_order(arena: &mut ForestArena) -> usize {
    let nodes = &mut arena.nodes;

    arena.roots.sort_by_key(|&root| nodes[root].message.timestamp);
    for idx in 0..nodes.len() {
        let mut children = std::mem::take(&mut nodes[idx].children);
        children.sort_by_key(|&child| nodes[child].message.timestamp);
        nodes[idx].children = children;
    }

    let mut next_number: u32 = 1;
    let mut stack: Vec<(usize, u32)> =
        arena.roots.iter().rev().map(|&root| (root, 0)).collect();

    while let Some((idx, depth)) = stack.pop() {
        let node = &mut nodes[idx];
        node.message.display_number = next_number;
        node.message.depth = depth;
        next_number += 1;

        stack.extend(node.children.iter().rev().map(|&child| (child, depth + 1)));
    }

    (next_number - 1) as usize
}

/// All nodes of a forest in display order
pub fn preorder(roots: &[Message]) -> Vec<&Message> {
    let mut ordered = Vec::new();
    let mut stack: Vec<&Message> = roots.iter().rev().collect();

    while let Some(message) = stack.pop() {
        ordered.push(message);
        stack.extend(message.children.iter().rev());
    }

    ordered
}

/// Check the structural invariants of a numbered forest
///
/// Numbers must be exactly `1..=N` in preorder, ids unique, depths and parent
/// links consistent with the nesting, and siblings ordered by timestamp.
pub fn verify_forest(roots: &[Message]) -> Result<(), ThreadingError> {
    check_sibling_order(roots, None)?;

    let mut seen: HashSet<&str> = HashSet::new();
    let mut expected_number: u32 = 1;
    let mut stack: Vec<(&Message, u32, Option<&str>)> =
        roots.iter().rev().map(|root| (root, 0, None)).collect();

    while let Some((message, depth, parent_id)) = stack.pop() {
        if !seen.insert(message.id.as_str()) {
            return Err(ThreadingError::InvariantViolation(format!(
                "id {} appears more than once",
                message.id
            )));
        }
        if message.display_number != expected_number {
            return Err(ThreadingError::InvariantViolation(format!(
                "node {} has display number {}, expected {}",
                message.id, message.display_number, expected_number
            )));
        }
        if message.depth != depth {
            return Err(ThreadingError::InvariantViolation(format!(
                "node {} has depth {}, expected {}",
                message.id, message.depth, depth
            )));
        }
        if message.parent_id.as_deref() != parent_id {
            return Err(ThreadingError::InvariantViolation(format!(
                "node {} points at parent {:?} but is nested under {:?}",
                message.id, message.parent_id, parent_id
            )));
        }
        check_sibling_order(&message.children, Some(message.id.as_str()))?;

        expected_number += 1;
        stack.extend(
            message
                .children
                .iter()
                .rev()
                .map(|child| (child, depth + 1, Some(message.id.as_str()))),
        );
    }

    Ok(())
}

fn check_sibling_order(
    siblings: &[Message],
    parent_id: Option<&str>,
) -> Result<(), ThreadingError> {
    if let Some(pair) = siblings
        .windows(2)
        .find(|pair| pair[0].timestamp > pair[1].timestamp)
    {
        return Err(ThreadingError::InvariantViolation(format!(
            "{} is ordered after {} under {}",
            pair[1].id,
            pair[0].id,
            parent_id.unwrap_or("the root list")
        )));
    }
    Ok(())
}
