//! Replaceable forest snapshots per conversation.
//!
//! Each rebuild produces a brand-new [`ThreadForest`]; publishing swaps the
//! shared reference and notifies subscribers, so readers never observe a
//! forest being mutated in place.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::threading::ThreadForest;

const BUFFER_SIZE: usize = 16;

/// Notification sent to subscribers after a snapshot swap.
#[derive(Debug, Clone)]
pub struct ForestUpdate {
    /// Conversation whose forest was replaced.
    pub conversation_id: String,

    /// The complete new forest.
    pub forest: Arc<ThreadForest>,
}

pub struct ForestSnapshots {
    current: DashMap<String, Arc<ThreadForest>>,
    streams: DashMap<String, broadcast::Sender<ForestUpdate>>,
}

impl ForestSnapshots {
    pub fn new() -> Self {
        Self {
            current: DashMap::new(),
            streams: DashMap::new(),
        }
    }

    /// The latest published forest for a conversation, if any.
    pub fn current(&self, conversation_id: &str) -> Option<Arc<ThreadForest>> {
        self.current
            .get(conversation_id)
            .map(|forest| Arc::clone(forest.value()))
    }

    /// Replace the conversation's forest and notify subscribers.
    pub fn publish(&self, conversation_id: &str, forest: ThreadForest) -> Arc<ThreadForest> {
        let forest = Arc::new(forest);
        self.current
            .insert(conversation_id.to_string(), Arc::clone(&forest));

        tracing::debug!(
            target: "threadweave::snapshots",
            "Published forest for {} ({} nodes)",
            conversation_id,
            forest.len()
        );

        if let Some(sender) = self.streams.get(conversation_id) {
            let update = ForestUpdate {
                conversation_id: conversation_id.to_string(),
                forest: Arc::clone(&forest),
            };
            // Attempt to send; if all receivers dropped, clean up
            if sender.send(update).is_err() && sender.receiver_count() == 0 {
                drop(sender);
                self.streams.remove(conversation_id);
            }
        }

        forest
    }

    pub fn subscribe(&self, conversation_id: &str) -> broadcast::Receiver<ForestUpdate> {
        self.streams
            .entry(conversation_id.to_string())
            .or_insert_with(|| broadcast::channel(BUFFER_SIZE).0)
            .subscribe()
    }

    /// Drop a conversation's snapshot and its update stream.
    pub fn remove(&self, conversation_id: &str) -> Option<Arc<ThreadForest>> {
        self.streams.remove(conversation_id);
        self.current
            .remove(conversation_id)
            .map(|(_, forest)| forest)
    }
}

impl Default for ForestSnapshots {
    fn default() -> Self {
        Self::new()
    }
}
