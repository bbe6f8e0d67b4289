//! Message Threading Module
//!
//! This module reconstructs a threaded conversation from a flat log of chat
//! messages. It folds rapid-fire posts by the same author, resolves explicit
//! and implicit reply links, synthesizes ghost nodes for parents that were
//! referenced but never loaded, and numbers the result for display.

mod coalescer;
mod forest;
mod numbering;
mod preview;
mod tree_builder;
mod types;

#[cfg(test)]
mod tests;

pub use coalescer::coalesce;
pub use forest::{NodeSummary, ThreadForest};
pub use numbering::{preorder, verify_forest};
pub use preview::collapse_whitespace;
pub use tree_builder::build_tree;
pub use types::{
    GHOST_PLACEHOLDER_CONTENT, GHOST_TIMESTAMP_OFFSET_MS, Message, PLACEHOLDER_AUTHOR,
    ParentPreview, RICH_BODY_SEPARATOR, ThreadingConfig, ThreadingError,
};

/// Entry point for turning extractor output into a numbered forest
///
/// Every call is an independent, pure transformation of its input; the
/// threader holds nothing but configuration.
#[derive(Debug, Clone)]
pub struct MessageThreader {
    config: ThreadingConfig,
}

impl MessageThreader {
    /// Create a new threader with default configuration
    pub fn new() -> Self {
        Self::with_config(ThreadingConfig::default())
    }

    /// Create a new threader with custom configuration
    pub fn with_config(config: ThreadingConfig) -> Self {
        Self { config }
    }

    /// Get the current configuration
    pub fn config(&self) -> &ThreadingConfig {
        &self.config
    }

    /// Fold same-author bursts; see [`coalesce`]
    pub fn coalesce(&self, messages: Vec<Message>) -> Result<Vec<Message>, ThreadingError> {
        self.config.validate()?;
        coalescer::coalesce(messages, &self.config)
    }

    /// Link coalesced messages into numbered roots; see [`build_tree`]
    pub fn build_tree(&self, messages: Vec<Message>) -> Result<Vec<Message>, ThreadingError> {
        self.config.validate()?;
        tree_builder::build_tree(messages, &self.config)
    }

    /// Run the full pipeline:
    /// 1. Fold rapid same-author messages
    /// 2. Resolve parents and synthesize ghosts
    /// 3. Number the forest and check its invariants
    pub fn reconstruct(&self, messages: Vec<Message>) -> Result<ThreadForest, ThreadingError> {
        self.config.validate()?;

        if self.config.enable_debug_logging {
            tracing::debug!("Reconstructing threads from {} messages", messages.len());
        }

        let coalesced = coalescer::coalesce(messages, &self.config)?;
        let roots = tree_builder::build_tree(coalesced, &self.config)?;
        let forest = ThreadForest::from_roots(roots);

        if self.config.enable_debug_logging {
            tracing::debug!(
                "Reconstructed {} nodes ({} ghosts) in {} threads",
                forest.len(),
                forest.ghost_count(),
                forest.roots().len()
            );
        }

        Ok(forest)
    }

    /// Like [`MessageThreader::reconstruct`], but degrades to an unthreaded
    /// view instead of failing
    pub fn reconstruct_or_flat(&self, messages: Vec<Message>) -> ThreadForest {
        match self.reconstruct(messages.clone()) {
            Ok(forest) => forest,
            Err(e) => {
                tracing::warn!(
                    "Thread reconstruction failed, falling back to flat view: {}",
                    e
                );
                ThreadForest::flat(messages)
            }
        }
    }
}

impl Default for MessageThreader {
    fn default() -> Self {
        Self::new()
    }
}
