use serde::{Deserialize, Serialize};

/// Author used for structural placeholder nodes that have no real author
pub const PLACEHOLDER_AUTHOR: &str = "";

/// Content shown for a ghost node whose parent preview is missing or empty
pub const GHOST_PLACEHOLDER_CONTENT: &str = "Message not loaded";

/// Separator inserted between rich bodies when messages are coalesced
pub const RICH_BODY_SEPARATOR: &str = "<hr data-coalesced>";

/// Offset applied to a ghost's timestamp so it sorts immediately before its first child
pub const GHOST_TIMESTAMP_OFFSET_MS: i64 = 1;

/// Snapshot of a parent's visible content, carried by a reply whose parent was not loaded
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ParentPreview {
    /// Display name shown in the quoted parent
    pub author: String,

    /// Plain-text excerpt of the quoted parent
    pub content: String,
}

/// A single conversation node, either straight from the extractor or placed in a forest
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Unique identifier of the message
    pub id: String,

    /// Display name of the author (empty for placeholder nodes)
    pub author: String,

    /// Milliseconds since the Unix epoch
    pub timestamp: i64,

    /// Plain-text preview of the body
    pub content: String,

    /// Rendered body, moved and concatenated but never interpreted
    #[serde(default)]
    pub rich_body: String,

    /// ID of the message this one explicitly replies to
    #[serde(default)]
    pub explicit_parent_id: Option<String>,

    /// Parent snapshot, present when the explicit parent is not loaded
    #[serde(default)]
    pub parent_preview: Option<ParentPreview>,

    /// Replies, ordered by ascending timestamp
    #[serde(default)]
    pub children: Vec<Message>,

    /// Whether this node was synthesized for a referenced but missing parent
    #[serde(default)]
    pub is_ghost: bool,

    /// Position in the canonical forest traversal, starting at 1 (0 until numbered)
    #[serde(default)]
    pub display_number: u32,

    /// Nesting depth, 0 for roots
    #[serde(default)]
    pub depth: u32,

    /// ID of the node this one was attached to, explicit or inferred
    #[serde(default)]
    pub parent_id: Option<String>,

    /// IDs of messages folded into this one by the coalescer
    #[serde(default)]
    pub merged_ids: Vec<String>,
}

impl Message {
    /// Create an unplaced message as the extractor would hand it over
    pub fn new(
        id: impl Into<String>,
        author: impl Into<String>,
        timestamp: i64,
        content: impl Into<String>,
    ) -> Self {
        let content = content.into();
        Self {
            id: id.into(),
            author: author.into(),
            timestamp,
            rich_body: content.clone(),
            content,
            explicit_parent_id: None,
            parent_preview: None,
            children: Vec::new(),
            is_ghost: false,
            display_number: 0,
            depth: 0,
            parent_id: None,
            merged_ids: Vec::new(),
        }
    }

    /// Mark this message as an explicit reply to `parent_id`
    pub fn replying_to(mut self, parent_id: impl Into<String>) -> Self {
        self.explicit_parent_id = Some(parent_id.into());
        self
    }

    /// Attach a snapshot of the (possibly missing) parent
    pub fn with_parent_preview(
        mut self,
        author: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        self.parent_preview = Some(ParentPreview {
            author: author.into(),
            content: content.into(),
        });
        self
    }

    /// Use a rendered body that differs from the plain-text content
    pub fn with_rich_body(mut self, rich_body: impl Into<String>) -> Self {
        self.rich_body = rich_body.into();
        self
    }

    /// Whether this node is a root of its forest
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Number of nodes in this subtree, including this one
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Message::subtree_len).sum::<usize>()
    }

    /// The creation time as a UTC datetime, if representable
    pub fn created_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp_millis(self.timestamp)
    }
}

/// Configuration for conversation threading heuristics
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ThreadingConfig {
    /// Maximum gap between same-author messages that are folded into one post
    pub coalesce_window_ms: i64,

    /// Maximum gap to the previous message for it to be adopted as an implicit parent
    pub implicit_link_window_ms: i64,

    /// Whether to enable detailed logging of processing steps
    pub enable_debug_logging: bool,
}

impl Default for ThreadingConfig {
    fn default() -> Self {
        Self {
            coalesce_window_ms: 60_000,
            implicit_link_window_ms: 300_000,
            enable_debug_logging: false,
        }
    }
}

impl ThreadingConfig {
    /// Check that the windows are usable together
    pub fn validate(&self) -> Result<(), ThreadingError> {
        if self.coalesce_window_ms < 0 {
            return Err(ThreadingError::InvalidConfig(format!(
                "coalesce window must not be negative, got {}ms",
                self.coalesce_window_ms
            )));
        }
        if self.implicit_link_window_ms < 0 {
            return Err(ThreadingError::InvalidConfig(format!(
                "implicit link window must not be negative, got {}ms",
                self.implicit_link_window_ms
            )));
        }
        if self.implicit_link_window_ms < self.coalesce_window_ms {
            return Err(ThreadingError::InvalidConfig(format!(
                "implicit link window ({}ms) must not be smaller than coalesce window ({}ms)",
                self.implicit_link_window_ms, self.coalesce_window_ms
            )));
        }
        Ok(())
    }
}

/// Errors that can occur while reconstructing a conversation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ThreadingError {
    #[error("Invalid message: {reason}")]
    InvalidMessage { reason: String },

    #[error("Duplicate message id: {0}")]
    DuplicateId(String),

    #[error("Message {0} replies to itself")]
    SelfReply(String),

    #[error("Forest invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Invalid threading configuration: {0}")]
    InvalidConfig(String),
}
