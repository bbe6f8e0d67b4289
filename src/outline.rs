//! Loading extractor output and rendering forests as plain text

use std::io::Read;
use std::path::Path;

use anyhow::Context;
use chrono::SecondsFormat;

use crate::error::Result;
use crate::threading::{Message, ThreadForest, collapse_whitespace};

/// Parse a JSON array of messages
pub fn read_messages<R: Read>(reader: R) -> Result<Vec<Message>> {
    let messages: Vec<Message> = serde_json::from_reader(reader)?;
    Ok(messages)
}

/// Read messages from a file, or stdin when `path` is `-`
pub fn load_messages(path: &Path) -> Result<Vec<Message>> {
    if path == Path::new("-") {
        return read_messages(std::io::stdin().lock());
    }

    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open message log: {:?}", path))?;
    read_messages(std::io::BufReader::new(file))
}

/// One line per node, indented by depth, in display order
pub fn render_outline(forest: &ThreadForest) -> String {
    let mut out = String::new();

    for message in forest.iter() {
        let indent = "  ".repeat(message.depth as usize);
        let author = if message.author.is_empty() {
            "unknown"
        } else {
            message.author.as_str()
        };
        let content = collapse_whitespace(&message.content);

        if message.is_ghost {
            out.push_str(&format!(
                "{indent}#{} (not loaded) {author}: {content}\n",
                message.display_number
            ));
            continue;
        }

        let time = message
            .created_at()
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_else(|| message.timestamp.to_string());
        out.push_str(&format!(
            "{indent}#{} [{time}] {author}: {content}",
            message.display_number
        ));
        if !message.merged_ids.is_empty() {
            out.push_str(&format!(" (+{} merged)", message.merged_ids.len()));
        }
        out.push('\n');
    }

    out
}
