//! Folding of rapid-fire messages
//!
//! Consecutive messages from the same author that arrive within the coalesce
//! window are merged into the earliest of them, so a burst of short lines
//! reads as one post.

use super::types::{Message, RICH_BODY_SEPARATOR, ThreadingConfig, ThreadingError};

/// Merge same-author bursts into single logical messages
///
/// Output is sorted by ascending timestamp; equal timestamps keep their input order.
/// A message carrying an explicit parent is never folded.
pub fn coalesce(
    messages: Vec<Message>,
    config: &ThreadingConfig,
) -> Result<Vec<Message>, ThreadingError> {
    if messages.is_empty() {
        return Ok(Vec::new());
    }

    for message in &messages {
        validate_message(message)?;
    }

    let input_len = messages.len();

    // `sort_by_key` is stable, which gives the original-order tie-break
    let mut sorted_messages = messages;
    sorted_messages.sort_by_key(|message| message.timestamp);

    let mut coalesced: Vec<Message> = Vec::with_capacity(input_len);

    for mut message in sorted_messages {
        message.children.clear();

        if let Some(representative) = coalesced.last_mut()
            && should_fold(representative, &message, config)
        {
            if config.enable_debug_logging {
                tracing::debug!(
                    "Folding message {} into {} (author: {})",
                    message.id,
                    representative.id,
                    message.author
                );
            }
            fold_into(representative, message);
            continue;
        }

        coalesced.push(message);
    }

    if config.enable_debug_logging {
        tracing::debug!(
            "Coalesced {} messages into {}",
            input_len,
            coalesced.len()
        );
    }

    Ok(coalesced)
}

fn validate_message(message: &Message) -> Result<(), ThreadingError> {
    if message.id.is_empty() {
        return Err(ThreadingError::InvalidMessage {
            reason: format!(
                "message by '{}' at {} has an empty id",
                message.author, message.timestamp
            ),
        });
    }
    Ok(())
}

/// Whether `message` belongs to the burst started by `representative`
fn should_fold(representative: &Message, message: &Message, config: &ThreadingConfig) -> bool {
    message.explicit_parent_id.is_none()
        && message.author == representative.author
        && message.timestamp.saturating_sub(representative.timestamp) <= config.coalesce_window_ms
}

/// Append `message` to `representative` and retire its id
fn fold_into(representative: &mut Message, message: Message) {
    if !message.rich_body.is_empty() {
        if !representative.rich_body.is_empty() {
            representative.rich_body.push_str(RICH_BODY_SEPARATOR);
        }
        representative.rich_body.push_str(&message.rich_body);
    }

    if !message.content.is_empty() {
        if !representative.content.is_empty() {
            representative.content.push(' ');
        }
        representative.content.push_str(&message.content);
    }

    representative.merged_ids.push(message.id);
    representative.merged_ids.extend(message.merged_ids);
}
