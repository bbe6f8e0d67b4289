use super::types::{GHOST_PLACEHOLDER_CONTENT, PLACEHOLDER_AUTHOR, ParentPreview};

/// Author and content a ghost node should display
pub fn ghost_identity(preview: Option<&ParentPreview>) -> (String, String) {
    match preview {
        Some(preview) => {
            let author = collapse_whitespace(&preview.author);
            let content = collapse_whitespace(&preview.content);
            let content = if content.is_empty() {
                GHOST_PLACEHOLDER_CONTENT.to_string()
            } else {
                content
            };
            (author, content)
        }
        None => (
            PLACEHOLDER_AUTHOR.to_string(),
            GHOST_PLACEHOLDER_CONTENT.to_string(),
        ),
    }
}

/// Trims and collapses runs of whitespace into single spaces
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
