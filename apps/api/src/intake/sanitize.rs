//! Cleanup of raw AI responses before JSON parsing.
//!
//! The model is told not to wrap its answer in markdown, but it sometimes does.

/// Opening fence markers, longest first so a tagged fence is never mistaken
/// for a bare one.
pub const OPENING_FENCES: &[&str] = &["```javascript", "```json", "```JSON", "```js", "```"];

pub const CLOSING_FENCE: &str = "```";

/// Trims whitespace and strips a surrounding code fence (with or without a
/// language tag). Repeats until nothing changes, so it is idempotent.
pub fn sanitize_response(raw: &str) -> &str {
    let mut current = raw.trim();
    loop {
        let next = strip_fence_once(current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn strip_fence_once(text: &str) -> &str {
    let mut text = text;
    if let Some(marker) = OPENING_FENCES.iter().find(|m| text.starts_with(*m)) {
        text = text[marker.len()..].trim();
    }
    if let Some(stripped) = text.strip_suffix(CLOSING_FENCE) {
        text = stripped.trim();
    }
    text
}
