//! Shared text helpers for prompt building and model-output decoding.

/// Extract a JSON object from text that may contain other content.
/// Uses brace-counting (string-aware) to find the outermost JSON object.
pub fn extract_json_object(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[start..start + i + 1].to_string());
                }
            }
            _ => {}
        }
    }

    None
}

/// Strip a leading ```` ``` ```` / ```` ```json ```` fence and a trailing ```` ``` ````
/// from model output, returning the trimmed inner text.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let inner = match trimmed.strip_prefix("```json") {
        Some(rest) => rest,
        None => trimmed.strip_prefix("```").unwrap_or(trimmed),
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    inner.trim()
}

/// Truncate to at most `max_chars` characters, never splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
