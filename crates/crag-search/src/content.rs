//! Result content cleanup.

use crate::SearchError;

/// Normalize a search result's content into plain text/Markdown.
///
/// Some providers return HTML fragments in `content`; those are converted
/// with htmd. Plain text passes through trimmed.
pub fn normalize_content(raw: &str) -> Result<String, SearchError> {
    let trimmed = raw.trim();
    if !looks_like_html(trimmed) {
        return Ok(trimmed.to_string());
    }

    let markdown = htmd::convert(trimmed)
        .map_err(|e| SearchError::Decode(format!("Failed to convert HTML: {}", e)))?;
    Ok(markdown.trim().to_string())
}

/// Cheap HTML sniffing: a tag opener followed by a closing angle bracket.
fn looks_like_html(text: &str) -> bool {
    const TAGS: &[&str] = &["<p", "<div", "<span", "<a ", "<br", "<li", "<h1", "<h2", "<h3", "<table"];
    let lower = text.to_lowercase();
    TAGS.iter().any(|tag| lower.contains(tag)) && lower.contains('>')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_passes_through() {
        let text = normalize_content("  Call 555-1234 for claims.  ").unwrap();
        assert_eq!(text, "Call 555-1234 for claims.");
    }

    #[test]
    fn test_html_is_converted() {
        let text = normalize_content("<p>Call <b>555-1234</b> for claims.</p>").unwrap();
        assert!(text.contains("555-1234"));
        assert!(!text.contains("<p>"));
    }

    #[test]
    fn test_angle_brackets_in_math_are_not_html() {
        assert!(!looks_like_html("x < y and y > z"));
    }
}
