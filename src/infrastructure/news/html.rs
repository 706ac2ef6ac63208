//! HTML stripping and truncation for feed entries. Feed summaries/content
//! routinely carry markup; the pipeline only cares about plain text.

use scraper::Html;

/// Extracts plain text from an HTML fragment, collapsing whitespace.
pub fn strip_html(input: &str) -> String {
    let fragment = Html::parse_fragment(input);
    let text = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncates to at most `max_chars` characters, respecting char boundaries.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_collapses_whitespace() {
        let html = "<p>Bitcoin   <b>surges</b></p>\n<div>past $70k</div>";
        assert_eq!(strip_html(html), "Bitcoin surges past $70k");
    }

    #[test]
    fn truncates_on_char_boundary() {
        let s = "hello world";
        assert_eq!(truncate_chars(s, 5), "hello");
        assert_eq!(truncate_chars(s, 100), "hello world");
    }
}
