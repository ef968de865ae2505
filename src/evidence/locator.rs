//! Locator strings and snippet extraction.
//!
//! A locator names a span of the analyzed text as `output:<start>-<end>`.
//! Offsets are UTF-8 byte offsets into the text, end exclusive.

/// Source tag every locator starts with
pub const LOCATOR_SOURCE: &str = "output";

/// Format a span as a locator string
pub fn format_locator(start: usize, end: usize) -> String {
    format!("{}:{}-{}", LOCATOR_SOURCE, start, end)
}

/// Parse a locator into `(start, end)`.
///
/// Returns None for a wrong source tag, a missing separator, a non-numeric
/// bound, or `end < start`. Never fails loudly: a bad locator simply has no
/// span.
pub fn try_parse(locator: &str) -> Option<(usize, usize)> {
    let rest = locator.strip_prefix(LOCATOR_SOURCE)?.strip_prefix(':')?;
    let (start, end) = rest.split_once('-')?;

    if !is_plain_number(start) || !is_plain_number(end) {
        return None;
    }

    let start: usize = start.parse().ok()?;
    let end: usize = end.parse().ok()?;

    if end < start {
        return None;
    }

    Some((start, end))
}

fn is_plain_number(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Extract the span padded by `radius` characters on each side.
///
/// Padding is clamped to the text; `...` marks a side where the snippet
/// stops short of the text boundary. Returns None when the span is outside
/// the text or does not fall on character boundaries.
pub fn extract_snippet(text: &str, start: usize, end: usize, radius: usize) -> Option<String> {
    if start > end || end > text.len() {
        return None;
    }
    if !text.is_char_boundary(start) || !text.is_char_boundary(end) {
        return None;
    }

    let snippet_start = if radius == 0 {
        start
    } else {
        text[..start]
            .char_indices()
            .rev()
            .nth(radius - 1)
            .map(|(i, _)| i)
            .unwrap_or(0)
    };

    let snippet_end = text[end..]
        .char_indices()
        .nth(radius)
        .map(|(i, _)| end + i)
        .unwrap_or(text.len());

    let prefix = if snippet_start > 0 { "..." } else { "" };
    let suffix = if snippet_end < text.len() { "..." } else { "" };

    Some(format!("{}{}{}", prefix, &text[snippet_start..snippet_end], suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_round_trip() {
        let locator = format_locator(12, 20);
        assert_eq!(locator, "output:12-20");
        assert_eq!(try_parse(&locator), Some((12, 20)));
    }

    #[test]
    fn test_try_parse_rejects_malformed() {
        assert_eq!(try_parse("input:1-2"), None);
        assert_eq!(try_parse("output1-2"), None);
        assert_eq!(try_parse("output:12"), None);
        assert_eq!(try_parse("output:a-2"), None);
        assert_eq!(try_parse("output:1-"), None);
        assert_eq!(try_parse("output:+1-2"), None);
        assert_eq!(try_parse("output:9-3"), None);
        assert_eq!(try_parse(""), None);
    }

    #[test]
    fn test_try_parse_allows_empty_span() {
        assert_eq!(try_parse("output:5-5"), Some((5, 5)));
    }

    #[test]
    fn test_snippet_in_middle() {
        let text = "The mixture was stirred at 60 °C for 2 h before workup.";
        let start = text.find("60").unwrap();
        let end = start + "60 °C".len();

        let snippet = extract_snippet(text, start, end, 5).unwrap();
        assert_eq!(snippet, "...d at 60 °C for ...");
    }

    #[test]
    fn test_snippet_clamped_to_text() {
        let text = "85% yield";
        let snippet = extract_snippet(text, 0, 3, 40).unwrap();
        assert_eq!(snippet, "85% yield");
    }

    #[test]
    fn test_snippet_zero_radius() {
        let text = "stir at -78 °C overnight";
        let start = text.find("-78").unwrap();
        let end = start + "-78 °C".len();
        assert_eq!(extract_snippet(text, start, end, 0).unwrap(), "...-78 °C...");
    }

    #[test]
    fn test_snippet_out_of_range() {
        assert_eq!(extract_snippet("short", 2, 10, 3), None);
        assert_eq!(extract_snippet("short", 4, 2, 3), None);
    }

    #[test]
    fn test_snippet_rejects_split_characters() {
        // '°' is two bytes; offset 1 lands inside it
        assert_eq!(extract_snippet("°C", 1, 2, 1), None);
    }
}
