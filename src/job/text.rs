//! Text normalisation for extracted fields

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Maximum length of a stored description, in characters
pub const DESCRIPTION_MAX_CHARS: usize = 1000;

/// Maximum length of a description preview, in characters
pub const PREVIEW_MAX_CHARS: usize = 200;

/// Appended to any text cut by [`truncate`]
pub const TRUNCATION_MARKER: &str = "...";

static NUMERIC_ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&#(?:[xX]([0-9a-fA-F]{1,6})|([0-9]{1,7}));")
        .expect("hardcoded regex pattern is valid")
});

/// Collapses every whitespace run to a single space and trims the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decodes the handful of HTML entities that survive text extraction
///
/// `&amp;` is decoded last so that `&amp;lt;` becomes `&lt;` rather than `<`.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let decoded = NUMERIC_ENTITY.replace_all(text, |caps: &Captures| {
        let code = match (caps.get(1), caps.get(2)) {
            (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (None, Some(dec)) => dec.as_str().parse::<u32>().ok(),
            _ => None,
        };
        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });

    decoded
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Entity-decodes and whitespace-collapses a text fragment
pub fn normalize(text: &str) -> String {
    collapse_whitespace(&decode_entities(text))
}

/// Cuts `text` to at most `max_chars` characters, appending the marker when cut
///
/// Lengths are counted in Unicode scalar values, never bytes.
///
/// # Examples
///
/// ```
/// use jobhunter::job::text::truncate;
///
/// assert_eq!(truncate("short", 10), "short");
/// assert_eq!(truncate("abcdef", 3), "abc...");
/// ```
pub fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}{}", &text[..byte_idx], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

/// Normalised description and its preview, in that order
///
/// The preview is cut from the already-truncated description.
pub fn description_and_preview(raw: &str) -> (String, String) {
    let description = truncate(&normalize(raw), DESCRIPTION_MAX_CHARS);
    let preview = truncate(&description, PREVIEW_MAX_CHARS);
    (description, preview)
}

/// Title-cases a hyphenated slug: `acme-labs` becomes `Acme Labs`
pub fn title_case_slug(slug: &str) -> String {
    slug.split(|c: char| c == '-' || c == '_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  Senior \n\t Rust   Engineer "), "Senior Rust Engineer");
        assert_eq!(collapse_whitespace(""), "");
    }

    #[test]
    fn test_decode_named_entities() {
        assert_eq!(decode_entities("Tom &amp; Jerry"), "Tom & Jerry");
        assert_eq!(decode_entities("&lt;b&gt;"), "<b>");
        assert_eq!(decode_entities("&quot;hi&quot; &#39;there&#39;"), "\"hi\" 'there'");
        assert_eq!(decode_entities("a&nbsp;b"), "a b");
    }

    #[test]
    fn test_decode_numeric_entities() {
        assert_eq!(decode_entities("caf&#233;"), "café");
        assert_eq!(decode_entities("&#x2014;"), "\u{2014}");
        // out of range code points are left alone
        assert_eq!(decode_entities("&#9999999;"), "&#9999999;");
    }

    #[test]
    fn test_amp_decoded_last() {
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_truncate_counts_characters() {
        let text = "é".repeat(5);
        assert_eq!(truncate(&text, 3), "ééé...");
        assert_eq!(truncate(&text, 5), text);
    }

    #[test]
    fn test_long_description_truncated() {
        let raw = "x".repeat(1500);
        let (description, preview) = description_and_preview(&raw);

        assert_eq!(description.chars().count(), DESCRIPTION_MAX_CHARS + TRUNCATION_MARKER.len());
        assert!(description.ends_with(TRUNCATION_MARKER));
        assert!(description.starts_with(&"x".repeat(DESCRIPTION_MAX_CHARS)));

        assert_eq!(preview.chars().count(), PREVIEW_MAX_CHARS + TRUNCATION_MARKER.len());
        assert_eq!(preview, format!("{}...", "x".repeat(PREVIEW_MAX_CHARS)));
    }

    #[test]
    fn test_short_description_untouched() {
        let (description, preview) = description_and_preview("  We are   hiring. ");
        assert_eq!(description, "We are hiring.");
        assert_eq!(preview, "We are hiring.");
    }

    #[test]
    fn test_title_case_slug() {
        assert_eq!(title_case_slug("acme-labs"), "Acme Labs");
        assert_eq!(title_case_slug("remote_first--co"), "Remote First Co");
        assert_eq!(title_case_slug(""), "");
    }
}
