//! Shared utility functions used across multiple modules.

use chrono::{SecondsFormat, Utc};

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Normalize word text to the canonical stored form.
///
/// Trims surrounding whitespace and title-cases each word. Returns `None`
/// for empty or whitespace-only input.
pub fn normalize_word(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(title_case(trimmed))
    }
}

/// Title-case text: the first letter of every run of letters is upper-cased,
/// the rest lower-cased. Apostrophes inside a word do not start a new run.
pub fn title_case(value: &str) -> String {
    let mut output = String::with_capacity(value.len());
    let mut in_word = false;

    for ch in value.chars() {
        if ch.is_alphabetic() {
            if in_word {
                output.extend(ch.to_lowercase());
            } else {
                output.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            in_word = in_word && matches!(ch, '\'' | '\u{2019}');
            output.push(ch);
        }
    }

    output
}

/// Current server time as an RFC 3339 string with millisecond precision.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_option_rejects_empty() {
        assert_eq!(normalize_text_option(None), None);
        assert_eq!(normalize_text_option(Some("   ".to_string())), None);
    }

    #[test]
    fn normalize_text_option_trims_value() {
        assert_eq!(
            normalize_text_option(Some(" laptop ".to_string())),
            Some("laptop".to_string())
        );
    }

    #[test]
    fn normalize_word_title_cases_and_trims() {
        assert_eq!(normalize_word("  resolve "), Some("Resolve".to_string()));
        assert_eq!(
            normalize_word("BREAK the ICE"),
            Some("Break The Ice".to_string())
        );
        assert_eq!(normalize_word(" \t\n"), None);
    }

    #[test]
    fn title_case_keeps_apostrophes_inside_words() {
        assert_eq!(title_case("don't give up"), "Don't Give Up");
        assert_eq!(title_case("well-known"), "Well-Known");
    }

    #[test]
    fn timestamp_now_is_rfc3339() {
        let now = timestamp_now();
        assert!(chrono::DateTime::parse_from_rfc3339(&now).is_ok());
    }
}
