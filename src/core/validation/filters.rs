//! Reusable parameter sanitizers
//!
//! These transform raw query-string values before validation. None of them
//! fail: unusable input degrades to an empty/zero value.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Sanitizer: plain single-line text
///
/// Strips markup tags and percent-encoded octets, drops control characters,
/// collapses runs of whitespace and trims the result.
pub fn sanitize_text_field(raw: &str) -> String {
    static TAGS: OnceLock<Regex> = OnceLock::new();
    static OCTETS: OnceLock<Regex> = OnceLock::new();

    let tags = TAGS.get_or_init(|| Regex::new(r"<[^>]*>?").unwrap());
    let octets = OCTETS.get_or_init(|| Regex::new(r"%[a-fA-F0-9]{2}").unwrap());

    let stripped = tags.replace_all(raw, "");
    let stripped = octets.replace_all(&stripped, "");

    stripped
        .split(|c: char| c.is_whitespace() || c.is_control())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Sanitizer: lowercase key made of `[a-z0-9_-]`
pub fn sanitize_key(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_' || *c == '-')
        .collect()
}

/// Sanitizer: non-negative integer
///
/// Negative or non-numeric input becomes 0; fractional input is truncated.
pub fn absint(raw: &str) -> u64 {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<i64>() {
        return u64::try_from(n).unwrap_or(0);
    }
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() && f >= 0.0 => f.trunc() as u64,
        _ => 0,
    }
}

/// Sanitizer: list of positive ids
///
/// Accepts comma and/or whitespace separated tokens; non-numeric tokens and
/// zero are ignored.
pub fn parse_id_list<'a>(values: impl IntoIterator<Item = &'a str>) -> BTreeSet<u64> {
    values
        .into_iter()
        .flat_map(|v| v.split(|c: char| c == ',' || c.is_whitespace()))
        .filter_map(|token| token.trim().parse::<u64>().ok())
        .filter(|id| *id > 0)
        .collect()
}

/// Sanitizer: comma separated list of trimmed, non-empty tokens
pub fn parse_token_list<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    values
        .into_iter()
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}
