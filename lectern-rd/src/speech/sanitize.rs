//! Segment text sanitization and narratability policy
//!
//! Speech engines are empirically unreliable on very long or symbol-heavy
//! input, so segment text is reduced to a safe word/punctuation set,
//! whitespace-collapsed, and truncated before it reaches the engine.
//! Truncation never spans a segment boundary: each utterance corresponds to
//! exactly one segment.

use once_cell::sync::Lazy;
use regex::Regex;

static UNSAFE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[^\w\s.,!?;:()\-'"]"#).expect("valid pattern"));
static WHITESPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid pattern"));

/// Clean segment text for the engine and bound its length
///
/// Strips characters outside the safe set, collapses whitespace runs to a
/// single space, trims, and truncates to `max_chars` characters (with a
/// terminal period marking the cut).
pub fn sanitize(text: &str, max_chars: usize) -> String {
    let stripped = UNSAFE_CHARS.replace_all(text, " ");
    let collapsed = WHITESPACE_RUNS.replace_all(&stripped, " ");
    let trimmed = collapsed.trim();

    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }

    let mut truncated: String = trimmed.chars().take(max_chars).collect();
    truncated.push('.');
    truncated
}

/// Whether sanitized text is worth an utterance
///
/// Empty and very short segments are skipped without producing an utterance
/// or a start/end callback cycle.
pub fn narratable(sanitized: &str, min_chars: usize) -> bool {
    sanitized.chars().count() >= min_chars
}
