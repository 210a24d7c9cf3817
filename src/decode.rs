//! Decoding generation output into typed records.
//!
//! LLM responses are untyped text that we parse two different ways: a strict
//! JSON decode first, then a stage-specific fallback. `Decoded` tags which
//! path produced a value so callers and tests can observe degradation.

/// Outcome of a two-phase decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded<T> {
    /// Strict JSON decode succeeded.
    Strict(T),
    /// Strict decode failed; the fallback parser produced a value.
    Fallback(T),
    /// Neither decode path produced anything usable.
    Failed,
}

impl<T> Decoded<T> {
    pub fn into_value(self) -> Option<T> {
        match self {
            Decoded::Strict(v) | Decoded::Fallback(v) => Some(v),
            Decoded::Failed => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Decoded::Fallback(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Decoded::Failed)
    }
}

/// Extract a JSON object or array from potentially noisy LLM output.
///
/// Handles:
/// - Pure JSON responses
/// - JSON wrapped in markdown code fences
/// - JSON embedded in prose
pub fn extract_json(raw: &str) -> &str {
    let trimmed = raw.trim();

    // Prefer whichever delimiter appears first; a response may contain prose
    // with braces before the actual array.
    let obj_start = trimmed.find('{');
    let arr_start = trimmed.find('[');

    let (start, open, close) = match (obj_start, arr_start) {
        (Some(o), Some(a)) if a < o => (a, '[', ']'),
        (Some(o), _) => (o, '{', '}'),
        (None, Some(a)) => (a, '[', ']'),
        (None, None) => return trimmed,
    };

    let remainder = &trimmed[start..];
    match find_matching_delim(remainder, open, close) {
        Some(end) => &remainder[..end],
        None => trimmed,
    }
}

/// Find the byte offset just past the matching closing delimiter, respecting
/// JSON strings. Tracks "inside string" state so delimiters within `"..."`
/// are not counted.
fn find_matching_delim(s: &str, open: char, close: char) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape = false;

    for (i, c) in s.char_indices() {
        if escape {
            escape = false;
            continue;
        }
        if c == '\\' && in_string {
            escape = true;
            continue;
        }
        if c == '"' {
            in_string = !in_string;
            continue;
        }
        if in_string {
            continue;
        }
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return Some(i + 1);
            }
        }
    }
    None
}
