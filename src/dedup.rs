//! Near-duplicate insight removal.
//!
//! Dedup key is the lower-cased, trimmed first 50 characters of the quote.
//! This is a cheap syntactic heuristic, not semantic similarity: paraphrases
//! slip through, and unrelated quotes sharing a 50-character opening collide.
//! Both are accepted behavior.

use std::collections::HashSet;

use crate::model::Insight;

const PREFIX_CHARS: usize = 50;

/// Normalized prefix key for an insight quote.
fn quote_key(quote: &str) -> String {
    quote
        .trim()
        .to_lowercase()
        .chars()
        .take(PREFIX_CHARS)
        .collect()
}

/// Remove near-duplicate insights, preserving first-seen order.
pub fn deduplicate(insights: Vec<Insight>) -> Vec<Insight> {
    let mut seen: HashSet<String> = HashSet::new();
    insights
        .into_iter()
        .filter(|insight| seen.insert(quote_key(&insight.quote)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sentiment;

    fn insight(quote: &str) -> Insight {
        Insight {
            quote: quote.into(),
            speaker: None,
            theme: "General".into(),
            sentiment: Sentiment::Neutral,
            confidence: 0.5,
            context: String::new(),
            timestamp: None,
        }
    }

    #[test]
    fn exact_duplicates_removed_first_seen_wins() {
        let out = deduplicate(vec![insight("Q1"), insight("Q2"), insight("Q1")]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].quote, "Q1");
        assert_eq!(out[1].quote, "Q2");
    }

    #[test]
    fn case_and_whitespace_insensitive() {
        let out = deduplicate(vec![insight("  The Button Is Hidden "), insight("the button is hidden")]);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn long_quotes_compared_by_prefix_only() {
        let prefix = "a".repeat(50);
        let a = format!("{prefix} tail one");
        let b = format!("{prefix} completely different tail");
        // Shared 50-char prefix merges unrelated quotes. Accepted behavior.
        let out = deduplicate(vec![insight(&a), insight(&b)]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].quote, a);
    }

    #[test]
    fn idempotent() {
        let input = vec![insight("Q1"), insight("Q2"), insight("q1 "), insight("Q3")];
        let once = deduplicate(input);
        let twice = deduplicate(once.clone());
        assert_eq!(once.len(), twice.len());
        for (a, b) in once.iter().zip(twice.iter()) {
            assert_eq!(a.quote, b.quote);
        }
    }

    #[test]
    fn multibyte_prefix_is_char_counted() {
        let a = "é".repeat(60);
        let b = format!("{}{}", "é".repeat(50), "different");
        let out = deduplicate(vec![insight(&a), insight(&b)]);
        assert_eq!(out.len(), 1);
    }
}
