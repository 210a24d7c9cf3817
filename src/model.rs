//! Value objects handed between pipeline stages.
//!
//! Every entity here is an immutable snapshot: stage N+1 only reads stage N's
//! outputs and produces new values. Nothing is mutated after creation.

use serde::{Deserialize, Serialize};

// =============================================================================
// Sentiment
// =============================================================================

/// Sentiment of an extracted insight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl Sentiment {
    /// Parse from free text; unrecognized values fall back to Neutral.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "positive" => Sentiment::Positive,
            "negative" => Sentiment::Negative,
            _ => Sentiment::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Negative => "Negative",
            Sentiment::Neutral => "Neutral",
        }
    }
}

// =============================================================================
// Chunk
// =============================================================================

/// An overlapping window of normalized transcript text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub source_id: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    /// blake3 hex digest of `content`.
    pub content_hash: String,
}

// =============================================================================
// Insight
// =============================================================================

/// A single quote-level observation extracted from a chunk.
///
/// `quote` is requested as a verbatim substring of the source chunk; the
/// extraction prompt asks for it but nothing enforces it at the type level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub quote: String,
    #[serde(default)]
    pub speaker: Option<String>,
    pub theme: String,
    pub sentiment: Sentiment,
    /// Confidence in [0, 1].
    pub confidence: f64,
    pub context: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

// =============================================================================
// ThemeCluster
// =============================================================================

/// Derived priority of a theme cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }
}

/// A group of insights sharing a theme label, with derived priority and a
/// narrative summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeCluster {
    pub theme_name: String,
    /// Members in arrival order.
    pub insights: Vec<Insight>,
    /// Always equal to `insights.len()`.
    pub frequency: usize,
    pub priority: Priority,
    pub summary: String,
}

// =============================================================================
// Key insight cards
// =============================================================================

/// Lightweight projection of an insight for presentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteWithAttribution {
    pub quote: String,
    #[serde(default)]
    pub speaker: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
}

/// Classification of a key insight finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FindingType {
    Positive,
    Negative,
    Critical,
    #[default]
    Neutral,
}

impl FindingType {
    /// Parse from free text; unrecognized values fall back to Neutral.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "positive" => FindingType::Positive,
            "negative" => FindingType::Negative,
            "critical" => FindingType::Critical,
            _ => FindingType::Neutral,
        }
    }
}

/// A curated, presentation-ready synthesis of one finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyInsightCard {
    /// 1-based, sequential; assigned by the synthesizer regardless of any
    /// number present in generated content.
    pub insight_number: usize,
    pub title: String,
    pub main_finding: String,
    pub finding_type: FindingType,
    #[serde(default)]
    pub problem_statement: Option<String>,
    pub supporting_quotes: Vec<QuoteWithAttribution>,
    #[serde(default)]
    pub behavioral_pattern: Option<String>,
    #[serde(default)]
    pub expected_journey: Option<Vec<String>>,
    #[serde(default)]
    pub impact_metric: Option<String>,
}

/// The single executive summary produced per synthesis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    pub research_question: String,
    pub key_finding: String,
    pub key_insight: String,
    pub recommendation: String,
    #[serde(default)]
    pub context: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentiment_parse_is_lenient() {
        assert_eq!(Sentiment::parse("Positive"), Sentiment::Positive);
        assert_eq!(Sentiment::parse(" negative "), Sentiment::Negative);
        assert_eq!(Sentiment::parse("mixed"), Sentiment::Neutral);
        assert_eq!(Sentiment::parse(""), Sentiment::Neutral);
    }

    #[test]
    fn finding_type_parse_is_lenient() {
        assert_eq!(FindingType::parse("critical"), FindingType::Critical);
        assert_eq!(FindingType::parse("POSITIVE"), FindingType::Positive);
        assert_eq!(FindingType::parse("???"), FindingType::Neutral);
    }

    #[test]
    fn finding_type_serializes_lowercase() {
        let json = serde_json::to_string(&FindingType::Critical).unwrap();
        assert_eq!(json, r#""critical""#);
    }
}
