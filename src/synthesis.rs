//! Key-insight cards and the executive summary.
//!
//! Two generation calls over the full corpus: one produces 3-5 insight
//! cards from the quote block plus theme summaries, one condenses the
//! cards into an executive summary. Card decode failure yields an empty
//! list; summary decode failure yields a canned default keyed to the
//! card count.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::decode::extract_json;
use crate::gateway::{Attribution, ChatGateway, ChatModel, ChatRequest};
use crate::model::{
    ExecutiveSummary, FindingType, Insight, KeyInsightCard, QuoteWithAttribution, ThemeCluster,
};
use crate::prompts::{card_prompt, render_theme_summaries, summary_prompt};

/// Only the first 50 insights feed the card prompt; beyond that the
/// context stops paying for itself.
const QUOTE_BLOCK_LIMIT: usize = 50;

/// Character prefix of the quote block passed to the summary prompt.
const SUMMARY_DATA_CHARS: usize = 3000;

const CARD_MAX_OUTPUT_TOKENS: u32 = 4096;
const SUMMARY_MAX_OUTPUT_TOKENS: u32 = 1024;

/// Options for the synthesis stage.
#[derive(Debug, Clone)]
pub struct SynthesisOptions {
    pub model: String,
    pub temperature: f32,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            model: "openai/gpt-4o-mini".into(),
            temperature: 0.3,
        }
    }
}

// =============================================================================
// Prompt inputs
// =============================================================================

/// Numbered quote block for the card prompt.
pub fn render_quote_block(insights: &[Insight]) -> String {
    insights
        .iter()
        .take(QUOTE_BLOCK_LIMIT)
        .enumerate()
        .map(|(i, insight)| {
            let speaker = insight
                .speaker
                .as_deref()
                .map(|s| format!(" - {s}"))
                .unwrap_or_default();
            format!(
                "{}. \"{}\"{} [Theme: {}, Sentiment: {}]",
                i + 1,
                insight.quote,
                speaker,
                insight.theme,
                insight.sentiment.as_str()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `n`-character prefix of `s`, cut back to the nearest char boundary.
fn char_prefix(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// =============================================================================
// Card decoding
// =============================================================================

#[derive(Debug, Deserialize)]
struct RawCard {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    main_finding: Option<String>,
    #[serde(default)]
    finding_type: Option<String>,
    #[serde(default)]
    problem_statement: Option<String>,
    #[serde(default)]
    supporting_quotes: Vec<Value>,
    #[serde(default)]
    behavioral_pattern: Option<String>,
    #[serde(default)]
    expected_journey: Option<Vec<String>>,
    #[serde(default)]
    impact_metric: Option<String>,
}

/// A supporting quote may arrive as a full object or a bare string.
fn decode_quote(value: Value) -> Option<QuoteWithAttribution> {
    match value {
        Value::String(s) => Some(QuoteWithAttribution {
            quote: s,
            speaker: None,
            context: None,
        }),
        Value::Object(_) => serde_json::from_value(value).ok(),
        _ => None,
    }
}

/// Decode the card array. Numbering in the generated content is ignored;
/// cards are renumbered 1..N in arrival order.
fn decode_cards(raw: &str) -> Option<Vec<KeyInsightCard>> {
    let records: Vec<RawCard> = serde_json::from_str(extract_json(raw)).ok()?;
    let cards = records
        .into_iter()
        .enumerate()
        .map(|(i, record)| {
            let number = i + 1;
            KeyInsightCard {
                insight_number: number,
                title: record
                    .title
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| format!("Insight #{number}")),
                main_finding: record.main_finding.unwrap_or_default(),
                finding_type: record
                    .finding_type
                    .map(|f| FindingType::parse(&f))
                    .unwrap_or_default(),
                problem_statement: record.problem_statement,
                supporting_quotes: record
                    .supporting_quotes
                    .into_iter()
                    .filter_map(decode_quote)
                    .collect(),
                behavioral_pattern: record.behavioral_pattern,
                expected_journey: record.expected_journey,
                impact_metric: record.impact_metric,
            }
        })
        .collect();
    Some(cards)
}

// =============================================================================
// Generation
// =============================================================================

/// Generate 3-5 key insight cards. An undecodable response yields no
/// cards rather than an error; the report renders fine without them.
pub async fn generate_key_insights(
    gateway: &dyn ChatGateway,
    options: &SynthesisOptions,
    insights: &[Insight],
    themes: &[ThemeCluster],
) -> Vec<KeyInsightCard> {
    let quote_block = render_quote_block(insights);
    let theme_summaries = render_theme_summaries(themes);

    let prompt = card_prompt(&quote_block, &theme_summaries);
    let req = ChatRequest::new(
        ChatModel::openrouter(&options.model),
        prompt.to_messages(),
        Attribution::new("synthesis::cards"),
    )
    .temperature(options.temperature)
    .max_tokens(CARD_MAX_OUTPUT_TOKENS)
    .json();

    match gateway.chat(req).await {
        Ok(resp) => decode_cards(&resp.content).unwrap_or_else(|| {
            warn!("undecodable key-insight response; continuing with no cards");
            Vec::new()
        }),
        Err(err) => {
            warn!(error = %err, "key-insight call failed; continuing with no cards");
            Vec::new()
        }
    }
}

fn default_summary(card_count: usize) -> ExecutiveSummary {
    ExecutiveSummary {
        research_question: "User research analysis".to_string(),
        key_finding: format!("{card_count} key insights identified from user research"),
        key_insight: "Multiple themes emerged from the research".to_string(),
        recommendation: "Review key insights and prioritize implementation".to_string(),
        context: None,
    }
}

/// Generate the executive summary from the cards plus a bounded slice of
/// the quote block.
pub async fn generate_executive_summary(
    gateway: &dyn ChatGateway,
    options: &SynthesisOptions,
    cards: &[KeyInsightCard],
    insights: &[Insight],
) -> ExecutiveSummary {
    let insights_summary = cards
        .iter()
        .map(|c| format!("{}. {}: {}", c.insight_number, c.title, c.main_finding))
        .collect::<Vec<_>>()
        .join("\n");
    let quote_block = render_quote_block(insights);
    let all_data = char_prefix(&quote_block, SUMMARY_DATA_CHARS);

    let prompt = summary_prompt(&insights_summary, all_data);
    let req = ChatRequest::new(
        ChatModel::openrouter(&options.model),
        prompt.to_messages(),
        Attribution::new("synthesis::summary"),
    )
    .temperature(options.temperature)
    .max_tokens(SUMMARY_MAX_OUTPUT_TOKENS)
    .json();

    let decoded = match gateway.chat(req).await {
        Ok(resp) => serde_json::from_str::<ExecutiveSummary>(extract_json(&resp.content)).ok(),
        Err(err) => {
            warn!(error = %err, "executive summary call failed");
            None
        }
    };

    decoded.unwrap_or_else(|| {
        warn!("falling back to default executive summary");
        default_summary(cards.len())
    })
}
