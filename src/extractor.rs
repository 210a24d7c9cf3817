//! Insight extraction from transcript chunks.
//!
//! For each chunk, one generation call requests a JSON array of insight
//! objects. Decoding is two-phase: strict JSON first, then a labeled-line
//! scanner for models that answer in prose. A chunk whose call or decode
//! fails completely contributes zero insights; the stage itself never fails
//! on empty output — the orchestrator decides what an empty result means.

use futures::stream::{self, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::decode::{extract_json, Decoded};
use crate::gateway::{Attribution, ChatGateway, ChatModel, ChatRequest};
use crate::model::{Chunk, Insight, Sentiment};
use crate::prompts::extraction_prompt;

/// Hard cap on generation for one chunk's extraction call.
const EXTRACTION_MAX_OUTPUT_TOKENS: u32 = 2000;

/// Options for the extraction stage.
#[derive(Debug, Clone)]
pub struct ExtractorOptions {
    /// Model for per-chunk extraction calls.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// How many chunk calls may be in flight at once.
    pub concurrency: usize,
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        Self {
            model: "openai/gpt-4o-mini".into(),
            temperature: 0.1,
            concurrency: 4,
        }
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Insight object as the model emits it; every field is optional so one
/// malformed record does not sink the batch.
#[derive(Debug, Deserialize)]
struct RawInsight {
    #[serde(default)]
    quote: String,
    #[serde(default)]
    speaker: Option<String>,
    #[serde(default)]
    theme: Option<String>,
    #[serde(default)]
    sentiment: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    context: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
}

impl RawInsight {
    fn into_insight(self) -> Option<Insight> {
        let quote = self.quote.trim().to_string();
        if quote.is_empty() {
            return None;
        }
        Some(Insight {
            quote,
            speaker: self.speaker.filter(|s| !s.trim().is_empty()),
            theme: self
                .theme
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| "General".to_string()),
            sentiment: self
                .sentiment
                .map(|s| Sentiment::parse(&s))
                .unwrap_or_default(),
            confidence: self.confidence.unwrap_or(0.5).clamp(0.0, 1.0),
            context: self.context.unwrap_or_default(),
            timestamp: self.timestamp,
        })
    }
}

/// Decode a generation response into insights.
///
/// Strict path: JSON array (a bare object is accepted as a one-element
/// array). Fallback path: labeled-line scan. `Failed` means neither path
/// produced a record.
pub fn decode_insights(raw: &str) -> Decoded<Vec<Insight>> {
    let json_str = extract_json(raw);

    let strict: Option<Vec<RawInsight>> = serde_json::from_str::<Vec<RawInsight>>(json_str)
        .map(Some)
        .unwrap_or_else(|_| serde_json::from_str::<RawInsight>(json_str).ok().map(|r| vec![r]));

    if let Some(records) = strict {
        let insights: Vec<Insight> = records.into_iter().filter_map(RawInsight::into_insight).collect();
        return Decoded::Strict(insights);
    }

    let fallback = parse_labeled_lines(raw);
    if fallback.is_empty() {
        Decoded::Failed
    } else {
        Decoded::Fallback(fallback)
    }
}

/// Labeled-line fallback parser.
///
/// Scans for `Quote:`, `Speaker:`, `Theme:`, `Sentiment:`, `Confidence:`,
/// `Timestamp:`, `Context:` lines; a record closes on `Context:` when a
/// quote and theme have been seen. Malformed confidence values default
/// to 0.5.
fn parse_labeled_lines(text: &str) -> Vec<Insight> {
    #[derive(Default)]
    struct Partial {
        quote: Option<String>,
        speaker: Option<String>,
        theme: Option<String>,
        sentiment: Option<String>,
        confidence: Option<f64>,
        timestamp: Option<String>,
    }

    let mut insights = Vec::new();
    let mut current = Partial::default();

    for line in text.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("Quote:") {
            current.quote = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("Speaker:") {
            current.speaker = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("Theme:") {
            current.theme = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("Sentiment:") {
            current.sentiment = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("Confidence:") {
            current.confidence = Some(rest.trim().parse().unwrap_or(0.5));
        } else if let Some(rest) = line.strip_prefix("Timestamp:") {
            current.timestamp = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("Context:") {
            let context = rest.trim().to_string();
            if let (Some(quote), Some(theme)) = (current.quote.take(), current.theme.take()) {
                if !quote.is_empty() {
                    insights.push(Insight {
                        quote,
                        speaker: current.speaker.take().filter(|s| !s.is_empty()),
                        theme,
                        sentiment: current
                            .sentiment
                            .take()
                            .map(|s| Sentiment::parse(&s))
                            .unwrap_or_default(),
                        confidence: current.confidence.take().unwrap_or(0.5).clamp(0.0, 1.0),
                        context,
                        timestamp: current.timestamp.take().filter(|s| !s.is_empty()),
                    });
                }
            }
            current = Partial::default();
        }
    }

    insights
}

// =============================================================================
// Extraction
// =============================================================================

/// Extract insights from one chunk. Gateway and decode failures are logged
/// and yield an empty list; they never propagate.
pub async fn extract_from_chunk(
    gateway: &dyn ChatGateway,
    options: &ExtractorOptions,
    chunk: &Chunk,
) -> Vec<Insight> {
    let prompt = extraction_prompt(&chunk.content);
    let req = ChatRequest::new(
        ChatModel::openrouter(&options.model),
        prompt.to_messages(),
        Attribution::new("extractor::chunk"),
    )
    .temperature(options.temperature)
    .max_tokens(EXTRACTION_MAX_OUTPUT_TOKENS)
    .json();

    let response = match gateway.chat(req).await {
        Ok(resp) => resp,
        Err(err) => {
            warn!(
                source_id = %chunk.source_id,
                chunk_index = chunk.chunk_index,
                error = %err,
                "extraction call failed; chunk contributes no insights"
            );
            return Vec::new();
        }
    };

    match decode_insights(&response.content) {
        Decoded::Strict(insights) => insights,
        Decoded::Fallback(insights) => {
            debug!(
                source_id = %chunk.source_id,
                chunk_index = chunk.chunk_index,
                recovered = insights.len(),
                "strict decode failed; labeled-line fallback recovered records"
            );
            insights
        }
        Decoded::Failed => {
            warn!(
                source_id = %chunk.source_id,
                chunk_index = chunk.chunk_index,
                "unparseable extraction response; chunk contributes no insights"
            );
            Vec::new()
        }
    }
}

/// Extract insights from all chunks, with bounded per-chunk concurrency.
///
/// Output is the concatenation of per-chunk sublists in completion order;
/// downstream stages are order-insensitive beyond first-seen tie-breaks.
pub async fn extract_insights(
    gateway: &dyn ChatGateway,
    options: &ExtractorOptions,
    chunks: &[Chunk],
) -> Vec<Insight> {
    let concurrency = options.concurrency.max(1);
    let sublists: Vec<Vec<Insight>> = stream::iter(chunks)
        .map(|chunk| extract_from_chunk(gateway, options, chunk))
        .buffer_unordered(concurrency)
        .collect()
        .await;

    sublists.into_iter().flatten().collect()
}
