//! The synthesis pipeline.
//!
//! Runs the stages in a fixed order: ingest and chunk, extract insights,
//! deduplicate, cluster into themes, synthesize key-insight cards and the
//! executive summary, render reports. Generation failures inside a stage
//! degrade to that stage's fallback; only missing input and report IO are
//! fatal.

use std::collections::HashMap;

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::chunker::{chunk_all, ChunkerConfig, DocumentSource};
use crate::dedup::deduplicate;
use crate::extractor::{extract_insights, ExtractorOptions};
use crate::gateway::ChatGateway;
use crate::model::{ExecutiveSummary, Insight, KeyInsightCard, Sentiment, ThemeCluster};
use crate::report::{write_reports, OutputError, OutputSink, ReportKind};
use crate::status::{Phase, StatusEvent, StatusSink};
use crate::synthesis::{generate_executive_summary, generate_key_insights, SynthesisOptions};
use crate::themes::{cluster_themes, ThemeOptions};

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The source yielded no usable text at all.
    #[error("no document content to analyze")]
    NoDocuments,
    #[error(transparent)]
    Output(#[from] OutputError),
}

/// Everything a run needs besides the gateway and the sinks.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub chunker: ChunkerConfig,
    pub extractor: ExtractorOptions,
    pub themes: ThemeOptions,
    pub synthesis: SynthesisOptions,
}

/// What a completed run produced.
#[derive(Debug)]
pub struct RunSummary {
    pub session_id: Uuid,
    pub insights: Vec<Insight>,
    pub themes: Vec<ThemeCluster>,
    pub key_insights: Vec<KeyInsightCard>,
    pub executive_summary: ExecutiveSummary,
    /// Locators for the written reports, keyed by kind.
    pub outputs: HashMap<ReportKind, String>,
}

/// Stands in when extraction finds nothing, so reports render a truthful
/// "nothing here" instead of an empty shell.
fn sentinel_insight() -> Insight {
    Insight {
        quote: "No significant insights found in the provided documents".to_string(),
        speaker: None,
        theme: "Analysis Result".to_string(),
        sentiment: Sentiment::Neutral,
        confidence: 1.0,
        context: "System message".to_string(),
        timestamp: None,
    }
}

/// Run the whole pipeline over one document source.
pub async fn run_pipeline(
    gateway: &dyn ChatGateway,
    source: &dyn DocumentSource,
    status: &dyn StatusSink,
    output: &dyn OutputSink,
    config: &PipelineConfig,
) -> Result<RunSummary, PipelineError> {
    let session_id = Uuid::new_v4();

    status
        .report(StatusEvent::PhaseStarted {
            phase: Phase::DocumentIngestion,
            count: 0,
        })
        .await;
    let chunks = chunk_all(source, &config.chunker);
    if chunks.is_empty() {
        status
            .report(StatusEvent::Failed {
                message: "no document content to analyze".to_string(),
            })
            .await;
        return Err(PipelineError::NoDocuments);
    }
    info!(session_id = %session_id, chunks = chunks.len(), "documents chunked");

    status
        .report(StatusEvent::PhaseStarted {
            phase: Phase::InsightExtraction,
            count: chunks.len(),
        })
        .await;
    let raw_insights = extract_insights(gateway, &config.extractor, &chunks).await;
    let mut insights = deduplicate(raw_insights);
    if insights.is_empty() {
        info!(session_id = %session_id, "extraction produced nothing; using sentinel insight");
        insights.push(sentinel_insight());
    }
    info!(session_id = %session_id, insights = insights.len(), "insights extracted");

    status
        .report(StatusEvent::PhaseStarted {
            phase: Phase::ThemeSynthesis,
            count: insights.len(),
        })
        .await;
    let themes = cluster_themes(gateway, &config.themes, &insights).await;
    info!(session_id = %session_id, themes = themes.len(), "themes clustered");

    status
        .report(StatusEvent::PhaseStarted {
            phase: Phase::KeyInsightSynthesis,
            count: themes.len(),
        })
        .await;
    let key_insights = generate_key_insights(gateway, &config.synthesis, &insights, &themes).await;
    let executive_summary =
        generate_executive_summary(gateway, &config.synthesis, &key_insights, &insights).await;
    info!(session_id = %session_id, cards = key_insights.len(), "key insights synthesized");

    status
        .report(StatusEvent::PhaseStarted {
            phase: Phase::OutputFormatting,
            count: key_insights.len(),
        })
        .await;
    let outputs = match write_reports(
        output,
        session_id,
        &insights,
        &themes,
        &key_insights,
        &executive_summary,
    )
    .await
    {
        Ok(outputs) => outputs,
        Err(err) => {
            status
                .report(StatusEvent::Failed {
                    message: err.to_string(),
                })
                .await;
            return Err(err.into());
        }
    };

    status.report(StatusEvent::Completed).await;
    info!(session_id = %session_id, "run complete");

    Ok(RunSummary {
        session_id,
        insights,
        themes,
        key_insights,
        executive_summary,
        outputs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_has_full_confidence_and_fixed_theme() {
        let s = sentinel_insight();
        assert_eq!(s.theme, "Analysis Result");
        assert_eq!(s.sentiment, Sentiment::Neutral);
        assert!((s.confidence - 1.0).abs() < 1e-9);
        assert_eq!(s.context, "System message");
    }
}
