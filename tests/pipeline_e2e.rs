//! End-to-end pipeline runs against a scripted in-process gateway.

use std::time::Duration;

use async_trait::async_trait;

use insight_loom::chunker::{SourceDocument, StaticDocumentSource};
use insight_loom::gateway::{ChatGateway, ChatRequest, ChatResponse, FinishReason, ProviderError};
use insight_loom::model::Priority;
use insight_loom::pipeline::{run_pipeline, PipelineConfig, PipelineError};
use insight_loom::report::{MemoryOutputSink, ReportKind};
use insight_loom::status::{MemoryStatusSink, Phase, StatusEvent};

fn response(content: &str) -> ChatResponse {
    ChatResponse {
        content: content.to_string(),
        input_tokens: 100,
        output_tokens: 50,
        cost_nanodollars: 0,
        latency: Duration::from_millis(1),
        finish_reason: FinishReason::Stop,
    }
}

/// Answers each call based on which stage made it and what the prompt
/// mentions.
struct ScriptedGateway;

#[async_trait]
impl ChatGateway for ScriptedGateway {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let user_text = req
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();

        let content = match req.attribution.caller {
            "extractor::chunk" => r#"[
                {"quote": "I could not find the settings menu anywhere", "speaker": "P1",
                 "theme": "Navigation", "sentiment": "Negative", "confidence": 0.9,
                 "context": "onboarding task"},
                {"quote": "The menu labels make no sense to me",
                 "theme": "Navigation", "sentiment": "Negative", "confidence": 0.8,
                 "context": "free exploration"},
                {"quote": "I kept clicking the wrong tab over and over", "speaker": "P3",
                 "theme": "Navigation", "sentiment": "Negative", "confidence": 0.85,
                 "context": "task 2"},
                {"quote": "The price feels fair for what you get",
                 "theme": "Pricing", "sentiment": "Positive", "confidence": 0.7,
                 "context": "closing interview"}
            ]"#
            .to_string(),
            "themes::cluster" => {
                if user_text.contains("Pricing") {
                    r#"{"theme_name": "Pricing Perception", "summary": "Pricing reads as fair"}"#
                        .to_string()
                } else {
                    r#"{"theme_name": "Navigation Breakdown", "summary": "Users cannot locate core controls"}"#
                        .to_string()
                }
            }
            "synthesis::cards" => r#"[
                {"insight_number": 7, "title": "Navigation Breakdown",
                 "main_finding": "Core controls are undiscoverable", "finding_type": "critical",
                 "supporting_quotes": [
                    {"quote": "I could not find the settings menu anywhere", "speaker": "P1"},
                    "The menu labels make no sense to me"
                 ],
                 "impact_metric": "3 of 4 participants failed task 2"},
                {"insight_number": 7, "title": "Pricing Lands Well",
                 "main_finding": "Perceived value matches cost", "finding_type": "positive",
                 "supporting_quotes": ["The price feels fair for what you get"]}
            ]"#
            .to_string(),
            "synthesis::summary" => r#"{
                "research_question": "Can users navigate the redesigned app?",
                "key_finding": "Navigation failures dominate the sessions",
                "key_insight": "Labels, not layout, are the blocker",
                "recommendation": "Run a card sort on the menu taxonomy"
            }"#
            .to_string(),
            other => panic!("unexpected caller {other}"),
        };

        Ok(response(&content))
    }
}

/// Always answers with unparseable prose.
struct GarbageGateway;

#[async_trait]
impl ChatGateway for GarbageGateway {
    async fn chat(&self, _req: ChatRequest) -> Result<ChatResponse, ProviderError> {
        Ok(response("I had a wonderful time reading these transcripts!"))
    }
}

/// Always fails at the transport level.
struct DownGateway;

#[async_trait]
impl ChatGateway for DownGateway {
    async fn chat(&self, _req: ChatRequest) -> Result<ChatResponse, ProviderError> {
        Err(ProviderError::provider("openrouter", "unreachable", true))
    }
}

fn transcript_source() -> StaticDocumentSource {
    StaticDocumentSource {
        documents: vec![SourceDocument {
            source_id: "session-01.txt".to_string(),
            text: "Moderator: walk me through finding the settings. \
                   P1: I could not find the settings menu anywhere, honestly. \
                   P3: I kept clicking the wrong tab over and over."
                .to_string(),
        }],
    }
}

#[tokio::test]
async fn full_run_produces_ranked_themes_cards_and_reports() {
    let status = MemoryStatusSink::new();
    let output = MemoryOutputSink::new();
    let config = PipelineConfig::default();

    let summary = run_pipeline(
        &ScriptedGateway,
        &transcript_source(),
        &status,
        &output,
        &config,
    )
    .await
    .unwrap();

    assert_eq!(summary.insights.len(), 4);

    // Navigation: frequency 3, three negatives -> High, sorted first.
    assert_eq!(summary.themes.len(), 2);
    assert_eq!(summary.themes[0].theme_name, "Navigation Breakdown");
    assert_eq!(summary.themes[0].priority, Priority::High);
    assert_eq!(summary.themes[0].frequency, 3);
    assert_eq!(summary.themes[1].theme_name, "Pricing Perception");
    assert_eq!(summary.themes[1].priority, Priority::Low);

    // Generated numbering (7, 7) is discarded.
    let numbers: Vec<usize> = summary
        .key_insights
        .iter()
        .map(|c| c.insight_number)
        .collect();
    assert_eq!(numbers, vec![1, 2]);
    assert_eq!(summary.key_insights[0].supporting_quotes.len(), 2);

    assert_eq!(
        summary.executive_summary.recommendation,
        "Run a card sort on the menu taxonomy"
    );

    // All three reports delivered.
    assert_eq!(summary.outputs.len(), 3);
    let json_report = output.take(ReportKind::JsonReport).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json_report).unwrap();
    assert_eq!(parsed["summary"]["total_insights"], 4);
    assert_eq!(parsed["summary"]["key_insights_count"], 2);
    assert_eq!(parsed["summary"]["quotes_extracted"], 3);
    assert_eq!(parsed["themes"][0]["theme_name"], "Navigation Breakdown");

    let exec = output.take(ReportKind::ExecutiveSummary).unwrap();
    assert!(exec.contains("### 1. Navigation Breakdown"));
    assert!(exec.contains("*3 of 4 participants failed task 2*"));

    // Phases fired in order, ending with Completed.
    let events = status.events();
    let phases: Vec<Phase> = events
        .iter()
        .filter_map(|e| match e {
            StatusEvent::PhaseStarted { phase, .. } => Some(*phase),
            _ => None,
        })
        .collect();
    assert_eq!(
        phases,
        vec![
            Phase::DocumentIngestion,
            Phase::InsightExtraction,
            Phase::ThemeSynthesis,
            Phase::KeyInsightSynthesis,
            Phase::OutputFormatting,
        ]
    );
    assert_eq!(events.last(), Some(&StatusEvent::Completed));
}

#[tokio::test]
async fn garbage_responses_degrade_to_sentinel_and_defaults() {
    let status = MemoryStatusSink::new();
    let output = MemoryOutputSink::new();
    let config = PipelineConfig::default();

    let summary = run_pipeline(
        &GarbageGateway,
        &transcript_source(),
        &status,
        &output,
        &config,
    )
    .await
    .unwrap();

    // Extraction produced nothing; the sentinel stands in.
    assert_eq!(summary.insights.len(), 1);
    assert_eq!(
        summary.insights[0].quote,
        "No significant insights found in the provided documents"
    );
    assert_eq!(summary.insights[0].theme, "Analysis Result");

    // Cluster fallback keeps the raw label at Medium.
    assert_eq!(summary.themes.len(), 1);
    assert_eq!(summary.themes[0].theme_name, "Analysis Result");
    assert_eq!(summary.themes[0].priority, Priority::Medium);
    assert_eq!(
        summary.themes[0].summary,
        "Theme identified from 1 user insights"
    );

    // No cards, default summary.
    assert!(summary.key_insights.is_empty());
    assert_eq!(
        summary.executive_summary.key_finding,
        "0 key insights identified from user research"
    );
    assert_eq!(
        summary.executive_summary.recommendation,
        "Review key insights and prioritize implementation"
    );

    // The run still completes and writes all reports.
    assert_eq!(status.events().last(), Some(&StatusEvent::Completed));
    assert!(output.take(ReportKind::InsightsReport).is_some());
}

#[tokio::test]
async fn transport_failures_degrade_the_same_way() {
    let status = MemoryStatusSink::new();
    let output = MemoryOutputSink::new();
    let config = PipelineConfig::default();

    let summary = run_pipeline(
        &DownGateway,
        &transcript_source(),
        &status,
        &output,
        &config,
    )
    .await
    .unwrap();

    assert_eq!(summary.insights.len(), 1);
    assert_eq!(summary.themes[0].priority, Priority::Medium);
    assert!(summary.key_insights.is_empty());
    assert_eq!(status.events().last(), Some(&StatusEvent::Completed));
}

#[tokio::test]
async fn empty_source_fails_before_any_generation() {
    let status = MemoryStatusSink::new();
    let output = MemoryOutputSink::new();
    let config = PipelineConfig::default();
    let source = StaticDocumentSource { documents: vec![] };

    let err = run_pipeline(&ScriptedGateway, &source, &status, &output, &config)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::NoDocuments));
    assert!(matches!(
        status.events().last(),
        Some(StatusEvent::Failed { .. })
    ));
    assert!(output.take(ReportKind::JsonReport).is_none());
}

#[tokio::test]
async fn whitespace_only_source_counts_as_empty() {
    let status = MemoryStatusSink::new();
    let output = MemoryOutputSink::new();
    let config = PipelineConfig::default();
    let source = StaticDocumentSource {
        documents: vec![SourceDocument {
            source_id: "blank.txt".to_string(),
            text: "   \n\t  ".to_string(),
        }],
    };

    let err = run_pipeline(&ScriptedGateway, &source, &status, &output, &config)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::NoDocuments));
}
