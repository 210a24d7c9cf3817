//! Report assembly.
//!
//! Pure rendering over the pipeline's in-memory collections: one JSON
//! report plus two markdown documents, delivered through an [`OutputSink`].
//! Every count in the summary block is computed here from the collections
//! themselves; nothing is carried over from earlier stages.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::model::{ExecutiveSummary, Insight, KeyInsightCard, ThemeCluster};

/// The three deliverables of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    JsonReport,
    ExecutiveSummary,
    InsightsReport,
}

impl ReportKind {
    /// Conventional file name for this deliverable.
    pub fn file_name(&self) -> &'static str {
        match self {
            ReportKind::JsonReport => "research_synthesis.json",
            ReportKind::ExecutiveSummary => "executive_summary.md",
            ReportKind::InsightsReport => "detailed_insights.md",
        }
    }
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to write {kind:?}: {source}")]
    Io {
        kind: ReportKind,
        #[source]
        source: std::io::Error,
    },
}

/// Destination for rendered reports.
#[async_trait]
pub trait OutputSink: Send + Sync {
    /// Deliver one rendered document. Returns a locator for the written
    /// artifact (a path, for file-backed sinks).
    async fn write(&self, kind: ReportKind, content: &str) -> Result<String, OutputError>;
}

/// Writes each report into a directory under its conventional name.
pub struct DirOutputSink {
    dir: PathBuf,
}

impl DirOutputSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl OutputSink for DirOutputSink {
    async fn write(&self, kind: ReportKind, content: &str) -> Result<String, OutputError> {
        let path = self.dir.join(kind.file_name());
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| OutputError::Io { kind, source })?;
        tokio::fs::write(&path, content)
            .await
            .map_err(|source| OutputError::Io { kind, source })?;
        Ok(path.display().to_string())
    }
}

/// Captures reports in memory. Test helper.
#[derive(Default)]
pub struct MemoryOutputSink {
    reports: Mutex<HashMap<ReportKind, String>>,
}

impl MemoryOutputSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self, kind: ReportKind) -> Option<String> {
        self.reports.lock().ok()?.remove(&kind)
    }
}

#[async_trait]
impl OutputSink for MemoryOutputSink {
    async fn write(&self, kind: ReportKind, content: &str) -> Result<String, OutputError> {
        if let Ok(mut reports) = self.reports.lock() {
            reports.insert(kind, content.to_string());
        }
        Ok(kind.file_name().to_string())
    }
}

// =============================================================================
// Rendering
// =============================================================================

/// Full machine-readable report.
pub fn render_json_report(
    session_id: Uuid,
    insights: &[Insight],
    themes: &[ThemeCluster],
    cards: &[KeyInsightCard],
    summary: &ExecutiveSummary,
) -> String {
    let quotes_extracted: usize = cards.iter().map(|c| c.supporting_quotes.len()).sum();
    let report = json!({
        "session_id": session_id.to_string(),
        "generated_at": Utc::now().to_rfc3339(),
        "executive_summary": summary,
        "key_insights": cards,
        "summary": {
            "total_insights": insights.len(),
            "themes_identified": themes.len(),
            "key_insights_count": cards.len(),
            "quotes_extracted": quotes_extracted,
        },
        "themes": themes,
        "insights": insights,
    });
    // json! output is always serializable.
    serde_json::to_string_pretty(&report).unwrap_or_default()
}

/// Executive summary in presentation markdown.
pub fn render_executive_summary(
    session_id: Uuid,
    summary: &ExecutiveSummary,
    cards: &[KeyInsightCard],
) -> String {
    let mut out = format!(
        "# Executive Summary\n\n\
         **Session ID:** {session_id}\n\
         **Generated:** {}\n\n\
         ## Research Question\n\n{}\n\n\
         ## Key Finding\n\n**{}**\n\n\
         ## Key Insight\n\n{}\n\n\
         ## Recommendation\n\n{}\n\n\
         ---\n\n\
         ## Key Insights Overview\n\n",
        Utc::now().format("%Y-%m-%d %H:%M"),
        summary.research_question,
        summary.key_finding,
        summary.key_insight,
        summary.recommendation,
    );

    for card in cards {
        out.push_str(&format!(
            "\n### {}. {}\n\n**{}**\n\n",
            card.insight_number, card.title, card.main_finding
        ));
        if let Some(metric) = &card.impact_metric {
            out.push_str(&format!("*{metric}*\n\n"));
        }
    }

    out
}

/// Insights grouped by theme, with per-quote detail.
pub fn render_insights_report(
    session_id: Uuid,
    insights: &[Insight],
    themes: &[ThemeCluster],
) -> String {
    let mut out = format!(
        "# Detailed Insights Report\n\n\
         **Session ID:** {session_id}\n\
         **Total Insights:** {}\n\
         **Generated:** {}\n\n\
         ## Insights by Theme\n",
        insights.len(),
        Utc::now().format("%Y-%m-%d %H:%M"),
    );

    for theme in themes {
        out.push_str(&format!(
            "\n### {} ({} insights)\n**Priority:** {}\n**Summary:** {}\n\n**Key Quotes:**\n",
            theme.theme_name,
            theme.frequency,
            theme.priority.as_str(),
            theme.summary,
        ));
        for insight in &theme.insights {
            out.push_str(&format!(
                "\n- \"{}\"\n  - **Sentiment:** {}\n  - **Confidence:** {:.2}\n  - **Context:** {}\n",
                insight.quote,
                insight.sentiment.as_str(),
                insight.confidence,
                insight.context,
            ));
        }
    }

    out
}

/// Render and deliver all three reports. Returns locators keyed by kind.
pub async fn write_reports(
    sink: &dyn OutputSink,
    session_id: Uuid,
    insights: &[Insight],
    themes: &[ThemeCluster],
    cards: &[KeyInsightCard],
    summary: &ExecutiveSummary,
) -> Result<HashMap<ReportKind, String>, OutputError> {
    let mut outputs = HashMap::new();

    let json_report = render_json_report(session_id, insights, themes, cards, summary);
    outputs.insert(
        ReportKind::JsonReport,
        sink.write(ReportKind::JsonReport, &json_report).await?,
    );

    let exec = render_executive_summary(session_id, summary, cards);
    outputs.insert(
        ReportKind::ExecutiveSummary,
        sink.write(ReportKind::ExecutiveSummary, &exec).await?,
    );

    let detailed = render_insights_report(session_id, insights, themes);
    outputs.insert(
        ReportKind::InsightsReport,
        sink.write(ReportKind::InsightsReport, &detailed).await?,
    );

    Ok(outputs)
}
