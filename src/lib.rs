//! insight-loom: research transcript synthesis.
//!
//! Turns a pile of raw research transcripts into a themed, prioritized
//! synthesis: overlapping chunks feed per-chunk insight extraction, the
//! deduplicated insights are clustered into ranked themes, and two final
//! generation passes produce key-insight cards plus an executive summary,
//! rendered as one JSON and two markdown reports.
//!
//! Every generation call goes through the [`gateway`] and is made at most
//! once; each stage carries a deterministic fallback so a flaky model
//! degrades the output instead of failing the run.

#![forbid(unsafe_code)]

pub mod chunker;
pub mod decode;
pub mod dedup;
pub mod extractor;
pub mod gateway;
pub mod model;
pub mod pipeline;
pub mod prompts;
pub mod report;
pub mod status;
pub mod synthesis;
pub mod themes;

pub use chunker::{ChunkerConfig, DocumentSource, SourceDocument, StaticDocumentSource};
pub use gateway::{ChatGateway, ProviderGateway};
pub use model::{
    ExecutiveSummary, Insight, KeyInsightCard, Priority, Sentiment, ThemeCluster,
};
pub use pipeline::{run_pipeline, PipelineConfig, PipelineError, RunSummary};
pub use report::{DirOutputSink, MemoryOutputSink, OutputSink, ReportKind};
pub use status::{MemoryStatusSink, NoopStatusSink, Phase, StatusEvent, StatusSink};
