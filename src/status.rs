//! Run progress reporting.
//!
//! The pipeline narrates its phases through a [`StatusSink`]. Sinks are
//! fire-and-forget: a slow or broken sink must never stall or fail a run,
//! so implementations should do their own buffering and swallow their own
//! errors.

use async_trait::async_trait;
use std::sync::Mutex;

/// Pipeline phase, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    DocumentIngestion,
    InsightExtraction,
    ThemeSynthesis,
    KeyInsightSynthesis,
    OutputFormatting,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::DocumentIngestion => "document_ingestion",
            Phase::InsightExtraction => "insight_extraction",
            Phase::ThemeSynthesis => "theme_synthesis",
            Phase::KeyInsightSynthesis => "key_insight_synthesis",
            Phase::OutputFormatting => "output_formatting",
        }
    }
}

/// One progress event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// A phase began, with whatever count is known at that point
    /// (chunks produced, insights in hand, clusters formed).
    PhaseStarted { phase: Phase, count: usize },
    /// The whole run finished.
    Completed,
    /// The run stopped on a fatal error.
    Failed { message: String },
}

#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn report(&self, event: StatusEvent);
}

/// Discards all events.
pub struct NoopStatusSink;

#[async_trait]
impl StatusSink for NoopStatusSink {
    async fn report(&self, _event: StatusEvent) {}
}

/// Collects events in memory. Test helper.
#[derive(Default)]
pub struct MemoryStatusSink {
    events: Mutex<Vec<StatusEvent>>,
}

impl MemoryStatusSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<StatusEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl StatusSink for MemoryStatusSink {
    async fn report(&self, event: StatusEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
