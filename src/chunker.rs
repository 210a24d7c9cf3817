//! Transcript ingestion and chunking.
//!
//! Splits normalized document text into overlapping fixed-size character
//! windows. Window metadata (`chunk_index`, `total_chunks`, `content_hash`)
//! is assigned after the full split is known. Documents that fail to load are
//! skipped with a warning; the batch continues over the rest.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::Chunk;

// Collapse any whitespace run to a single space.
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

// Strip characters outside word/space/common-punctuation classes.
static SPECIAL_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[^\w\s.,!?;:\-'"()]"#).expect("special chars regex"));

// Normalize speaker labels at line starts: exactly one space after the colon.
static SPEAKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^([A-Za-z0-9 ]+):\s*").expect("speaker regex"));

/// Configuration for the chunker.
#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    /// Window size in characters.
    pub chunk_size: usize,
    /// Shared characters between adjacent windows. Must be < chunk_size.
    pub chunk_overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl ChunkerConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ChunkerError> {
        if chunk_size == 0 {
            return Err(ChunkerError::InvalidParams(
                "chunk_size must be positive".into(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(ChunkerError::InvalidParams(
                "chunk_overlap must be smaller than chunk_size".into(),
            ));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }
}

/// Errors from the chunking stage.
#[derive(Debug, Error)]
pub enum ChunkerError {
    #[error("invalid chunker parameters: {0}")]
    InvalidParams(String),
}

/// A loaded source document, ready to chunk.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub source_id: String,
    pub text: String,
}

/// Error loading one document. Reported per document, never per batch.
#[derive(Debug, Error)]
#[error("failed to load {source_id}: {message}")]
pub struct SourceError {
    pub source_id: String,
    pub message: String,
}

/// Supplies raw documents to the pipeline. Text extraction for binary formats
/// lives behind this boundary; the pipeline only sees text or a per-document
/// error.
pub trait DocumentSource: Send + Sync {
    fn documents(&self) -> Vec<Result<SourceDocument, SourceError>>;
}

/// Fixed in-memory document source.
pub struct StaticDocumentSource {
    pub documents: Vec<SourceDocument>,
}

impl DocumentSource for StaticDocumentSource {
    fn documents(&self) -> Vec<Result<SourceDocument, SourceError>> {
        self.documents.iter().cloned().map(Ok).collect()
    }
}

/// Clean and normalize raw transcript text.
///
/// Collapses whitespace runs, strips characters outside word/punctuation
/// classes, normalizes leading speaker labels (`P1:I hate it` becomes
/// `P1: I hate it`), and trims.
pub fn preprocess_text(text: &str) -> String {
    let text = WHITESPACE.replace_all(text, " ");
    let text = SPECIAL_CHARS.replace_all(&text, "");
    let text = SPEAKER.replace_all(&text, "${1}: ");
    text.trim().to_string()
}

/// Split one normalized document into overlapping chunks.
///
/// Adjacent chunks share `chunk_overlap` characters; the final chunk may be
/// shorter than `chunk_size`. Empty input produces zero chunks.
pub fn chunk_document(doc: &SourceDocument, config: &ChunkerConfig) -> Vec<Chunk> {
    let normalized = preprocess_text(&doc.text);
    if normalized.is_empty() {
        return Vec::new();
    }

    // Byte offsets of char boundaries, with one past-the-end sentinel, so
    // windows slice on char boundaries.
    let mut boundaries: Vec<usize> = normalized.char_indices().map(|(i, _)| i).collect();
    boundaries.push(normalized.len());
    let n_chars = boundaries.len() - 1;

    // `ChunkerConfig::new` rejects these, but the fields are public; clamp so
    // a hand-built config cannot stall the loop or underflow.
    let size = config.chunk_size.max(1);
    let step = size.saturating_sub(config.chunk_overlap).max(1);
    let mut windows: Vec<&str> = Vec::new();
    let mut start = 0usize;
    loop {
        let end = (start + size).min(n_chars);
        windows.push(&normalized[boundaries[start]..boundaries[end]]);
        if end == n_chars {
            break;
        }
        start += step;
    }

    let total = windows.len();
    windows
        .into_iter()
        .enumerate()
        .map(|(i, content)| Chunk {
            content_hash: blake3::hash(content.as_bytes()).to_hex().to_string(),
            content: content.to_string(),
            source_id: doc.source_id.clone(),
            chunk_index: i,
            total_chunks: total,
        })
        .collect()
}

/// Chunk every document a source yields. Failed documents are skipped with a
/// warning and contribute zero chunks.
pub fn chunk_all(source: &dyn DocumentSource, config: &ChunkerConfig) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for result in source.documents() {
        match result {
            Ok(doc) => {
                let doc_chunks = chunk_document(&doc, config);
                debug!(
                    source_id = %doc.source_id,
                    chunks = doc_chunks.len(),
                    "chunked document"
                );
                chunks.extend(doc_chunks);
            }
            Err(err) => {
                warn!(source_id = %err.source_id, error = %err.message, "skipping document");
            }
        }
    }
    chunks
}
