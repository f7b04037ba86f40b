//! Events emitted at pipeline boundaries.


use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::{info, warn};

/// Something that happened while handling an upload or a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// Text extraction began for a file.
    ExtractionStarted { filename: String },

    /// Text extraction finished.
    ExtractionFinished { filename: String, characters: usize },

    /// Extracted text was split into chunks.
    Chunked { filename: String, chunks: usize },

    /// Chunks were embedded.
    Embedded { filename: String, vectors: usize },

    /// Records were written to the vector index.
    Indexed { filename: String, records: usize },

    /// An upload was abandoned; the index was left untouched.
    UploadFailed { filename: String, error: String },

    /// Retrieval finished for a question.
    SearchCompleted { hits: usize },

    /// Retrieval failed before the chat model was asked.
    SearchFailed { error: String },

    /// The chat model produced an answer.
    SynthesisCompleted { characters: usize },

    /// The chat model failed or timed out.
    SynthesisFailed { error: String },
}

/// Receiver of pipeline events.
pub trait EventSink: Send + Sync {
    fn record(&self, event: PipelineEvent);
}

/// Forwards every event to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    #[inline]
    fn record(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::ExtractionStarted { filename } => {
                info!(filename = %filename, "extraction started");
            }
            PipelineEvent::ExtractionFinished {
                filename,
                characters,
            } => {
                info!(filename = %filename, characters, "extraction finished");
            }
            PipelineEvent::Chunked { filename, chunks } => {
                info!(filename = %filename, chunks, "document chunked");
            }
            PipelineEvent::Embedded { filename, vectors } => {
                info!(filename = %filename, vectors, "chunks embedded");
            }
            PipelineEvent::Indexed { filename, records } => {
                info!(filename = %filename, records, "records indexed");
            }
            PipelineEvent::UploadFailed { filename, error } => {
                warn!(filename = %filename, error = %error, "upload failed");
            }
            PipelineEvent::SearchCompleted { hits } => {
                info!(hits, "search completed");
            }
            PipelineEvent::SearchFailed { error } => {
                warn!(error = %error, "search failed");
            }
            PipelineEvent::SynthesisCompleted { characters } => {
                info!(characters, "answer synthesized");
            }
            PipelineEvent::SynthesisFailed { error } => {
                warn!(error = %error, "answer synthesis failed");
            }
        }
    }
}

/// Keeps events in memory, in the order they were recorded.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingSink {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl EventSink for RecordingSink {
    #[inline]
    fn record(&self, event: PipelineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
