//! Upload and question handling built from injected collaborators.
//!
//! Every public operation here is a user action boundary: failures are
//! reported to the event sink and turned into readable outcomes instead of
//! being propagated.


use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::answer::{AnswerSynthesizer, ChatModel, error_message};
use crate::config::Config;
use crate::embeddings::{ChunkingConfig, Embedder, chunk_document};
use crate::events::{EventSink, PipelineEvent};
use crate::extract::{Document, extract_text};
use crate::index::{IndexedRecord, SearchHit, VectorIndex};
use crate::session::{Conversation, Role};
use crate::{QaError, Result};

/// Result of uploading one file
#[derive(Debug)]
pub struct UploadOutcome {
    pub filename: String,
    /// Number of chunks indexed
    pub result: Result<usize>,
}

impl UploadOutcome {
    #[inline]
    pub const fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

impl fmt::Display for UploadOutcome {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            Ok(chunks) => write!(
                f,
                "Processed {}: {} chunks indexed",
                self.filename, chunks
            ),
            Err(e) => write!(f, "Error processing {}: {}", self.filename, e),
        }
    }
}

/// An answer with the chunks it was based on
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<SearchHit>,
}

pub struct QaPipeline {
    embedder: Arc<dyn Embedder>,
    synthesizer: AnswerSynthesizer,
    index: VectorIndex,
    events: Arc<dyn EventSink>,
    chunking: ChunkingConfig,
    top_k: usize,
}

impl QaPipeline {
    #[inline]
    pub fn new(
        config: &Config,
        embedder: Arc<dyn Embedder>,
        chat: Arc<dyn ChatModel>,
        index: VectorIndex,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            embedder,
            synthesizer: AnswerSynthesizer::new(chat),
            index,
            events,
            chunking: config.chunking.clone(),
            top_k: config.retrieval.top_k,
        }
    }

    #[inline]
    pub const fn index(&self) -> &VectorIndex {
        &self.index
    }

    #[inline]
    pub const fn top_k(&self) -> usize {
        self.top_k
    }

    /// Extract, chunk, embed and index one document.
    ///
    /// The index is only touched once every chunk has a vector, so a failure
    /// at any earlier step leaves previously indexed data as it was.
    #[inline]
    pub async fn process_document(&mut self, document: &Document) -> Result<usize> {
        let filename = document.filename.as_str();

        self.events.record(PipelineEvent::ExtractionStarted {
            filename: filename.to_string(),
        });
        let text = extract_text(document)?;
        self.events.record(PipelineEvent::ExtractionFinished {
            filename: filename.to_string(),
            characters: text.chars().count(),
        });

        let chunks = chunk_document(filename, &text, &self.chunking);
        self.events.record(PipelineEvent::Chunked {
            filename: filename.to_string(),
            chunks: chunks.len(),
        });

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = if texts.is_empty() {
            Vec::new()
        } else {
            self.embedder.embed_documents(&texts)?
        };
        if vectors.len() != chunks.len() {
            return Err(QaError::EmbeddingService(format!(
                "Expected {} vectors, got {}",
                chunks.len(),
                vectors.len()
            )));
        }
        self.events.record(PipelineEvent::Embedded {
            filename: filename.to_string(),
            vectors: vectors.len(),
        });

        let records: Vec<IndexedRecord> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexedRecord::new(filename, chunk.index, chunk.text, vector))
            .collect();

        self.index.replace_source(filename, &records).await?;
        self.events.record(PipelineEvent::Indexed {
            filename: filename.to_string(),
            records: records.len(),
        });

        info!("Indexed {} chunks from {}", records.len(), filename);
        Ok(records.len())
    }

    /// Process each document independently; one failure does not stop the rest
    #[inline]
    pub async fn upload(&mut self, documents: Vec<Document>) -> Vec<UploadOutcome> {
        let mut outcomes = Vec::with_capacity(documents.len());
        for document in documents {
            let result = self.process_document(&document).await;
            outcomes.push(self.outcome(document.filename, result));
        }
        outcomes
    }

    /// Read files from disk and upload them
    #[inline]
    pub async fn upload_paths<P: AsRef<Path>>(&mut self, paths: &[P]) -> Vec<UploadOutcome> {
        let mut outcomes = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let result = match Document::from_path(path) {
                Ok(document) => self.process_document(&document).await,
                Err(e) => Err(e),
            };
            let filename = path
                .file_name()
                .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().to_string());
            outcomes.push(self.outcome(filename, result));
        }
        outcomes
    }

    /// The `k` chunks closest to `question`
    #[inline]
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<SearchHit>> {
        let query = self.embedder.embed_query(question)?;
        let hits = self.index.search(&query, k).await?;
        self.events
            .record(PipelineEvent::SearchCompleted { hits: hits.len() });
        debug!("Retrieved {} chunks for question", hits.len());
        Ok(hits)
    }

    /// Answer a question from the configured number of chunks. Never fails.
    #[inline]
    pub async fn ask(&self, question: &str) -> Answer {
        self.ask_with_top_k(question, self.top_k).await
    }

    #[inline]
    pub async fn ask_with_top_k(&self, question: &str, k: usize) -> Answer {
        let hits = match self.retrieve(question, k).await {
            Ok(hits) => hits,
            Err(e) => {
                self.events.record(PipelineEvent::SearchFailed {
                    error: e.to_string(),
                });
                return Answer {
                    text: error_message(&e),
                    sources: Vec::new(),
                };
            }
        };

        let context: Vec<String> = hits.iter().map(|h| h.record.content.clone()).collect();
        let text = match self.synthesizer.synthesize(question, &context) {
            Ok(text) => {
                self.events.record(PipelineEvent::SynthesisCompleted {
                    characters: text.chars().count(),
                });
                text
            }
            Err(e) => {
                self.events.record(PipelineEvent::SynthesisFailed {
                    error: e.to_string(),
                });
                error_message(&e)
            }
        };

        Answer {
            text,
            sources: hits,
        }
    }

    /// Record the question and its answer in `conversation`
    #[inline]
    pub async fn respond(&self, conversation: &mut Conversation, question: &str) -> Answer {
        conversation.append(Role::User, question);
        let answer = self.ask(question).await;
        conversation.append(Role::Assistant, answer.text.clone());
        answer
    }

    #[inline]
    pub async fn remove(&self, filename: &str) -> Result<()> {
        self.index.delete_source(filename).await
    }

    fn outcome(&self, filename: String, result: Result<usize>) -> UploadOutcome {
        if let Err(e) = &result {
            self.events.record(PipelineEvent::UploadFailed {
                filename: filename.clone(),
                error: e.to_string(),
            });
        }
        UploadOutcome { filename, result }
    }
}
