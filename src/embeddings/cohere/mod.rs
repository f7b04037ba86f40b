
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::answer::ChatModel;
use crate::config::CohereConfig;
use crate::config::settings::MAX_EMBED_BATCH;
use crate::embeddings::Embedder;
use crate::{QaError, Result};

/// Client for the Cohere REST API, used for both embeddings and chat.
///
/// Every call is a single blocking request; failures are reported to the
/// caller rather than retried.
#[derive(Clone)]
pub struct CohereClient {
    base_url: Url,
    api_key: String,
    embed_model: String,
    chat_model: String,
    batch_size: u32,
    temperature: f32,
    timeout: Duration,
    agent: ureq::Agent,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
enum InputType {
    SearchDocument,
    SearchQuery,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    texts: &'a [String],
    input_type: InputType,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    message: &'a str,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

/// Failure of a single HTTP exchange, before it is attributed to the
/// embedding or chat side
#[derive(Debug, Error)]
enum RequestError {
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl fmt::Debug for CohereClient {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CohereClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("embed_model", &self.embed_model)
            .field("chat_model", &self.chat_model)
            .field("batch_size", &self.batch_size)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl CohereClient {
    #[inline]
    pub fn new(config: &CohereConfig, api_key: String) -> Result<Self> {
        config.validate()?;

        let timeout = Duration::from_secs(config.timeout_secs);

        Ok(Self {
            base_url: config.base_url.clone(),
            api_key,
            embed_model: config.embed_model.clone(),
            chat_model: config.chat_model.clone(),
            batch_size: config.batch_size,
            temperature: config.temperature,
            timeout,
            agent: build_agent(timeout),
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.agent = build_agent(timeout);
        self
    }

    #[inline]
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_EMBED_BATCH);
        self
    }

    #[inline]
    pub fn embed_model(&self) -> &str {
        &self.embed_model
    }

    #[inline]
    pub fn chat_model(&self) -> &str {
        &self.chat_model
    }

    fn embed(&self, texts: &[String], input_type: InputType) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            "Generating {:?} embeddings for {} texts",
            input_type,
            texts.len()
        );

        let mut embeddings = Vec::with_capacity(texts.len());

        // Nothing is returned unless every batch succeeds
        for batch in texts.chunks(self.batch_size as usize) {
            let request = EmbedRequest {
                model: &self.embed_model,
                texts: batch,
                input_type,
            };

            let response: EmbedResponse = self
                .post_json(&["v1", "embed"], &request)
                .map_err(|e| QaError::EmbeddingService(e.to_string()))?;

            if response.embeddings.len() != batch.len() {
                return Err(QaError::EmbeddingService(format!(
                    "Mismatch between request and response counts: {} vs {}",
                    batch.len(),
                    response.embeddings.len()
                )));
            }

            embeddings.extend(response.embeddings);
        }

        debug!("Generated {} embeddings total", embeddings.len());
        Ok(embeddings)
    }

    /// `segments` are appended to the base URL, keeping any path prefix it has
    fn endpoint(&self, segments: &[&str]) -> Result<Url, RequestError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                RequestError::Transport(format!("{} cannot be a base URL", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn post_json<B, R>(&self, segments: &[&str], body: &B) -> Result<R, RequestError>
    where
        B: Serialize,
        R: for<'de> Deserialize<'de>,
    {
        let url = self.endpoint(segments)?;

        let request_json =
            serde_json::to_string(body).map_err(|e| RequestError::Transport(e.to_string()))?;

        debug!("POST {}", url);

        let mut response = self
            .agent
            .post(url.as_str())
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .send(&request_json)
            .map_err(|error| match error {
                ureq::Error::Timeout(_) => RequestError::Timeout,
                other => RequestError::Transport(other.to_string()),
            })?;

        let status = response.status();
        let response_text = response
            .body_mut()
            .read_to_string()
            .map_err(|error| match error {
                ureq::Error::Timeout(_) => RequestError::Timeout,
                other => RequestError::Transport(other.to_string()),
            })?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&response_text)
                .map_or(response_text, |e| e.message);
            warn!("Cohere returned HTTP {} for {}: {}", status, url, message);
            return Err(RequestError::Status {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&response_text)
            .map_err(|e| RequestError::InvalidResponse(e.to_string()))
    }
}

impl Embedder for CohereClient {
    #[inline]
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.embed(texts, InputType::SearchDocument)
    }

    #[inline]
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()], InputType::SearchQuery)?
            .pop()
            .ok_or_else(|| QaError::EmbeddingService("No embedding returned for query".to_string()))
    }
}

impl ChatModel for CohereClient {
    #[inline]
    fn complete(&self, prompt: &str) -> Result<String> {
        debug!(
            "Requesting chat completion from {} (prompt length: {})",
            self.chat_model,
            prompt.len()
        );

        let request = ChatRequest {
            model: &self.chat_model,
            message: prompt,
            temperature: self.temperature,
        };

        let response: ChatResponse = self
            .post_json(&["v1", "chat"], &request)
            .map_err(|error| match error {
                RequestError::Timeout => QaError::SynthesisTimeout(self.timeout.as_secs()),
                other => QaError::Synthesis(other.to_string()),
            })?;

        Ok(response.text)
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}
