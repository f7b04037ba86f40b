//! Answer synthesis: retrieved chunks and a question become one prompt for
//! the chat model.

#[cfg(test)]
mod tests;

use std::sync::Arc;
use tracing::{debug, error};

use crate::{QaError, Result};

/// A remote chat model answering a single prompt.
pub trait ChatModel: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String>;
}

/// Everything retrieved is placed into a single prompt ("stuff" strategy)
#[inline]
pub fn build_prompt(question: &str, context: &[String]) -> String {
    format!(
        "Use the following pieces of context to answer the question at the end. \
         If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\n\
         {context}\n\n\
         Question: {question}\n\
         Helpful Answer:",
        context = context.join("\n\n"),
        question = question,
    )
}

/// Readable text for a failed synthesis
#[inline]
pub fn error_message(error: &QaError) -> String {
    match error {
        QaError::SynthesisTimeout(_) => format!(
            "Error: The model is taking too long to respond. Please try again. Details: {}",
            error
        ),
        other => format!("Error generating response: {}", other),
    }
}

#[derive(Clone)]
pub struct AnswerSynthesizer {
    model: Arc<dyn ChatModel>,
}

impl AnswerSynthesizer {
    #[inline]
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// Ask the chat model, keeping timeouts and other failures distinct
    #[inline]
    pub fn synthesize(&self, question: &str, context: &[String]) -> Result<String> {
        let prompt = build_prompt(question, context);
        debug!(
            "Synthesizing answer from {} context chunks (prompt length: {})",
            context.len(),
            prompt.len()
        );

        self.model.complete(&prompt).map_err(|e| match e {
            QaError::SynthesisTimeout(_) | QaError::Synthesis(_) => e,
            other => QaError::Synthesis(other.to_string()),
        })
    }

    /// Like [`Self::synthesize`], but a failure becomes the returned text
    #[inline]
    pub fn answer(&self, question: &str, context: &[String]) -> String {
        match self.synthesize(question, context) {
            Ok(answer) => answer,
            Err(e) => {
                error!("Answer synthesis failed: {}", e);
                error_message(&e)
            }
        }
    }
}
