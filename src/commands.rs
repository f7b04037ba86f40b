use anyhow::{Context, Result};
use console::style;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::{Config, load_api_key};
use crate::embeddings::{CohereClient, Embedder};
use crate::events::TracingSink;
use crate::index::{SearchHit, VectorIndex};
use crate::pipeline::{QaPipeline, UploadOutcome};
use crate::session::Conversation;

/// Load `.env` from the working directory, if there is one
#[inline]
pub fn load_dotenv() {
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            eprintln!("Warning: failed to load .env file: {}", err);
        }
    }
}

/// Build the pipeline with the Cohere client and the on-disk index.
///
/// Fails when the API key is missing; nothing is read from the network here.
#[inline]
pub async fn build_pipeline(config: &Config) -> crate::Result<QaPipeline> {
    let api_key = load_api_key()?;
    let client = Arc::new(CohereClient::new(&config.cohere, api_key)?);
    let index = VectorIndex::open(config).await?;

    info!(
        "Using embed model {} and chat model {}",
        client.embed_model(),
        client.chat_model()
    );

    Ok(QaPipeline::new(
        config,
        Arc::clone(&client) as Arc<dyn Embedder>,
        client,
        index,
        Arc::new(TracingSink),
    ))
}

/// Upload files into the index and print one line per file
#[inline]
pub async fn upload_files(config: &Config, files: &[PathBuf]) -> Result<()> {
    let mut pipeline = build_pipeline(config).await?;
    let outcomes = upload_with_progress(&mut pipeline, files).await;

    check_uploads(&outcomes)
}

/// Fail when any upload in the batch failed, so the process exits non-zero
fn check_uploads(outcomes: &[UploadOutcome]) -> Result<()> {
    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    if failed > 0 {
        warn!("{} of {} uploads failed", failed, outcomes.len());
        anyhow::bail!("{} of {} uploads failed", failed, outcomes.len());
    }

    Ok(())
}

/// Answer a single question and print the answer with its sources
#[inline]
pub async fn ask_question(config: &Config, question: &str, top_k: Option<usize>) -> Result<()> {
    let pipeline = build_pipeline(config).await?;

    let bar = spinner("Thinking...");
    let answer = match top_k {
        Some(k) => pipeline.ask_with_top_k(question, k).await,
        None => pipeline.ask(question).await,
    };
    bar.finish_and_clear();

    println!("{}", answer.text);
    print_sources(&answer.sources);

    Ok(())
}

/// Interactive question-and-answer session
#[inline]
pub async fn run_chat(config: &Config, uploads: &[PathBuf]) -> Result<()> {
    let mut pipeline = build_pipeline(config).await?;
    let mut conversation = Conversation::new();
    let mut last_sources: Vec<SearchHit> = Vec::new();

    if !uploads.is_empty() {
        upload_with_progress(&mut pipeline, uploads).await;
    }

    println!("{}", style("Document QA chat").bold().cyan());
    println!("Ask a question about your documents. Commands: /upload <files..>, /history, /sources, /quit");
    println!();

    loop {
        let line: String = match Input::new()
            .with_prompt("You")
            .allow_empty(true)
            .interact_text()
        {
            Ok(line) => line,
            Err(e) => {
                info!("Input closed: {}", e);
                break;
            }
        };

        match ChatCommand::parse(&line) {
            ChatCommand::Empty => {}
            ChatCommand::Quit => break,
            ChatCommand::History => print_history(&conversation),
            ChatCommand::Sources => print_sources(&last_sources),
            ChatCommand::Upload(files) => {
                if files.is_empty() {
                    println!("Usage: /upload <file> [file...]");
                } else {
                    upload_with_progress(&mut pipeline, &files).await;
                }
            }
            ChatCommand::Unknown(command) => {
                println!("Unknown command: {}", command);
            }
            ChatCommand::Question(question) => {
                let bar = spinner("Thinking...");
                let answer = pipeline.respond(&mut conversation, &question).await;
                bar.finish_and_clear();

                println!("{} {}", style("Assistant:").bold().green(), answer.text);
                println!();
                last_sources = answer.sources;
            }
        }
    }

    println!("Goodbye!");
    Ok(())
}

/// Show what is currently indexed
#[inline]
pub async fn show_status(config: &Config) -> Result<()> {
    let index = VectorIndex::open(config)
        .await
        .context("Failed to open vector index")?;

    let count = index.count().await?;
    let sources = index.sources().await?;

    println!("{}", style("Document QA Status").bold().cyan());
    println!("  Data directory: {}", config.get_base_dir().display());
    println!("  Vector dimension: {}", index.vector_dimension());
    println!("  Indexed chunks: {}", count);
    println!("  Documents: {}", sources.len());

    if sources.is_empty() {
        println!();
        println!("No documents have been uploaded yet.");
        println!("Use 'docqa upload <file>' to add one.");
    } else {
        for source in &sources {
            println!("    📄 {}", source);
        }
    }

    Ok(())
}

/// Remove every chunk of a previously uploaded document
#[inline]
pub async fn remove_document(config: &Config, filename: &str) -> Result<()> {
    let index = VectorIndex::open(config)
        .await
        .context("Failed to open vector index")?;

    let sources = index.sources().await?;
    if !sources.iter().any(|s| s == filename) {
        println!("No indexed document named {}", filename);
        return Ok(());
    }

    index.delete_source(filename).await?;
    println!("✓ Removed {}", filename);

    Ok(())
}

/// A line typed into the chat prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Empty,
    Quit,
    History,
    Sources,
    Upload(Vec<PathBuf>),
    Unknown(String),
    Question(String),
}

impl ChatCommand {
    #[inline]
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }

        let Some(command) = line.strip_prefix('/') else {
            return Self::Question(line.to_string());
        };

        let mut parts = command.split_whitespace();
        match parts.next().unwrap_or_default() {
            "quit" | "exit" | "q" => Self::Quit,
            "history" => Self::History,
            "sources" => Self::Sources,
            "upload" => Self::Upload(parts.map(PathBuf::from).collect()),
            other => Self::Unknown(format!("/{}", other)),
        }
    }
}

async fn upload_with_progress(pipeline: &mut QaPipeline, files: &[PathBuf]) -> Vec<UploadOutcome> {
    let bar = spinner(&format!("Processing {} file(s)...", files.len()));
    let outcomes = pipeline.upload_paths(files).await;
    bar.finish_and_clear();

    for outcome in &outcomes {
        if outcome.is_success() {
            println!("{} {}", style("✓").green(), outcome);
        } else {
            println!("{} {}", style("✗").red(), outcome);
        }
    }

    outcomes
}

fn print_sources(sources: &[SearchHit]) {
    if sources.is_empty() {
        return;
    }

    println!();
    println!("{}", style("Sources:").bold());
    for (i, hit) in sources.iter().enumerate() {
        let preview: String = hit.record.content.chars().take(80).collect();
        println!(
            "  [{}] {} (chunk {}, distance {:.3})",
            i + 1,
            hit.record.source,
            hit.record.chunk_index,
            hit.distance
        );
        println!("      {}", style(preview.replace('\n', " ")).dim());
    }
}

fn print_history(conversation: &Conversation) {
    if conversation.is_empty() {
        println!("No messages yet.");
        return;
    }

    for turn in conversation.all() {
        println!(
            "[{}] {}: {}",
            turn.at.format("%H:%M:%S"),
            turn.role,
            turn.content
        );
    }
}

fn spinner(message: &str) -> ProgressBar {
    if !console::user_attended_stderr() {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new_spinner().with_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_question() {
        assert_eq!(
            ChatCommand::parse("  What is in the report? "),
            ChatCommand::Question("What is in the report?".to_string())
        );
    }

    #[test]
    fn blank_line_is_empty() {
        assert_eq!(ChatCommand::parse("   "), ChatCommand::Empty);
    }

    #[test]
    fn slash_commands() {
        assert_eq!(ChatCommand::parse("/quit"), ChatCommand::Quit);
        assert_eq!(ChatCommand::parse("/exit"), ChatCommand::Quit);
        assert_eq!(ChatCommand::parse("/history"), ChatCommand::History);
        assert_eq!(ChatCommand::parse("/sources"), ChatCommand::Sources);
        assert_eq!(
            ChatCommand::parse("/frobnicate now"),
            ChatCommand::Unknown("/frobnicate".to_string())
        );
    }

    #[test]
    fn upload_takes_paths() {
        assert_eq!(
            ChatCommand::parse("/upload a.pdf notes/b.txt"),
            ChatCommand::Upload(vec![PathBuf::from("a.pdf"), PathBuf::from("notes/b.txt")])
        );
        assert_eq!(ChatCommand::parse("/upload"), ChatCommand::Upload(vec![]));
    }

    #[test]
    fn any_failed_upload_is_an_error() {
        let outcomes = vec![
            UploadOutcome {
                filename: "good.txt".to_string(),
                result: Ok(3),
            },
            UploadOutcome {
                filename: "bad.xlsx".to_string(),
                result: Err(crate::QaError::UnsupportedFormat("xlsx".to_string())),
            },
        ];

        let err = check_uploads(&outcomes).expect_err("a failed upload should fail the command");

        assert_eq!(err.to_string(), "1 of 2 uploads failed");
    }

    #[test]
    fn successful_uploads_are_ok() {
        let outcomes = vec![UploadOutcome {
            filename: "good.txt".to_string(),
            result: Ok(3),
        }];

        assert!(check_uploads(&outcomes).is_ok());
        assert!(check_uploads(&[]).is_ok());
    }
}
