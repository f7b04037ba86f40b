#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input};
use std::path::Path;

use super::{API_KEY_VAR, CohereConfig, Config, ConfigError};
use crate::embeddings::chunking::ChunkingConfig;

#[inline]
pub fn run_interactive_config(base_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 docqa Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(base_dir);

    eprintln!("{}", style("Cohere Configuration").bold().yellow());
    eprintln!(
        "The API key itself is read from the {} environment variable.",
        style(API_KEY_VAR).cyan()
    );
    eprintln!();

    configure_cohere(&mut config.cohere)?;

    eprintln!();
    eprintln!("{}", style("Retrieval Configuration").bold().yellow());
    configure_chunking(&mut config.chunking)?;

    config.retrieval.top_k = Input::new()
        .with_prompt("Chunks retrieved per question")
        .default(config.retrieval.top_k)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if (1..=50).contains(input) {
                Ok(())
            } else {
                Err("Must be between 1 and 50")
            }
        })
        .interact_text()?;

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(base_dir: &Path) -> Result<()> {
    let config = Config::load(base_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Cohere Settings:").bold().yellow());
    eprintln!("  Base URL: {}", style(&config.cohere.base_url).cyan());
    eprintln!("  Embedding Model: {}", style(&config.cohere.embed_model).cyan());
    eprintln!("  Chat Model: {}", style(&config.cohere.chat_model).cyan());
    eprintln!("  Batch Size: {}", style(config.cohere.batch_size).cyan());
    eprintln!(
        "  Embedding Dimension: {}",
        style(config.cohere.embedding_dimension).cyan()
    );
    eprintln!("  Timeout: {}s", style(config.cohere.timeout_secs).cyan());
    eprintln!("  Temperature: {}", style(config.cohere.temperature).cyan());
    match std::env::var(API_KEY_VAR) {
        Ok(key) if !key.trim().is_empty() => {
            eprintln!("  {}: {}", API_KEY_VAR, style("set").green());
        }
        _ => eprintln!("  {}: {}", API_KEY_VAR, style("missing").red()),
    }

    eprintln!();
    eprintln!("{}", style("Retrieval Settings:").bold().yellow());
    eprintln!("  Chunk Size: {}", style(config.chunking.chunk_size).cyan());
    eprintln!("  Chunk Overlap: {}", style(config.chunking.chunk_overlap).cyan());
    eprintln!(
        "  Separators: {}",
        style(format!("{:?}", config.chunking.separators)).cyan()
    );
    eprintln!("  Top K: {}", style(config.retrieval.top_k).cyan());

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );
    eprintln!(
        "Vector index: {}",
        style(config.vector_database_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config(base_dir: &Path) -> Config {
    if base_dir.join("config.toml").exists() {
        match Config::load(base_dir) {
            Ok(config) => {
                eprintln!("{}", style("Found existing configuration.").green());
                return config;
            }
            Err(e) => {
                eprintln!(
                    "{} {}",
                    style("Existing configuration is invalid, using defaults:").yellow(),
                    e
                );
            }
        }
    } else {
        eprintln!(
            "{}",
            style("No existing configuration found. Using defaults.").yellow()
        );
    }

    Config {
        base_dir: base_dir.to_path_buf(),
        ..Config::default()
    }
}

fn configure_cohere(cohere: &mut CohereConfig) -> Result<()> {
    let base_url: String = Input::new()
        .with_prompt("Cohere API base URL")
        .default(cohere.base_url.to_string())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let mut temp_config = cohere.clone();
            temp_config.set_base_url(input)
        })
        .interact_text()?;

    let embed_model: String = Input::new()
        .with_prompt("Embedding model")
        .default(cohere.embed_model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let embedding_dimension: u32 = Input::new()
        .with_prompt("Embedding dimension of that model")
        .default(cohere.embedding_dimension)
        .interact_text()?;

    let chat_model: String = Input::new()
        .with_prompt("Chat model")
        .default(cohere.chat_model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let timeout_secs: u64 = Input::new()
        .with_prompt("Chat request timeout (seconds)")
        .default(cohere.timeout_secs)
        .interact_text()?;

    cohere.set_base_url(&base_url)?;
    cohere.set_embed_model(embed_model)?;
    cohere.set_embedding_dimension(embedding_dimension)?;
    cohere.set_chat_model(chat_model)?;
    cohere.set_timeout_secs(timeout_secs)?;

    Ok(())
}

fn configure_chunking(chunking: &mut ChunkingConfig) -> Result<()> {
    let chunk_size: usize = Input::new()
        .with_prompt("Chunk size (characters)")
        .default(chunking.chunk_size)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if (50..=8192).contains(input) {
                Ok(())
            } else {
                Err("Chunk size must be between 50 and 8192")
            }
        })
        .interact_text()?;

    let chunk_overlap: usize = Input::new()
        .with_prompt("Chunk overlap (characters)")
        .default(chunking.chunk_overlap.min(chunk_size.saturating_sub(1)))
        .validate_with(|input: &usize| -> Result<(), &str> {
            if *input < chunk_size {
                Ok(())
            } else {
                Err("Overlap must be smaller than the chunk size")
            }
        })
        .interact_text()?;

    chunking.chunk_size = chunk_size;
    chunking.chunk_overlap = chunk_overlap;
    Ok(())
}
