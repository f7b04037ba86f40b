use clap::{Parser, Subcommand};
use docqa::Result;
use docqa::commands::{
    ask_question, load_dotenv, remove_document, run_chat, show_status, upload_files,
};
use docqa::config::{Config, run_interactive_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docqa")]
#[command(about = "Ask questions about your PDF, DOCX and text documents")]
#[command(version)]
struct Cli {
    /// Directory holding the configuration and the vector index
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the Cohere connection and retrieval settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Extract, chunk, embed and index documents
    Upload {
        /// Files to upload (.pdf, .docx or .txt)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Answer a single question from the indexed documents
    Ask {
        question: String,
        /// Number of chunks to retrieve
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Start an interactive chat session
    Chat {
        /// Files to upload before the session starts
        #[arg(long, num_args = 1..)]
        upload: Vec<PathBuf>,
    },
    /// Show indexed documents
    Status,
    /// Remove an uploaded document from the index
    Remove {
        /// Filename as it was uploaded
        filename: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let base_dir = match cli.base_dir {
        Some(dir) => dir,
        None => Config::default_base_dir()?,
    };

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&base_dir)?;
            } else {
                run_interactive_config(&base_dir)?;
            }
        }
        Commands::Upload { files } => {
            let config = Config::load(&base_dir)?;
            upload_files(&config, &files).await?;
        }
        Commands::Ask { question, top_k } => {
            let config = Config::load(&base_dir)?;
            ask_question(&config, &question, top_k).await?;
        }
        Commands::Chat { upload } => {
            let config = Config::load(&base_dir)?;
            run_chat(&config, &upload).await?;
        }
        Commands::Status => {
            let config = Config::load(&base_dir)?;
            show_status(&config).await?;
        }
        Commands::Remove { filename } => {
            let config = Config::load(&base_dir)?;
            remove_document(&config, &filename).await?;
        }
    }

    Ok(())
}
