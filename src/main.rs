//! # CoursePilot — course-materials assistant
//!
//! Answers questions about a local library of course documents using
//! semantic retrieval plus a tool-calling language model.
//!
//! Usage:
//!   coursepilot ingest ./docs            # Index a folder of course documents
//!   coursepilot ingest ./docs --rebuild  # Re-index from scratch
//!   coursepilot ask "What is MCP?"       # One-shot question
//!   coursepilot chat                     # Interactive session
//!   coursepilot stats                    # Catalog totals

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use coursepilot_agent::RagSystem;
use coursepilot_core::config::CoursePilotConfig;
use coursepilot_index::SqliteIndex;
use coursepilot_providers::create_provider;

#[derive(Parser)]
#[command(name = "coursepilot", version, about = "📚 CoursePilot — course materials assistant")]
struct Cli {
    /// Config file path (default: ~/.coursepilot/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index a folder of course documents
    Ingest {
        /// Folder containing .txt course documents
        dir: PathBuf,
        /// Clear the index and load everything fresh
        #[arg(long)]
        rebuild: bool,
    },
    /// Ask a single question
    Ask {
        question: String,
    },
    /// Interactive question-answering session
    Chat,
    /// Show catalog totals
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "coursepilot=debug" } else { "coursepilot=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => CoursePilotConfig::load_from(path)?,
        None => CoursePilotConfig::load()?,
    };

    let db_path = config.index.resolved_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let index = Arc::new(SqliteIndex::open(&db_path)?);
    let provider = create_provider(&config)?;
    let rag = RagSystem::new(config, index, provider);

    match cli.command {
        Command::Ingest { dir, rebuild } => {
            let (courses, chunks) = rag.add_course_folder(&dir, rebuild).await?;
            println!("✅ Indexed {courses} course(s), {chunks} chunk(s).");
        }
        Command::Ask { question } => {
            let session = rag.create_session();
            let outcome = rag.answer(&session, &question).await?;
            println!("{}", outcome.answer);
            print_sources(&outcome.sources);
        }
        Command::Chat => {
            let session = rag.create_session();
            println!("📚 CoursePilot — ask about your courses (/clear resets, Ctrl-D exits)\n");
            loop {
                print!("you> ");
                std::io::stdout().flush()?;
                let mut line = String::new();
                if std::io::stdin().read_line(&mut line)? == 0 {
                    break;
                }
                let question = line.trim();
                if question.is_empty() {
                    continue;
                }
                if question == "/clear" {
                    rag.clear_session(&session);
                    println!("(history cleared)");
                    continue;
                }
                match rag.answer(&session, question).await {
                    Ok(outcome) => {
                        println!("\n{}\n", outcome.answer);
                        print_sources(&outcome.sources);
                    }
                    Err(e) => eprintln!("⚠️  {e}"),
                }
            }
        }
        Command::Stats => {
            let analytics = rag.analytics().await?;
            println!("Courses indexed: {}", analytics.total_courses);
            for title in analytics.course_titles {
                println!("  - {title}");
            }
        }
    }

    Ok(())
}

fn print_sources(sources: &[coursepilot_core::types::SourceRecord]) {
    if sources.is_empty() {
        return;
    }
    println!("Sources:");
    for source in sources {
        match &source.link {
            Some(link) => println!("  - {} ({link})", source.label()),
            None => println!("  - {}", source.label()),
        }
    }
}
