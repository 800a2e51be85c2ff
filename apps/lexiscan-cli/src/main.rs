//! LexiScan command line
//!
//! Reviews contract analyses in the terminal:
//!
//! - `analyze` replays a recorded analyzer response against a document and
//!   prints the annotated text, risk score and findings
//! - `recent` lists recently analyzed documents
//! - `clear-recent` empties that list
//!
//! Recent documents are kept in the data directory, shared between runs.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use review_session::{
    AnalysisViewController, DocumentFile, FileStore, KeyValueStore, LexiscanConfig,
    RecentDocumentsRegistry,
};
use tracing::{debug, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod render;
mod replay;

use replay::ReplayBackend;

/// Command-line arguments for LexiScan
#[derive(Parser, Debug)]
#[command(name = "lexiscan")]
#[command(about = "Review contract risk analyses in the terminal")]
struct Args {
    /// Configuration file (defaults to $LEXISCAN_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for session data (defaults to $LEXISCAN_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the analysis of a document
    Analyze {
        /// Contract to review (.pdf or .txt)
        file: PathBuf,

        /// Recorded analyzer response (JSON)
        #[arg(long)]
        response: PathBuf,

        /// Print the review as JSON
        #[arg(long)]
        json: bool,
    },
    /// List recently analyzed documents
    Recent {
        /// Print the list as JSON
        #[arg(long)]
        json: bool,
    },
    /// Forget recently analyzed documents
    ClearRecent,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr so --json output stays parseable
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = LexiscanConfig::load(args.config.as_deref())?;
    let data_dir = config.data_dir(args.data_dir.as_deref());
    debug!(data_dir = %data_dir.display(), "Using data directory");
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(&data_dir));

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match args.command {
        Command::Analyze {
            file,
            response,
            json,
        } => {
            let document = read_document(&file).await?;
            let name = document.name.clone();
            let mut controller = AnalysisViewController::from_config(
                Arc::new(ReplayBackend::new(response)),
                store,
                &config,
            );
            let view = controller
                .analyze(document)
                .await
                .with_context(|| format!("Analysis of {} failed", name))?;

            if json {
                writeln!(out, "{}", render::view_json(view)?)?;
            } else {
                render::write_view(&mut out, view)?;
            }
        }
        Command::Recent { json } => {
            let registry = RecentDocumentsRegistry::load_with_key(
                store,
                &config.registry.key,
                config.registry.capacity,
            );
            if json {
                let entries: Vec<_> = registry.list().collect();
                writeln!(out, "{}", serde_json::to_string_pretty(&entries)?)?;
            } else {
                render::write_recent(&mut out, registry.list())?;
            }
        }
        Command::ClearRecent => {
            let mut registry = RecentDocumentsRegistry::load_with_key(
                store,
                &config.registry.key,
                config.registry.capacity,
            );
            let count = registry.len();
            registry
                .clear()
                .context("Failed to clear recent documents")?;
            writeln!(out, "Cleared {} recent documents", count)?;
        }
    }

    Ok(())
}

async fn read_document(path: &Path) -> anyhow::Result<DocumentFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read document: {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(DocumentFile::new(name, media_type_for(path), bytes))
}

/// Declared media type, from the file extension
fn media_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase());
    match extension.as_deref() {
        Some("pdf") => review_session::backend::MEDIA_TYPE_PDF,
        Some("txt") | Some("text") => review_session::backend::MEDIA_TYPE_TEXT,
        Some("md") | Some("markdown") => "text/markdown",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}
