//! ORC command line
//!
//! # Usage
//! ```bash
//! orc serve [--port 3001] [--host 0.0.0.0] [--verbose]
//! orc process invoice.pdf [--mime application/pdf]
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use orc_pipeline::{
    DocumentInput, GeminiTransport, ModelGateway, Orchestrator, PromptSet,
};
use orc_server::ServerConfig;

/// ORC - three-agent review pipeline for supply chain documents
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
    },

    /// Run the pipeline over one local document and print the result
    Process {
        /// Path to the document
        file: PathBuf,

        /// MIME type override (guessed from the extension otherwise)
        #[arg(long)]
        mime: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_target(false)
            .init();
    }

    match cli.command {
        Commands::Serve { port, host } => {
            let mut config = ServerConfig::from_env();
            if let Some(port) = port {
                config = config.with_port(port);
            }
            if let Some(host) = host {
                config = config.with_host(host);
            }
            orc_server::serve(config).await
        }
        Commands::Process { file, mime } => process(file, mime).await,
    }
}

async fn process(path: PathBuf, mime: Option<String>) -> anyhow::Result<()> {
    let config = ServerConfig::from_env();
    anyhow::ensure!(
        !config.api_keys.is_empty(),
        "GEMINI_API_KEYS is not set; export at least one key"
    );

    let data = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    let mime_type = mime.unwrap_or_else(|| guess_mime(&path).to_string());

    let gateway = Arc::new(ModelGateway::new(
        config.api_keys,
        Arc::new(GeminiTransport::new()),
    ));
    let orchestrator = Orchestrator::new(gateway, PromptSet::discover());

    let document = DocumentInput {
        filename,
        mime_type,
        data,
    };
    let result = orchestrator.run(&document).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

/// Best-effort MIME type from the file extension
fn guess_mime(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("txt") | Some("log") => "text/plain",
        Some("csv") => "text/csv",
        _ => "application/octet-stream",
    }
}
