#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use insight_loom::chunker::{ChunkerConfig, SourceDocument, StaticDocumentSource};
use insight_loom::gateway::{ChatGateway, NoopUsageSink, ProviderGateway, StderrUsageSink};
use insight_loom::pipeline::{run_pipeline, PipelineConfig};
use insight_loom::report::DirOutputSink;
use insight_loom::status::NoopStatusSink;

#[derive(Parser)]
#[command(name = "loom", version, about = "Research transcript synthesis CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize transcripts into themed insights and reports
    Run {
        /// Transcript files (.txt/.md) or directories of them
        #[arg(long, value_delimiter = ',', required = true)]
        input: Vec<PathBuf>,

        /// Output directory for the three reports
        #[arg(long, default_value = "outputs")]
        out: PathBuf,

        /// OpenRouter model ID for per-chunk insight extraction
        #[arg(long, default_value = "openai/gpt-4o-mini")]
        extraction_model: String,

        /// OpenRouter model ID for theme and key-insight synthesis
        #[arg(long, default_value = "openai/gpt-4o-mini")]
        synthesis_model: String,

        /// Chunk window size in characters
        #[arg(long, default_value_t = 1000)]
        chunk_size: usize,

        /// Overlap between adjacent chunks in characters
        #[arg(long, default_value_t = 200)]
        chunk_overlap: usize,

        /// Concurrent extraction calls
        #[arg(long, default_value_t = 4)]
        parallel: usize,

        /// Log per-call usage records to stderr as JSON lines
        #[arg(long)]
        usage_log: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            input,
            out,
            extraction_model,
            synthesis_model,
            chunk_size,
            chunk_overlap,
            parallel,
            usage_log,
        } => {
            let documents = load_documents(&input)?;
            if documents.is_empty() {
                return Err("no readable transcript files under the given inputs".into());
            }
            eprintln!("[loom] loaded {} document(s)", documents.len());

            let gateway: Box<dyn ChatGateway> = if usage_log {
                Box::new(ProviderGateway::from_env(Arc::new(StderrUsageSink))?)
            } else {
                Box::new(ProviderGateway::from_env(Arc::new(NoopUsageSink))?)
            };

            let mut config = PipelineConfig {
                chunker: ChunkerConfig::new(chunk_size, chunk_overlap)?,
                ..PipelineConfig::default()
            };
            config.extractor.model = extraction_model;
            config.extractor.concurrency = parallel;
            config.themes.model = synthesis_model.clone();
            config.synthesis.model = synthesis_model;

            let source = StaticDocumentSource { documents };
            let output = DirOutputSink::new(&out);

            let summary =
                run_pipeline(gateway.as_ref(), &source, &NoopStatusSink, &output, &config).await?;

            eprintln!(
                "[loom] session {}: {} insights, {} themes, {} key insight cards",
                summary.session_id,
                summary.insights.len(),
                summary.themes.len(),
                summary.key_insights.len(),
            );
            let mut locations: Vec<&String> = summary.outputs.values().collect();
            locations.sort();
            for location in locations {
                println!("{location}");
            }
        }
    }

    Ok(())
}

/// Collect transcript documents from files and (one level of) directories.
fn load_documents(inputs: &[PathBuf]) -> Result<Vec<SourceDocument>, Box<dyn std::error::Error>> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            for entry in std::fs::read_dir(input)? {
                let path = entry?.path();
                if path.is_file() && has_text_extension(&path) {
                    paths.push(path);
                }
            }
        } else {
            paths.push(input.clone());
        }
    }
    paths.sort();

    let mut documents = Vec::new();
    for path in paths {
        let text = std::fs::read_to_string(&path)?;
        let source_id = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        documents.push(SourceDocument { source_id, text });
    }
    Ok(documents)
}

fn has_text_extension(path: &std::path::Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("txt") | Some("md")
    )
}
