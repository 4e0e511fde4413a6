use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use bidwright_ai::{DraftOrchestrator, ExtractionPipeline, MatchScorer, ProviderRouter};
use bidwright_core::{
    AiConfig, BackendConfig, BackendFamily, CompanyProfile, ExtractionResult, TaskClass,
    TenderSummary, bid_viability,
};
use bidwright_store::{Retriever, VectorStore};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{Level, info, warn};

mod display;
mod ingest;

#[derive(Parser)]
#[command(name = "bidwright", about = "Tender extraction, scoring and bid drafting", version)]
struct Cli {
    #[command(flatten)]
    backends: BackendArgs,

    /// Retrieval index directory.
    #[arg(long, global = true, env = "BIDWRIGHT_INDEX", default_value = "bidwright_index")]
    index: PathBuf,

    /// Use the LanceDB index backend (needs the `lancedb` feature).
    #[arg(long, global = true)]
    lance: bool,

    /// ONNX sentence-transformers model directory for retrieval embeddings
    /// (needs the `onnx` feature).
    #[arg(long, global = true, env = "BIDWRIGHT_MODEL_DIR")]
    model_dir: Option<PathBuf>,

    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Credentials and role → backend assignment.
#[derive(Args)]
struct BackendArgs {
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_key: Option<String>,
    #[arg(long, global = true, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    anthropic_key: Option<String>,
    #[arg(long, global = true, env = "GOOGLE_API_KEY", hide_env_values = true)]
    google_key: Option<String>,

    /// Force heuristic extraction and scoring even when keys are present.
    #[arg(long, global = true, env = "AI_DEMO_MODE")]
    demo: bool,

    /// Backend for fast structured tasks, as `family` or `family:model`.
    #[arg(long, global = true, env = "BIDWRIGHT_FAST_BACKEND")]
    fast_backend: Option<String>,
    /// Backend for large-context analysis, as `family` or `family:model`.
    #[arg(long, global = true, env = "BIDWRIGHT_LARGE_CONTEXT_BACKEND")]
    large_context_backend: Option<String>,
    /// Backend for drafting prose, as `family` or `family:model`.
    #[arg(long, global = true, env = "BIDWRIGHT_PROSE_BACKEND")]
    prose_backend: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Extract structured data from a tender text file
    Extract {
        file: PathBuf,
        /// Print a human-readable card instead of JSON
        #[arg(long)]
        card: bool,
    },
    /// Generate a bid draft for a tender
    Draft {
        file: PathBuf,
        /// Company profile JSON file
        #[arg(long)]
        profile: Option<PathBuf>,
    },
    /// Add reference documents (.txt / .md) to the retrieval index
    Ingest { path: PathBuf },
    /// Query the retrieval index
    Query {
        text: String,
        #[arg(short, default_value = "2")]
        k: usize,
    },
    /// Score tender/company fit (tender as extraction JSON or raw text)
    Score {
        file: PathBuf,
        #[arg(long)]
        profile: Option<PathBuf>,
        /// Print a one-line summary instead of JSON
        #[arg(long)]
        card: bool,
    },
    /// Heuristic bid viability percentage
    Viability {
        #[arg(long)]
        value: Option<String>,
        #[arg(long, default_value = "medium")]
        complexity: String,
        #[arg(long)]
        competitors: Option<String>,
    },
    /// Show which provider chain serves a task class (all classes if omitted)
    Route { task_class: Option<TaskClass> },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    let config = cli.backends.ai_config()?;
    if !config.any_configured() {
        info!("no AI backend credentials configured, outputs will be degraded");
    }
    let router = Arc::new(ProviderRouter::new(&config));

    match &cli.command {
        Command::Extract { file, card } => {
            let text = read_text(file).await?;
            let result = ExtractionPipeline::new(router).extract(&text).await;
            if *card {
                display::print_extraction_card(&result);
            } else {
                print_json(&result)?;
            }
        }
        Command::Draft { file, profile } => {
            let text = read_text(file).await?;
            let profile = load_profile(profile.as_deref()).await?;
            let draft = draft_orchestrator(&cli, router)
                .await
                .generate_draft(&text, &profile)
                .await;
            print_json(&draft.into_response())?;
        }
        Command::Ingest { path } => {
            let retriever = open_retriever(&cli).await?;
            let stats = ingest::ingest_path(retriever.as_ref(), path).await?;
            eprintln!(
                "Ingested {} document(s), {} chunk(s) in {:.1}s ({} skipped)",
                stats.documents, stats.chunks, stats.elapsed_secs, stats.skipped
            );
        }
        Command::Query { text, k } => {
            let retriever = open_retriever(&cli).await?;
            let hits = retriever.query(text, *k).await.context("querying index")?;
            print_json(&hits)?;
        }
        Command::Score {
            file,
            profile,
            card,
        } => {
            let tender = load_tender(file, &router).await?;
            let profile = load_profile(profile.as_deref()).await?;
            let score = MatchScorer::new(router).score(&tender, &profile).await;
            if *card {
                display::print_score(&score);
            } else {
                print_json(&score)?;
            }
        }
        Command::Viability {
            value,
            complexity,
            competitors,
        } => {
            let score = bid_viability(value.as_deref(), complexity, competitors.as_deref());
            print_json(&serde_json::json!({ "viability": score }))?;
        }
        Command::Route { task_class } => {
            let classes = match task_class {
                Some(c) => vec![*c],
                None => TaskClass::ALL.to_vec(),
            };
            let routes: Vec<_> = classes.into_iter().map(|c| router.describe(c)).collect();
            print_json(&routes)?;
        }
    }

    Ok(())
}

impl BackendArgs {
    fn ai_config(&self) -> anyhow::Result<AiConfig> {
        let defaults = AiConfig::default();
        Ok(AiConfig {
            fast: self.backend(self.fast_backend.as_deref(), defaults.fast)?,
            large_context: self.backend(self.large_context_backend.as_deref(), defaults.large_context)?,
            prose: self.backend(self.prose_backend.as_deref(), defaults.prose)?,
            demo_mode: self.demo,
        })
    }

    /// Apply a `family[:model]` override, then attach that family's key.
    fn backend(&self, spec: Option<&str>, default: BackendConfig) -> anyhow::Result<BackendConfig> {
        let config = match spec {
            None => default,
            Some(spec) => parse_backend(spec)?,
        };
        let key = match config.family {
            BackendFamily::OpenAi => &self.openai_key,
            BackendFamily::Anthropic => &self.anthropic_key,
            BackendFamily::Gemini => &self.google_key,
        };
        Ok(config.with_api_key(key.clone()))
    }
}

fn parse_backend(spec: &str) -> anyhow::Result<BackendConfig> {
    let (family, model) = match spec.split_once(':') {
        Some((f, m)) => (f, Some(m)),
        None => (spec, None),
    };
    let (family, default_model) = match family.trim().to_ascii_lowercase().as_str() {
        "openai" => (BackendFamily::OpenAi, "gpt-4o-mini"),
        "anthropic" | "claude" => (BackendFamily::Anthropic, "claude-3-5-sonnet-latest"),
        "gemini" | "google" => (BackendFamily::Gemini, "gemini-1.5-pro"),
        other => anyhow::bail!("unknown backend family {other:?} (expected openai, anthropic or gemini)"),
    };
    let model = model.map(str::trim).filter(|m| !m.is_empty()).unwrap_or(default_model);
    Ok(BackendConfig::new(family, model))
}

async fn open_retriever(cli: &Cli) -> anyhow::Result<Arc<dyn Retriever>> {
    let embedder = embedder(cli.model_dir.as_deref())?;
    if cli.lance {
        return open_lance(&cli.index, embedder).await;
    }
    let store = VectorStore::open_with(&cli.index, embedder, Default::default())
        .await
        .with_context(|| format!("opening index at {}", cli.index.display()))?;
    Ok(Arc::new(store))
}

/// Drafting treats an unusable index as "no references" rather than failing.
async fn draft_orchestrator(cli: &Cli, router: Arc<ProviderRouter>) -> DraftOrchestrator {
    match open_retriever(cli).await {
        Ok(retriever) => DraftOrchestrator::new(router, retriever),
        Err(e) => {
            warn!(error = %format!("{e:#}"), "retrieval index unavailable, drafting without references");
            DraftOrchestrator::without_retrieval(router)
        }
    }
}

#[cfg(feature = "lancedb")]
async fn open_lance(
    path: &Path,
    embedder: Arc<dyn bidwright_store::Embed>,
) -> anyhow::Result<Arc<dyn Retriever>> {
    let store = bidwright_store::LanceStore::open(path, embedder, Default::default())
        .await
        .with_context(|| format!("opening LanceDB at {}", path.display()))?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "lancedb"))]
async fn open_lance(
    _path: &Path,
    _embedder: Arc<dyn bidwright_store::Embed>,
) -> anyhow::Result<Arc<dyn Retriever>> {
    anyhow::bail!("--lance requires building with the `lancedb` feature")
}

#[cfg(feature = "onnx")]
fn embedder(model_dir: Option<&Path>) -> anyhow::Result<Arc<dyn bidwright_store::Embed>> {
    match model_dir {
        Some(dir) => {
            let model = bidwright_ai::OnnxEmbedder::load(dir)
                .with_context(|| format!("loading embedding model from {}", dir.display()))?;
            Ok(Arc::new(model))
        }
        None => Ok(Arc::new(bidwright_store::HashingEmbedder::default())),
    }
}

#[cfg(not(feature = "onnx"))]
fn embedder(model_dir: Option<&Path>) -> anyhow::Result<Arc<dyn bidwright_store::Embed>> {
    anyhow::ensure!(
        model_dir.is_none(),
        "--model-dir requires building with the `onnx` feature"
    );
    Ok(Arc::new(bidwright_store::HashingEmbedder::default()))
}

async fn read_text(path: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))
}

async fn load_profile(path: Option<&Path>) -> anyhow::Result<CompanyProfile> {
    let Some(path) = path else {
        return Ok(CompanyProfile::default());
    };
    let raw = read_text(path).await?;
    serde_json::from_str(&raw).with_context(|| format!("parsing company profile {}", path.display()))
}

/// An extraction JSON file is used as is; anything else is extracted first.
async fn load_tender(path: &Path, router: &Arc<ProviderRouter>) -> anyhow::Result<TenderSummary> {
    let raw = read_text(path).await?;
    let extraction = match serde_json::from_str::<ExtractionResult>(&raw) {
        Ok(parsed) if !parsed.description.trim().is_empty() => parsed,
        _ => ExtractionPipeline::new(router.clone()).extract(&raw).await,
    };
    Ok(TenderSummary::from(&extraction))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
