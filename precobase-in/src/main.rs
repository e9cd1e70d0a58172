//! precobase-in - Ingest Normalization Service
//!
//! **Module Identity:**
//! - Name: precobase-in (Ingest Normalizer)
//! - Port: 5810
//!
//! Normalizes raw procurement items from the public feeds into the
//! shared taxonomy: classification, unit/price normalization and the
//! human review queue. Also hosts the offline classification benchmark
//! (`precobase-in benchmark`).

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sqlx::SqlitePool;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use precobase_in::classifier::completion::HttpCompletionClient;
use precobase_in::classifier::Classifier;
use precobase_in::pipeline::NormalizationPipeline;
use precobase_in::scheduler::{self, SchedulerConfig};
use precobase_in::{benchmark, config, db, AppState};

/// Command-line arguments for precobase-in
#[derive(Parser, Debug)]
#[command(name = "precobase-in")]
#[command(about = "Procurement item normalization microservice for Precobase")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5810", env = "PRECOBASE_IN_PORT")]
    port: u16,

    /// Data directory holding precobase.db (falls back to
    /// PRECOBASE_DATA_DIR, the TOML config, then the platform default)
    #[arg(short, long)]
    data_dir: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the classification benchmark and write JSON/CSV reports
    Benchmark {
        /// JSON file with benchmark cases (defaults to the built-in set)
        #[arg(long)]
        case_file: Option<PathBuf>,

        /// Directory for benchmark_result.json / benchmark_result.csv
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Run only these case ids (repeatable)
        #[arg(long)]
        case_ids: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // TOML is loaded before tracing so the [logging] section can set the
    // filter; RUST_LOG still wins when present.
    let toml_config = precobase_common::config::load_toml_config("precobase-in");
    let default_filter = toml_config
        .logging
        .level
        .clone()
        .unwrap_or_else(|| "precobase_in=info,precobase_common=info".to_string());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!(
        "Starting Precobase Ingest Normalizer (precobase-in) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let data_dir = precobase_common::config::resolve_data_dir(
        args.data_dir.as_deref(),
        "PRECOBASE_DATA_DIR",
        &toml_config,
    );
    precobase_common::config::ensure_data_dir(&data_dir)
        .context("Failed to initialize data directory")?;

    let db_path = precobase_common::config::database_path(&data_dir);
    info!("Database: {}", db_path.display());

    let pool = db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    let completion_config = config::resolve_completion_config(&pool, &toml_config).await?;
    let completion = Arc::new(
        HttpCompletionClient::new(completion_config)
            .context("Failed to build completion client")?,
    );

    let classifier = Classifier::new(pool.clone(), completion);
    let pipeline = Arc::new(NormalizationPipeline::new(pool.clone(), classifier));

    match args.command {
        Some(Command::Benchmark {
            case_file,
            output_dir,
            case_ids,
        }) => run_benchmark(&pipeline, case_file, &output_dir, case_ids).await,
        None => serve(args.port, pool, pipeline).await,
    }
}

/// Default mode: HTTP API plus the scheduled daily batch.
async fn serve(port: u16, pool: SqlitePool, pipeline: Arc<NormalizationPipeline>) -> Result<()> {
    let scheduler_config = SchedulerConfig::from_database(&pool).await;
    scheduler::spawn(scheduler_config, Arc::clone(&pipeline));

    let state = AppState::new(pool, pipeline);
    let app = precobase_in::build_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("precobase-in listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// `benchmark` subcommand: run the labeled dataset through the live
/// classifier and write the JSON/CSV reports.
async fn run_benchmark(
    pipeline: &NormalizationPipeline,
    case_file: Option<PathBuf>,
    output_dir: &Path,
    case_ids: Vec<String>,
) -> Result<()> {
    let cases = match &case_file {
        Some(path) => benchmark::load_from_file(path)
            .with_context(|| format!("Failed to load cases from {}", path.display()))?,
        None => benchmark::builtin_cases(),
    };

    let filter = if case_ids.is_empty() {
        None
    } else {
        Some(case_ids.as_slice())
    };

    let result = benchmark::run(pipeline.classifier(), pipeline.extractor(), &cases, filter).await;
    let summary = benchmark::summary(&result);

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let json_path = output_dir.join("benchmark_result.json");
    std::fs::write(&json_path, benchmark::export::to_json(&result)?)
        .with_context(|| format!("Failed to write {}", json_path.display()))?;

    let csv_path = output_dir.join("benchmark_result.csv");
    std::fs::write(&csv_path, benchmark::export::to_csv(&result))
        .with_context(|| format!("Failed to write {}", csv_path.display()))?;

    info!("Benchmark reports written to {}", output_dir.display());

    println!("{}", summary.report);

    if !summary.passed {
        anyhow::bail!("Benchmark finished below accuracy targets");
    }
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
