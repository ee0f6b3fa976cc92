use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use lms_search_indexer::commands;
use lms_search_indexer::telemetry::init_tracing;
use lms_search_indexer::{Dependencies, IndexerConfig, IndexingError};
use lms_search_pipeline::ReconciliationMode;

#[derive(Parser)]
#[command(name = "lms-search-indexer")]
#[command(about = "Builds and maintains the LMS search indexes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding entity snapshots and extracted file text
    /// (overrides LMS_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create every index and ingest pipeline that does not exist yet
    CreateIndexes,
    /// Drop every index
    DropIndexes,
    /// Bring the indexes in line with the entity snapshots
    Reconcile {
        /// Re-index everything instead of only what is missing
        #[arg(long, conflicts_with = "incremental")]
        full: bool,
        /// Index what is missing and remove what no longer exists (default)
        #[arg(long)]
        incremental: bool,
    },
    /// Index learning materials (all file-backed ones when no ids are given)
    IndexLearningMaterials {
        ids: Vec<i64>,
        /// Re-index even when already present
        #[arg(long)]
        force: bool,
    },
    /// Index courses (all when no ids are given)
    IndexCourses { ids: Vec<i64> },
    /// Index MeSH descriptors (all when no ids are given)
    IndexMesh { ids: Vec<String> },
    /// Search the curriculum index and print matching courses as JSON
    SearchCurriculum {
        text: String,
        #[arg(long, default_value = "25")]
        size: usize,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = match IndexerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let config = match cli.data_dir.clone() {
        Some(dir) => config.with_data_dir(dir),
        None => config,
    };
    init_tracing(config.log_format);

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(command: Commands, config: &IndexerConfig) -> Result<(), IndexingError> {
    let deps = Dependencies::new(config).await?;

    match command {
        Commands::CreateIndexes => {
            let created = commands::create_indexes(&deps).await?;
            info!(created = ?created, "Indexes ready");
        }
        Commands::DropIndexes => {
            let dropped = commands::drop_indexes(&deps).await?;
            info!(dropped = ?dropped, "Indexes dropped");
        }
        Commands::Reconcile { full, .. } => {
            let mode = if full {
                ReconciliationMode::Full
            } else {
                ReconciliationMode::Incremental
            };
            let report = commands::reconcile(&deps, mode).await?;
            info!(report = ?report, "Reconciliation complete");
        }
        Commands::IndexLearningMaterials { ids, force } => {
            let summary = commands::index_learning_materials(&deps, ids, force).await?;
            info!(summary = ?summary, "Learning materials indexed");
        }
        Commands::IndexCourses { ids } => {
            let summary = commands::index_courses(&deps, ids).await?;
            info!(summary = ?summary, "Courses indexed");
        }
        Commands::IndexMesh { ids } => {
            let summary = commands::index_mesh(&deps, ids).await?;
            info!(summary = ?summary, "MeSH descriptors indexed");
        }
        Commands::SearchCurriculum { text, size } => {
            let hits = commands::search_curriculum(&deps, &text, size).await?;
            let rendered = serde_json::to_string_pretty(&hits)
                .map_err(|e| IndexingError::config(format!("Failed to render results: {}", e)))?;
            println!("{}", rendered);
        }
    }
    Ok(())
}
