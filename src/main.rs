use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::{info, warn};
use uuid::Uuid;

use greenlight::analysis::brands::{BrandDetector, DisabledBrandDetector, LlmBrandDetector};
use greenlight::analysis::keywords::KeywordScreener;
use greenlight::analysis::media::{DisabledMediaAnalyzer, HttpMediaAnalyzer, MediaAnalyzer};
use greenlight::analysis::prescreen::{DisabledPreScreener, HttpPreScreener, VisionPreScreener};
use greenlight::analysis::rate_limit::AnalysisPools;
use greenlight::config::Config;
use greenlight::db::models::{Batch, BatchStatus, Creator, CreatorStatus};
use greenlight::db::Database;
use greenlight::events::EventBus;
use greenlight::pipeline::PipelineCtx;
use greenlight::platforms::AdapterSet;
use greenlight::search::{DisabledSearchProvider, HttpSearchProvider, SearchProvider};

/// Greenlight: brand-safety vetting for content creators.
///
/// Fetches creators' public posts, runs them through tiered content-risk
/// analysis, and produces a per-creator risk report for a whole batch.
#[derive(Parser)]
#[command(name = "greenlight", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Create a batch of creators from a JSON-lines file
    CreateBatch {
        /// Batch name
        #[arg(long)]
        name: String,

        /// Path to a JSON-lines file: {"name": "...", "links": ["..."]} per line
        #[arg(long)]
        file: String,

        /// Optional search terms stored with the batch
        #[arg(long)]
        search_terms: Option<String>,
    },

    /// Run the vetting pipeline over a batch
    RunBatch {
        /// Batch id (printed by create-batch)
        batch_id: String,

        /// Override the creator concurrency limit
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Run only the keyword screener on a piece of text
    Screen {
        /// The caption/transcript text to screen
        text: String,
    },

    /// Show a batch's per-creator reports
    Report {
        batch_id: String,
    },

    /// Show system status (batches, reports, configured tiers)
    Status,

    /// Recovery: relink externally-completed analyses, find stuck creators
    Recover {
        #[command(subcommand)]
        command: RecoverCommands,
    },
}

#[derive(Subcommand)]
enum RecoverCommands {
    /// List unlinked external analyses and stale creators
    List {
        /// Minutes after which a PENDING/PROCESSING creator counts as stuck
        #[arg(long, default_value = "30")]
        stale_minutes: i64,
    },

    /// Merge one external analysis into a creator's report
    Link {
        /// The provider's analysis id
        #[arg(long)]
        analysis_id: String,

        /// The creator to link it to
        #[arg(long)]
        creator_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("greenlight=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            info!("Initializing Greenlight database...");
            let config = Config::load()?;
            let db = greenlight::db::initialize_sqlite(&config.db_path)?;
            let table_count = db.table_count().await?;
            println!("Database initialized at: {}", config.db_path);
            println!("Tables created: {table_count}");
            println!("\nGreenlight is ready. Next step: set up your .env file,");
            println!("then run: greenlight create-batch --name <name> --file creators.jsonl");
        }

        Commands::CreateBatch {
            name,
            file,
            search_terms,
        } => {
            let config = Config::load()?;
            let db = greenlight::db::open_sqlite(&config.db_path)?;

            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {file}"))?;

            let batch = Batch {
                id: Uuid::new_v4().to_string(),
                name: name.clone(),
                status: BatchStatus::Pending,
                search_terms,
                owner: None,
                created_at: String::new(),
                completed_at: None,
            };
            db.create_batch(&batch).await?;

            let mut count = 0;
            for (line_no, line) in raw.lines().enumerate() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let entry: CreatorEntry = serde_json::from_str(line)
                    .with_context(|| format!("Malformed creator on line {}", line_no + 1))?;
                let creator = Creator {
                    id: Uuid::new_v4().to_string(),
                    batch_id: batch.id.clone(),
                    name: entry.name,
                    social_links: entry.links,
                    platform_status: Default::default(),
                    status: CreatorStatus::Pending,
                    error: None,
                    created_at: String::new(),
                    updated_at: String::new(),
                };
                db.insert_creator(&creator).await?;
                count += 1;
            }

            println!("Batch {} created: {count} creators", batch.id.bold());
            println!("Run it with: greenlight run-batch {}", batch.id);
        }

        Commands::RunBatch {
            batch_id,
            concurrency,
        } => {
            let mut config = Config::load()?;
            config.require_scrape()?;
            if let Some(n) = concurrency {
                config.limits.creator_concurrency = n;
            }
            let db = greenlight::db::open_sqlite(&config.db_path)?;

            let bus = Arc::new(EventBus::default());
            let mut events = bus.subscribe();
            let printer = tokio::spawn(async move {
                while let Ok(envelope) = events.recv().await {
                    greenlight::output::terminal::display_event(&envelope);
                }
            });

            let ctx = Arc::new(build_ctx(&config, db, bus)?);
            let metrics = greenlight::pipeline::batch::run_batch(Arc::clone(&ctx), &batch_id).await?;
            drop(ctx);

            // Let the printer drain whatever is still in flight
            let _ = tokio::time::timeout(std::time::Duration::from_secs(1), printer).await;

            println!("\n{}", "Batch complete.".bold());
            println!("  Creators: {}", metrics.total_creators);
            println!("  Completed: {}", metrics.completed_creators);
            println!("  Failed: {}", metrics.failed_creators);
            println!("  Posts analyzed: {}", metrics.total_posts);
            println!("  Duration: {}ms", metrics.duration_ms);
        }

        Commands::Screen { text } => {
            let screener = KeywordScreener::new();
            let result = screener.screen(&text);
            greenlight::output::terminal::display_screen_result(&text, &result);
        }

        Commands::Report { batch_id } => {
            let config = Config::load()?;
            let db = greenlight::db::open_sqlite(&config.db_path)?;

            let batch = db
                .get_batch(&batch_id)
                .await?
                .with_context(|| format!("Batch {batch_id} not found"))?;
            let creators = db.get_creators_for_batch(&batch_id).await?;

            println!(
                "{} — {} ({} creators)\n",
                batch.name.bold(),
                batch.status,
                creators.len()
            );

            let mut rows = Vec::new();
            for creator in creators {
                let report = db.get_report_for_creator(&creator.id).await?;
                rows.push((creator, report));
            }
            greenlight::output::terminal::display_batch_reports(&rows);
        }

        Commands::Status => {
            let config = Config::load()?;
            let db = greenlight::db::open_sqlite(&config.db_path)?;
            greenlight::status::show(&db, &config).await?;
        }

        Commands::Recover { command } => {
            let config = Config::load()?;
            let db = greenlight::db::open_sqlite(&config.db_path)?;
            let analyzer = create_media_analyzer(&config)?;

            match command {
                RecoverCommands::List { stale_minutes } => {
                    let unlinked =
                        greenlight::recovery::find_unlinked_analyses(&db, &analyzer).await?;
                    if unlinked.is_empty() {
                        println!("No unlinked external analyses.");
                    } else {
                        println!("{}", "Unlinked external analyses:".bold());
                        for analysis in &unlinked {
                            println!(
                                "  {}  {}",
                                analysis.provider_id,
                                analysis.asset_url.as_deref().unwrap_or("-").dimmed(),
                            );
                        }
                    }

                    let stale =
                        greenlight::recovery::find_stale_creators(&db, stale_minutes).await?;
                    if stale.is_empty() {
                        println!("No stale creators.");
                    } else {
                        println!("{}", "Stale creators:".bold());
                        for creator in &stale {
                            println!(
                                "  {}  {} ({}, last update {})",
                                creator.id,
                                creator.name,
                                creator.status,
                                creator.updated_at,
                            );
                        }
                    }
                }

                RecoverCommands::Link {
                    analysis_id,
                    creator_id,
                } => {
                    let outcome =
                        greenlight::recovery::relink(&db, &analyzer, &analysis_id, &creator_id)
                            .await?;
                    println!("Linked {} -> report {}", analysis_id, outcome.report_id);
                    if outcome.report_created {
                        println!("  Report created");
                    }
                    if outcome.creator_unstuck {
                        println!("  Creator moved to COMPLETED");
                    }
                    println!("  Risk level: {}", outcome.risk_level);
                }
            }
        }
    }

    Ok(())
}

#[derive(serde::Deserialize)]
struct CreatorEntry {
    name: String,
    links: Vec<String>,
}

/// Assemble the pipeline context from configuration. Each unconfigured tier
/// gets its disabled implementation and a warning, never a hard failure.
fn build_ctx(config: &Config, db: Arc<dyn Database>, bus: Arc<EventBus>) -> Result<PipelineCtx> {
    let brands: Arc<dyn BrandDetector> = if config.brand_detection_configured() {
        Arc::new(LlmBrandDetector::new(
            &config.brand_api_url,
            &config.brand_api_key,
            &config.brand_model,
        )?)
    } else {
        warn!("Brand detection unconfigured — tier disabled");
        Arc::new(DisabledBrandDetector)
    };

    let prescreener: Arc<dyn VisionPreScreener> = if config.prescreen_configured() {
        Arc::new(HttpPreScreener::new(
            &config.vision_api_url,
            &config.vision_api_key,
            config.prescreen_confidence_threshold,
        )?)
    } else {
        warn!("Vision pre-screening unconfigured — every asset gates in");
        Arc::new(DisabledPreScreener)
    };

    let media: Arc<dyn MediaAnalyzer> = create_media_analyzer(config)?;

    let search: Arc<dyn SearchProvider> = if config.search_configured() {
        Arc::new(HttpSearchProvider::new(
            &config.search_api_url,
            &config.search_api_key,
        )?)
    } else {
        warn!("Background search unconfigured — skipping search step");
        Arc::new(DisabledSearchProvider)
    };

    Ok(PipelineCtx {
        db,
        adapters: AdapterSet::from_config(config)?,
        screener: KeywordScreener::new(),
        brands,
        prescreener,
        media,
        search,
        pools: AnalysisPools::from_limits(&config.limits),
        bus,
        limits: config.limits.clone(),
        lookback_months: config.lookback_months,
        competitor_brands: config.competitor_brands.clone(),
    })
}

fn create_media_analyzer(config: &Config) -> Result<Arc<dyn MediaAnalyzer>> {
    if config.media_analysis_configured() {
        Ok(Arc::new(HttpMediaAnalyzer::new(
            &config.media_api_url,
            &config.media_api_key,
        )?))
    } else {
        warn!("Media analysis unconfigured — tier disabled");
        Ok(Arc::new(DisabledMediaAnalyzer))
    }
}
