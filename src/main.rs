use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing_subscriber::EnvFilter;

mod client;
mod coalesce;
mod config;
mod db;
mod error;
mod heuristic;
mod html;
mod mapper;
mod models;
mod normalize;
mod report;
mod sse;

use client::DiseaseRiskClient;
use coalesce::Coalescer;
use config::ServiceConfig;
use db::BatchRow;
use error::PredictionError;
use models::{
    BreedSize, DietType, DiseasePredictionInput, DiseasePredictionResult, Environment,
    ExerciseLevel, Sex, TickPrevention,
};

#[derive(Parser)]
#[command(name = "vetlink-risk")]
#[command(about = "Multi-disease risk screening for pets", long_about = None)]
struct Cli {
    /// Base URL of the hosted prediction model (defaults to NEXT_PUBLIC_MULTI_DISEASE_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Budget for one submit + result exchange
    #[arg(long, global = true, default_value_t = config::DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Check whether the hosted model is reachable
    Health,
    /// Analyze one pet
    Predict {
        #[command(flatten)]
        input: InputArgs,
        #[arg(long)]
        pet_id: Option<String>,
        /// Use the local heuristic estimator instead of the hosted model
        #[arg(long)]
        offline: bool,
        /// Store the analysis in the database
        #[arg(long)]
        save: bool,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
        /// Write a markdown report
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Analyze every row of a CSV file
    Batch {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value_t = 4)]
        concurrency: usize,
        #[arg(long)]
        offline: bool,
        #[arg(long)]
        save: bool,
    },
    /// List stored analyses
    History {
        #[arg(long)]
        pet_id: Option<String>,
        #[arg(long, default_value_t = 30)]
        since_days: i64,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Generate a markdown history report
    Report {
        #[arg(long)]
        pet_id: Option<String>,
        #[arg(long, default_value_t = 30)]
        since_days: i64,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[derive(Args)]
struct InputArgs {
    #[arg(long)]
    age_years: f64,
    #[arg(long, value_enum, ignore_case = true)]
    breed_size: BreedSize,
    #[arg(long, value_enum, ignore_case = true)]
    sex: Sex,
    #[arg(long)]
    neutered: bool,
    /// Body condition score on the 1-9 scale
    #[arg(long)]
    bcs: u8,
    #[arg(long)]
    pale_gums: bool,
    #[arg(long)]
    skin_lesions: bool,
    #[arg(long)]
    polyuria: bool,
    #[arg(long, value_enum, ignore_case = true)]
    tick_prevention: TickPrevention,
    #[arg(long)]
    heartworm_prevention: bool,
    #[arg(long, value_enum, ignore_case = true)]
    diet: DietType,
    #[arg(long, value_enum, ignore_case = true)]
    exercise: ExerciseLevel,
    #[arg(long, value_enum, ignore_case = true)]
    environment: Environment,
}

impl From<InputArgs> for DiseasePredictionInput {
    fn from(args: InputArgs) -> Self {
        DiseasePredictionInput {
            age_years: args.age_years,
            breed_size: args.breed_size,
            sex: args.sex,
            is_neutered: args.neutered,
            body_condition_score: args.bcs,
            pale_gums: args.pale_gums,
            skin_lesions: args.skin_lesions,
            polyuria: args.polyuria,
            tick_prevention: args.tick_prevention,
            heartworm_prevention: args.heartworm_prevention,
            diet_type: args.diet,
            exercise_level: args.exercise,
            environment: args.environment,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn connect_pool() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

/// Like [`connect_pool`], but only warns when the database is unavailable.
async fn connect_quietly() -> Option<PgPool> {
    match connect_pool().await {
        Ok(pool) => Some(pool),
        Err(err) => {
            tracing::warn!(error = %err, "database unavailable, analyses will not be saved");
            None
        }
    }
}

/// Stores an analysis; a failure here never fails the command.
async fn save_quietly(
    pool: &PgPool,
    pet_id: Option<&str>,
    input: &DiseasePredictionInput,
    result: &DiseasePredictionResult,
) -> Option<uuid::Uuid> {
    match db::save_analysis(pool, pet_id, input, result).await {
        Ok(id) => Some(id),
        Err(err) => {
            tracing::warn!(error = %err, "failed to save analysis, continuing without it");
            None
        }
    }
}

fn print_summary(label: &str, result: &DiseasePredictionResult) {
    println!(
        "{}: {} (highest risk: {}, {} risk factors)",
        label,
        if result.has_risk { "AT RISK" } else { "no positive findings" },
        result
            .highest_risk_disease
            .map(|d| d.as_str())
            .unwrap_or("none"),
        result.pet_profile.risk_factors_count
    );
    for prediction in &result.predictions {
        println!(
            "- {} {:.1}% ({}{})",
            prediction.disease,
            prediction.probability,
            prediction.risk_level,
            if prediction.is_positive { ", positive" } else { "" }
        );
    }
}

type BatchOutcome = (usize, BatchRow, Result<DiseasePredictionResult, PredictionError>);

/// Prints each batch outcome in row order and saves the successful ones when a
/// pool is available. Returns the number of failed rows.
async fn report_batch(outcomes: Vec<BatchOutcome>, pool: Option<&PgPool>) -> usize {
    let mut failed = 0usize;

    for (index, row, outcome) in outcomes {
        let label = row
            .pet_id
            .clone()
            .unwrap_or_else(|| format!("row {}", index + 1));
        match outcome {
            Ok(result) => {
                print_summary(&label, &result);
                if let Some(pool) = pool {
                    save_quietly(pool, row.pet_id.as_deref(), &row.input, &result).await;
                }
            }
            Err(err) => {
                failed += 1;
                println!("{}: failed - {}", label, err);
            }
        }
    }

    failed
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let service = match cli.api_url.as_deref() {
        Some(url) => ServiceConfig::new(url, std::time::Duration::from_secs(cli.timeout_secs)),
        None => ServiceConfig::from_env().with_timeout_secs(cli.timeout_secs),
    };

    match cli.command {
        Commands::InitDb => {
            let pool = connect_pool().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Health => {
            let client = DiseaseRiskClient::new(service)?;
            let health = client.health_check().await;
            println!("{}: {}", client.config().base_url, health.status);
        }
        Commands::Predict {
            input,
            pet_id,
            offline,
            save,
            json,
            out,
        } => {
            let input = DiseasePredictionInput::from(input);
            mapper::validate_input(&input)?;

            let result = if offline {
                heuristic::estimate(&input)
            } else {
                let client = DiseaseRiskClient::new(service)?;
                client.predict(&input).await?
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_summary(pet_id.as_deref().unwrap_or("Analysis"), &result);
                println!("Recommendations:");
                for recommendation in &result.recommendations {
                    println!("- {}", recommendation);
                }
            }

            if save {
                if let Some(pool) = connect_quietly().await {
                    let saved = save_quietly(&pool, pet_id.as_deref(), &input, &result).await;
                    if let Some(id) = saved {
                        println!("Saved analysis {id}.");
                    }
                }
            }

            if let Some(out) = out {
                let report = report::build_report(pet_id.as_deref(), &input, &result);
                std::fs::write(&out, report)
                    .with_context(|| format!("failed to write {}", out.display()))?;
                println!("Report written to {}.", out.display());
            }
        }
        Commands::Batch {
            csv,
            concurrency,
            offline,
            save,
        } => {
            let rows = db::import_csv(&csv)?;
            if rows.is_empty() {
                println!("No rows found in {}.", csv.display());
                return Ok(());
            }

            let client = Arc::new(DiseaseRiskClient::new(service)?);
            let coalescer = Arc::new(Coalescer::new());
            let permits = Arc::new(Semaphore::new(concurrency.max(1)));
            let mut tasks = JoinSet::new();

            for (index, row) in rows.iter().cloned().enumerate() {
                let client = Arc::clone(&client);
                let coalescer = Arc::clone(&coalescer);
                let permits = Arc::clone(&permits);
                tasks.spawn(async move {
                    let _permit = permits.acquire_owned().await;
                    let outcome = if offline {
                        mapper::validate_input(&row.input).map(|_| heuristic::estimate(&row.input))
                    } else {
                        coalescer
                            .run(&row.input, || client.predict(&row.input))
                            .await
                    };
                    (index, row, outcome)
                });
            }

            let mut outcomes = Vec::with_capacity(rows.len());
            while let Some(joined) = tasks.join_next().await {
                outcomes.push(joined.context("batch task panicked")?);
            }
            outcomes.sort_by_key(|(index, _, _)| *index);
            tracing::debug!(in_flight = coalescer.in_flight(), "batch analyses finished");

            let pool = if save { connect_quietly().await } else { None };
            let failed = report_batch(outcomes, pool.as_ref()).await;

            println!(
                "Analyzed {} of {} rows from {}.",
                rows.len() - failed,
                rows.len(),
                csv.display()
            );
        }
        Commands::History {
            pet_id,
            since_days,
            limit,
        } => {
            let pool = connect_pool().await?;
            let since_date = report::cutoff_date(since_days);
            let records = db::fetch_history(&pool, since_date, pet_id.as_deref()).await?;

            if records.is_empty() {
                println!("No analyses found for this window.");
                return Ok(());
            }

            println!("Most recent analyses:");
            for record in records.iter().take(limit) {
                println!("{}", report::history_line(record));
            }
        }
        Commands::Report {
            pet_id,
            since_days,
            out,
        } => {
            let pool = connect_pool().await?;
            let since_date = report::cutoff_date(since_days);
            let records = db::fetch_history(&pool, since_date, pet_id.as_deref()).await?;
            let report = report::build_history_report(pet_id.as_deref(), since_date, &records);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
