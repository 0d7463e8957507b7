// src/main.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use plantcare::analysis::pipeline::AnalysisPipeline;
use plantcare::analysis::types::Report;
use plantcare::config::CONFIG;
use plantcare::index::QdrantPlantIndex;
use plantcare::llm::GeminiClient;
use plantcare::service::{PlantCareService, PlantImage};
use plantcare::store::{FeedbackType, SqliteReportStore};

#[derive(Parser)]
#[command(name = "plantcare")]
#[command(about = "Houseplant health analysis from a photo and peer sensor data")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a plant photo and store the report
    Analyze {
        /// Path to the plant image
        #[arg(short, long)]
        image: PathBuf,

        /// What you noticed about the plant
        #[arg(short, long, default_value = "")]
        description: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List past analyses, newest first
    History,

    /// Print a stored report as JSON
    Show {
        #[arg(index = 1)]
        id: i64,
    },

    /// Record how the plant did after following the advice
    Feedback {
        #[arg(index = 1)]
        id: i64,

        /// improved, no_change or worsened
        #[arg(index = 2)]
        feedback_type: FeedbackType,

        #[arg(short, long)]
        comment: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON output stays clean
    let subscriber = FmtSubscriber::builder()
        .with_max_level(CONFIG.log_level())
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let store = Arc::new(
        SqliteReportStore::connect(&CONFIG.database_url)
            .await
            .context("Failed to open report store")?,
    );

    match cli.command {
        Commands::Analyze {
            image,
            description,
            json,
        } => run_analyze(store, image, description, json).await,
        Commands::History => {
            let service = PlantCareService::records_only(store);
            let entries = service.history().await?;
            if entries.is_empty() {
                println!("No analyses yet.");
            }
            for entry in entries {
                let feedback = entry
                    .feedback
                    .map(|f| format!(" [{}]", f.feedback_type))
                    .unwrap_or_default();
                println!(
                    "#{:<4} {}  {} ({}){}  {}",
                    entry.id,
                    entry.created_at.format("%Y-%m-%d %H:%M"),
                    entry.species,
                    entry.growth_stage,
                    feedback,
                    entry.user_description
                );
            }
            Ok(())
        }
        Commands::Show { id } => {
            let report = PlantCareService::records_only(store).report(id).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::Feedback {
            id,
            feedback_type,
            comment,
        } => {
            PlantCareService::records_only(store)
                .feedback(id, feedback_type, comment)
                .await?;
            println!("Recorded {} for analysis #{}", feedback_type, id);
            Ok(())
        }
    }
}

async fn run_analyze(
    store: Arc<SqliteReportStore>,
    image: PathBuf,
    description: String,
    json: bool,
) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(&image)
        .await
        .with_context(|| format!("Failed to read image {}", image.display()))?;
    let mime_type = mime_guess::from_path(&image)
        .first_or_octet_stream()
        .essence_str()
        .to_string();

    let analysis_config = CONFIG.to_analysis_config()?;
    let gemini = Arc::new(GeminiClient::new(CONFIG.to_gemini_config()?)?);
    let index = Arc::new(QdrantPlantIndex::connect(
        &CONFIG.qdrant_url,
        CONFIG.qdrant_api_key.clone(),
        &CONFIG.qdrant_collection,
        CONFIG.qdrant_vector_name.clone(),
        CONFIG.request_timeout(),
    )?);

    info!("Model: {}", CONFIG.gemini_model);
    info!("Channels: {}", analysis_config.layout.len());

    let pipeline = AnalysisPipeline::new(index, gemini.clone(), analysis_config);
    let service = PlantCareService::new(gemini.clone(), gemini, pipeline, store);

    let plant_image = PlantImage {
        bytes,
        mime_type,
        image_ref: image
            .file_name()
            .map(|name| name.to_string_lossy().into_owned()),
    };
    let outcome = service.analyze(&plant_image, &description).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome.report)?);
    } else {
        print_report(outcome.log_id, &outcome.report);
    }
    Ok(())
}

fn print_report(id: i64, report: &Report) {
    println!("Analysis #{}", id);
    println!(
        "{} ({}), overall score {}",
        report.species, report.growth_stage, report.overall_score
    );
    println!("\n{}\n", report.caption);
    for metric in &report.metric_scores {
        println!(
            "  {:<26} {:>3}  {}",
            metric.channel.label(),
            metric.score,
            metric.status.as_str()
        );
    }
    println!("\n{}", report.analysis);
    if !report.keywords.is_empty() {
        println!("Keywords: {}", report.keywords.join(", "));
    }
    for guide in &report.care_guide {
        println!("\n* {}\n  {}", guide.issue, guide.content);
    }
    if !report.similar_images.is_empty() {
        println!("\nSimilar plants: {}", report.similar_images.join(", "));
    }
}
