use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};

use playstore_etl::config::EtlConfig;
use playstore_etl::extract::extract_data;
use playstore_etl::load::LoadOutcome;
use playstore_etl::logging;
use playstore_etl::pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "playstore_etl")]
#[command(about = "Google Play apps and reviews ETL into SQLite")]
#[command(version = "0.1.0")]
struct Cli {
    /// TOML config file (defaults to ./etl.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: extract, transform and load
    Run {
        #[command(flatten)]
        paths: PathArgs,
    },
    /// Read both input files and report their shape
    Extract {
        #[command(flatten)]
        paths: PathArgs,
    },
    /// Extract and transform without writing to the database
    Transform {
        #[command(flatten)]
        paths: PathArgs,
    },
}

#[derive(Args)]
struct PathArgs {
    /// App metadata CSV
    #[arg(long)]
    apps: Option<PathBuf>,
    /// User reviews CSV
    #[arg(long)]
    reviews: Option<PathBuf>,
    /// Directory for the SQLite output
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

impl PathArgs {
    fn apply(self, config: &mut EtlConfig) {
        if let Some(apps) = self.apps {
            config.sources.apps_csv = apps;
        }
        if let Some(reviews) = self.reviews {
            config.sources.reviews_csv = reviews;
        }
        if let Some(dir) = self.output_dir {
            config.output.dir = dir;
        }
    }
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut config = EtlConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let (paths, action): (PathArgs, fn(&EtlConfig) -> anyhow::Result<()>) = match cli.command {
        Commands::Run { paths } => (paths, run),
        Commands::Extract { paths } => (paths, extract),
        Commands::Transform { paths } => (paths, transform),
    };
    paths.apply(&mut config);

    let _guard = logging::init_logging(&config.logging.dir, &config.logging.filter);
    action(&config)
}

fn run(config: &EtlConfig) -> anyhow::Result<()> {
    println!("🚀 Running full ETL pipeline...");
    let summary = Pipeline::run(config)?;

    if summary.aborted {
        println!("❌ Extraction failed; nothing was transformed or loaded");
        return Ok(());
    }

    println!("\n📊 Pipeline Results:");
    println!("   Apps: {} raw, {} clean", summary.raw_apps, summary.clean_apps);
    println!("   Reviews: {} raw, {} clean", summary.raw_reviews, summary.clean_reviews);
    println!("   Apps with reviews: {}", summary.aggregated_apps);
    match summary.unified_rows {
        Some(rows) => println!("   Unified rows: {}", rows),
        None => println!("   Unified rows: not produced"),
    }
    for (table, outcome) in &summary.loads {
        match outcome {
            LoadOutcome::Written { rows } => println!("   ✅ {}: {} rows written", table, rows),
            LoadOutcome::Skipped => println!("   ⚠️  {}: empty, skipped", table),
            LoadOutcome::Failed(reason) => println!("   ❌ {}: {}", table, reason),
        }
    }
    println!("   Database: {}", config.database_path().display());
    Ok(())
}

fn extract(config: &EtlConfig) -> anyhow::Result<()> {
    println!("📥 Extracting input files...");
    let options = config.read_options()?;
    match extract_data(&config.sources.apps_csv, &config.sources.reviews_csv, &options) {
        Some((apps, reviews)) => {
            for table in [&apps, &reviews] {
                println!("   {}: {} rows x {} columns", table.name(), table.len(), table.width());
                println!("      columns: {}", table.columns().join(", "));
            }
        }
        None => println!("❌ Extraction failed"),
    }
    Ok(())
}

fn transform(config: &EtlConfig) -> anyhow::Result<()> {
    println!("🔧 Extracting and transforming (no load)...");
    let options = config.read_options()?;
    let Some((raw_apps, raw_reviews)) =
        extract_data(&config.sources.apps_csv, &config.sources.reviews_csv, &options)
    else {
        error!("Extraction failed");
        println!("❌ Extraction failed");
        return Ok(());
    };

    let output = Pipeline::transform(&raw_apps, &raw_reviews)?;
    info!("Transform-only run finished");
    println!("   Apps: {} -> {}", raw_apps.len(), output.apps.len());
    println!("   Reviews: {} -> {}", raw_reviews.len(), output.reviews.len());
    println!("   Apps with reviews: {}", output.aggregated.len());
    match &output.unified {
        Some(unified) => println!("   Unified: {} rows x {} columns", unified.len(), unified.width()),
        None => println!("   Unified: not produced"),
    }
    Ok(())
}
