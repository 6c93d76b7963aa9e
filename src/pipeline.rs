use metrics::{counter, histogram};
use std::fs;
use std::time::Instant;
use tracing::{error, info, instrument};

use crate::config::EtlConfig;
use crate::error::Result;
use crate::extract::extract_data;
use crate::load::{write_table, LoadOutcome};
use crate::table::Table;
use crate::transform::{aggregate_reviews, clean_apps, clean_reviews, unify_tables};

/// Tables produced by the transform stage
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub apps: Table,
    pub reviews: Table,
    pub aggregated: Table,
    /// `None` when the tables could not be joined
    pub unified: Option<Table>,
}

/// Result of a complete pipeline run
#[derive(Debug, Default)]
pub struct PipelineSummary {
    /// Extraction failed and nothing downstream ran
    pub aborted: bool,
    pub raw_apps: usize,
    pub raw_reviews: usize,
    pub clean_apps: usize,
    pub clean_reviews: usize,
    pub aggregated_apps: usize,
    pub unified_rows: Option<usize>,
    pub loads: Vec<(String, LoadOutcome)>,
}

impl PipelineSummary {
    pub fn load_outcome(&self, table_name: &str) -> Option<&LoadOutcome> {
        self.loads
            .iter()
            .find(|(name, _)| name == table_name)
            .map(|(_, outcome)| outcome)
    }
}

pub struct Pipeline;

impl Pipeline {
    /// Clean both tables, aggregate the reviews and join them onto the apps
    #[instrument(skip_all)]
    pub fn transform(raw_apps: &Table, raw_reviews: &Table) -> Result<TransformOutput> {
        let started = Instant::now();
        let apps = clean_apps(raw_apps)?;
        let reviews = clean_reviews(raw_reviews)?;
        let aggregated = aggregate_reviews(&reviews)?;
        let unified = unify_tables(&apps, &aggregated);
        histogram!("etl_stage_duration_seconds", "stage" => "transform")
            .record(started.elapsed().as_secs_f64());

        Ok(TransformOutput {
            apps,
            reviews,
            aggregated,
            unified,
        })
    }

    /// Run extract, transform and load against the configured files and database
    #[instrument(skip_all, fields(apps = %config.sources.apps_csv.display(), reviews = %config.sources.reviews_csv.display()))]
    pub fn run(config: &EtlConfig) -> Result<PipelineSummary> {
        info!("🚀 Starting ETL pipeline");
        counter!("etl_pipeline_runs_total").increment(1);
        let t_pipeline = Instant::now();
        let mut summary = PipelineSummary::default();

        // Step 1: Extract
        info!("📥 Step 1: Extracting raw data...");
        let read_options = config.read_options()?;
        let t_extract = Instant::now();
        let Some((raw_apps, raw_reviews)) = extract_data(
            &config.sources.apps_csv,
            &config.sources.reviews_csv,
            &read_options,
        ) else {
            error!("Data extraction failed; stopping the pipeline");
            summary.aborted = true;
            return Ok(summary);
        };
        histogram!("etl_stage_duration_seconds", "stage" => "extract")
            .record(t_extract.elapsed().as_secs_f64());
        summary.raw_apps = raw_apps.len();
        summary.raw_reviews = raw_reviews.len();

        // Step 2: Transform
        info!("🔧 Step 2: Transforming data...");
        let output = Self::transform(&raw_apps, &raw_reviews)?;
        summary.clean_apps = output.apps.len();
        summary.clean_reviews = output.reviews.len();
        summary.aggregated_apps = output.aggregated.len();
        summary.unified_rows = output.unified.as_ref().map(Table::len);
        info!("✅ App and review transformation finished");

        // Step 3: Load
        info!("💾 Step 3: Loading transformed data into the database...");
        fs::create_dir_all(&config.output.dir)?;
        let target = config.connection_target();
        let mode = config.write_mode()?;
        let t_load = Instant::now();

        let apps_table = &config.output.apps_table;
        let outcome = write_table(&output.apps, &target, apps_table, mode);
        summary.loads.push((apps_table.clone(), outcome));

        let reviews_table = &config.output.reviews_table;
        let outcome = write_table(&output.aggregated, &target, reviews_table, mode);
        summary.loads.push((reviews_table.clone(), outcome));

        info!("Loading unified table...");
        match &output.unified {
            Some(unified) => {
                let unified_table = &config.output.unified_table;
                let outcome = write_table(unified, &target, unified_table, mode);
                summary.loads.push((unified_table.clone(), outcome));
            }
            None => {
                error!("Unification failed; the unified table will not be created");
            }
        }
        histogram!("etl_stage_duration_seconds", "stage" => "load")
            .record(t_load.elapsed().as_secs_f64());

        histogram!("etl_pipeline_duration_seconds").record(t_pipeline.elapsed().as_secs_f64());
        info!("🎉 ETL pipeline finished");
        Ok(summary)
    }
}
