use anyhow::Result;
use playstore_etl::config::EtlConfig;
use playstore_etl::load::LoadOutcome;
use playstore_etl::pipeline::Pipeline;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn config_for(output_dir: &Path) -> EtlConfig {
    let mut config = EtlConfig::default();
    config.sources.apps_csv = fixture("googleplaystore.csv");
    config.sources.reviews_csv = fixture("googleplaystore_user_reviews.csv");
    config.output.dir = output_dir.to_path_buf();
    config
}

fn count(conn: &Connection, sql: &str) -> Result<i64> {
    Ok(conn.query_row(sql, [], |row| row.get(0))?)
}

#[test]
fn test_full_pipeline_writes_three_tables() -> Result<()> {
    let temp_dir = tempdir()?;
    let config = config_for(temp_dir.path());

    let summary = Pipeline::run(&config)?;

    assert!(!summary.aborted);
    assert_eq!(summary.raw_apps, 7);
    assert_eq!(summary.clean_apps, 5);
    assert_eq!(summary.raw_reviews, 7);
    assert_eq!(summary.clean_reviews, 6);
    assert_eq!(summary.aggregated_apps, 3);
    assert_eq!(summary.unified_rows, Some(5));
    assert_eq!(
        summary.load_outcome("googleplay_data"),
        Some(&LoadOutcome::Written { rows: 5 })
    );

    let conn = Connection::open(config.database_path())?;
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM googleplaystore_apps_silver")?, 5);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM googleplaystore_user_reviews_silver")?, 3);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM googleplay_data")?, 5);
    assert_eq!(
        count(&conn, "SELECT COUNT(*) FROM googleplay_data WHERE Total_Reviews IS NULL")?,
        3
    );
    assert_eq!(
        count(&conn, "SELECT Total_Reviews FROM googleplay_data WHERE App = 'Coloring book moana'")?,
        3
    );
    assert_eq!(
        count(&conn, "SELECT Positive_Reviews FROM googleplay_data WHERE App = 'Minecraft'")?,
        2
    );

    let (size, price, updated, genres): (f64, f64, String, String) = conn.query_row(
        "SELECT Size, Price, \"Last Updated\", Genres FROM googleplaystore_apps_silver WHERE App = 'Minecraft'",
        [],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
    )?;
    assert_eq!(size, 16.5);
    assert_eq!(price, 6.99);
    assert_eq!(updated, "2018-07-24");
    assert_eq!(genres, "Arcade");

    let rating: f64 = conn.query_row(
        "SELECT Rating FROM googleplaystore_apps_silver WHERE App = 'Pixel Draw - Number Art Coloring Book'",
        [],
        |row| row.get(0),
    )?;
    assert_eq!(rating, 4.5);

    Ok(())
}

#[test]
fn test_rerun_replaces_tables() -> Result<()> {
    let temp_dir = tempdir()?;
    let config = config_for(temp_dir.path());

    Pipeline::run(&config)?;
    Pipeline::run(&config)?;

    let conn = Connection::open(config.database_path())?;
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM googleplaystore_apps_silver")?, 5);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM googleplay_data")?, 5);
    Ok(())
}

#[test]
fn test_missing_input_aborts_before_loading() -> Result<()> {
    let temp_dir = tempdir()?;
    let mut config = config_for(temp_dir.path());
    config.sources.reviews_csv = temp_dir.path().join("missing.csv");

    let summary = Pipeline::run(&config)?;

    assert!(summary.aborted);
    assert!(summary.loads.is_empty());
    assert!(!config.database_path().exists());
    Ok(())
}

#[test]
fn test_bad_write_mode_is_a_config_error() {
    let temp_dir = tempdir().unwrap();
    let mut config = config_for(temp_dir.path());
    config.output.write_mode = "upsert".to_string();

    assert!(Pipeline::run(&config).is_err());
}
