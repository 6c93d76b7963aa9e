use tracing::{info, instrument};

use crate::constants::*;
use crate::error::Result;
use crate::table::{Cell, Table};

/// Clean the raw review table. Sentiment cannot be imputed, so incomplete
/// rows are removed rather than repaired.
#[instrument(skip(reviews), fields(table = %reviews.name(), rows = reviews.len()))]
pub fn clean_reviews(reviews: &Table) -> Result<Table> {
    info!("Starting review table transformation");
    let mut table = reviews.clone();

    let required = REVIEW_REQUIRED_COLUMNS
        .iter()
        .map(|column| table.require_column(column))
        .collect::<Result<Vec<_>>>()?;
    let polarity_idx = table.require_column(SENTIMENT_POLARITY)?;
    let subjectivity_idx = table.require_column(SENTIMENT_SUBJECTIVITY)?;

    let incomplete = table.retain_rows(|row| required.iter().all(|&idx| !row[idx].is_missing()));

    table.map_column(polarity_idx, coerce_numeric);
    table.map_column(subjectivity_idx, coerce_numeric);

    let unparseable = table.retain_rows(|row| {
        !row[polarity_idx].is_missing() && !row[subjectivity_idx].is_missing()
    });

    info!(
        "Review table transformation finished: {} rows kept ({} incomplete, {} non-numeric dropped)",
        table.len(),
        incomplete,
        unparseable
    );
    Ok(table)
}

fn coerce_numeric(cell: &Cell) -> Cell {
    cell.coerce_f64().map(Cell::Number).unwrap_or(Cell::Missing)
}
