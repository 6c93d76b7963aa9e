use std::collections::BTreeMap;
use tracing::{info, instrument};

use crate::constants::*;
use crate::error::Result;
use crate::table::{Cell, Table};

/// Running sentiment statistics for one app
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SentimentTally {
    pub reviews: i64,
    pub scored: usize,
    pub polarity_sum: f64,
    pub subjectivity_sum: f64,
    pub positive: i64,
    pub negative: i64,
    pub neutral: i64,
}

impl SentimentTally {
    fn add(&mut self, review: &Cell, sentiment: &Cell, polarity: f64, subjectivity: f64) {
        if !review.is_missing() {
            self.reviews += 1;
        }
        self.scored += 1;
        self.polarity_sum += polarity;
        self.subjectivity_sum += subjectivity;
        match sentiment.as_text() {
            Some(POSITIVE) => self.positive += 1,
            Some(NEGATIVE) => self.negative += 1,
            Some(NEUTRAL) => self.neutral += 1,
            _ => {}
        }
    }

    fn mean(&self, sum: f64) -> Cell {
        if self.scored == 0 {
            Cell::Missing
        } else {
            Cell::Number(sum / self.scored as f64)
        }
    }
}

/// Collapse cleaned reviews into one row per app.
///
/// Rows are emitted in ascending App order. Apps with no reviews are absent.
#[instrument(skip(reviews), fields(rows = reviews.len()))]
pub fn aggregate_reviews(reviews: &Table) -> Result<Table> {
    info!("Aggregating reviews by app");
    let app_idx = reviews.require_column(APP)?;
    let review_idx = reviews.require_column(TRANSLATED_REVIEW)?;
    let sentiment_idx = reviews.require_column(SENTIMENT)?;
    let polarity_idx = reviews.require_column(SENTIMENT_POLARITY)?;
    let subjectivity_idx = reviews.require_column(SENTIMENT_SUBJECTIVITY)?;

    let mut tallies: BTreeMap<String, SentimentTally> = BTreeMap::new();
    for row in reviews.rows() {
        let Some(app) = row[app_idx].to_key() else {
            continue;
        };
        let (Some(polarity), Some(subjectivity)) =
            (row[polarity_idx].coerce_f64(), row[subjectivity_idx].coerce_f64())
        else {
            continue;
        };
        tallies
            .entry(app)
            .or_default()
            .add(&row[review_idx], &row[sentiment_idx], polarity, subjectivity);
    }

    let mut aggregated = Table::new(
        REVIEWS_TABLE,
        [
            APP,
            AVG_SENTIMENT_POLARITY,
            AVG_SENTIMENT_SUBJECTIVITY,
            TOTAL_REVIEWS,
            POSITIVE_REVIEWS,
            NEGATIVE_REVIEWS,
            NEUTRAL_REVIEWS,
        ],
    );
    for (app, tally) in tallies {
        aggregated.push_row(vec![
            Cell::Text(app),
            tally.mean(tally.polarity_sum),
            tally.mean(tally.subjectivity_sum),
            Cell::Integer(tally.reviews),
            Cell::Integer(tally.positive),
            Cell::Integer(tally.negative),
            Cell::Integer(tally.neutral),
        ]);
    }

    info!("Aggregated reviews into {} apps", aggregated.len());
    Ok(aggregated)
}
