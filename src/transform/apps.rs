use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info, instrument};

use super::size::normalize_size;
use crate::constants::*;
use crate::error::Result;
use crate::table::{median, parse_number, Cell, Table};

/// Date layouts seen in the Last Updated column and in previously cleaned output
const DATE_FORMATS: [&str; 5] = ["%B %d, %Y", "%b %d, %Y", "%Y-%m-%d", "%m/%d/%Y", "%d %B %Y"];
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Clean the app metadata table.
///
/// Steps run in a fixed order because later ones rely on the rows removed by
/// earlier ones:
/// 1. missing Rating filled with the median of the full input column
/// 2. rows without App, Type, Content Rating, Current Ver or Android Ver dropped
/// 3. rows whose Installs is the corrupt "Free" sentinel dropped
/// 4. Installs and 5. Price parsed to numbers, 0 on failure
/// 6. Size converted to megabytes, gaps filled with the median size
/// 7. Last Updated parsed to a date or left missing
/// 8. Genres reduced to the first ';'-separated entry
/// 9. rows whose Category is not a text label dropped
///
/// Only a column missing from the schema is an error.
#[instrument(skip(apps), fields(table = %apps.name(), rows = apps.len()))]
pub fn clean_apps(apps: &Table) -> Result<Table> {
    info!("Starting app table transformation");
    let mut table = apps.clone();

    let app_idx = table.require_column(APP)?;
    let rating_idx = table.require_column(RATING)?;
    let installs_idx = table.require_column(INSTALLS)?;
    let price_idx = table.require_column(PRICE)?;
    let size_idx = table.require_column(SIZE)?;
    let updated_idx = table.require_column(LAST_UPDATED)?;
    let genres_idx = table.require_column(GENRES)?;
    let category_idx = table.require_column(CATEGORY)?;
    let required = APP_REQUIRED_COLUMNS
        .iter()
        .map(|column| table.require_column(column))
        .collect::<Result<Vec<_>>>()?;

    let rating_median = median(table.column_cells(rating_idx).filter_map(Cell::coerce_f64).collect());
    if let Some(fill) = rating_median {
        table.map_column(rating_idx, |cell| fill_missing(cell, fill));
        debug!("Filled missing ratings with median {}", fill);
    }

    let incomplete = table.retain_rows(|row| {
        !row[app_idx].is_missing() && required.iter().all(|&idx| !row[idx].is_missing())
    });
    let corrupt_installs = table.retain_rows(|row| {
        row[installs_idx].as_text() != Some(INSTALLS_CORRUPT_SENTINEL)
    });

    table.map_column(installs_idx, |cell| {
        Cell::Number(parse_count(cell, &['+', ',']).unwrap_or(0.0))
    });
    table.map_column(price_idx, |cell| {
        Cell::Number(parse_count(cell, &['$']).unwrap_or(0.0))
    });

    let mut bad_sizes = 0usize;
    table.map_column(size_idx, |cell| match normalize_size(cell) {
        Ok(Some(megabytes)) => Cell::Number(megabytes),
        Ok(None) => Cell::Missing,
        Err(e) => {
            debug!("Treating size as missing: {}", e);
            bad_sizes += 1;
            Cell::Missing
        }
    });
    let size_median = median(table.column_cells(size_idx).filter_map(Cell::as_f64).collect());
    if let Some(fill) = size_median {
        table.map_column(size_idx, |cell| fill_missing(cell, fill));
    }

    table.map_column(updated_idx, parse_date);
    table.map_column(genres_idx, primary_genre);

    let bad_categories = table.retain_rows(|row| is_category_label(&row[category_idx]));

    info!(
        "App table transformation finished: {} rows kept ({} incomplete, {} corrupt installs, {} bad categories dropped; {} unreadable sizes)",
        table.len(),
        incomplete,
        corrupt_installs,
        bad_categories,
        bad_sizes
    );
    Ok(table)
}

fn fill_missing(cell: &Cell, fill: f64) -> Cell {
    if cell.is_missing() {
        Cell::Number(fill)
    } else {
        cell.clone()
    }
}

/// Parse a count-like cell after stripping decoration characters.
/// Negative values are not valid counts or prices.
fn parse_count(cell: &Cell, strip: &[char]) -> Option<f64> {
    let value = match cell {
        Cell::Text(raw) => parse_number(&raw.replace(strip, "")),
        other => other.as_f64(),
    };
    value.filter(|v| *v >= 0.0)
}

/// Parse Last Updated into a date; unreadable values become missing.
pub fn parse_date(cell: &Cell) -> Cell {
    match cell {
        Cell::Date(d) => Cell::Date(*d),
        Cell::Text(raw) => {
            let raw = raw.trim();
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .or_else(|| {
                    NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT)
                        .ok()
                        .map(|dt| dt.date())
                })
                .map(Cell::Date)
                .unwrap_or(Cell::Missing)
        }
        _ => Cell::Missing,
    }
}

/// First entry of a ';'-delimited genre list. Non-text cells pass through.
pub fn primary_genre(cell: &Cell) -> Cell {
    match cell {
        Cell::Text(genres) => Cell::text(genres.split(';').next().unwrap_or_default()),
        other => other.clone(),
    }
}

/// A category is a label when it is text that does not read as a plain or
/// decimal number once a single '.' is removed (e.g. the shifted "1.9" row).
pub fn is_category_label(cell: &Cell) -> bool {
    match cell {
        Cell::Text(category) => {
            let digits = category.replacen('.', "", 1);
            digits.is_empty() || !digits.chars().all(is_digit)
        }
        _ => false,
    }
}

/// Decimal digits and their superscript/subscript forms. Fractions and
/// numeral letters such as '½' or 'Ⅻ' are not digits.
fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
        || matches!(c, '¹' | '²' | '³' | '⁰' | '⁴'..='⁹' | '₀'..='₉')
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: [&str; 13] = [
        APP,
        CATEGORY,
        RATING,
        "Reviews",
        SIZE,
        INSTALLS,
        TYPE,
        PRICE,
        CONTENT_RATING,
        GENRES,
        LAST_UPDATED,
        CURRENT_VER,
        ANDROID_VER,
    ];

    fn t(s: &str) -> Cell {
        Cell::text(s)
    }

    #[allow(clippy::too_many_arguments)]
    fn app_row(
        app: &str,
        category: &str,
        rating: Cell,
        size: &str,
        installs: &str,
        price: &str,
        genres: &str,
        updated: &str,
    ) -> Vec<Cell> {
        vec![
            t(app),
            t(category),
            rating,
            t("100"),
            t(size),
            t(installs),
            t("Free"),
            t(price),
            t("Everyone"),
            t(genres),
            t(updated),
            t("1.0"),
            t("4.0 and up"),
        ]
    }

    fn sample_apps() -> Table {
        Table::with_rows(
            "apps",
            COLUMNS,
            vec![
                app_row("Alpha", "ART_AND_DESIGN", Cell::Number(4.1), "19M", "10,000+", "0", "Art & Design;Pretend Play", "January 7, 2018"),
                app_row("Beta", "GAME", Cell::Missing, "500k", "1,000,000+", "$4.99", "Action", "not a date"),
                app_row("Gamma", "TOOLS", Cell::Number(3.9), "Varies with device", "50+", "$0.99", "Tools", "2018-08-01"),
                app_row("Delta", "1.9", Cell::Number(19.0), "3.0M", "Free", "Everyone", "Tools", "1.0.19"),
                app_row("Epsilon", "FAMILY", Cell::Number(4.5), "8.5M", "oops", "free", "Casual;Brain Games", "March 3, 2017"),
            ],
        )
    }

    #[test]
    fn test_rating_median_uses_full_input_column() {
        let cleaned = clean_apps(&sample_apps()).unwrap();
        // Median of [4.1, 3.9, 19.0, 4.5] includes the row later dropped
        let beta = cleaned.rows().iter().find(|r| r[0] == t("Beta")).unwrap();
        assert_eq!(beta[2], Cell::Number(4.3));
    }

    #[test]
    fn test_free_installs_row_is_dropped() {
        let cleaned = clean_apps(&sample_apps()).unwrap();
        assert_eq!(cleaned.len(), 4);
        assert!(cleaned.rows().iter().all(|r| r[0] != t("Delta")));
    }

    #[test]
    fn test_installs_and_price_are_numeric() {
        let cleaned = clean_apps(&sample_apps()).unwrap();
        assert_eq!(cleaned.get(0, INSTALLS), Some(&Cell::Number(10_000.0)));
        assert_eq!(cleaned.get(1, INSTALLS), Some(&Cell::Number(1_000_000.0)));
        assert_eq!(cleaned.get(1, PRICE), Some(&Cell::Number(4.99)));
        // Unparseable installs and price fall back to zero
        assert_eq!(cleaned.get(3, INSTALLS), Some(&Cell::Number(0.0)));
        assert_eq!(cleaned.get(3, PRICE), Some(&Cell::Number(0.0)));
    }

    #[test]
    fn test_size_normalized_and_median_filled() {
        let cleaned = clean_apps(&sample_apps()).unwrap();
        assert_eq!(cleaned.get(0, SIZE), Some(&Cell::Number(19.0)));
        assert_eq!(cleaned.get(1, SIZE), Some(&Cell::Number(500.0 / 1024.0)));
        // Median of [19.0, 0.488.., 8.5]
        assert_eq!(cleaned.get(2, SIZE), Some(&Cell::Number(8.5)));
    }

    #[test]
    fn test_dates_and_genres() {
        let cleaned = clean_apps(&sample_apps()).unwrap();
        assert_eq!(
            cleaned.get(0, LAST_UPDATED),
            Some(&Cell::Date(NaiveDate::from_ymd_opt(2018, 1, 7).unwrap()))
        );
        assert_eq!(cleaned.get(1, LAST_UPDATED), Some(&Cell::Missing));
        assert_eq!(cleaned.get(0, GENRES), Some(&t("Art & Design")));
        assert_eq!(cleaned.get(3, GENRES), Some(&t("Casual")));
    }

    #[test]
    fn test_incomplete_rows_are_dropped() {
        let mut rows = vec![app_row("Zeta", "TOOLS", Cell::Number(4.0), "1M", "5+", "0", "Tools", "May 1, 2018")];
        let mut missing_type = app_row("Eta", "TOOLS", Cell::Number(4.0), "1M", "5+", "0", "Tools", "May 1, 2018");
        missing_type[6] = Cell::Missing;
        rows.push(missing_type);
        let mut missing_app = app_row("", "TOOLS", Cell::Number(4.0), "1M", "5+", "0", "Tools", "May 1, 2018");
        missing_app[0] = Cell::Missing;
        rows.push(missing_app);

        let cleaned = clean_apps(&Table::with_rows("apps", COLUMNS, rows)).unwrap();
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned.get(0, APP), Some(&t("Zeta")));
    }

    #[test]
    fn test_cleaned_rows_hold_invariants() {
        let cleaned = clean_apps(&sample_apps()).unwrap();
        for row in 0..cleaned.len() {
            assert!(cleaned.get(row, INSTALLS).and_then(Cell::as_f64).unwrap() >= 0.0);
            assert!(cleaned.get(row, PRICE).and_then(Cell::as_f64).unwrap() >= 0.0);
            assert!(is_category_label(cleaned.get(row, CATEGORY).unwrap()));
        }
    }

    #[test]
    fn test_cleaning_is_idempotent() {
        let once = clean_apps(&sample_apps()).unwrap();
        let twice = clean_apps(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let table = Table::new("apps", [APP, CATEGORY]);
        assert!(clean_apps(&table).is_err());
    }

    #[test]
    fn test_category_label_rules() {
        assert!(is_category_label(&t("GAME")));
        assert!(is_category_label(&t("1.9a")));
        assert!(!is_category_label(&t("1.9")));
        assert!(!is_category_label(&t("42")));
        assert!(is_category_label(&t("1.2.3")));
        assert!(!is_category_label(&Cell::Number(1.9)));
        assert!(!is_category_label(&Cell::Missing));
    }

    #[test]
    fn test_numeric_symbols_are_labels() {
        assert!(is_category_label(&t("½")));
        assert!(is_category_label(&t("Ⅻ")));
        assert!(!is_category_label(&t("²")));
        assert!(!is_category_label(&t("1.²")));
    }

    #[test]
    fn test_accepted_date_layouts() {
        let expected = Cell::Date(NaiveDate::from_ymd_opt(2018, 1, 7).unwrap());
        for raw in [
            "January 7, 2018",
            "Jan 7, 2018",
            "2018-01-07",
            "01/07/2018",
            "7 January 2018",
            "2018-01-07 00:00:00",
            "  2018-01-07  ",
        ] {
            assert_eq!(parse_date(&t(raw)), expected, "{raw}");
        }
        assert_eq!(parse_date(&expected), expected);
        assert_eq!(parse_date(&t("1.0.19")), Cell::Missing);
        assert_eq!(parse_date(&t("2018-13-40")), Cell::Missing);
        assert_eq!(parse_date(&Cell::Number(2018.0)), Cell::Missing);
    }
}
