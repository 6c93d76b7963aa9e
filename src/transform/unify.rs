use std::collections::HashMap;
use tracing::{error, info, instrument};

use crate::constants::{APP, UNIFIED_TABLE};
use crate::table::{Cell, Table};

/// Left join of cleaned apps with aggregated reviews on App.
///
/// Returns `None` when either table has no App column. Every app row is kept;
/// apps without a review aggregate get missing review columns. An app row that
/// matches several aggregate rows is repeated once per match.
#[instrument(skip(apps, reviews), fields(apps = apps.len(), reviews = reviews.len()))]
pub fn unify_tables(apps: &Table, reviews: &Table) -> Option<Table> {
    info!("Starting table unification");
    let (Some(left_key), Some(right_key)) = (apps.column_index(APP), reviews.column_index(APP))
    else {
        error!(
            "Column '{}' is missing from '{}' or '{}'; cannot unify",
            APP,
            apps.name(),
            reviews.name()
        );
        return None;
    };

    let right_columns: Vec<usize> = (0..reviews.width()).filter(|&i| i != right_key).collect();
    let mut index: HashMap<String, Vec<usize>> = HashMap::new();
    for (row_idx, row) in reviews.rows().iter().enumerate() {
        if let Some(key) = row[right_key].to_key() {
            index.entry(key).or_default().push(row_idx);
        }
    }

    let mut unified = Table::new(UNIFIED_TABLE, joined_columns(apps, reviews, left_key, &right_columns));
    for row in apps.rows() {
        let key = row[left_key].to_key();
        let mut base = row.clone();
        base[left_key] = key.clone().map(Cell::Text).unwrap_or(Cell::Missing);

        match key.as_ref().and_then(|k| index.get(k)) {
            Some(matches) => {
                for &right_idx in matches {
                    let right = &reviews.rows()[right_idx];
                    let mut joined = base.clone();
                    joined.extend(right_columns.iter().map(|&i| right[i].clone()));
                    unified.push_row(joined);
                }
            }
            None => unified.push_row(base),
        }
    }

    info!(
        "Unified table has {} rows and {} columns",
        unified.len(),
        unified.width()
    );
    Some(unified)
}

/// Left columns followed by the right non-key columns. A name present on both
/// sides gets an `_x` suffix on the left and `_y` on the right.
fn joined_columns(apps: &Table, reviews: &Table, left_key: usize, right_columns: &[usize]) -> Vec<String> {
    let right_names: Vec<&String> = right_columns.iter().map(|&i| &reviews.columns()[i]).collect();
    let clashes = |name: &String| right_names.contains(&name);

    let mut columns: Vec<String> = apps
        .columns()
        .iter()
        .enumerate()
        .map(|(i, name)| {
            if i != left_key && clashes(name) {
                format!("{name}_x")
            } else {
                name.clone()
            }
        })
        .collect();
    let left_names = apps.columns();
    columns.extend(right_names.iter().map(|name| {
        if name.as_str() != APP && left_names.contains(*name) {
            format!("{name}_y")
        } else {
            (*name).clone()
        }
    }));
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{CATEGORY, TOTAL_REVIEWS};

    fn apps(names: &[&str]) -> Table {
        Table::with_rows(
            "apps",
            [APP, CATEGORY],
            names
                .iter()
                .map(|n| vec![Cell::text(*n), Cell::text("TOOLS")])
                .collect(),
        )
    }

    fn aggregates(names: &[&str]) -> Table {
        Table::with_rows(
            "aggregates",
            [APP, TOTAL_REVIEWS],
            names
                .iter()
                .map(|n| vec![Cell::text(*n), Cell::Integer(4)])
                .collect(),
        )
    }

    #[test]
    fn test_left_join_keeps_every_app() {
        let unified = unify_tables(
            &apps(&["a", "b", "c", "d", "e"]),
            &aggregates(&["a", "c", "e"]),
        )
        .unwrap();

        assert_eq!(unified.len(), 5);
        assert_eq!(unified.columns(), &[APP, CATEGORY, TOTAL_REVIEWS]);
        assert_eq!(unified.get(0, TOTAL_REVIEWS), Some(&Cell::Integer(4)));
        assert_eq!(unified.get(1, TOTAL_REVIEWS), Some(&Cell::Missing));
        assert_eq!(unified.get(3, TOTAL_REVIEWS), Some(&Cell::Missing));
        let missing = unified
            .rows()
            .iter()
            .filter(|row| row[2].is_missing())
            .count();
        assert_eq!(missing, 2);
    }

    #[test]
    fn test_missing_app_column_returns_none() {
        let no_key = Table::new("broken", [CATEGORY]);
        assert!(unify_tables(&no_key, &aggregates(&["a"])).is_none());
        assert!(unify_tables(&apps(&["a"]), &no_key).is_none());
    }

    #[test]
    fn test_keys_compared_as_text() {
        let numeric_apps = Table::with_rows("apps", [APP], vec![vec![Cell::Number(1.0)]]);
        let unified = unify_tables(&numeric_apps, &aggregates(&["1.0"])).unwrap();
        assert_eq!(unified.get(0, APP), Some(&Cell::text("1.0")));
        assert_eq!(unified.get(0, TOTAL_REVIEWS), Some(&Cell::Integer(4)));
    }

    #[test]
    fn test_duplicate_aggregates_multiply_rows() {
        let unified = unify_tables(&apps(&["a", "b"]), &aggregates(&["a", "a"])).unwrap();
        assert_eq!(unified.len(), 3);
    }

    #[test]
    fn test_clashing_columns_are_suffixed() {
        let right = Table::with_rows(
            "aggregates",
            [APP, CATEGORY],
            vec![vec![Cell::text("a"), Cell::text("OTHER")]],
        );
        let unified = unify_tables(&apps(&["a"]), &right).unwrap();
        assert_eq!(unified.columns(), &[APP, "Category_x", "Category_y"]);
    }
}
