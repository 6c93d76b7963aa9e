use metrics::counter;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use std::str::FromStr;
use tracing::{error, info, instrument, warn};

use crate::error::{EtlError, Result};
use crate::table::{Cell, Table};

/// What to do when the destination table already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Drop and recreate the table
    #[default]
    Replace,
    /// Insert after the existing rows, creating the table if needed
    Append,
    /// Refuse to write into an existing table
    Fail,
}

impl FromStr for WriteMode {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replace" => Ok(WriteMode::Replace),
            "append" => Ok(WriteMode::Append),
            "fail" => Ok(WriteMode::Fail),
            other => Err(EtlError::Config(format!("Unknown write mode: {other}"))),
        }
    }
}

/// Result of a best-effort table load
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Written { rows: usize },
    /// The table had no rows; nothing was written
    Skipped,
    Failed(String),
}

impl LoadOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, LoadOutcome::Written { .. })
    }
}

/// Write a table into a SQLite database.
///
/// Never fails: an empty table is skipped with a warning and any database
/// error is logged and reported through the returned outcome. Callers must
/// not assume the data was persisted.
#[instrument(skip(table), fields(rows = table.len()))]
pub fn write_table(
    table: &Table,
    connection_target: &str,
    table_name: &str,
    mode: WriteMode,
) -> LoadOutcome {
    if table.is_empty() {
        warn!("Empty table received for '{}'; nothing to load", table_name);
        return LoadOutcome::Skipped;
    }

    info!("💾 Loading {} rows into table '{}'", table.len(), table_name);
    let result = open_connection(connection_target).and_then(|mut conn| {
        let inserted = insert_table(&mut conn, table, table_name, mode);
        drop(conn);
        info!("Database connection released");
        inserted
    });

    match result {
        Ok(rows) => {
            info!("✅ Inserted {} rows into table '{}'", rows, table_name);
            counter!("etl_tables_written_total", "table" => table_name.to_string()).increment(1);
            LoadOutcome::Written { rows }
        }
        Err(e) => {
            error!("Failed to load table '{}': {}", table_name, e);
            counter!("etl_table_load_failures_total", "table" => table_name.to_string()).increment(1);
            LoadOutcome::Failed(e.to_string())
        }
    }
}

/// Open the database named by a `sqlite:///path` URL or a plain file path.
/// `sqlite://`, `sqlite://:memory:` and `:memory:` open an in-memory database.
pub fn open_connection(connection_target: &str) -> Result<Connection> {
    let path = if let Some(path) = connection_target.strip_prefix("sqlite:///") {
        path
    } else if let Some(rest) = connection_target.strip_prefix("sqlite://") {
        match rest {
            "" | ":memory:" => ":memory:",
            _ => {
                return Err(EtlError::Config(format!(
                    "Unsupported SQLite URL: {connection_target}"
                )));
            }
        }
    } else if connection_target.contains("://") {
        return Err(EtlError::Config(format!(
            "Only SQLite targets are supported: {connection_target}"
        )));
    } else {
        connection_target
    };

    let conn = if path == ":memory:" {
        Connection::open_in_memory()?
    } else {
        Connection::open(path)?
    };
    Ok(conn)
}

fn insert_table(conn: &mut Connection, table: &Table, table_name: &str, mode: WriteMode) -> Result<usize> {
    let tx = conn.transaction()?;
    let exists: bool = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
        params![table_name],
        |row| row.get(0),
    )?;

    let name = quote_ident(table_name);
    match mode {
        WriteMode::Fail if exists => {
            return Err(EtlError::Persistence(format!(
                "table '{table_name}' already exists"
            )));
        }
        WriteMode::Replace => {
            tx.execute(&format!("DROP TABLE IF EXISTS {name}"), [])?;
        }
        _ => {}
    }

    let column_defs: Vec<String> = table
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| format!("{} {}", quote_ident(column), sql_type(table, idx)))
        .collect();
    tx.execute(
        &format!("CREATE TABLE IF NOT EXISTS {name} ({})", column_defs.join(", ")),
        [],
    )?;

    {
        let column_list: Vec<String> = table.columns().iter().map(|c| quote_ident(c)).collect();
        let placeholders: Vec<String> = (1..=table.width()).map(|i| format!("?{i}")).collect();
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {name} ({}) VALUES ({})",
            column_list.join(", "),
            placeholders.join(", ")
        ))?;
        for row in table.rows() {
            stmt.execute(params_from_iter(row.iter().map(sql_value)))?;
        }
    }

    tx.commit()?;
    Ok(table.len())
}

/// Column affinity from the present cells of a column
fn sql_type(table: &Table, idx: usize) -> &'static str {
    let mut integer = true;
    let mut numeric = true;
    let mut any = false;
    for cell in table.column_cells(idx) {
        match cell {
            Cell::Missing => continue,
            Cell::Integer(_) => {}
            Cell::Number(_) => integer = false,
            Cell::Text(_) | Cell::Date(_) => {
                integer = false;
                numeric = false;
            }
        }
        any = true;
    }
    match (any, integer, numeric) {
        (false, _, _) => "TEXT",
        (true, true, _) => "INTEGER",
        (true, false, true) => "REAL",
        _ => "TEXT",
    }
}

fn sql_value(cell: &Cell) -> Value {
    match cell {
        Cell::Missing => Value::Null,
        Cell::Number(n) => Value::Real(*n),
        Cell::Integer(i) => Value::Integer(*i),
        Cell::Text(s) => Value::Text(s.clone()),
        Cell::Date(d) => Value::Text(d.format("%Y-%m-%d").to_string()),
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
