use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Input file not found: {path}")]
    MissingInput { path: String },

    #[error("Failed to read '{path}': {message}")]
    Read { path: String, message: String },

    #[error("Parse failure: {0}")]
    Parse(String),

    #[error("Table '{table}' has no '{column}' column")]
    MissingColumn { table: String, column: String },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EtlError {
    pub fn missing_column(table: &str, column: &str) -> Self {
        EtlError::MissingColumn {
            table: table.to_string(),
            column: column.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
