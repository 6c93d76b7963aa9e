use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constants::*;
use crate::error::{EtlError, Result};
use crate::extract::ReadOptions;
use crate::load::WriteMode;

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "etl.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
    pub sources: SourceConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub apps_csv: PathBuf,
    pub reviews_csv: PathBuf,
    pub delimiter: char,
    pub quote_char: char,
    pub encoding: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            apps_csv: PathBuf::from(DEFAULT_APPS_CSV),
            reviews_csv: PathBuf::from(DEFAULT_REVIEWS_CSV),
            delimiter: ',',
            quote_char: '"',
            encoding: "utf-8".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub database: String,
    pub write_mode: String,
    pub apps_table: String,
    pub reviews_table: String,
    pub unified_table: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            database: SQLITE_FILE_NAME.to_string(),
            write_mode: "replace".to_string(),
            apps_table: APPS_TABLE.to_string(),
            reviews_table: REVIEWS_TABLE.to_string(),
            unified_table: UNIFIED_TABLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
    /// Default `EnvFilter` directive when RUST_LOG is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_LOG_DIR),
            filter: "playstore_etl=info".to_string(),
        }
    }
}

impl EtlConfig {
    /// Load configuration from `path`, or from `etl.toml` when present,
    /// then apply `ETL_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        debug!("Loaded config from {}", path.display());
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EtlConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Override paths from variables such as `ETL_APPS_CSV`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("ETL_APPS_CSV") {
            self.sources.apps_csv = PathBuf::from(v);
        }
        if let Some(v) = lookup("ETL_REVIEWS_CSV") {
            self.sources.reviews_csv = PathBuf::from(v);
        }
        if let Some(v) = lookup("ETL_OUTPUT_DIR") {
            self.output.dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("ETL_LOG_DIR") {
            self.logging.dir = PathBuf::from(v);
        }
    }

    pub fn read_options(&self) -> Result<ReadOptions> {
        Ok(ReadOptions {
            delimiter: single_byte(self.sources.delimiter, "delimiter")?,
            quote_char: single_byte(self.sources.quote_char, "quote_char")?,
            encoding: self.sources.encoding.parse()?,
        })
    }

    pub fn write_mode(&self) -> Result<WriteMode> {
        self.output.write_mode.parse()
    }

    pub fn database_path(&self) -> PathBuf {
        self.output.dir.join(&self.output.database)
    }

    /// SQLite URL of the output database
    pub fn connection_target(&self) -> String {
        format!("sqlite:///{}", self.database_path().display())
    }
}

fn single_byte(c: char, what: &str) -> Result<u8> {
    if c.is_ascii() {
        Ok(c as u8)
    } else {
        Err(EtlError::Config(format!("{what} must be a single ASCII character, got '{c}'")))
    }
}
