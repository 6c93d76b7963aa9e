use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::str::FromStr;
use tracing::{error, info, instrument, warn};

use crate::constants::NA_TOKENS;
use crate::error::{EtlError, Result};
use crate::table::{parse_number, Cell, Table};

/// Text encodings the extractor can decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    Latin1,
}

impl FromStr for Encoding {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "latin-1" | "latin1" | "iso-8859-1" => Ok(Encoding::Latin1),
            other => Err(EtlError::Config(format!("Unsupported encoding: {other}"))),
        }
    }
}

/// How a delimited file is read
#[derive(Debug, Clone)]
pub struct ReadOptions {
    pub delimiter: u8,
    pub encoding: Encoding,
    pub quote_char: u8,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            encoding: Encoding::Utf8,
            quote_char: b'"',
        }
    }
}

/// Read a delimited text file with a header row into a table.
///
/// A column whose every present value is numeric is typed as numbers
/// (integers when all values are whole); every other column stays text.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn read_table(path: impl AsRef<Path>, options: &ReadOptions) -> Result<Table> {
    let path = path.as_ref();
    let shown = path.display().to_string();
    info!("Reading CSV file: {}", shown);

    let bytes = fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => EtlError::MissingInput { path: shown.clone() },
        _ => read_error(&shown, e),
    })?;
    let content = decode(bytes, options.encoding).map_err(|e| read_error(&shown, e))?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .quote(options.quote_char)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| read_error(&shown, e))?
        .iter()
        .map(|h| h.to_string())
        .collect();
    let width = headers.len();

    let mut raw_rows: Vec<Vec<Option<String>>> = Vec::new();
    let mut overlong = 0usize;
    for record in reader.records() {
        let record = record.map_err(|e| read_error(&shown, e))?;
        if record.len() > width {
            overlong += 1;
        }
        let mut row: Vec<Option<String>> = record
            .iter()
            .take(width)
            .map(|field| (!is_na(field)).then(|| field.to_string()))
            .collect();
        row.resize(width, None);
        raw_rows.push(row);
    }
    if overlong > 0 {
        warn!("{} rows in {} had more fields than the header; extras dropped", overlong, shown);
    }

    let kinds: Vec<ColumnKind> = (0..width)
        .map(|col| ColumnKind::infer(raw_rows.iter().filter_map(|row| row[col].as_deref())))
        .collect();

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| shown.clone());
    let mut table = Table::new(&name, headers);
    for row in raw_rows {
        table.push_row(
            row.into_iter()
                .zip(&kinds)
                .map(|(value, kind)| kind.cell(value))
                .collect(),
        );
    }

    info!("Read {} rows and {} columns from {}", table.len(), table.width(), shown);
    Ok(table)
}

/// Read both source files. Any failure is logged and yields `None` so the
/// caller can stop before transforming.
pub fn extract_data(
    apps_path: impl AsRef<Path>,
    reviews_path: impl AsRef<Path>,
    options: &ReadOptions,
) -> Option<(Table, Table)> {
    let read = |path: &Path| match read_table(path, options) {
        Ok(table) => Some(table),
        Err(e @ EtlError::MissingInput { .. }) => {
            error!("Source file not found: {}", e);
            None
        }
        Err(e) => {
            error!("Extraction failed: {}", e);
            None
        }
    };

    let apps = read(apps_path.as_ref())?;
    info!("App metadata extracted");
    let reviews = read(reviews_path.as_ref())?;
    info!("User reviews extracted");
    Some((apps, reviews))
}

fn is_na(field: &str) -> bool {
    NA_TOKENS.contains(&field)
}

fn decode(bytes: Vec<u8>, encoding: Encoding) -> std::result::Result<String, std::string::FromUtf8Error> {
    match encoding {
        Encoding::Utf8 => String::from_utf8(bytes),
        Encoding::Latin1 => Ok(bytes.into_iter().map(char::from).collect()),
    }
}

fn read_error(path: &str, e: impl std::fmt::Display) -> EtlError {
    EtlError::Read {
        path: path.to_string(),
        message: e.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ColumnKind {
    Integer,
    Number,
    Text,
}

impl ColumnKind {
    fn infer<'a>(values: impl Iterator<Item = &'a str>) -> Self {
        let mut kind = ColumnKind::Integer;
        for value in values {
            if kind == ColumnKind::Integer && value.trim().parse::<i64>().is_err() {
                kind = ColumnKind::Number;
            }
            if kind == ColumnKind::Number && parse_number(value).is_none() {
                return ColumnKind::Text;
            }
        }
        kind
    }

    fn cell(self, value: Option<String>) -> Cell {
        let Some(value) = value else {
            return Cell::Missing;
        };
        match self {
            ColumnKind::Integer => value
                .trim()
                .parse()
                .map(Cell::Integer)
                .unwrap_or(Cell::Text(value)),
            ColumnKind::Number => parse_number(&value)
                .map(Cell::Number)
                .unwrap_or(Cell::Text(value)),
            ColumnKind::Text => Cell::Text(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_missing_file_is_missing_input() {
        let err = read_table("/definitely/not/here.csv", &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, EtlError::MissingInput { .. }));
    }

    #[test]
    fn test_columns_are_typed() {
        let file = csv_file("App,Rating,Reviews,Size\nA,4.1,10,19M\nB,nan,3,\"1,000k\"\n");
        let table = read_table(file.path(), &ReadOptions::default()).unwrap();

        assert_eq!(table.columns(), &["App", "Rating", "Reviews", "Size"]);
        assert_eq!(table.get(0, "Rating"), Some(&Cell::Number(4.1)));
        assert_eq!(table.get(1, "Rating"), Some(&Cell::Missing));
        assert_eq!(table.get(1, "Reviews"), Some(&Cell::Integer(3)));
        assert_eq!(table.get(1, "Size"), Some(&Cell::text("1,000k")));
    }

    #[test]
    fn test_short_rows_are_padded() {
        let file = csv_file("a,b,c\n1,2\nx,y,z,extra\n");
        let table = read_table(file.path(), &ReadOptions::default()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0, "c"), Some(&Cell::Missing));
        assert_eq!(table.get(1, "c"), Some(&Cell::text("z")));
    }

    #[test]
    fn test_custom_delimiter_and_latin1() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"name;city\nJos\xe9;Lisboa\n").unwrap();
        let options = ReadOptions {
            delimiter: b';',
            encoding: Encoding::Latin1,
            ..ReadOptions::default()
        };
        let table = read_table(file.path(), &options).unwrap();
        assert_eq!(table.get(0, "name"), Some(&Cell::text("José")));
    }

    #[test]
    fn test_invalid_utf8_is_a_read_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"name\n\xff\xfe\n").unwrap();
        let err = read_table(file.path(), &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, EtlError::Read { .. }));
    }

    #[test]
    fn test_extract_data_aborts_when_a_file_is_missing() {
        let file = csv_file("App\nA\n");
        assert!(extract_data(file.path(), "/no/such/reviews.csv", &ReadOptions::default()).is_none());
        assert!(extract_data(file.path(), file.path(), &ReadOptions::default()).is_some());
    }

    #[test]
    fn test_encoding_names() {
        assert_eq!("UTF-8".parse::<Encoding>().unwrap(), Encoding::Utf8);
        assert_eq!("latin-1".parse::<Encoding>().unwrap(), Encoding::Latin1);
        assert!("ebcdic".parse::<Encoding>().is_err());
    }
}
