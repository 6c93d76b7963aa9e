use crate::constants::SIZE_VARIES;
use crate::error::{EtlError, Result};
use crate::table::{parse_number, Cell};

const KILOBYTES_PER_MEGABYTE: f64 = 1024.0;

/// Convert a raw Size cell into megabytes.
///
/// `Ok(None)` is the missing marker ("Varies with device" or an already
/// missing cell). Anything that cannot be read as a size is a parse failure
/// for the caller to handle.
pub fn normalize_size(cell: &Cell) -> Result<Option<f64>> {
    match cell {
        Cell::Text(raw) => normalize_size_text(raw),
        Cell::Number(n) => Ok(Some(*n)),
        Cell::Integer(i) => Ok(Some(*i as f64)),
        Cell::Missing => Ok(None),
        Cell::Date(d) => Err(EtlError::Parse(format!("size cannot be a date: {d}"))),
    }
}

fn normalize_size_text(raw: &str) -> Result<Option<f64>> {
    let size = raw.replace(',', "");

    if size.contains('M') {
        parse_size(&size.replace('M', ""), raw).map(Some)
    } else if size.contains('k') {
        parse_size(&size.replace('k', ""), raw).map(|kb| Some(kb / KILOBYTES_PER_MEGABYTE))
    } else if size.trim() == SIZE_VARIES {
        Ok(None)
    } else {
        parse_size(&size, raw).map(Some)
    }
}

fn parse_size(number: &str, raw: &str) -> Result<f64> {
    parse_number(number).ok_or_else(|| EtlError::Parse(format!("invalid size '{raw}'")))
}
