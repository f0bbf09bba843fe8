//! CSV serialization of a normalized bar series.

use std::path::Path;

use crate::domain::{Bar, ExportColumn};

use super::{csv_field, ExportError};

/// Write one task's series to `path`: a header row with exactly the selected
/// columns, then one row per bar in fetch order.
pub fn write_csv(path: &Path, columns: &[ExportColumn], bars: &[Bar]) -> Result<(), ExportError> {
    let mut wtr = ::csv::Writer::from_path(path)?;

    wtr.write_record(columns.iter().map(|c| c.header()))?;
    for bar in bars {
        wtr.write_record(columns.iter().map(|c| csv_field(*c, bar)))?;
    }

    wtr.flush().map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}
