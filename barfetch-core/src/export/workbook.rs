//! Combined multi-sheet xlsx workbook output.
//!
//! The xlsx format cannot carry timezone-aware timestamps, so date cells are
//! written timezone-stripped; every other cell is numeric.

use std::path::Path;

use rust_xlsxwriter::Workbook;

use crate::domain::{Bar, ExportColumn};

use super::ExportError;

/// The format's sheet-name length ceiling.
pub const SHEET_NAME_LIMIT: usize = 31;

/// Truncate a task key to a legal sheet name.
pub fn sheet_name(key: &str) -> String {
    key.chars().take(SHEET_NAME_LIMIT).collect()
}

/// Write one workbook with one sheet per accumulated task, then save once.
pub fn write_workbook(
    path: &Path,
    columns: &[ExportColumn],
    sheets: &[(String, Vec<Bar>)],
) -> Result<(), ExportError> {
    let mut workbook = Workbook::new();

    for (name, bars) in sheets {
        let sheet = workbook.add_worksheet();
        sheet.set_name(name)?;

        for (col, column) in columns.iter().enumerate() {
            sheet.write_string(0, col as u16, column.header())?;
        }
        for (row, bar) in bars.iter().enumerate() {
            let row = row as u32 + 1;
            for (col, column) in columns.iter().enumerate() {
                let col = col as u16;
                match column.numeric(bar) {
                    Some(value) => {
                        sheet.write_number(row, col, value)?;
                    }
                    None => {
                        // Date column: naive local-free rendering.
                        let naive = bar.timestamp.naive_utc().format("%Y-%m-%d %H:%M:%S");
                        sheet.write_string(row, col, naive.to_string())?;
                    }
                }
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}
