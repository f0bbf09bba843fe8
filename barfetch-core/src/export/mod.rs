//! Export engine: routes completed task series to CSV files or a combined
//! multi-sheet workbook.
//!
//! An [`ExportPlan`] is built once per run. CSV tasks are written as they
//! complete; workbook tasks accumulate in memory and are written in one
//! `finish()` call after a successful, non-cancelled run.

pub mod csv;
pub mod workbook;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Bar, ExportColumn, ExportSelection, Timeframe};

/// Output format for persisted bar series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    /// One CSV file per task.
    #[serde(rename = "csv")]
    Csv,
    /// One xlsx workbook with one sheet per task.
    #[serde(rename = "xlsx")]
    Workbook,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Workbook => "xlsx",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Unknown export format name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown export format '{0}' (expected csv or xlsx)")]
pub struct ParseExportFormatError(pub String);

impl FromStr for ExportFormat {
    type Err = ParseExportFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" | "workbook" => Ok(ExportFormat::Workbook),
            _ => Err(ParseExportFormatError(s.to_string())),
        }
    }
}

/// Errors from the export layer.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("csv encoding error: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("workbook error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),
}

/// What happened to one task's series at the export layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteDisposition {
    /// A per-task file was written at this path.
    Written(PathBuf),
    /// The series was accumulated for the combined workbook.
    Accumulated,
    /// Persistence is disabled for this run (empty output path).
    Disabled,
}

/// Per-run export state: routing policy plus the workbook accumulator.
pub struct ExportPlan {
    format: ExportFormat,
    output: Option<PathBuf>,
    columns: ExportSelection,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    single_task: bool,
    sheets: Vec<(String, Vec<Bar>)>,
}

impl ExportPlan {
    /// Build the plan for one run. An empty `output_path` disables
    /// persistence entirely; `single_task` is true when the run requested
    /// exactly one symbol and one timeframe.
    pub fn new(
        format: ExportFormat,
        output_path: &str,
        columns: ExportSelection,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        single_task: bool,
    ) -> Self {
        let output = if output_path.trim().is_empty() {
            None
        } else {
            Some(PathBuf::from(output_path.trim()))
        };

        Self {
            format,
            output,
            columns,
            start,
            end,
            single_task,
            sheets: Vec::new(),
        }
    }

    /// The effective export columns for this run.
    pub fn columns(&self) -> &[ExportColumn] {
        self.columns.columns()
    }

    /// Persist or accumulate one completed task's series.
    pub fn write_task(
        &mut self,
        symbol: &str,
        timeframe: Timeframe,
        bars: &[Bar],
    ) -> Result<WriteDisposition, ExportError> {
        match self.format {
            ExportFormat::Workbook => {
                let name = workbook::sheet_name(&format!("{symbol}_{timeframe}"));
                // Truncation can collide; the later task silently replaces
                // the earlier sheet.
                if let Some(slot) = self.sheets.iter_mut().find(|(n, _)| *n == name) {
                    slot.1 = bars.to_vec();
                } else {
                    self.sheets.push((name, bars.to_vec()));
                }
                Ok(WriteDisposition::Accumulated)
            }
            ExportFormat::Csv => {
                if self.output.is_none() {
                    return Ok(WriteDisposition::Disabled);
                }
                let path = self.csv_target(symbol, timeframe)?;
                csv::write_csv(&path, self.columns.columns(), bars)?;
                Ok(WriteDisposition::Written(path))
            }
        }
    }

    /// Deferred combined-workbook write. A no-op (returning `None`) for the
    /// CSV format, when persistence is disabled, or when no task produced
    /// exportable data.
    pub fn finish(&mut self) -> Result<Option<PathBuf>, ExportError> {
        let path = match (&self.format, &self.output) {
            (ExportFormat::Workbook, Some(path)) if !self.sheets.is_empty() => path.clone(),
            _ => return Ok(None),
        };
        workbook::write_workbook(&path, self.columns.columns(), &self.sheets)?;
        Ok(Some(path))
    }

    /// Number of sheets accumulated so far.
    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    /// Resolve the target path for one task's CSV file.
    ///
    /// A single-task run whose output path is not an existing directory
    /// writes to that path verbatim. Every other case synthesizes
    /// `{SYMBOL}_{TF}_{start}_to_{end}.csv` under the output directory
    /// (the path itself when it is a directory, its parent otherwise),
    /// creating it if absent.
    fn csv_target(&self, symbol: &str, timeframe: Timeframe) -> Result<PathBuf, ExportError> {
        let output = self.output.as_ref().cloned().unwrap_or_default();

        if self.single_task && !output.is_dir() {
            if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|source| ExportError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            return Ok(output);
        }

        let dir = if output.is_dir() {
            output
        } else {
            match output.parent() {
                Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                _ => PathBuf::from("."),
            }
        };
        std::fs::create_dir_all(&dir).map_err(|source| ExportError::Io {
            path: dir.clone(),
            source,
        })?;

        let filename = format!(
            "{symbol}_{timeframe}_{}_to_{}.{}",
            self.start.format("%Y%m%d"),
            self.end.format("%Y%m%d"),
            self.format.extension()
        );
        Ok(dir.join(filename))
    }
}

/// Render one bar field as a CSV cell. Dates are RFC 3339 with an explicit
/// UTC offset; numbers use the shortest round-trip form.
pub(crate) fn csv_field(column: ExportColumn, bar: &Bar) -> String {
    match column {
        ExportColumn::Date => bar.timestamp.to_rfc3339(),
        ExportColumn::Open => bar.open.to_string(),
        ExportColumn::High => bar.high.to_string(),
        ExportColumn::Low => bar.low.to_string(),
        ExportColumn::Close => bar.close.to_string(),
        ExportColumn::Volume => bar.volume.to_string(),
        ExportColumn::Spread => bar.spread.to_string(),
        ExportColumn::RealVolume => bar.real_volume.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn range() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap(),
        )
    }

    fn sample_bars(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| Bar {
                timestamp: Utc.with_ymd_and_hms(2024, 1, 1, i as u32, 0, 0).unwrap(),
                open: 1.10 + i as f64 * 0.001,
                high: 1.11 + i as f64 * 0.001,
                low: 1.09 + i as f64 * 0.001,
                close: 1.105 + i as f64 * 0.001,
                volume: 100 + i as u64,
                spread: 10,
                real_volume: 1_000 + i as u64,
            })
            .collect()
    }

    #[test]
    fn format_parses_aliases() {
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("XLSX".parse::<ExportFormat>().unwrap(), ExportFormat::Workbook);
        assert_eq!(
            "workbook".parse::<ExportFormat>().unwrap(),
            ExportFormat::Workbook
        );
        assert!("parquet".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn single_task_writes_to_exact_path() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("eurusd_h1.csv");
        let (start, end) = range();
        let mut plan = ExportPlan::new(
            ExportFormat::Csv,
            target.to_str().unwrap(),
            ExportSelection::all(),
            start,
            end,
            true,
        );

        let disposition = plan
            .write_task("EURUSD", Timeframe::H1, &sample_bars(3))
            .unwrap();
        assert_eq!(disposition, WriteDisposition::Written(target.clone()));

        let content = std::fs::read_to_string(&target).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4); // header + 3 rows
        assert_eq!(
            lines[0],
            "Date,Open,High,Low,Close,Volume,Spread,RealVolume"
        );
        assert!(lines[1].starts_with("2024-01-01T00:00:00+00:00,1.1,"));
    }

    #[test]
    fn multi_task_synthesizes_filenames_under_parent() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("exports").join("out.csv");
        let (start, end) = range();
        let mut plan = ExportPlan::new(
            ExportFormat::Csv,
            output.to_str().unwrap(),
            ExportSelection::parse(&["Date", "Close"]),
            start,
            end,
            false,
        );

        let disposition = plan
            .write_task("EURUSD", Timeframe::H1, &sample_bars(2))
            .unwrap();
        let expected = dir
            .path()
            .join("exports")
            .join("EURUSD_H1_20240101_to_20240131.csv");
        assert_eq!(disposition, WriteDisposition::Written(expected.clone()));

        let content = std::fs::read_to_string(&expected).unwrap();
        assert_eq!(content.lines().next().unwrap(), "Date,Close");
    }

    #[test]
    fn directory_output_path_is_used_directly() {
        let dir = tempfile::tempdir().unwrap();
        let (start, end) = range();
        let mut plan = ExportPlan::new(
            ExportFormat::Csv,
            dir.path().to_str().unwrap(),
            ExportSelection::all(),
            start,
            end,
            true,
        );

        // Even a single-task run falls back to a synthesized name when the
        // configured path is an existing directory.
        let disposition = plan
            .write_task("XAUUSD", Timeframe::D1, &sample_bars(1))
            .unwrap();
        let expected = dir.path().join("XAUUSD_D1_20240101_to_20240131.csv");
        assert_eq!(disposition, WriteDisposition::Written(expected));
    }

    #[test]
    fn empty_output_path_disables_persistence() {
        let (start, end) = range();
        let mut plan = ExportPlan::new(
            ExportFormat::Csv,
            "  ",
            ExportSelection::all(),
            start,
            end,
            false,
        );
        let disposition = plan
            .write_task("EURUSD", Timeframe::H1, &sample_bars(2))
            .unwrap();
        assert_eq!(disposition, WriteDisposition::Disabled);
        assert_eq!(plan.finish().unwrap(), None);
    }

    #[test]
    fn workbook_accumulates_and_flushes_once() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("bars.xlsx");
        let (start, end) = range();
        let mut plan = ExportPlan::new(
            ExportFormat::Workbook,
            target.to_str().unwrap(),
            ExportSelection::all(),
            start,
            end,
            false,
        );

        assert_eq!(
            plan.write_task("EURUSD", Timeframe::H1, &sample_bars(2))
                .unwrap(),
            WriteDisposition::Accumulated
        );
        assert_eq!(
            plan.write_task("XAUUSD", Timeframe::D1, &sample_bars(3))
                .unwrap(),
            WriteDisposition::Accumulated
        );
        assert_eq!(plan.sheet_count(), 2);
        assert!(!target.exists());

        let written = plan.finish().unwrap();
        assert_eq!(written, Some(target.clone()));
        assert!(target.metadata().unwrap().len() > 0);
    }

    #[test]
    fn workbook_sheet_collision_keeps_later_task() {
        let (start, end) = range();
        let mut plan = ExportPlan::new(
            ExportFormat::Workbook,
            "out.xlsx",
            ExportSelection::all(),
            start,
            end,
            false,
        );

        // A 31-character symbol fills the sheet-name limit on its own, so
        // both task keys truncate to the same name.
        let long = "A".repeat(31);
        plan.write_task(&long, Timeframe::M1, &sample_bars(1)).unwrap();
        plan.write_task(&long, Timeframe::M15, &sample_bars(4)).unwrap();

        assert_eq!(plan.sheet_count(), 1);
        assert_eq!(plan.sheets[0].1.len(), 4);
    }

    #[test]
    fn workbook_without_accumulated_sheets_writes_nothing() {
        let (start, end) = range();
        let mut plan = ExportPlan::new(
            ExportFormat::Workbook,
            "never_written.xlsx",
            ExportSelection::all(),
            start,
            end,
            false,
        );
        assert_eq!(plan.finish().unwrap(), None);
        assert!(!std::path::Path::new("never_written.xlsx").exists());
    }
}
