//! Export columns and the user's ordered column selection.

use serde::{Deserialize, Serialize};

use super::Bar;

/// One exportable field of a canonical [`Bar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExportColumn {
    Date,
    Open,
    High,
    Low,
    Close,
    Volume,
    Spread,
    RealVolume,
}

impl ExportColumn {
    /// All columns, in canonical order.
    pub const ALL: [ExportColumn; 8] = [
        ExportColumn::Date,
        ExportColumn::Open,
        ExportColumn::High,
        ExportColumn::Low,
        ExportColumn::Close,
        ExportColumn::Volume,
        ExportColumn::Spread,
        ExportColumn::RealVolume,
    ];

    /// Header text used in CSV files and workbook sheets.
    pub fn header(self) -> &'static str {
        match self {
            ExportColumn::Date => "Date",
            ExportColumn::Open => "Open",
            ExportColumn::High => "High",
            ExportColumn::Low => "Low",
            ExportColumn::Close => "Close",
            ExportColumn::Volume => "Volume",
            ExportColumn::Spread => "Spread",
            ExportColumn::RealVolume => "RealVolume",
        }
    }

    /// Case-insensitive lookup by header name.
    pub fn from_name(name: &str) -> Option<ExportColumn> {
        ExportColumn::ALL
            .into_iter()
            .find(|col| col.header().eq_ignore_ascii_case(name.trim()))
    }

    /// The numeric value of this column for a bar, or `None` for `Date`.
    pub fn numeric(self, bar: &Bar) -> Option<f64> {
        match self {
            ExportColumn::Date => None,
            ExportColumn::Open => Some(bar.open),
            ExportColumn::High => Some(bar.high),
            ExportColumn::Low => Some(bar.low),
            ExportColumn::Close => Some(bar.close),
            ExportColumn::Volume => Some(bar.volume as f64),
            ExportColumn::Spread => Some(f64::from(bar.spread)),
            ExportColumn::RealVolume => Some(bar.real_volume as f64),
        }
    }
}

/// An ordered, deduplicated subset of the eight export columns.
///
/// Built from raw user input; names that match no column are dropped, so the
/// selection can legitimately end up empty. Order follows the input, not the
/// canonical column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSelection(Vec<ExportColumn>);

impl ExportSelection {
    /// Parse raw column names, keeping input order, dropping unrecognized
    /// names and duplicates.
    pub fn parse<S: AsRef<str>>(names: &[S]) -> ExportSelection {
        let mut columns = Vec::new();
        for name in names {
            if let Some(col) = ExportColumn::from_name(name.as_ref()) {
                if !columns.contains(&col) {
                    columns.push(col);
                }
            }
        }
        ExportSelection(columns)
    }

    /// The full eight-column selection in canonical order.
    pub fn all() -> ExportSelection {
        ExportSelection(ExportColumn::ALL.to_vec())
    }

    pub fn columns(&self) -> &[ExportColumn] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}
