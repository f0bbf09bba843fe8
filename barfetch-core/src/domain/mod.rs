//! Domain types: bars, timeframes, export columns.

pub mod bar;
pub mod column;
pub mod timeframe;

pub use bar::{Bar, RawBar};
pub use column::{ExportColumn, ExportSelection};
pub use timeframe::{ParseTimeframeError, Timeframe};
