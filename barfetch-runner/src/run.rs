//! The run loop: connect, iterate the task matrix, fetch/normalize/export,
//! report, disconnect.
//!
//! A run is a single-use state machine:
//! `Idle -> Connecting -> Running -> {Completed, Stopped, ConnectFailed}`.
//! Terminal states are final; every new run starts fresh. The loop is
//! strictly sequential because the terminal session is single and stateful.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use barfetch_core::domain::{Bar, ExportSelection, Timeframe};
use barfetch_core::export::{ExportFormat, ExportPlan, WriteDisposition};
use barfetch_core::normalize::normalize_series;
use barfetch_core::terminal::Terminal;

use crate::matrix::{build_matrix, Task};
use crate::observer::{LogLevel, RunObserver};
use crate::progress::ProgressTracker;

/// Everything a run needs, supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    /// Requested instrument symbols, any casing.
    pub symbols: Vec<String>,
    /// Requested timeframes.
    pub timeframes: Vec<Timeframe>,
    /// Range start, inclusive.
    pub start: DateTime<Utc>,
    /// Range end, inclusive.
    pub end: DateTime<Utc>,
    /// Output file or directory; empty disables persistence.
    #[serde(default)]
    pub output_path: String,
    pub format: ExportFormat,
    /// Raw export column names; unrecognized names are dropped at run time.
    pub columns: Vec<String>,
}

/// Request validation errors, caught before the run leaves `Idle`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("at least one symbol is required")]
    NoSymbols,
    #[error("at least one timeframe is required")]
    NoTimeframes,
    #[error("start date {start} is after end date {end}")]
    InvertedRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("at least one export column is required")]
    NoColumns,
}

impl RunRequest {
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.symbols.is_empty() {
            return Err(RequestError::NoSymbols);
        }
        if self.timeframes.is_empty() {
            return Err(RequestError::NoTimeframes);
        }
        if self.start > self.end {
            return Err(RequestError::InvertedRange {
                start: self.start,
                end: self.end,
            });
        }
        if self.columns.is_empty() {
            return Err(RequestError::NoColumns);
        }
        Ok(())
    }
}

/// Run lifecycle states. `Completed`, `Stopped`, and `ConnectFailed` are
/// terminal; `Connecting` and `Running` are transient while `execute` runs,
/// and a report carrying `Idle` means the request failed validation and the
/// run never started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Connecting,
    Running,
    Completed,
    Stopped,
    ConnectFailed,
}

/// Outcome of one task. The bar series of a completed task lives in the
/// report's results map under the task key; the outcome carries the count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed { rows: usize },
    SkippedSymbolNotFound,
    SkippedEmptyResult,
    SkippedNoSelectedColumns,
    Failed(String),
}

/// One task annotated with what happened to it. Tasks a cancelled run never
/// reached have no record.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub task: Task,
    pub outcome: TaskOutcome,
}

/// Terminal report of one run.
#[derive(Debug)]
pub struct RunReport {
    pub state: RunState,
    pub outcomes: Vec<TaskRecord>,
    /// Completed bar series keyed `{symbol}_{timeframe}`, for charting.
    pub results: BTreeMap<String, Vec<Bar>>,
    /// Run-level error: connect failure or a failed combined-workbook save.
    pub error: Option<String>,
}

impl RunReport {
    fn empty(state: RunState, error: Option<String>) -> Self {
        Self {
            state,
            outcomes: Vec::new(),
            results: BTreeMap::new(),
            error,
        }
    }

    /// Number of tasks that completed with data.
    pub fn completed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|r| matches!(r.outcome, TaskOutcome::Completed { .. }))
            .count()
    }
}

/// Execute one run against a terminal.
///
/// The cancellation flag is polled at symbol and task boundaries only; an
/// in-flight fetch is never interrupted. The terminal is disconnected exactly
/// once on every exit path. A request that fails validation never leaves
/// `Idle`.
pub fn execute(
    terminal: &dyn Terminal,
    request: &RunRequest,
    observer: &dyn RunObserver,
    cancel: &AtomicBool,
) -> RunReport {
    if let Err(e) = request.validate() {
        observer.on_log(LogLevel::Error, &format!("invalid run request: {e}"));
        return RunReport::empty(RunState::Idle, Some(e.to_string()));
    }

    observer.on_log(
        LogLevel::Info,
        &format!("connecting to terminal ({})...", terminal.name()),
    );
    if let Err(e) = terminal.connect() {
        let message = format!("failed to connect to terminal: {e}");
        observer.on_log(LogLevel::Error, &message);
        terminal.disconnect();
        return RunReport::empty(RunState::ConnectFailed, Some(message));
    }

    let report = run_connected(terminal, request, observer, cancel);
    observer.on_log(LogLevel::Info, "closing terminal session");
    terminal.disconnect();
    report
}

fn run_connected(
    terminal: &dyn Terminal,
    request: &RunRequest,
    observer: &dyn RunObserver,
    cancel: &AtomicBool,
) -> RunReport {
    // The catalog is listed once per run; symbol resolution consumes no
    // further terminal calls.
    let catalog = match terminal.symbols() {
        Ok(catalog) => catalog,
        Err(e) => {
            let message = format!("failed to list terminal symbols: {e}");
            observer.on_log(LogLevel::Error, &message);
            return RunReport::empty(RunState::ConnectFailed, Some(message));
        }
    };
    observer.on_log(
        LogLevel::Info,
        &format!("terminal reports {} available symbols", catalog.len()),
    );

    let tasks = build_matrix(&request.symbols, &request.timeframes, &catalog);
    let selection = ExportSelection::parse(&request.columns);
    let single_task = request.symbols.len() == 1 && request.timeframes.len() == 1;
    let mut plan = ExportPlan::new(
        request.format,
        &request.output_path,
        selection,
        request.start,
        request.end,
        single_task,
    );
    let mut progress = ProgressTracker::new(tasks.len());
    observer.on_log(
        LogLevel::Info,
        &format!(
            "starting download of {} symbol/timeframe combinations",
            tasks.len()
        ),
    );

    let mut outcomes: Vec<TaskRecord> = Vec::with_capacity(tasks.len());
    let mut results: BTreeMap<String, Vec<Bar>> = BTreeMap::new();
    let mut state = RunState::Running;

    let group = request.timeframes.len();
    'symbols: for chunk in tasks.chunks(group) {
        if cancel.load(Ordering::Relaxed) {
            state = RunState::Stopped;
            break 'symbols;
        }

        // Unresolved symbol: skip the whole timeframe group in one step,
        // without touching the terminal.
        if chunk[0].resolved.is_none() {
            observer.on_log(
                LogLevel::Warning,
                &format!("symbol {} not found in terminal catalog", chunk[0].requested),
            );
            for task in chunk {
                outcomes.push(TaskRecord {
                    task: task.clone(),
                    outcome: TaskOutcome::SkippedSymbolNotFound,
                });
            }
            observer.on_progress(progress.advance_by(chunk.len()));
            continue;
        }

        for task in chunk {
            if cancel.load(Ordering::Relaxed) {
                state = RunState::Stopped;
                break 'symbols;
            }
            let outcome = run_task(terminal, request, task, &mut plan, &mut results, observer);
            outcomes.push(TaskRecord {
                task: task.clone(),
                outcome,
            });
            observer.on_progress(progress.advance());
        }
    }

    let mut error = None;
    if state == RunState::Running {
        match plan.finish() {
            Ok(Some(path)) => observer.on_log(
                LogLevel::Info,
                &format!(
                    "saved {} sheets to {}",
                    plan.sheet_count(),
                    path.display()
                ),
            ),
            Ok(None) => {}
            Err(e) => {
                let message = format!("failed to save workbook: {e}");
                observer.on_log(LogLevel::Error, &message);
                error = Some(message);
            }
        }
        state = RunState::Completed;
        observer.on_log(LogLevel::Info, "download completed");
    } else {
        observer.on_log(LogLevel::Info, "download stopped by user");
    }

    RunReport {
        state,
        outcomes,
        results,
        error,
    }
}

/// One task: fetch, normalize, record for charting, export. Task-local
/// failures never escalate; the loop always proceeds to the next task.
fn run_task(
    terminal: &dyn Terminal,
    request: &RunRequest,
    task: &Task,
    plan: &mut ExportPlan,
    results: &mut BTreeMap<String, Vec<Bar>>,
    observer: &dyn RunObserver,
) -> TaskOutcome {
    let symbol = task.symbol();
    let timeframe = task.timeframe;
    observer.on_log(LogLevel::Info, &format!("downloading {symbol} {timeframe}..."));

    let raw = match terminal.fetch_bars(symbol, timeframe.period_code(), request.start, request.end)
    {
        Ok(raw) => raw,
        Err(e) => {
            observer.on_log(
                LogLevel::Warning,
                &format!("no data returned for {symbol} {timeframe}: {e}"),
            );
            return TaskOutcome::SkippedEmptyResult;
        }
    };
    if raw.is_empty() {
        observer.on_log(
            LogLevel::Warning,
            &format!("no data returned for {symbol} {timeframe}"),
        );
        return TaskOutcome::SkippedEmptyResult;
    }

    let bars = match normalize_series(&raw) {
        Ok(bars) => bars,
        Err(e) => {
            observer.on_log(
                LogLevel::Error,
                &format!("failed to normalize {symbol} {timeframe}: {e}"),
            );
            return TaskOutcome::Failed(e.to_string());
        }
    };

    // Charting always gets the full series, whatever the export selection.
    let rows = bars.len();
    results.insert(task.key(), bars.clone());

    if plan.columns().is_empty() {
        observer.on_log(
            LogLevel::Warning,
            &format!("no valid export columns selected for {symbol} {timeframe}"),
        );
        return TaskOutcome::SkippedNoSelectedColumns;
    }

    match plan.write_task(symbol, timeframe, &bars) {
        Ok(WriteDisposition::Written(path)) => {
            observer.on_log(
                LogLevel::Info,
                &format!("saved {rows} rows to {}", path.display()),
            );
        }
        Ok(WriteDisposition::Accumulated) | Ok(WriteDisposition::Disabled) => {}
        Err(e) => {
            observer.on_log(
                LogLevel::Error,
                &format!("failed to save {symbol} {timeframe}: {e}"),
            );
            return TaskOutcome::Failed(e.to_string());
        }
    }

    TaskOutcome::Completed { rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request() -> RunRequest {
        RunRequest {
            symbols: vec!["EURUSD".to_string()],
            timeframes: vec![Timeframe::H1],
            start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            output_path: String::new(),
            format: ExportFormat::Csv,
            columns: vec!["Date".to_string(), "Close".to_string()],
        }
    }

    #[test]
    fn validate_accepts_well_formed_request() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_fields() {
        let mut r = request();
        r.symbols.clear();
        assert_eq!(r.validate(), Err(RequestError::NoSymbols));

        let mut r = request();
        r.timeframes.clear();
        assert_eq!(r.validate(), Err(RequestError::NoTimeframes));

        let mut r = request();
        r.columns.clear();
        assert_eq!(r.validate(), Err(RequestError::NoColumns));
    }

    #[test]
    fn validate_rejects_inverted_range() {
        let mut r = request();
        std::mem::swap(&mut r.start, &mut r.end);
        assert!(matches!(
            r.validate(),
            Err(RequestError::InvertedRange { .. })
        ));
    }

    #[test]
    fn request_roundtrips_through_serde() {
        let r = request();
        let json = serde_json::to_string(&r).unwrap();
        let back: RunRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(r, back);
    }
}
