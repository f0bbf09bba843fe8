//! Background worker thread: the whole run executes here, strictly
//! sequentially. Communication with the caller is via `mpsc` channels plus
//! the shared cancellation flag.
//!
//! The caller keeps its clone of the cancel flag and sets it to stop a run in
//! progress; the `CancelRun` command exists for callers that only hold the
//! command channel. The flag is polled by the run loop at symbol and task
//! boundaries, never mid-fetch.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};

use barfetch_core::domain::Bar;
use barfetch_core::terminal::{BridgeTerminal, SyntheticTerminal, Terminal};

use crate::observer::{LogLevel, RunObserver};
use crate::run::{execute, RunRequest, RunState};

/// Which terminal backend the worker should build for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalSpec {
    /// HTTP bridge at the given endpoint.
    Bridge { endpoint: String },
    /// In-process synthetic terminal (demo/testing).
    Synthetic,
}

impl TerminalSpec {
    fn build(&self) -> Box<dyn Terminal> {
        match self {
            TerminalSpec::Bridge { endpoint } => Box::new(BridgeTerminal::new(endpoint)),
            TerminalSpec::Synthetic => Box::new(SyntheticTerminal::new()),
        }
    }
}

/// Commands sent from the caller to the worker.
#[derive(Debug)]
pub enum WorkerCommand {
    StartRun {
        request: RunRequest,
        terminal: TerminalSpec,
    },
    CancelRun,
    Shutdown,
}

/// Events sent from the worker back to the caller.
///
/// `Finished` and `Error` are terminal for a run, emitted at most once each
/// and never both; every log and progress event of a run precedes its
/// terminal event. A cancelled run ends with a final log line and no
/// terminal event, matching the way the caller initiated the stop.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    Progress(u8),
    Log { level: LogLevel, message: String },
    Finished(BTreeMap<String, Vec<Bar>>),
    Error(String),
}

/// Spawn the background worker thread.
pub fn spawn_worker(
    rx: Receiver<WorkerCommand>,
    tx: Sender<WorkerEvent>,
    cancel: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name("barfetch-worker".into())
        .spawn(move || {
            worker_loop(rx, tx, cancel);
        })
        .expect("failed to spawn worker thread")
}

fn worker_loop(rx: Receiver<WorkerCommand>, tx: Sender<WorkerEvent>, cancel: Arc<AtomicBool>) {
    loop {
        match rx.recv() {
            Ok(WorkerCommand::Shutdown) | Err(_) => break,
            Ok(WorkerCommand::CancelRun) => {
                cancel.store(true, Ordering::Relaxed);
            }
            Ok(WorkerCommand::StartRun { request, terminal }) => {
                cancel.store(false, Ordering::Relaxed);
                handle_run(request, terminal, &tx, &cancel);
            }
        }
    }
}

fn handle_run(
    request: RunRequest,
    spec: TerminalSpec,
    tx: &Sender<WorkerEvent>,
    cancel: &Arc<AtomicBool>,
) {
    let terminal = spec.build();
    let observer = ChannelObserver { tx: tx.clone() };
    let report = execute(terminal.as_ref(), &request, &observer, cancel);

    match report.state {
        RunState::Completed => match report.error {
            Some(message) => {
                let _ = tx.send(WorkerEvent::Error(message));
            }
            None => {
                let _ = tx.send(WorkerEvent::Finished(report.results));
            }
        },
        RunState::Stopped => {
            // The stop was caller-initiated; the closing log line already
            // went out through the observer.
        }
        _ => {
            let message = report
                .error
                .unwrap_or_else(|| "run ended without starting".to_string());
            let _ = tx.send(WorkerEvent::Error(message));
        }
    }
}

/// RunObserver implementation that forwards onto the event channel.
struct ChannelObserver {
    tx: Sender<WorkerEvent>,
}

impl RunObserver for ChannelObserver {
    fn on_progress(&self, percent: u8) {
        let _ = self.tx.send(WorkerEvent::Progress(percent));
    }

    fn on_log(&self, level: LogLevel, message: &str) {
        let _ = self.tx.send(WorkerEvent::Log {
            level,
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    use barfetch_core::domain::Timeframe;
    use barfetch_core::export::ExportFormat;
    use chrono::{TimeZone, Utc};

    fn demo_request() -> RunRequest {
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
    fn worker_shutdown() {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (evt_tx, _evt_rx) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));

        let handle = spawn_worker(cmd_rx, evt_tx, cancel);
        cmd_tx.send(WorkerCommand::Shutdown).unwrap();
        handle.join().expect("worker should join cleanly");
    }

    #[test]
    fn synthetic_run_emits_progress_then_finished() {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (evt_tx, evt_rx) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let handle = spawn_worker(cmd_rx, evt_tx, cancel);

        cmd_tx
            .send(WorkerCommand::StartRun {
                request: demo_request(),
                terminal: TerminalSpec::Synthetic,
            })
            .unwrap();

        let mut progress: Vec<u8> = Vec::new();
        let mut finished: Option<BTreeMap<String, Vec<Bar>>> = None;
        for event in evt_rx.iter() {
            match event {
                WorkerEvent::Progress(p) => progress.push(p),
                WorkerEvent::Log { .. } => {}
                WorkerEvent::Finished(results) => {
                    finished = Some(results);
                    break;
                }
                WorkerEvent::Error(message) => panic!("unexpected run error: {message}"),
            }
        }

        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(progress.last(), Some(&100));
        let results = finished.unwrap();
        assert!(results.contains_key("EURUSD_H1"));

        cmd_tx.send(WorkerCommand::Shutdown).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn invalid_request_reports_error_event() {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (evt_tx, evt_rx) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let handle = spawn_worker(cmd_rx, evt_tx, cancel);

        let mut request = demo_request();
        request.symbols.clear();
        cmd_tx
            .send(WorkerCommand::StartRun {
                request,
                terminal: TerminalSpec::Synthetic,
            })
            .unwrap();

        let mut saw_error = false;
        for event in evt_rx.iter() {
            match event {
                WorkerEvent::Error(message) => {
                    assert!(message.contains("symbol"));
                    saw_error = true;
                    break;
                }
                WorkerEvent::Finished(_) => panic!("invalid request must not finish"),
                _ => {}
            }
        }
        assert!(saw_error);

        cmd_tx.send(WorkerCommand::Shutdown).unwrap();
        handle.join().unwrap();
    }
}
