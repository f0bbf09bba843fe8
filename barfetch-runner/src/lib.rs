//! barfetch runner: run orchestration over a terminal session.
//!
//! This crate builds on `barfetch-core` to provide:
//! - Task matrix construction (symbols × timeframes, catalog resolution)
//! - Progress accounting with integer-percent reporting
//! - The sequential run loop with cooperative cancellation
//! - A background worker thread speaking mpsc channels
//! - Symbol preset persistence

pub mod matrix;
pub mod observer;
pub mod presets;
pub mod progress;
pub mod run;
pub mod worker;

pub use matrix::{build_matrix, Task};
pub use observer::{LogLevel, RunObserver};
pub use presets::{split_symbols, PresetStore, DEFAULT_PRESET_FILE};
pub use progress::ProgressTracker;
pub use run::{
    execute, RequestError, RunReport, RunRequest, RunState, TaskOutcome, TaskRecord,
};
pub use worker::{spawn_worker, TerminalSpec, WorkerCommand, WorkerEvent};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn request_and_report_cross_threads() {
        assert_send::<RunRequest>();
        assert_sync::<RunRequest>();
        assert_send::<RunReport>();
        assert_sync::<RunReport>();
    }

    #[test]
    fn worker_messages_cross_threads() {
        assert_send::<WorkerCommand>();
        assert_send::<WorkerEvent>();
        assert_send::<TerminalSpec>();
        assert_sync::<TerminalSpec>();
    }

    #[test]
    fn task_types_cross_threads() {
        assert_send::<Task>();
        assert_sync::<Task>();
        assert_send::<TaskOutcome>();
        assert_sync::<TaskOutcome>();
    }
}
