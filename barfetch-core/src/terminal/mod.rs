//! Terminal abstraction: the market-data terminal as a collaborator.
//!
//! The `Terminal` trait covers the four-call session contract (connect, list
//! symbols, fetch bars, disconnect) so the run loop can be driven against the
//! HTTP bridge, the synthetic terminal, or a scripted test double.

pub mod bridge;
pub mod synthetic;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::RawBar;

pub use bridge::BridgeTerminal;
pub use synthetic::SyntheticTerminal;

/// Structured error types for terminal operations.
#[derive(Debug, Error)]
pub enum TerminalError {
    #[error("failed to connect to terminal: {0}")]
    ConnectFailed(String),

    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("unsupported period code {0}")]
    UnsupportedPeriod(u32),

    #[error("unexpected response shape: {0}")]
    ResponseFormat(String),

    #[error("terminal bridge returned HTTP {status}")]
    Http { status: u16 },

    #[error("terminal error: {0}")]
    Other(String),
}

/// A market-data terminal session.
///
/// The session is single and stateful: one connect, strictly sequential
/// fetches, one disconnect. Implementations must not be assumed safe for
/// concurrent fetches.
pub trait Terminal: Send + Sync {
    /// Human-readable name of this terminal backend.
    fn name(&self) -> &str;

    /// Open the session. Fatal to a run when it fails.
    fn connect(&self) -> Result<(), TerminalError>;

    /// The terminal's current symbol catalog, exact-cased as the terminal
    /// defines it.
    fn symbols(&self) -> Result<Vec<String>, TerminalError>;

    /// Fetch bars for one symbol over `[start, end]` at the given terminal
    /// period code.
    fn fetch_bars(
        &self,
        symbol: &str,
        period: u32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RawBar>, TerminalError>;

    /// Close the session. Idempotent; safe to call even if `connect` was
    /// never called or failed.
    fn disconnect(&self);
}
