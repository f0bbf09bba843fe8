//! HTTP bridge terminal client.
//!
//! Talks to a local terminal gateway over JSON: `POST /connect`,
//! `GET /symbols`, `GET /bars`, `POST /disconnect`. No automatic retries;
//! a failed fetch is recorded as a task outcome by the run loop and the
//! loop moves on.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{Terminal, TerminalError};
use crate::domain::RawBar;

#[derive(Debug, Deserialize)]
struct SymbolsResponse {
    symbols: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct BarsResponse {
    bars: Vec<RawBar>,
}

/// Client for an HTTP terminal bridge.
pub struct BridgeTerminal {
    client: reqwest::blocking::Client,
    base: String,
}

impl BridgeTerminal {
    /// Default bridge endpoint on the local machine.
    pub const DEFAULT_ENDPOINT: &'static str = "http://127.0.0.1:8228";

    pub fn new(endpoint: &str) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            base: endpoint.trim_end_matches('/').to_string(),
        }
    }

    fn bars_url(&self, symbol: &str, period: u32, start: DateTime<Utc>, end: DateTime<Utc>) -> String {
        format!(
            "{}/bars?symbol={symbol}&period={period}&from={}&to={}",
            self.base,
            start.timestamp(),
            end.timestamp()
        )
    }
}

impl Terminal for BridgeTerminal {
    fn name(&self) -> &str {
        "terminal_bridge"
    }

    fn connect(&self) -> Result<(), TerminalError> {
        let resp = self
            .client
            .post(format!("{}/connect", self.base))
            .send()
            .map_err(|e| TerminalError::ConnectFailed(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(TerminalError::ConnectFailed(format!(
                "bridge returned HTTP {}",
                resp.status()
            )));
        }
        Ok(())
    }

    fn symbols(&self) -> Result<Vec<String>, TerminalError> {
        let resp = self
            .client
            .get(format!("{}/symbols", self.base))
            .send()
            .map_err(|e| TerminalError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TerminalError::Http {
                status: status.as_u16(),
            });
        }

        let parsed: SymbolsResponse = resp
            .json()
            .map_err(|e| TerminalError::ResponseFormat(format!("symbols response: {e}")))?;
        Ok(parsed.symbols)
    }

    fn fetch_bars(
        &self,
        symbol: &str,
        period: u32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RawBar>, TerminalError> {
        let url = self.bars_url(symbol, period, start, end);
        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| TerminalError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(TerminalError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        if !status.is_success() {
            return Err(TerminalError::Http {
                status: status.as_u16(),
            });
        }

        let parsed: BarsResponse = resp
            .json()
            .map_err(|e| TerminalError::ResponseFormat(format!("bars response for {symbol}: {e}")))?;
        Ok(parsed.bars)
    }

    fn disconnect(&self) {
        // Best effort; the bridge drops stale sessions on its own.
        let _ = self.client.post(format!("{}/disconnect", self.base)).send();
    }
}
