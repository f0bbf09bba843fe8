//! Synthetic terminal: deterministic random-walk bars for demos and tests.
//!
//! Each (symbol, period) pair is seeded from a blake3 hash, so the same
//! request always yields the same series and different symbols diverge.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{Terminal, TerminalError};
use crate::domain::{RawBar, Timeframe};

/// History depth limit per fetch, mirroring a real terminal's chart-bars cap.
const MAX_BARS: usize = 250_000;

/// An in-process terminal producing deterministic synthetic bars.
pub struct SyntheticTerminal {
    catalog: Vec<String>,
}

impl SyntheticTerminal {
    /// Default demo catalog.
    pub fn new() -> Self {
        Self::with_catalog(
            ["EURUSD", "GBPUSD", "USDJPY", "GBPJPY", "XAUUSD", "BTCUSD"]
                .into_iter()
                .map(String::from)
                .collect(),
        )
    }

    pub fn with_catalog(catalog: Vec<String>) -> Self {
        Self { catalog }
    }
}

impl Default for SyntheticTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Terminal for SyntheticTerminal {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn connect(&self) -> Result<(), TerminalError> {
        Ok(())
    }

    fn symbols(&self) -> Result<Vec<String>, TerminalError> {
        Ok(self.catalog.clone())
    }

    fn fetch_bars(
        &self,
        symbol: &str,
        period: u32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RawBar>, TerminalError> {
        if !self.catalog.iter().any(|s| s == symbol) {
            return Err(TerminalError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        let timeframe =
            Timeframe::from_period_code(period).ok_or(TerminalError::UnsupportedPeriod(period))?;

        Ok(generate_bars(symbol, timeframe, start, end))
    }

    fn disconnect(&self) {}
}

/// Random walk from a fixed starting price, one bar per timeframe interval.
fn generate_bars(
    symbol: &str,
    timeframe: Timeframe,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<RawBar> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(symbol.as_bytes());
    hasher.update(&timeframe.period_code().to_le_bytes());
    let seed: [u8; 32] = *hasher.finalize().as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let interval = timeframe.bar_interval();
    let mut bars = Vec::new();
    let mut price = 100.0_f64;
    let mut current = start;

    while current <= end && bars.len() < MAX_BARS {
        let step_return: f64 = rng.gen_range(-0.003..0.003);
        let open = price;
        let close = price * (1.0 + step_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.001));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.001));
        let tick_volume = rng.gen_range(100..10_000u64);

        bars.push(RawBar {
            time: current.timestamp(),
            open,
            high,
            low,
            close,
            tick_volume,
            spread: rng.gen_range(1..40),
            real_volume: tick_volume * rng.gen_range(1..50),
        });

        price = close;
        current += interval;
    }

    bars
}
