//! Bar types: the terminal's wire record and the canonical form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One price bar exactly as the terminal serves it.
///
/// `time` is epoch seconds with no timezone information attached; the
/// normalizer interprets it as UTC. `tick_volume` is the tick-count volume
/// proxy, `real_volume` the traded volume where the venue reports one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub tick_volume: u64,
    pub spread: u32,
    pub real_volume: u64,
}

/// Canonical OHLCV bar. Immutable once constructed.
///
/// `timestamp` is always timezone-aware UTC; `volume` is the tick-count
/// proxy carried over from `RawBar::tick_volume`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub spread: u32,
    pub real_volume: u64,
}

impl Bar {
    /// Basic OHLC sanity check: high is the ceiling, low the floor,
    /// prices positive.
    pub fn is_sane(&self) -> bool {
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> Bar {
        Bar {
            timestamp: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            open: 1.0712,
            high: 1.0745,
            low: 1.0698,
            close: 1.0730,
            volume: 4_812,
            spread: 12,
            real_volume: 0,
        }
    }

    #[test]
    fn sane_bar_passes() {
        assert!(sample_bar().is_sane());
    }

    #[test]
    fn inverted_high_low_fails() {
        let mut bar = sample_bar();
        bar.high = bar.low - 0.01;
        assert!(!bar.is_sane());
    }

    #[test]
    fn raw_bar_deserializes_from_bridge_json() {
        let json = r#"{
            "time": 1700000000,
            "open": 1.0712, "high": 1.0745, "low": 1.0698, "close": 1.0730,
            "tick_volume": 4812, "spread": 12, "real_volume": 0
        }"#;
        let raw: RawBar = serde_json::from_str(json).unwrap();
        assert_eq!(raw.time, 1_700_000_000);
        assert_eq!(raw.tick_volume, 4_812);
    }
}
