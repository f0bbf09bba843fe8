//! The fixed timeframe set and its terminal period codes.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A chart timeframe. The set is fixed; each variant maps to the terminal's
/// opaque numeric period code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
    D1,
    W1,
    MN1,
}

/// Unknown timeframe name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown timeframe '{0}' (expected one of M1 M5 M15 M30 H1 H4 D1 W1 MN1)")]
pub struct ParseTimeframeError(pub String);

impl Timeframe {
    /// All timeframes, in chart order.
    pub const ALL: [Timeframe; 9] = [
        Timeframe::M1,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::D1,
        Timeframe::W1,
        Timeframe::MN1,
    ];

    /// The terminal's period code for this timeframe.
    ///
    /// Minute periods are the raw minute count; hour, day, week, and month
    /// periods carry the terminal's flag bits in the upper half.
    pub fn period_code(self) -> u32 {
        match self {
            Timeframe::M1 => 1,
            Timeframe::M5 => 5,
            Timeframe::M15 => 15,
            Timeframe::M30 => 30,
            Timeframe::H1 => 16_385,
            Timeframe::H4 => 16_388,
            Timeframe::D1 => 16_408,
            Timeframe::W1 => 32_769,
            Timeframe::MN1 => 49_153,
        }
    }

    /// Reverse lookup of `period_code`.
    pub fn from_period_code(code: u32) -> Option<Timeframe> {
        Timeframe::ALL.into_iter().find(|tf| tf.period_code() == code)
    }

    /// Nominal spacing between consecutive bars. Calendar months are
    /// approximated as 30 days; this is only used for bar spacing, never
    /// for range arithmetic.
    pub fn bar_interval(self) -> Duration {
        match self {
            Timeframe::M1 => Duration::minutes(1),
            Timeframe::M5 => Duration::minutes(5),
            Timeframe::M15 => Duration::minutes(15),
            Timeframe::M30 => Duration::minutes(30),
            Timeframe::H1 => Duration::hours(1),
            Timeframe::H4 => Duration::hours(4),
            Timeframe::D1 => Duration::days(1),
            Timeframe::W1 => Duration::weeks(1),
            Timeframe::MN1 => Duration::days(30),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Timeframe::M1 => "M1",
            Timeframe::M5 => "M5",
            Timeframe::M15 => "M15",
            Timeframe::M30 => "M30",
            Timeframe::H1 => "H1",
            Timeframe::H4 => "H4",
            Timeframe::D1 => "D1",
            Timeframe::W1 => "W1",
            Timeframe::MN1 => "MN1",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = ParseTimeframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Timeframe::ALL
            .into_iter()
            .find(|tf| tf.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseTimeframeError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_codes_match_terminal_constants() {
        assert_eq!(Timeframe::M1.period_code(), 1);
        assert_eq!(Timeframe::M30.period_code(), 30);
        assert_eq!(Timeframe::H1.period_code(), 16_385);
        assert_eq!(Timeframe::D1.period_code(), 16_408);
        assert_eq!(Timeframe::W1.period_code(), 32_769);
        assert_eq!(Timeframe::MN1.period_code(), 49_153);
    }

    #[test]
    fn period_code_roundtrip() {
        for tf in Timeframe::ALL {
            assert_eq!(Timeframe::from_period_code(tf.period_code()), Some(tf));
        }
        assert_eq!(Timeframe::from_period_code(9_999), None);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("h1".parse::<Timeframe>().unwrap(), Timeframe::H1);
        assert_eq!(" mn1 ".parse::<Timeframe>().unwrap(), Timeframe::MN1);
    }

    #[test]
    fn parse_rejects_unknown() {
        let err = "H2".parse::<Timeframe>().unwrap_err();
        assert!(err.to_string().contains("H2"));
    }

    #[test]
    fn display_roundtrip() {
        for tf in Timeframe::ALL {
            assert_eq!(tf.to_string().parse::<Timeframe>().unwrap(), tf);
        }
    }
}
