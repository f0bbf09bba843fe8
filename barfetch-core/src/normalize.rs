//! Raw-to-canonical bar normalization.
//!
//! A pure per-record transform: epoch seconds become a timezone-aware UTC
//! timestamp (the terminal serves no timezone information, so UTC is assumed
//! and tagged), and the terminal's field names map 1:1 onto the canonical
//! ones. No resampling, gap-filling, or deduplication; input order is
//! preserved.

use chrono::DateTime;
use thiserror::Error;

use crate::domain::{Bar, RawBar};

/// Errors from bar normalization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("bar timestamp {0} is outside the representable range")]
    TimestampOutOfRange(i64),
}

/// Convert one raw terminal bar into its canonical form.
pub fn normalize(raw: &RawBar) -> Result<Bar, NormalizeError> {
    let timestamp = DateTime::from_timestamp(raw.time, 0)
        .ok_or(NormalizeError::TimestampOutOfRange(raw.time))?;

    Ok(Bar {
        timestamp,
        open: raw.open,
        high: raw.high,
        low: raw.low,
        close: raw.close,
        volume: raw.tick_volume,
        spread: raw.spread,
        real_volume: raw.real_volume,
    })
}

/// Normalize a fetched series, preserving order. One bad record fails the
/// series; partial normalization would silently change the row count.
pub fn normalize_series(raw: &[RawBar]) -> Result<Vec<Bar>, NormalizeError> {
    raw.iter().map(normalize).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Timelike, Utc};

    fn raw(time: i64) -> RawBar {
        RawBar {
            time,
            open: 1.10,
            high: 1.12,
            low: 1.09,
            close: 1.11,
            tick_volume: 321,
            spread: 7,
            real_volume: 9_000,
        }
    }

    #[test]
    fn fields_map_one_to_one() {
        let bar = normalize(&raw(1_700_000_000)).unwrap();
        assert_eq!(bar.open, 1.10);
        assert_eq!(bar.high, 1.12);
        assert_eq!(bar.low, 1.09);
        assert_eq!(bar.close, 1.11);
        assert_eq!(bar.volume, 321);
        assert_eq!(bar.spread, 7);
        assert_eq!(bar.real_volume, 9_000);
    }

    #[test]
    fn timestamp_is_utc_aware() {
        // 2023-11-14 22:13:20 UTC
        let bar = normalize(&raw(1_700_000_000)).unwrap();
        assert_eq!(bar.timestamp.timezone(), Utc);
        assert_eq!(bar.timestamp.hour(), 22);
        assert_eq!(bar.timestamp.to_rfc3339(), "2023-11-14T22:13:20+00:00");
    }

    #[test]
    fn series_preserves_order_and_count() {
        let input = vec![raw(300), raw(100), raw(200)];
        let bars = normalize_series(&input).unwrap();
        assert_eq!(bars.len(), 3);
        let times: Vec<i64> = bars.iter().map(|b| b.timestamp.timestamp()).collect();
        assert_eq!(times, vec![300, 100, 200]);
    }

    #[test]
    fn out_of_range_timestamp_errors() {
        let err = normalize(&raw(i64::MAX)).unwrap_err();
        assert_eq!(err, NormalizeError::TimestampOutOfRange(i64::MAX));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn normalization_is_total_over_plausible_epochs(
                times in proptest::collection::vec(0i64..4_000_000_000, 0..50),
            ) {
                let input: Vec<RawBar> = times.iter().map(|&t| raw(t)).collect();
                let bars = normalize_series(&input).unwrap();
                prop_assert_eq!(bars.len(), input.len());
                for (bar, raw) in bars.iter().zip(&input) {
                    prop_assert_eq!(bar.timestamp.timestamp(), raw.time);
                    prop_assert_eq!(bar.volume, raw.tick_volume);
                }
            }
        }
    }
}
