//! Canonical intraday sample.

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// A single timestamped sub-daily reading.
///
/// Every provider payload shape is flattened into a strictly time-sorted,
/// timestamp-unique `Vec<Sample>` at the ingestion boundary before any
/// merging happens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// When the reading was taken (UTC).
    pub ts_utc: Timestamp,
    /// The reading value, in the metric's canonical unit.
    pub value: f64,
}

/// Sort samples by timestamp and drop duplicates, keeping the last value
/// seen for each timestamp (providers revise recent points in place).
pub fn sort_dedup(mut samples: Vec<Sample>) -> Vec<Sample> {
    samples.sort_by_key(|s| s.ts_utc);
    // Keep the later occurrence per timestamp: walk backwards.
    let mut out: Vec<Sample> = Vec::with_capacity(samples.len());
    for s in samples.into_iter().rev() {
        if out.last().map(|p: &Sample| p.ts_utc) != Some(s.ts_utc) {
            out.push(s);
        }
    }
    out.reverse();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at(secs: i64, value: f64) -> Sample {
        Sample {
            ts_utc: Utc.timestamp_opt(secs, 0).unwrap(),
            value,
        }
    }

    #[test]
    fn sorts_by_timestamp() {
        let out = sort_dedup(vec![at(30, 3.0), at(10, 1.0), at(20, 2.0)]);
        let values: Vec<f64> = out.iter().map(|s| s.value).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn dedup_keeps_last_value_per_timestamp() {
        let out = sort_dedup(vec![at(10, 1.0), at(10, 9.0), at(20, 2.0)]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].value, 9.0);
    }
}
