//! Intraday payload normalization.
//!
//! Providers ship intraday series in several shapes: a list of chunk
//! objects, a flat map of epoch-seconds to value, or a map of metric
//! name to such a series. [`IntradayPayload`] is the tagged union over
//! every shape we know; [`flatten`] reduces any of them to one sorted,
//! timestamp-unique [`Sample`] list. Shape variance stops here — nothing
//! past this module inspects raw provider JSON.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use healthsync_core::sample::{sort_dedup, Sample};

/// Every known intraday series shape.
///
/// Variant order matters for `untagged` resolution: a named-series map
/// must be tried before the flat epoch map, since any named map also
/// decodes as a map of strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum IntradayPayload {
    /// A list of chunk objects: `[{"ts": 1717400000, "value": 72.0}, …]`,
    /// with vendor spellings for both keys and optional nesting under
    /// `"data"`.
    Chunks(Vec<RawChunk>),
    /// Metric name to epoch-map: `{"heart_rate": {"1717400000": 72.0}}`.
    NamedSeries(BTreeMap<String, BTreeMap<String, Value>>),
    /// Flat epoch-map: `{"1717400000": 72.0, …}`.
    EpochSeries(BTreeMap<String, Value>),
}

/// One entry of the chunk-list shape, before validation.
#[derive(Debug, Deserialize)]
pub struct RawChunk {
    /// Epoch seconds, as a number or numeric string.
    #[serde(default, alias = "timestamp", alias = "time")]
    pub ts: Option<Value>,
    /// The reading, directly on the chunk…
    #[serde(default, alias = "bpm")]
    pub value: Option<Value>,
    /// …or nested one level down under a vendor field name.
    #[serde(default)]
    pub data: Option<BTreeMap<String, Value>>,
}

/// Result of flattening a payload: the usable samples plus how many
/// entries were dropped as unparseable.
#[derive(Debug, Default)]
pub struct Flattened {
    pub samples: Vec<Sample>,
    pub skipped: usize,
}

/// Flatten any payload shape into a sorted, deduplicated sample list.
///
/// `field` is the vendor's name for the metric (e.g. `"heart_rate"`),
/// used to pick the right series out of named maps and nested chunk
/// data. Entries that fail to parse are counted and skipped — a single
/// garbled sample never fails the sync.
pub fn flatten(payload: IntradayPayload, field: &str) -> Flattened {
    let mut out = Flattened::default();

    match payload {
        IntradayPayload::Chunks(chunks) => {
            for chunk in chunks {
                match chunk_sample(&chunk, field) {
                    Some(sample) => out.samples.push(sample),
                    None => out.skipped += 1,
                }
            }
        }
        IntradayPayload::NamedSeries(named) => {
            // Take the series matching the requested field; a map with a
            // single series is accepted under any name.
            let series = named.get(field).or_else(|| {
                if named.len() == 1 {
                    named.values().next()
                } else {
                    None
                }
            });
            match series {
                Some(series) => collect_epoch_map(series, &mut out),
                None => out.skipped += named.values().map(BTreeMap::len).sum::<usize>(),
            }
        }
        IntradayPayload::EpochSeries(series) => collect_epoch_map(&series, &mut out),
    }

    out.samples = sort_dedup(out.samples);
    out
}

fn collect_epoch_map(series: &BTreeMap<String, Value>, out: &mut Flattened) {
    for (key, value) in series {
        match (parse_epoch_str(key), parse_number(value)) {
            (Some(ts_utc), Some(value)) => out.samples.push(Sample { ts_utc, value }),
            _ => out.skipped += 1,
        }
    }
}

fn chunk_sample(chunk: &RawChunk, field: &str) -> Option<Sample> {
    let ts_utc = parse_epoch(chunk.ts.as_ref()?)?;
    let value = match &chunk.value {
        Some(v) => parse_number(v)?,
        None => {
            let data = chunk.data.as_ref()?;
            parse_number(data.get(field)?)?
        }
    };
    Some(Sample { ts_utc, value })
}

/// Epoch seconds from a JSON number or numeric string.
fn parse_epoch(value: &Value) -> Option<DateTime<Utc>> {
    let secs = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?,
        Value::String(s) => s.parse::<i64>().ok()?,
        _ => return None,
    };
    DateTime::<Utc>::from_timestamp(secs, 0)
}

fn parse_epoch_str(key: &str) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(key.parse::<i64>().ok()?, 0)
}

fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn parse(json: &str) -> IntradayPayload {
        serde_json::from_str(json).expect("payload decodes")
    }

    #[test]
    fn chunk_list_flattens() {
        let payload = parse(r#"[{"ts": 1717400000, "value": 72.0}, {"ts": 1717400060, "value": 75.0}]"#);
        let flat = flatten(payload, "heart_rate");
        assert_eq!(flat.samples.len(), 2);
        assert_eq!(flat.skipped, 0);
        assert_eq!(flat.samples[0].value, 72.0);
    }

    #[test]
    fn chunk_list_accepts_vendor_spellings() {
        let payload = parse(
            r#"[{"timestamp": 1717400000, "data": {"heart_rate": 72}},
                {"time": "1717400060", "bpm": 75}]"#,
        );
        let flat = flatten(payload, "heart_rate");
        assert_eq!(flat.samples.len(), 2);
        assert_eq!(flat.samples[1].value, 75.0);
    }

    #[test]
    fn epoch_map_flattens() {
        let payload = parse(r#"{"1717400000": 72.0, "1717400060": "75"}"#);
        let flat = flatten(payload, "heart_rate");
        assert_eq!(flat.samples.len(), 2);
        assert_eq!(flat.samples[1].value, 75.0);
    }

    #[test]
    fn named_series_selects_requested_field() {
        let payload = parse(
            r#"{"heart_rate": {"1717400000": 72.0}, "steps": {"1717400000": 30}}"#,
        );
        let flat = flatten(payload, "heart_rate");
        assert_eq!(flat.samples.len(), 1);
        assert_eq!(flat.samples[0].value, 72.0);
    }

    #[test]
    fn single_named_series_accepted_under_any_name() {
        let payload = parse(r#"{"hr": {"1717400000": 72.0}}"#);
        let flat = flatten(payload, "heart_rate");
        assert_eq!(flat.samples.len(), 1);
    }

    #[test]
    fn garbled_entries_are_skipped_not_fatal() {
        let payload = parse(
            r#"[{"ts": 1717400000, "value": 72.0},
                {"ts": "not-a-number", "value": 75.0},
                {"value": 80.0}]"#,
        );
        let flat = flatten(payload, "heart_rate");
        assert_eq!(flat.samples.len(), 1);
        assert_eq!(flat.skipped, 2);
    }

    #[test]
    fn duplicate_timestamps_collapse_to_latest() {
        let payload = parse(r#"[{"ts": 1717400000, "value": 72.0}, {"ts": 1717400000, "value": 74.0}]"#);
        let flat = flatten(payload, "heart_rate");
        assert_eq!(flat.samples.len(), 1);
        assert_eq!(flat.samples[0].value, 74.0);
    }

    #[test]
    fn output_is_time_sorted() {
        let payload = parse(r#"[{"ts": 1717400120, "value": 3.0}, {"ts": 1717400000, "value": 1.0}]"#);
        let flat = flatten(payload, "heart_rate");
        assert_eq!(
            flat.samples[0].ts_utc,
            Utc.timestamp_opt(1717400000, 0).unwrap()
        );
        assert_eq!(flat.samples[1].value, 3.0);
    }
}
