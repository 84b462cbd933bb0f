//! Per-trace [0, 1] normalization.

use std::collections::HashMap;

use crate::data::model::{LongRow, LongTable, NormalizationKind};
use crate::error::{Error, Result};

/// An inclusive volume window (mL) over which extrema are taken.
pub type VolumeRange = (f64, f64);

/// Derive a normalized value per (sample, channel) trace.
///
/// Only the raw `Signal` rows of the input are consulted, so normalizing an
/// already-normalized table re-derives the `Normalized` rows from scratch.
/// With no `range`, extrema come from the whole trace; with one, from the
/// rows whose volume falls inside it. `strict` decides what an empty window
/// means: an error naming the trace, or a silent fall-back to the full
/// extrema. A flat trace (max == min) normalizes to a constant 0.
///
/// The output re-expresses every input row twice: all `Signal` rows first,
/// then all `Normalized` rows, each block in input order.
pub fn normalize(
    table: &LongTable,
    range: Option<VolumeRange>,
    strict: bool,
) -> Result<LongTable> {
    let signal_rows: Vec<&LongRow> = table
        .rows
        .iter()
        .filter(|r| r.kind == NormalizationKind::Signal)
        .collect();

    let extrema = group_extrema(&signal_rows, range, strict)?;

    let mut out = LongTable::new();
    out.rows.reserve(signal_rows.len() * 2);

    for row in &signal_rows {
        out.rows.push((*row).clone());
    }
    for row in &signal_rows {
        let key = (row.sample.clone(), row.channel.clone());
        let (min, max) = extrema[&key];
        let span = max - min;
        let value = if span == 0.0 {
            0.0
        } else {
            (row.signal - min) / span
        };
        let mut derived = (*row).clone();
        derived.kind = NormalizationKind::Normalized;
        derived.value = value;
        out.rows.push(derived);
    }

    Ok(out)
}

/// Signal extrema per (sample, channel), restricted to the volume window
/// when one is given.
fn group_extrema(
    rows: &[&LongRow],
    range: Option<VolumeRange>,
    strict: bool,
) -> Result<HashMap<(String, String), (f64, f64)>> {
    let mut full: HashMap<(String, String), (f64, f64)> = HashMap::new();
    let mut windowed: HashMap<(String, String), (f64, f64)> = HashMap::new();

    for row in rows {
        let key = (row.sample.clone(), row.channel.clone());
        stretch(full.entry(key.clone()).or_insert((row.signal, row.signal)), row.signal);
        if let Some((lo, hi)) = range {
            if row.volume >= lo && row.volume <= hi {
                stretch(
                    windowed.entry(key).or_insert((row.signal, row.signal)),
                    row.signal,
                );
            }
        }
    }

    let Some((lo, hi)) = range else {
        return Ok(full);
    };

    let mut out = HashMap::with_capacity(full.len());
    for (key, full_extrema) in full {
        match windowed.get(&key) {
            Some(&window_extrema) => {
                out.insert(key, window_extrema);
            }
            None if strict => {
                return Err(Error::NormalizationRange {
                    sample: key.0,
                    channel: key.1,
                    lo,
                    hi,
                });
            }
            None => {
                out.insert(key, full_extrema);
            }
        }
    }
    Ok(out)
}

fn stretch(extrema: &mut (f64, f64), value: f64) {
    if value < extrema.0 {
        extrema.0 = value;
    }
    if value > extrema.1 {
        extrema.1 = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal_row(sample: &str, time: f64, signal: f64) -> LongRow {
        LongRow {
            time,
            signal,
            channel: "UV1".to_string(),
            sample: sample.to_string(),
            volume: time * 0.5,
            kind: NormalizationKind::Signal,
            value: signal,
        }
    }

    fn table(rows: Vec<LongRow>) -> LongTable {
        LongTable { rows }
    }

    fn normalized_values(table: &LongTable, sample: &str) -> Vec<f64> {
        table
            .rows
            .iter()
            .filter(|r| r.kind == NormalizationKind::Normalized && r.sample == sample)
            .map(|r| r.value)
            .collect()
    }

    #[test]
    fn full_trace_normalization_spans_zero_to_one() {
        let input = table(vec![
            signal_row("S1", 0.0, 2.0),
            signal_row("S1", 1.0, 6.0),
            signal_row("S1", 2.0, 4.0),
        ]);

        let out = normalize(&input, None, false).unwrap();
        assert_eq!(out.len(), 6);
        assert_eq!(normalized_values(&out, "S1"), vec![0.0, 1.0, 0.5]);
        // Signal block first, input order intact.
        assert!(out.rows[..3]
            .iter()
            .all(|r| r.kind == NormalizationKind::Signal));
        assert_eq!(out.rows[0].value, 2.0);
    }

    #[test]
    fn groups_normalize_independently() {
        let input = table(vec![
            signal_row("S1", 0.0, 0.0),
            signal_row("S1", 1.0, 10.0),
            signal_row("S2", 0.0, 5.0),
            signal_row("S2", 1.0, 7.0),
        ]);

        let out = normalize(&input, None, false).unwrap();
        assert_eq!(normalized_values(&out, "S1"), vec![0.0, 1.0]);
        assert_eq!(normalized_values(&out, "S2"), vec![0.0, 1.0]);
    }

    #[test]
    fn flat_trace_normalizes_to_constant_zero() {
        let input = table(vec![
            signal_row("S1", 0.0, 3.0),
            signal_row("S1", 1.0, 3.0),
        ]);

        let out = normalize(&input, None, false).unwrap();
        assert_eq!(normalized_values(&out, "S1"), vec![0.0, 0.0]);
    }

    #[test]
    fn windowed_extrema_only_see_the_window() {
        // Volumes are time * 0.5: 0.0, 0.5, 1.0. Window covers the first two.
        let input = table(vec![
            signal_row("S1", 0.0, 2.0),
            signal_row("S1", 1.0, 4.0),
            signal_row("S1", 2.0, 10.0),
        ]);

        let out = normalize(&input, Some((0.0, 0.5)), false).unwrap();
        // Extrema 2..4, so the out-of-window peak lands above 1.
        assert_eq!(normalized_values(&out, "S1"), vec![0.0, 1.0, 4.0]);
    }

    #[test]
    fn strict_empty_window_is_an_error() {
        let input = table(vec![signal_row("S1", 0.0, 2.0)]);
        let err = normalize(&input, Some((5.0, 6.0)), true).unwrap_err();
        assert!(matches!(err, Error::NormalizationRange { .. }));
    }

    #[test]
    fn lenient_empty_window_falls_back_to_full_extrema() {
        let input = table(vec![
            signal_row("S1", 0.0, 2.0),
            signal_row("S1", 1.0, 6.0),
        ]);
        let out = normalize(&input, Some((5.0, 6.0)), false).unwrap();
        assert_eq!(normalized_values(&out, "S1"), vec![0.0, 1.0]);
    }

    #[test]
    fn renormalizing_discards_stale_normalized_rows() {
        let first = normalize(
            &table(vec![
                signal_row("S1", 0.0, 2.0),
                signal_row("S1", 1.0, 4.0),
                signal_row("S1", 2.0, 10.0),
            ]),
            None,
            false,
        )
        .unwrap();

        let second = normalize(&first, Some((0.0, 0.5)), false).unwrap();
        assert_eq!(second.len(), first.len());
        assert_eq!(normalized_values(&second, "S1"), vec![0.0, 1.0, 4.0]);
    }
}
