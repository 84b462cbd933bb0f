//! Uniform-stride downsampling.

use crate::data::model::LongTable;
use crate::error::{Error, Result};

/// Downsample every (sample, channel, kind) series to roughly
/// `target_points` rows.
///
/// For a series of `n` rows the stride is `n / target_points` (integer
/// division); rows at indices `0, stride, 2*stride, …` survive and the
/// trailing remainder is dropped. Subsampling, never interpolation: row 0 of
/// each reduced series is row 0 of the original. A series shorter than
/// `target_points` makes the stride zero, which is reported as an error
/// naming the series instead of silently returning every row. Any error
/// leaves no partial output.
pub fn reduce(table: &LongTable, target_points: usize) -> Result<LongTable> {
    let mut out = LongTable::new();

    for ((sample, channel, kind), indices) in table.series_groups() {
        let stride = if target_points == 0 {
            0
        } else {
            indices.len() / target_points
        };
        if stride == 0 {
            return Err(Error::Reduction {
                sample,
                channel,
                kind,
                requested: target_points,
                available: indices.len(),
            });
        }
        for &i in indices.iter().step_by(stride) {
            out.rows.push(table.rows[i].clone());
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{LongRow, NormalizationKind};

    fn series(sample: &str, kind: NormalizationKind, n: usize) -> Vec<LongRow> {
        (0..n)
            .map(|i| LongRow {
                time: i as f64,
                signal: i as f64,
                channel: "UV1".to_string(),
                sample: sample.to_string(),
                volume: i as f64 * 0.5,
                kind,
                value: i as f64,
            })
            .collect()
    }

    #[test]
    fn even_series_reduce_to_the_requested_count() {
        let table = LongTable {
            rows: series("S1", NormalizationKind::Signal, 100),
        };

        let out = reduce(&table, 10).unwrap();
        assert_eq!(out.len(), 10);
        // Stride 10, anchored at row 0.
        assert_eq!(out.rows[0].time, 0.0);
        assert_eq!(out.rows[1].time, 10.0);
        assert_eq!(out.rows[9].time, 90.0);
    }

    #[test]
    fn each_series_is_reduced_independently() {
        let mut rows = series("S1", NormalizationKind::Signal, 20);
        rows.extend(series("S1", NormalizationKind::Normalized, 20));
        rows.extend(series("S2", NormalizationKind::Signal, 40));
        let table = LongTable { rows };

        let out = reduce(&table, 10).unwrap();
        assert_eq!(out.len(), 10 + 10 + 10);
        let s2_stride_rows: Vec<f64> = out
            .rows
            .iter()
            .filter(|r| r.sample == "S2")
            .map(|r| r.time)
            .collect();
        assert_eq!(s2_stride_rows[1], 4.0); // stride 40 / 10
    }

    #[test]
    fn asking_for_more_points_than_available_fails() {
        let table = LongTable {
            rows: series("S1", NormalizationKind::Signal, 5),
        };

        let err = reduce(&table, 10).unwrap_err();
        match err {
            Error::Reduction {
                sample,
                requested,
                available,
                ..
            } => {
                assert_eq!(sample, "S1");
                assert_eq!(requested, 10);
                assert_eq!(available, 5);
            }
            other => panic!("expected reduction error, got {other}"),
        }
    }

    #[test]
    fn zero_target_points_fails() {
        let table = LongTable {
            rows: series("S1", NormalizationKind::Signal, 5),
        };
        assert!(matches!(
            reduce(&table, 0).unwrap_err(),
            Error::Reduction { .. }
        ));
    }
}
