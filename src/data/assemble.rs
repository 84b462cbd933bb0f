//! Canonical assembly: per-file record sequences → one ordered long table.

use crate::data::model::{LongRow, LongTable, NormalizationKind};
use crate::error::{Error, Result};
use crate::parsers::{Batch, ParsedFile};

/// Concatenate every file's records in file-list order, computing the volume
/// axis from each file's flow rate (constant within a file, free to differ
/// across files). Every row enters as a raw `Signal` row.
pub fn assemble(batch: &Batch) -> Result<LongTable> {
    let mut table = LongTable::new();
    for file in &batch.files {
        append_file(&mut table, file)?;
    }
    Ok(table)
}

fn append_file(table: &mut LongTable, file: &ParsedFile) -> Result<()> {
    for (index, record) in file.records.iter().enumerate() {
        let schema_error = |field: &'static str| Error::Schema {
            path: file.path.clone(),
            index,
            field,
        };
        if !record.time.is_finite() {
            return Err(schema_error("time"));
        }
        if !record.signal.is_finite() {
            return Err(schema_error("signal"));
        }
        if record.channel.is_empty() {
            return Err(schema_error("channel"));
        }
        if record.sample.is_empty() {
            return Err(schema_error("sample"));
        }

        table.rows.push(LongRow {
            time: record.time,
            signal: record.signal,
            channel: record.channel.clone(),
            sample: record.sample.clone(),
            volume: record.time * file.flow_rate,
            kind: NormalizationKind::Signal,
            value: record.signal,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::RawRecord;
    use std::path::PathBuf;

    fn record(time: f64, signal: f64) -> RawRecord {
        RawRecord {
            time,
            signal,
            channel: "UV1".to_string(),
            sample: "S1".to_string(),
        }
    }

    fn file(name: &str, flow_rate: f64, records: Vec<RawRecord>) -> ParsedFile {
        ParsedFile {
            path: PathBuf::from(name),
            records,
            flow_rate,
            run_label: None,
        }
    }

    #[test]
    fn volume_uses_the_owning_files_flow_rate() {
        let batch = Batch {
            files: vec![
                file("a.arw", 0.5, vec![record(2.0, 1.0)]),
                file("b.arw", 0.3, vec![record(2.0, 1.0)]),
            ],
            run_label: None,
        };

        let table = assemble(&batch).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].volume, 1.0);
        assert_eq!(table.rows[1].volume, 0.6);
        assert_eq!(table.rows[0].kind, NormalizationKind::Signal);
        assert_eq!(table.rows[0].value, table.rows[0].signal);
    }

    #[test]
    fn holes_in_a_record_are_schema_errors() {
        let mut bad = record(1.0, 1.0);
        bad.channel.clear();
        let batch = Batch {
            files: vec![file("a.arw", 0.5, vec![record(0.0, 1.0), bad])],
            run_label: None,
        };

        let err = assemble(&batch).unwrap_err();
        match err {
            Error::Schema { index, field, .. } => {
                assert_eq!(index, 1);
                assert_eq!(field, "channel");
            }
            other => panic!("expected schema error, got {other}"),
        }
    }

    #[test]
    fn non_finite_signal_is_a_schema_error() {
        let batch = Batch {
            files: vec![file("a.arw", 0.5, vec![record(0.0, f64::NAN)])],
            run_label: None,
        };
        assert!(matches!(
            assemble(&batch).unwrap_err(),
            Error::Schema { field: "signal", .. }
        ));
    }
}
