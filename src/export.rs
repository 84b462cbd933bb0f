//! CSV views of the canonical table.
//!
//! The long file is the authoritative output; the wide pivot (rows = time,
//! columns = "sample channel", cells = raw signal) is a derived convenience
//! for plotting tools and is rebuilt from scratch every time.

use std::io::Write;
use std::path::Path;

use crate::data::model::{LongTable, NormalizationKind};
use crate::error::{Error, Result};

/// Write the long table as CSV, one row per (point, kind).
pub fn write_long<W: Write>(table: &LongTable, writer: W) -> Result<()> {
    let mut w = csv::Writer::from_writer(writer);
    for row in &table.rows {
        w.serialize(row)?;
    }
    w.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn write_long_csv(table: &LongTable, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    write_long(table, file)
}

/// Write the wide pivot: raw `Signal` rows only, times ascending, columns
/// (`"<sample> <channel>"`) lexicographic, colliding cells averaged.
pub fn write_wide<W: Write>(table: &LongTable, writer: W) -> Result<()> {
    let signal_rows: Vec<_> = table
        .rows
        .iter()
        .filter(|r| r.kind == NormalizationKind::Signal)
        .collect();

    // Axis values first, so cells can be placed by index.
    let mut times: Vec<f64> = signal_rows.iter().map(|r| r.time).collect();
    times.sort_by(f64::total_cmp);
    times.dedup_by(|a, b| a.to_bits() == b.to_bits());

    let mut columns: Vec<String> = signal_rows
        .iter()
        .map(|r| format!("{} {}", r.sample, r.channel))
        .collect();
    columns.sort();
    columns.dedup();

    // (sum, count) per cell so duplicate points average out.
    let mut cells = vec![vec![(0.0f64, 0usize); columns.len()]; times.len()];
    for row in &signal_rows {
        let t = match times.binary_search_by(|probe| probe.total_cmp(&row.time)) {
            Ok(i) | Err(i) => i,
        };
        let name = format!("{} {}", row.sample, row.channel);
        let c = match columns.binary_search(&name) {
            Ok(i) | Err(i) => i,
        };
        let cell = &mut cells[t][c];
        cell.0 += row.signal;
        cell.1 += 1;
    }

    // Cells can be absent (not every trace covers every time), so rows are
    // written field by field rather than through serde.
    let mut w = csv::Writer::from_writer(writer);
    let mut header = vec!["time".to_string()];
    header.extend(columns.iter().cloned());
    w.write_record(&header)?;

    for (i, &time) in times.iter().enumerate() {
        let mut record = vec![fmt_float(time)];
        for c in 0..columns.len() {
            let (sum, count) = cells[i][c];
            record.push(if count > 0 {
                fmt_float(sum / count as f64)
            } else {
                String::new()
            });
        }
        w.write_record(&record)?;
    }
    w.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Shortest round-trip float text, matching what serde-based rows emit.
fn fmt_float(value: f64) -> String {
    format!("{value:?}")
}

pub fn write_wide_csv(table: &LongTable, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    write_wide(table, file)
}
