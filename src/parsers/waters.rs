//! Waters `.arw` exports.
//!
//! Two header lines (field names, then values, tab-delimited and usually
//! quoted), then whitespace-delimited Time/Signal pairs. The header carries
//! `SampleName` and `Channel`, and optionally `Sample Set Name` (the run
//! label) and `Instrument Method Name` (feeds flow-rate resolution).

use std::collections::HashMap;
use std::path::Path;

use log::warn;

use crate::config::FlowRateTable;
use crate::data::model::RawRecord;
use crate::error::{Error, Result};
use crate::parsers::{parse_float, warn_empty, ParsedFile};
use crate::resolver::{resolve_flow_rate, MetadataProvider, ResolverSession};

/// Parse one Waters file. `Ok(None)` means the file held no data rows and
/// was skipped (logged, not fatal to the batch).
pub fn parse(
    path: &Path,
    explicit_flow: Option<f64>,
    flow_table: Option<&FlowRateTable>,
    session: &mut ResolverSession,
    provider: &mut dyn MetadataProvider,
) -> Result<Option<ParsedFile>> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut lines = text.lines();

    let names = lines.next().ok_or_else(|| header_error(path))?;
    let values = lines.next().ok_or_else(|| header_error(path))?;
    let header = parse_header(names, values);

    // Data first: an empty file must be skipped before any prompting.
    let mut points = Vec::new();
    for (i, line) in lines.enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let line_no = i + 3;
        let mut fields = line.split_whitespace();
        let time = fields.next().ok_or_else(|| pair_error(path, line_no))?;
        let signal = fields.next().ok_or_else(|| pair_error(path, line_no))?;
        points.push((
            parse_float(time, path, line_no, "time")?,
            parse_float(signal, path, line_no, "signal")?,
        ));
    }
    if points.is_empty() {
        warn_empty(path);
        return Ok(None);
    }

    let sample = header
        .get("SampleName")
        .cloned()
        .ok_or_else(|| missing_field(path, "SampleName"))?;
    let channel = header
        .get("Channel")
        .cloned()
        .ok_or_else(|| missing_field(path, "Channel"))?;

    let run_label = header.get("Sample Set Name").cloned();
    if run_label.is_none() {
        warn!("no Sample Set Name in {}", path.display());
    }

    let method = header.get("Instrument Method Name").map(String::as_str);
    let flow_rate = resolve_flow_rate(
        explicit_flow,
        method,
        flow_table,
        session,
        provider,
        &path.display().to_string(),
    )?;

    let records = points
        .into_iter()
        .map(|(time, signal)| RawRecord {
            time,
            signal,
            channel: channel.clone(),
            sample: sample.clone(),
        })
        .collect();

    Ok(Some(ParsedFile {
        path: path.to_path_buf(),
        records,
        flow_rate,
        run_label,
    }))
}

/// Zip the two tab-delimited header lines into field → value, trimming the
/// quotes Waters puts around each cell.
fn parse_header(names: &str, values: &str) -> HashMap<String, String> {
    let clean = |s: &str| s.trim().trim_matches('"').to_string();
    names
        .split('\t')
        .zip(values.split('\t'))
        .map(|(n, v)| (clean(n), clean(v)))
        .collect()
}

fn header_error(path: &Path) -> Error {
    Error::Parse {
        path: path.to_path_buf(),
        reason: "expected two header lines".to_string(),
    }
}

fn pair_error(path: &Path, line_no: usize) -> Error {
    Error::Parse {
        path: path.to_path_buf(),
        reason: format!("line {line_no}: expected a Time/Signal pair"),
    }
}

fn missing_field(path: &Path, field: &str) -> Error {
    Error::Parse {
        path: path.to_path_buf(),
        reason: format!("header is missing {field:?}"),
    }
}
