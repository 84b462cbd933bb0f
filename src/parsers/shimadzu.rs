//! Shimadzu `.asc` exports.
//!
//! Sixteen header lines form a transposed key→value block: the first column
//! is the stat name, followed by one value column per detector channel. The
//! body is a single column of signal values with no time axis — one block of
//! `Total Data Points:` values per declared channel, in channel order. Time
//! is synthesized as `index * sampling_interval / 60` (seconds → minutes).

use std::collections::HashMap;
use std::path::Path;

use crate::config::ChannelMapping;
use crate::data::model::RawRecord;
use crate::error::{Error, Result};
use crate::parsers::{parse_float, warn_empty, ParsedFile};
use crate::resolver::{resolve_flow_rate, MetadataProvider, ResolverSession};

const HEADER_LINES: usize = 16;

/// Parse one Shimadzu file. `Ok(None)` means zero data rows (skipped).
pub fn parse(
    path: &Path,
    mapping: &ChannelMapping,
    explicit_flow: Option<f64>,
    session: &mut ResolverSession,
    provider: &mut dyn MetadataProvider,
) -> Result<Option<ParsedFile>> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut lines = text.lines();

    // Transposed header: stat name, then one value per channel column. Only
    // the first channel's column is consulted, the stats are shared.
    let mut stats: HashMap<String, String> = HashMap::new();
    for _ in 0..HEADER_LINES {
        let line = lines.next().ok_or_else(|| Error::Parse {
            path: path.to_path_buf(),
            reason: format!("expected {HEADER_LINES} header lines"),
        })?;
        let mut fields = line.split('\t');
        if let Some(stat) = fields.next() {
            let value = fields.next().unwrap_or("").trim().to_string();
            stats.insert(stat.trim().to_string(), value);
        }
    }

    let mut signals = Vec::new();
    for (i, line) in lines.enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        signals.push(parse_float(line, path, HEADER_LINES + i + 1, "signal")?);
    }
    if signals.is_empty() {
        warn_empty(path);
        return Ok(None);
    }

    let points: usize = stat(path, &stats, "Total Data Points:")?
        .parse()
        .map_err(|_| Error::Parse {
            path: path.to_path_buf(),
            reason: "Total Data Points: is not an integer".to_string(),
        })?;
    let interval: f64 = stat(path, &stats, "Sampling Rate:")?
        .parse()
        .map_err(|_| Error::Parse {
            path: path.to_path_buf(),
            reason: "Sampling Rate: is not a number".to_string(),
        })?;
    let sample = stat(path, &stats, "Sample ID:")?;

    // `/`, ` `, `:` make terrible directory names.
    let run_label = stats.get("Acquisition Date and Time:").map(|raw| {
        raw.replace('/', "-").replace(' ', "_").replace(':', "-")
    });

    let channels = mapping.raw_names();
    if signals.len() != points * channels.len() {
        return Err(Error::Parse {
            path: path.to_path_buf(),
            reason: format!(
                "{} data rows do not match {points} points x {} declared channels",
                signals.len(),
                channels.len()
            ),
        });
    }

    let flow_rate = resolve_flow_rate(
        explicit_flow,
        None,
        None,
        session,
        provider,
        &path.display().to_string(),
    )?;

    // One contiguous block per channel; the clock restarts for each.
    let mut records = Vec::with_capacity(signals.len());
    for (c, raw_name) in channels.iter().enumerate() {
        let display = mapping.display_name(raw_name);
        for i in 0..points {
            records.push(RawRecord {
                time: i as f64 * interval / 60.0,
                signal: signals[c * points + i],
                channel: display.to_string(),
                sample: sample.clone(),
            });
        }
    }

    Ok(Some(ParsedFile {
        path: path.to_path_buf(),
        records,
        flow_rate,
        run_label,
    }))
}

fn stat(path: &Path, stats: &HashMap<String, String>, key: &str) -> Result<String> {
    stats.get(key).cloned().ok_or_else(|| Error::Parse {
        path: path.to_path_buf(),
        reason: format!("header is missing {key:?}"),
    })
}
