//! Format parsers: one per instrument family.
//!
//! Each vendor module turns a raw export file plus resolved metadata into an
//! ordered sequence of [`RawRecord`]s tagged with sample and channel. The
//! batch driver walks a fixed file list in order, so the assembled table is
//! deterministic for a given invocation regardless of anything else.

use std::fmt;
use std::path::{Path, PathBuf};

use log::{error, warn};

use crate::config::{ChannelMapping, FlowRateTable};
use crate::data::model::RawRecord;
use crate::error::{Error, Result};
use crate::resolver::{MetadataProvider, ResolverSession};

pub mod agilent;
pub mod shimadzu;
pub mod waters;

// ---------------------------------------------------------------------------
// Vendor dispatch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Vendor {
    Waters,
    Shimadzu,
    Agilent,
}

impl Vendor {
    /// Export file extension for this instrument family (lowercase).
    pub fn extension(&self) -> &'static str {
        match self {
            Vendor::Waters => "arw",
            Vendor::Shimadzu => "asc",
            Vendor::Agilent => "csv",
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vendor::Waters => write!(f, "Waters"),
            Vendor::Shimadzu => write!(f, "Shimadzu"),
            Vendor::Agilent => write!(f, "Agilent"),
        }
    }
}

// ---------------------------------------------------------------------------
// Parser output
// ---------------------------------------------------------------------------

/// One successfully parsed file: its records (volume not yet computed), the
/// flow rate resolved for it, and the run label it declared, if any.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub path: PathBuf,
    pub records: Vec<RawRecord>,
    /// mL/min, constant within one file.
    pub flow_rate: f64,
    pub run_label: Option<String>,
}

/// A whole batch in file-list order, plus the run label (the last parsed
/// file's label wins, matching how repeated header reads behave).
#[derive(Debug, Clone)]
pub struct Batch {
    pub files: Vec<ParsedFile>,
    pub run_label: Option<String>,
}

/// Explicit metadata and config surfaces shared by every file of a batch.
#[derive(Default)]
pub struct BatchOptions<'a> {
    pub flow_rate: Option<f64>,
    pub channel: Option<&'a str>,
    pub flow_table: Option<&'a FlowRateTable>,
    /// Shimadzu only: declared channel columns and their display renames.
    pub channel_mapping: Option<&'a ChannelMapping>,
}

// ---------------------------------------------------------------------------
// Batch driver
// ---------------------------------------------------------------------------

/// Parse every file in order.
///
/// Per-file read and format anomalies are logged and the file is dropped
/// from the batch; resolver failures (ambiguous config, no metadata source)
/// abort the whole run. Files that parse but yield zero data rows are
/// skipped with a warning inside the vendor parser.
pub fn parse_batch(
    vendor: Vendor,
    files: &[PathBuf],
    opts: &BatchOptions,
    session: &mut ResolverSession,
    provider: &mut dyn MetadataProvider,
) -> Result<Batch> {
    let mut parsed = Vec::with_capacity(files.len());
    // Two-detector instruments are the common case when no mapping is given.
    let default_mapping = ChannelMapping::identity(&["A", "B"]);

    for path in files {
        let outcome = match vendor {
            Vendor::Waters => {
                waters::parse(path, opts.flow_rate, opts.flow_table, session, provider)
            }
            Vendor::Shimadzu => {
                let mapping = opts.channel_mapping.unwrap_or(&default_mapping);
                shimadzu::parse(path, mapping, opts.flow_rate, session, provider)
            }
            Vendor::Agilent => {
                agilent::parse(path, opts.flow_rate, opts.channel, session, provider)
            }
        };

        match outcome {
            Ok(Some(file)) => parsed.push(file),
            Ok(None) => {} // empty file, already warned
            Err(e @ (Error::Parse { .. } | Error::Io { .. })) => {
                error!("skipping {}: {e}", path.display());
            }
            Err(fatal) => return Err(fatal),
        }
    }

    let run_label = parsed.last().and_then(|f| f.run_label.clone());
    Ok(Batch {
        files: parsed,
        run_label,
    })
}

// ---------------------------------------------------------------------------
// Shared line-level helpers
// ---------------------------------------------------------------------------

/// Parse one float field, pinning the file and line into the error.
pub(crate) fn parse_float(token: &str, path: &Path, line_no: usize, what: &str) -> Result<f64> {
    token.trim().parse::<f64>().map_err(|_| Error::Parse {
        path: path.to_path_buf(),
        reason: format!("line {line_no}: {what} {token:?} is not a number"),
    })
}

/// Warn-and-skip marker for a file with zero data rows.
pub(crate) fn warn_empty(path: &Path) {
    warn!("file {} is empty; ignoring it", path.display());
}
