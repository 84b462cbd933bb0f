use std::path::PathBuf;

use crate::data::model::NormalizationKind;

/// Everything that can go wrong between raw vendor files and a finished
/// long-format table.
///
/// Per-file anomalies (unreadable file, zero data rows) are recovered by the
/// batch driver; every other variant propagates to the caller untouched.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O failure reading a trace or config file.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed vendor file: bad header, bad number, or a channel layout
    /// that does not match what the header declares.
    #[error("{}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },

    /// More than one flow-rate config key is a substring of the method name.
    /// Signals a bad config file; aborts the run rather than prompting.
    #[error(
        "method {method:?} matches multiple flow-rate entries ({first:?} and {second:?}); \
         fix the flow-rate config"
    )]
    AmbiguousFlowRate {
        method: String,
        first: String,
        second: String,
    },

    /// No explicit value, no config match, no filename hint, and no
    /// interactive input available.
    #[error("no {field} available and no way to ask for one")]
    MetadataMissing { field: &'static str },

    /// A parsed record reached the assembler with a hole in it.
    #[error("{}: record {index} is missing {field}", .path.display())]
    Schema {
        path: PathBuf,
        index: usize,
        field: &'static str,
    },

    /// Strict renormalization over a volume window that contains no points.
    #[error(
        "no points between {lo} and {hi} mL for sample {sample:?} channel {channel:?}"
    )]
    NormalizationRange {
        sample: String,
        channel: String,
        lo: f64,
        hi: f64,
    },

    /// Asked for more points than a group has.
    #[error(
        "cannot reduce sample {sample:?} channel {channel:?} ({kind}) to {requested} \
         points: only {available} available"
    )]
    Reduction {
        sample: String,
        channel: String,
        kind: NormalizationKind,
        requested: usize,
        available: usize,
    },

    /// An Experiment slot was assigned twice.
    #[error("experiment {id:?} already has {slot} data")]
    StateConflict { id: String, slot: &'static str },

    /// An Experiment operation that needs a table found the slot empty.
    #[error("experiment {id:?} has no {slot} data")]
    NoData { id: String, slot: &'static str },

    /// The experiment store already holds a document with this id.
    #[error("experiment {id:?} already exists in the store")]
    Conflict { id: String },

    /// JSON (de)serialization of config or experiment documents.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV export failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
