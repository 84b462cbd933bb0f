//! Assemble, normalize, and reduce liquid-chromatography traces.
//!
//! Vendor export files (Waters `.arw`, Shimadzu `.asc`, Agilent UTF-16
//! `.csv`) are parsed into one canonical long-format table with a computed
//! volume axis, a per-trace normalized signal, and optional uniform-stride
//! downsampling. Missing run metadata (flow rate, detector channel) is
//! reconciled through a deterministic precedence chain: explicit input,
//! config lookup, filename heuristics, then an interactive fallback that is
//! memoized per run.

pub mod config;
pub mod data;
pub mod error;
pub mod experiment;
pub mod export;
pub mod parsers;
pub mod resolver;
pub mod store;

pub use config::{ChannelMapping, FlowRateTable};
pub use data::assemble::assemble;
pub use data::model::{LongRow, LongTable, NormalizationKind, RawRecord};
pub use data::normalize::normalize;
pub use data::reduce::reduce;
pub use error::{Error, Result};
pub use experiment::{concat_experiments, Experiment};
