use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// NormalizationKind – which flavour of value a long-table row carries
// ---------------------------------------------------------------------------

/// Whether a row carries the raw detector signal or the [0, 1]-rescaled one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NormalizationKind {
    Signal,
    Normalized,
}

impl fmt::Display for NormalizationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizationKind::Signal => write!(f, "Signal"),
            NormalizationKind::Normalized => write!(f, "Normalized"),
        }
    }
}

// ---------------------------------------------------------------------------
// RawRecord – one parsed data point, before the volume axis exists
// ---------------------------------------------------------------------------

/// A single time/signal point as emitted by a format parser, tagged with the
/// sample and detector channel it belongs to. Volume is computed later by the
/// assembler, once the file's flow rate is known.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// Instrument clock, minutes.
    pub time: f64,
    pub signal: f64,
    pub channel: String,
    pub sample: String,
}

// ---------------------------------------------------------------------------
// LongRow / LongTable – the canonical long-format table
// ---------------------------------------------------------------------------

/// One row of the canonical long table.
///
/// Within a (sample, channel) group and a fixed [`NormalizationKind`], rows
/// are time-monotonic non-decreasing — inherited from the instrument clock,
/// never re-sorted by this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongRow {
    /// Instrument clock, minutes.
    pub time: f64,
    /// Raw detector signal, kept on every row regardless of `kind`.
    pub signal: f64,
    pub channel: String,
    pub sample: String,
    /// Elution volume, mL (`time * flow_rate`).
    pub volume: f64,
    pub kind: NormalizationKind,
    /// `signal` for `kind == Signal`, the derived value for `Normalized`.
    pub value: f64,
}

/// An ordered long-format table. Row order is the file/record emission
/// order; consumers sort for display only, never in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LongTable {
    pub rows: Vec<LongRow>,
}

impl LongTable {
    pub fn new() -> Self {
        LongTable { rows: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Group row indices by an arbitrary key, preserving first-appearance
    /// order of the keys and input order within each group. Grouped
    /// transforms re-emit groups in exactly this order, so the output stays
    /// deterministic for a fixed file-list traversal.
    pub fn group_indices<K, F>(&self, key: F) -> Vec<(K, Vec<usize>)>
    where
        K: Eq + Hash + Clone,
        F: Fn(&LongRow) -> K,
    {
        let mut order: Vec<(K, Vec<usize>)> = Vec::new();
        let mut seen: HashMap<K, usize> = HashMap::new();

        for (i, row) in self.rows.iter().enumerate() {
            let k = key(row);
            match seen.get(&k) {
                Some(&slot) => order[slot].1.push(i),
                None => {
                    seen.insert(k.clone(), order.len());
                    order.push((k, vec![i]));
                }
            }
        }
        order
    }

    /// (sample, channel) groups in first-appearance order.
    pub fn trace_groups(&self) -> Vec<((String, String), Vec<usize>)> {
        self.group_indices(|r| (r.sample.clone(), r.channel.clone()))
    }

    /// (sample, channel, kind) groups in first-appearance order.
    pub fn series_groups(&self) -> Vec<((String, String, NormalizationKind), Vec<usize>)> {
        self.group_indices(|r| (r.sample.clone(), r.channel.clone(), r.kind))
    }
}
