//! The per-run aggregate: zero or one HPLC table plus zero or one FPLC
//! table, with renormalization, reduction, and cross-run concatenation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::model::LongTable;
use crate::data::normalize::{normalize, VolumeRange};
use crate::data::reduce::reduce;
use crate::error::{Error, Result};

/// Document schema version for stored experiments.
pub const EXPERIMENT_VERSION: u32 = 3;

// ---------------------------------------------------------------------------
// Experiment
// ---------------------------------------------------------------------------

/// One run's worth of assembled tables.
///
/// Slots are set-once: assigning a table to an occupied slot fails with
/// [`Error::StateConflict`]. Build a fresh Experiment to replace data.
/// (Slots only accept [`LongTable`], so a wrongly-typed payload is a compile
/// error rather than a runtime one.)
#[derive(Debug, Clone)]
pub struct Experiment {
    id: String,
    hplc: Option<LongTable>,
    fplc: Option<LongTable>,
}

impl Experiment {
    pub fn new(id: impl Into<String>) -> Self {
        Experiment {
            id: id.into(),
            hplc: None,
            fplc: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn hplc(&self) -> Option<&LongTable> {
        self.hplc.as_ref()
    }

    pub fn fplc(&self) -> Option<&LongTable> {
        self.fplc.as_ref()
    }

    pub fn set_hplc(&mut self, table: LongTable) -> Result<()> {
        if self.hplc.is_some() {
            return Err(Error::StateConflict {
                id: self.id.clone(),
                slot: "HPLC",
            });
        }
        self.hplc = Some(table);
        Ok(())
    }

    pub fn set_fplc(&mut self, table: LongTable) -> Result<()> {
        if self.fplc.is_some() {
            return Err(Error::StateConflict {
                id: self.id.clone(),
                slot: "FPLC",
            });
        }
        self.fplc = Some(table);
        Ok(())
    }

    /// Re-derive the HPLC `Normalized` rows over a new volume window.
    pub fn renormalize_hplc(&mut self, range: Option<VolumeRange>, strict: bool) -> Result<()> {
        let table = self.hplc.as_ref().ok_or_else(|| Error::NoData {
            id: self.id.clone(),
            slot: "HPLC",
        })?;
        self.hplc = Some(normalize(table, range, strict)?);
        Ok(())
    }

    /// Re-derive the FPLC `Normalized` rows over a new volume window.
    pub fn renormalize_fplc(&mut self, range: Option<VolumeRange>, strict: bool) -> Result<()> {
        let table = self.fplc.as_ref().ok_or_else(|| Error::NoData {
            id: self.id.clone(),
            slot: "FPLC",
        })?;
        self.fplc = Some(normalize(table, range, strict)?);
        Ok(())
    }

    /// Downsample the HPLC table to `points` per series. A no-op when the
    /// slot is empty.
    pub fn reduce_hplc(&mut self, points: usize) -> Result<()> {
        if let Some(table) = self.hplc.as_ref() {
            self.hplc = Some(reduce(table, points)?);
        }
        Ok(())
    }

    /// Serialize for the document store: empty slots become empty strings.
    pub fn to_document(&self) -> Result<ExperimentDocument> {
        let encode = |slot: &Option<LongTable>| -> Result<String> {
            match slot {
                Some(table) => Ok(serde_json::to_string(table)?),
                None => Ok(String::new()),
            }
        };
        Ok(ExperimentDocument {
            id: self.id.clone(),
            version: EXPERIMENT_VERSION,
            hplc: encode(&self.hplc)?,
            fplc: encode(&self.fplc)?,
        })
    }
}

impl fmt::Display for Experiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds = match (&self.hplc, &self.fplc) {
            (Some(_), Some(_)) => "HPLC and FPLC",
            (Some(_), None) => "HPLC",
            (None, Some(_)) => "FPLC",
            (None, None) => "no",
        };
        write!(f, "Experiment {:?} with {kinds} data", self.id)
    }
}

/// The wire shape handed to an [`crate::store::ExperimentStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub version: u32,
    /// JSON-serialized [`LongTable`], or empty when the slot was unset.
    pub hplc: String,
    pub fplc: String,
}

// ---------------------------------------------------------------------------
// Aggregation across runs
// ---------------------------------------------------------------------------

/// Merge many experiments into one composite, id `"Combined"`.
///
/// HPLC samples are prefixed with `"<id>: "` so lanes from different runs
/// stay distinguishable; FPLC samples are replaced by the experiment id
/// outright (an FPLC run has one sample per run, not per lane). Experiments
/// contributing nothing to an axis are skipped for that axis; an axis with
/// zero contributors stays unset.
pub fn concat_experiments(experiments: &[Experiment]) -> Experiment {
    let mut hplc = LongTable::new();
    let mut fplc = LongTable::new();

    for exp in experiments {
        if let Some(table) = exp.hplc() {
            for row in &table.rows {
                let mut row = row.clone();
                row.sample = format!("{}: {}", exp.id, row.sample);
                hplc.rows.push(row);
            }
        }
    }

    for exp in experiments {
        if let Some(table) = exp.fplc() {
            for row in &table.rows {
                let mut row = row.clone();
                row.sample = exp.id.clone();
                fplc.rows.push(row);
            }
        }
    }

    let mut combined = Experiment::new("Combined");
    if !hplc.is_empty() {
        combined.hplc = Some(hplc);
    }
    if !fplc.is_empty() {
        combined.fplc = Some(fplc);
    }
    combined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{LongRow, NormalizationKind};
    use std::collections::BTreeSet;

    fn one_row_table(sample: &str) -> LongTable {
        LongTable {
            rows: vec![LongRow {
                time: 1.0,
                signal: 2.0,
                channel: "UV1".to_string(),
                sample: sample.to_string(),
                volume: 0.5,
                kind: NormalizationKind::Signal,
                value: 2.0,
            }],
        }
    }

    fn experiment_with_hplc(id: &str, sample: &str) -> Experiment {
        let mut exp = Experiment::new(id);
        exp.set_hplc(one_row_table(sample)).unwrap();
        exp
    }

    #[test]
    fn slots_are_set_once() {
        let mut exp = Experiment::new("run1");
        exp.set_hplc(one_row_table("S1")).unwrap();
        let err = exp.set_hplc(one_row_table("S2")).unwrap_err();
        assert!(matches!(err, Error::StateConflict { slot: "HPLC", .. }));
        // The original table survives the rejected assignment.
        assert_eq!(exp.hplc().unwrap().rows[0].sample, "S1");
    }

    #[test]
    fn concat_prefixes_hplc_samples_and_replaces_fplc_samples() {
        let a = experiment_with_hplc("runA", "S1");
        let mut b = Experiment::new("runB");
        b.set_fplc(one_row_table("whatever")).unwrap();

        let combined = concat_experiments(&[a, b]);
        assert_eq!(combined.id(), "Combined");
        assert_eq!(combined.hplc().unwrap().rows[0].sample, "runA: S1");
        assert_eq!(combined.fplc().unwrap().rows[0].sample, "runB");
    }

    #[test]
    fn concat_skips_axes_with_zero_contributors() {
        let a = experiment_with_hplc("runA", "S1");
        let combined = concat_experiments(&[a]);
        assert!(combined.hplc().is_some());
        assert!(combined.fplc().is_none());
    }

    #[test]
    fn concat_is_associative_over_sample_sets() {
        let a = experiment_with_hplc("A", "S1");
        let b = experiment_with_hplc("B", "S2");
        let c = experiment_with_hplc("C", "S3");

        let samples = |exp: &Experiment| -> BTreeSet<String> {
            exp.hplc()
                .map(|t| t.rows.iter().map(|r| r.sample.clone()).collect())
                .unwrap_or_default()
        };

        let direct = concat_experiments(&[a.clone(), b.clone(), c.clone()]);
        let ab = concat_experiments(&[a, b]);
        let staged = concat_experiments(&[ab, c]);

        // Staged concatenation re-prefixes with "Combined: ", so compare the
        // underlying sample identities, not the display strings.
        let strip = |set: BTreeSet<String>| -> BTreeSet<String> {
            set.into_iter()
                .map(|s| s.rsplit(": ").next().unwrap_or(&s).to_string())
                .collect()
        };
        assert_eq!(strip(samples(&direct)), strip(samples(&staged)));
    }

    #[test]
    fn renormalize_requires_data() {
        let mut exp = Experiment::new("empty");
        let err = exp.renormalize_hplc(None, false).unwrap_err();
        assert!(matches!(err, Error::NoData { slot: "HPLC", .. }));
    }

    #[test]
    fn reduce_on_an_empty_slot_is_a_no_op() {
        let mut exp = Experiment::new("empty");
        exp.reduce_hplc(10).unwrap();
        assert!(exp.hplc().is_none());
    }

    #[test]
    fn document_serializes_empty_slots_as_empty_strings() {
        let exp = experiment_with_hplc("runA", "S1");
        let doc = exp.to_document().unwrap();
        assert_eq!(doc.id, "runA");
        assert_eq!(doc.version, EXPERIMENT_VERSION);
        assert!(doc.hplc.contains("\"sample\":\"S1\""));
        assert_eq!(doc.fplc, "");
    }
}
