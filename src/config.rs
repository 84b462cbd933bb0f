use std::collections::BTreeMap;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// FlowRateTable – method-name substring → flow rate (mL/min)
// ---------------------------------------------------------------------------

/// Flow-rate lookup config. Keys are matched as substrings of the run's
/// instrument method name; at most one key may match a given method.
///
/// JSON shape: `{ "10_300": 0.5, "5_150": 0.3 }`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowRateTable {
    rates: BTreeMap<String, f64>,
}

impl FlowRateTable {
    /// Load from a JSON file. A missing file degrades resolution to the
    /// later steps of the precedence chain, so it is logged, not fatal.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("no flow-rate config at {}", path.display());
                return Ok(None);
            }
            Err(source) => {
                return Err(Error::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Ok(Some(serde_json::from_str(&text)?))
    }

    /// Find the unique key that is a substring of `method`.
    ///
    /// Zero matches is `Ok(None)` (the caller falls through to the next
    /// resolution step); two or more matches is a config error that aborts
    /// the run.
    pub fn lookup(&self, method: &str) -> Result<Option<f64>> {
        let mut found: Option<(&str, f64)> = None;
        for (key, &rate) in &self.rates {
            if method.contains(key.as_str()) {
                if let Some((first, _)) = found {
                    return Err(Error::AmbiguousFlowRate {
                        method: method.to_string(),
                        first: first.to_string(),
                        second: key.clone(),
                    });
                }
                found = Some((key, rate));
            }
        }
        Ok(found.map(|(_, rate)| rate))
    }

    /// Build a table in code, bypassing the JSON file.
    pub fn from_pairs(pairs: &[(&str, f64)]) -> Self {
        FlowRateTable {
            rates: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// ChannelMapping – raw Shimadzu channel label → display label
// ---------------------------------------------------------------------------

/// One raw → display channel rename.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelRename {
    pub raw: String,
    pub display: String,
}

/// Ordered channel mapping for Shimadzu files. The order of entries defines
/// the column order of the 16-line header block, so this is a JSON array
/// rather than an object:
///
/// `[{ "raw": "A", "display": "Trp" }, { "raw": "B", "display": "GFP" }]`
///
/// Renaming is a total replacement of the raw label, not a default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelMapping {
    entries: Vec<ChannelRename>,
}

impl ChannelMapping {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Identity mapping for detectors named by the instrument itself.
    pub fn identity(raw_names: &[&str]) -> Self {
        ChannelMapping {
            entries: raw_names
                .iter()
                .map(|name| ChannelRename {
                    raw: name.to_string(),
                    display: name.to_string(),
                })
                .collect(),
        }
    }

    /// Raw channel labels in header-column order.
    pub fn raw_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.raw.as_str()).collect()
    }

    pub fn channel_count(&self) -> usize {
        self.entries.len()
    }

    /// Display label for a raw label; unmapped labels pass through.
    pub fn display_name<'a>(&'a self, raw: &'a str) -> &'a str {
        self.entries
            .iter()
            .find(|e| e.raw == raw)
            .map(|e| e.display.as_str())
            .unwrap_or(raw)
    }
}
