//! Collaborator boundaries: persistence and notification.
//!
//! The pipeline itself owns no storage. These traits are the abstract
//! contracts downstream glue implements; the in-memory store exists for
//! tests and dry runs.

use std::collections::BTreeMap;
use std::path::PathBuf;

use log::debug;

use crate::error::{Error, Result};
use crate::experiment::ExperimentDocument;

/// Document store for finished experiments. Ids are unique; storing an
/// existing id fails with [`Error::Conflict`] rather than overwriting.
pub trait ExperimentStore {
    fn store(&mut self, doc: ExperimentDocument) -> Result<()>;
}

/// Keeps documents in a map. Useful for tests and `--dry-run` style flows.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: BTreeMap<String, ExperimentDocument>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&ExperimentDocument> {
        self.docs.get(id)
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

impl ExperimentStore for MemoryStore {
    fn store(&mut self, doc: ExperimentDocument) -> Result<()> {
        if self.docs.contains_key(&doc.id) {
            return Err(Error::Conflict { id: doc.id });
        }
        self.docs.insert(doc.id.clone(), doc);
        Ok(())
    }
}

/// Fire-and-forget notification about produced artifacts. Callers tolerate
/// its absence, so the trait cannot fail.
pub trait Notifier {
    fn notify(&self, paths: &[PathBuf]);
}

/// Notifier that does nothing beyond a debug log line.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, paths: &[PathBuf]) {
        debug!("notification suppressed for {} path(s)", paths.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str) -> ExperimentDocument {
        ExperimentDocument {
            id: id.to_string(),
            version: 3,
            hplc: String::new(),
            fplc: String::new(),
        }
    }

    #[test]
    fn duplicate_ids_conflict() {
        let mut store = MemoryStore::new();
        store.store(doc("runA")).unwrap();
        let err = store.store(doc("runA")).unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
        assert_eq!(store.len(), 1);
    }
}
