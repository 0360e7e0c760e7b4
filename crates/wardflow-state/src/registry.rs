//! The MRN-indexed collection of live patients.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use wardflow_store::{ItemSyncer, SyncedItem};

use crate::patient::Patient;

/// Tracks every patient with pending work, indexed by MRN.
///
/// Lookups return clones: callers mutate their copy and [`Self::put`] it back,
/// which is also the point where the durable mirror is refreshed. The
/// `evict_after_delete` flag controls whether finished patients leave the map
/// or stay resident so their records survive for later pathways.
pub struct PatientRegistry {
    map: Mutex<HashMap<String, Patient>>,
    syncer: Option<Arc<dyn ItemSyncer<Patient>>>,
    evict_after_delete: bool,
}

impl PatientRegistry {
    pub fn new(evict_after_delete: bool) -> Self {
        Self {
            map: Mutex::new(HashMap::new()),
            syncer: None,
            evict_after_delete,
        }
    }

    /// Creates a registry that mirrors every put and delete to the syncer.
    pub fn with_syncer(syncer: Arc<dyn ItemSyncer<Patient>>, evict_after_delete: bool) -> Self {
        Self {
            map: Mutex::new(HashMap::new()),
            syncer: Some(syncer),
            evict_after_delete,
        }
    }

    /// Stores the patient under their MRN and refreshes the mirror.
    pub fn put(&self, patient: Patient) {
        let mut map = self.map.lock();
        if let Some(syncer) = self.syncer.as_ref() {
            if let Err(e) = syncer.write(&patient) {
                tracing::error!(patient_id = %patient.mrn(), error = %e, "Cannot write patient to the syncer");
            }
        }
        map.insert(patient.sync_id(), patient);
    }

    /// Returns a copy of the patient, falling back to the mirror when the MRN
    /// is not resident. A mirror hit repopulates the map.
    pub fn get(&self, mrn: &str) -> Option<Patient> {
        let mut map = self.map.lock();
        if let Some(patient) = map.get(mrn) {
            return Some(patient.clone());
        }
        let syncer = self.syncer.as_ref()?;
        match syncer.load_by_id(mrn) {
            Ok(Some(patient)) => {
                map.insert(patient.sync_id(), patient.clone());
                Some(patient)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::error!(patient_id = %mrn, error = %e, "Could not get patient from synced storage");
                None
            }
        }
    }

    /// Removes the patient from the mirror and, when eviction is on, from the
    /// map. The mirror entry is removed even when the patient is not resident,
    /// which needs a load first because the mirror contract deletes by item.
    pub fn delete(&self, mrn: &str) {
        let mut map = self.map.lock();
        if let Some(syncer) = self.syncer.as_ref() {
            let patient = match map.get(mrn) {
                Some(patient) => Some(patient.clone()),
                None => syncer.load_by_id(mrn).unwrap_or_else(|e| {
                    tracing::error!(patient_id = %mrn, error = %e, "Could not get patient from synced storage");
                    None
                }),
            };
            if let Some(patient) = patient {
                if let Err(e) = syncer.delete(&patient) {
                    tracing::error!(patient_id = %mrn, error = %e, "Cannot delete patient from the syncer");
                }
            }
        }
        if self.evict_after_delete {
            map.remove(mrn);
        }
    }

    /// Number of patients resident in the map.
    pub fn len(&self) -> usize {
        self.map.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.lock().is_empty()
    }
}
