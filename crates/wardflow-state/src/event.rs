//! The unit of scheduled work: one pathway step bound to a patient and a time.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use wardflow_pathway::{PatientId, Step};
use wardflow_store::SyncedItem;

use crate::queue::QueueItem;

/// One pending step of a running pathway.
///
/// An event carries everything needed to process its step and to schedule the
/// follow-on event: the remaining steps, the identifier mapping for
/// multi-patient pathways, and the historical flag that anchors past steps to
/// the pathway start instead of the event time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// When the step should run.
    pub event_time: OffsetDateTime,
    /// When messages produced by the step should be sent.
    pub message_time: OffsetDateTime,
    pub pathway_name: String,
    /// MRN of the patient the step applies to.
    pub patient_mrn: String,
    pub step: Step,
    /// Historical steps still to run before the live pathway resumes.
    pub history: Vec<Step>,
    /// Live steps still to run after this one.
    pub steps: Vec<Step>,
    /// When the pathway started; historical steps compute times from here.
    pub pathway_started: OffsetDateTime,
    /// Whether this step came from the historical section.
    pub is_historical: bool,
    /// Position of the step in the pathway, starting at zero.
    pub index: u32,
    /// Maps pathway person identifiers to the MRNs minted for them.
    pub patient_ids: HashMap<PatientId, String>,
}

impl Event {
    /// Resolves a pathway person identifier to an MRN.
    ///
    /// Identifiers not present in the mapping are treated as literal MRNs,
    /// which is how pathways reference pre-existing patients.
    pub fn resolve_mrn(&self, id: &PatientId) -> String {
        match self.patient_ids.get(id) {
            Some(mrn) => mrn.clone(),
            None => id.as_str().to_string(),
        }
    }
}

impl SyncedItem for Event {
    fn sync_id(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}",
            self.pathway_name,
            self.patient_mrn,
            self.index,
            self.event_time.unix_timestamp(),
            self.message_time.unix_timestamp()
        )
    }
}

impl QueueItem for Event {
    fn due_time(&self) -> OffsetDateTime {
        self.event_time
    }
}
