//! A rendered message waiting to be sent.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use wardflow_store::SyncedItem;

use crate::queue::QueueItem;

/// A wire-ready message queued for delivery at its message time.
///
/// The body is opaque here; rendering happened when the producing event ran.
/// The type and trigger event are kept alongside for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Human-readable name, `TYPE^TRIGGER-MRN`. Used in logs and as part of
    /// the storage key.
    pub name: String,
    pub pathway_name: String,
    /// Message type, e.g. `ADT` or `ORU`.
    pub message_type: String,
    /// Trigger event, e.g. `A01`.
    pub trigger_event: String,
    /// The serialized message exactly as it will be sent.
    pub body: String,
    pub message_time: OffsetDateTime,
    pub is_historical: bool,
}

impl OutboundMessage {
    /// Builds the display name for a message: `TYPE^TRIGGER-MRN`.
    pub fn compose_name(message_type: &str, trigger_event: &str, patient_mrn: &str) -> String {
        format!("{message_type}^{trigger_event}-{patient_mrn}")
    }
}

impl SyncedItem for OutboundMessage {
    fn sync_id(&self) -> String {
        format!("{}:{}", self.name, self.message_time.unix_timestamp())
    }
}

impl QueueItem for OutboundMessage {
    fn due_time(&self) -> OffsetDateTime {
        self.message_time
    }
}
