//! The rendering seam: how patient state becomes a wire-ready message body.
//!
//! The engine decides *when* a message exists and *what* state it reflects;
//! a [`MessageRenderer`] decides what the bytes look like. Keeping the wire
//! format behind this trait lets the same pathway logic drive different
//! output formats.

use time::OffsetDateTime;
use wardflow_core::Result;
use wardflow_core::ir::{Document, Order, PatientInfo, Person};
use wardflow_pathway::Parameters;

/// A message produced by a step, not yet queued.
#[derive(Debug, Clone)]
pub struct RenderedMessage {
    /// Message type, e.g. `ADT` or `ORU`.
    pub message_type: String,
    /// Trigger event, e.g. `A01`.
    pub trigger_event: String,
    pub body: String,
}

/// Everything a renderer gets to produce one message body.
pub struct RenderRequest<'a> {
    pub message_type: &'a str,
    pub trigger_event: &'a str,
    /// The patient record as the step left it.
    pub patient: &'a PatientInfo,
    /// When the step took effect.
    pub event_time: OffsetDateTime,
    /// When the message becomes due.
    pub message_time: OffsetDateTime,
    /// The step's parameters, for header overrides such as the sending
    /// application.
    pub parameters: Option<&'a Parameters>,
    pub extra: RenderExtra<'a>,
}

/// Step-specific payload that accompanies some message kinds.
pub enum RenderExtra<'a> {
    None,
    /// Order and results messages carry the order they report on.
    Order(&'a Order),
    /// Document messages carry the document.
    Document(&'a Document),
    /// Merge messages carry the resolved MRNs of the merged-in patients.
    MergeChildren(&'a [String]),
    /// Bed swaps carry the record of the other patient.
    SwapPartner(&'a PatientInfo),
}

pub trait MessageRenderer: Send + Sync {
    fn render(&self, request: &RenderRequest<'_>) -> Result<String>;
}

/// A source of canned messages selected by a name pattern.
///
/// Hardcoded-message steps pick one matching message at random; the source
/// substitutes the patient's identifiers and the current time into the body.
pub trait HardcodedMessages: Send + Sync {
    fn message(
        &self,
        pattern: &str,
        person: &Person,
        now: OffsetDateTime,
    ) -> Result<RenderedMessage>;
}
