//! Pluggable processing stages around the built-in event and message
//! handling.
//!
//! Each event and each message passes through three stages: pre processors
//! run first, override processors replace the built-in handling when any of
//! them matches, and post processors run last. A processor only sees the
//! items its `matches` accepts.

use wardflow_core::Result;
use wardflow_state::{Event, OutboundMessage, Patient};

use crate::render::RenderedMessage;

/// Custom handling for events. Messages returned from `process` are queued
/// for delivery at the event's message time.
pub trait EventProcessor: Send + Sync {
    fn matches(&self, event: &Event) -> bool;

    fn process(&self, event: &mut Event, patient: &mut Patient) -> Result<Vec<RenderedMessage>>;
}

/// Custom handling for outbound messages.
pub trait MessageProcessor: Send + Sync {
    fn matches(&self, message: &OutboundMessage) -> bool;

    fn process(&self, message: &mut OutboundMessage) -> Result<()>;
}

/// The processors a hospital runs, grouped by stage. Empty by default;
/// every stage is optional.
#[derive(Default)]
pub struct Processors {
    pub event_pre: Vec<Box<dyn EventProcessor>>,
    pub event_override: Vec<Box<dyn EventProcessor>>,
    pub event_post: Vec<Box<dyn EventProcessor>>,
    pub message_pre: Vec<Box<dyn MessageProcessor>>,
    pub message_override: Vec<Box<dyn MessageProcessor>>,
    pub message_post: Vec<Box<dyn MessageProcessor>>,
}
