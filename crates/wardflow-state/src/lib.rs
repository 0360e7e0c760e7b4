//! Runtime state for the wardflow simulator.
//!
//! Everything the engine mutates while pathways run lives here: the
//! time-ordered queues that hold pending events and outbound messages, the
//! per-patient aggregate that accumulates orders, documents, and past visits,
//! and the registry that indexes patients by MRN. All of it can be mirrored
//! to durable storage through the [`wardflow_store`] contracts so a restarted
//! process resumes where the previous one stopped.

pub mod event;
pub mod message;
pub mod patient;
pub mod queue;
pub mod registry;

pub use event::Event;
pub use message::OutboundMessage;
pub use patient::Patient;
pub use queue::{
    EVENT_ITEM_TYPE, MESSAGE_ITEM_TYPE, PATIENT_ITEM_TYPE, QueueItem, TimeOrderedQueue,
};
pub use registry::PatientRegistry;
