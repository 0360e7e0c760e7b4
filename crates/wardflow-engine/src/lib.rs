//! The wardflow simulation engine.
//!
//! [`Hospital`] owns the event and message queues, the patient registry,
//! and the collaborators that turn pathway steps into outbound messages:
//! bed management, demographics generation, rendering, and the transport.
//! It never sleeps or spawns; callers decide when to ask for the next due
//! event or message, which is what makes the simulation drivable both by a
//! real-time server loop and by tests stepping a logical clock.

pub mod demographics;
mod events;
mod handlers;
pub mod hospital;
pub mod locations;
mod messages;
pub mod processors;
pub mod render;
pub mod resources;
pub mod transport;

pub use demographics::{Demographics, INPATIENT, OUTPATIENT};
pub use hospital::{Hospital, HospitalBuilder};
pub use locations::{ED, LocationDefinition, LocationManager};
pub use processors::{EventProcessor, MessageProcessor, Processors};
pub use render::{HardcodedMessages, MessageRenderer, RenderExtra, RenderRequest, RenderedMessage};
pub use resources::{NullResourceWriter, ResourceWriter};
pub use transport::{MemoryTransport, Transport};
