//! Durable mirroring for wardflow's queues and registry.
//!
//! An [`ItemSyncer`] shadows an in-memory structure in some kind of storage
//! so that a restarted process can pick up where it left off. The in-memory
//! state is always authoritative for the running process; the mirror exists
//! solely for recovery.

pub mod memory;
pub mod traits;

pub use memory::InMemorySyncer;
pub use traits::{ItemSyncer, SyncedItem};
