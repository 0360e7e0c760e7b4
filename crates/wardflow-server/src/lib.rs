//! The wardflow simulator binary: configuration, the control-plane HTTP
//! surface, Prometheus export, and the loops that drive the hospital.
//!
//! Everything that talks to the outside world lives here; the engine crates
//! below stay free of sockets, files, and process-wide state.

pub mod config;
pub mod http;
pub mod metrics;
pub mod observability;
pub mod pathways;
pub mod render;
pub mod runner;
pub mod transport;
