//! Pathway model for the wardflow simulator.
//!
//! A pathway is an ordered sequence of clinical steps for one or more
//! patients: admissions, transfers, orders, results, discharges and so on.
//! This crate owns the step vocabulary and the [`PathwaySupplier`] seam the
//! engine pulls pathways from; loading pathways from files and choosing
//! between them by distribution weights belongs to supplier implementations.

pub mod pathway;
pub mod person;
pub mod step;
pub mod supplier;

pub use pathway::{CURRENT, Consultant, DEFAULT_PATIENT_ID, Pathway, PatientId, Persons};
pub use person::{Age, PersonTemplate};
pub use step::{DeathStatus, Delay, Parameters, Step, StepKind, TrackMode};
pub use supplier::{PathwaySupplier, RoundRobinSupplier};
