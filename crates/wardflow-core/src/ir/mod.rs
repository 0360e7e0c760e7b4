//! Internal representation of clinical entities: people, locations,
//! encounters, orders, and documents. These records are what pathway steps
//! mutate; rendering them into wire messages belongs to collaborators.

mod document;
mod encounter;
mod location;
mod order;
mod patient;
mod person;

pub use document::Document;
pub use encounter::{Encounter, EncounterStatus, LocationHistory, StatusHistory};
pub use location::PatientLocation;
pub use order::{ClinicalNote, ClinicalNoteContent, ClinicalResult, Order, DIAGNOSTIC_SERV_DOC};
pub use patient::{AccountStatus, PatientInfo};
pub use person::{Allergy, CodedElement, DiagnosisOrProcedure, Doctor, Person};
