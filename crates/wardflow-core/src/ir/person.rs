use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A person. Empty string fields are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub prefix: String,
    pub first_name: String,
    pub middle_name: String,
    pub surname: String,
    pub suffix: String,
    pub gender: String,
    pub ethnicity: Option<CodedElement>,
    pub birth: Option<OffsetDateTime>,
    pub date_of_death: Option<OffsetDateTime>,
    pub phone_number: String,
    /// Medical record number; the patient's stable key.
    pub mrn: String,
    pub nhs: String,
    /// "Y" once the person is recorded as deceased, "N" when explicitly alive.
    pub death_indicator: String,
}

impl Person {
    /// Full name built from the non-empty name parts.
    pub fn full_name(&self) -> String {
        join_non_empty(
            &[
                &self.prefix,
                &self.first_name,
                &self.middle_name,
                &self.surname,
                &self.suffix,
            ],
            " ",
        )
    }

    pub fn is_deceased(&self) -> bool {
        self.date_of_death.is_some()
    }
}

/// A coded element: an identifier plus its human-readable text and the
/// coding system both belong to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodedElement {
    pub id: String,
    pub text: String,
    pub coding_system: String,
}

impl CodedElement {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            coding_system: String::new(),
        }
    }
}

/// A doctor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: String,
    pub surname: String,
    pub first_name: String,
    pub prefix: String,
    pub specialty: String,
}

/// An allergy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Allergy {
    pub allergy_type: String,
    pub description: CodedElement,
    pub severity: String,
    pub reaction: String,
    pub identified: Option<OffsetDateTime>,
}

/// A clinical diagnosis or procedure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisOrProcedure {
    pub description: Option<CodedElement>,
    pub kind: String,
    pub clinician: Option<Doctor>,
    pub date_time: Option<OffsetDateTime>,
}

fn join_non_empty(parts: &[&str], separator: &str) -> String {
    parts
        .iter()
        .filter(|s| !s.trim().is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(separator)
}
