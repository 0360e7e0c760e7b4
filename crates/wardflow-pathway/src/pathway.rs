//! Pathways and the persons section that names their patients.

use std::borrow::Borrow;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use wardflow_core::{CoreError, Result};

use crate::person::PersonTemplate;
use crate::step::Step;

/// Keyword naming the patient currently used in the pathway.
pub const CURRENT: &str = "CURRENT";

/// Person id given to pathways without an explicit persons section.
pub const DEFAULT_PATIENT_ID: &str = "main-patient";

/// A patient reference within a pathway: either a key of the persons
/// section, an MRN, or the [`CURRENT`] keyword.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientId(String);

impl PatientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_current(&self) -> bool {
        self.0 == CURRENT
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PatientId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PatientId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for PatientId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// The persons section: person id to demographics template, in authoring
/// order. Patients are created in this order when the pathway starts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Persons(IndexMap<PatientId, PersonTemplate>);

impl Persons {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: PatientId, template: PersonTemplate) -> Option<PersonTemplate> {
        self.0.insert(id, template)
    }

    pub fn get(&self, id: &str) -> Option<&PersonTemplate> {
        self.0.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PatientId, &PersonTemplate)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has_one_person(&self) -> bool {
        self.0.len() == 1
    }

    /// The only entry of the section; an error when there are zero or many.
    pub fn only_person(&self) -> Result<(&PatientId, &PersonTemplate)> {
        if !self.has_one_person() {
            return Err(CoreError::InvalidPersonsSection);
        }
        self.0.iter().next().ok_or(CoreError::InvalidPersonsSection)
    }

    /// Whether this is the section `init` adds when the author wrote none:
    /// a single default patient with an empty template.
    pub fn is_default(&self) -> bool {
        self.has_one_person()
            && self
                .get(DEFAULT_PATIENT_ID)
                .is_some_and(PersonTemplate::is_unset)
    }
}

/// The consultant to use whenever the pathway needs one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Consultant {
    pub id: Option<String>,
    pub first_name: Option<String>,
    pub surname: Option<String>,
    pub prefix: Option<String>,
}

/// An ordered sequence of clinical steps for one or more patients.
///
/// `history` steps already happened before the pathway starts and replay
/// with negative time offsets; `steps` play out from the start time onward.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pathway {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage_of_patients: Option<f64>,
    #[serde(skip_serializing_if = "Persons::is_empty")]
    pub persons: Persons,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consultant: Option<Consultant>,
    #[serde(rename = "historical_data", skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<Step>,
    #[serde(rename = "pathway")]
    pub steps: Vec<Step>,
}

impl Pathway {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Prepare a runtime copy: record the name under which the pathway was
    /// selected and make sure the persons section has at least the default
    /// patient.
    pub fn init(&mut self, name: impl Into<String>) {
        self.name = name.into();
        if self.persons.is_empty() {
            self.persons
                .insert(PatientId::from(DEFAULT_PATIENT_ID), PersonTemplate::default());
        }
    }

    /// Whether the author wrote a persons section, as opposed to the
    /// default one added by `init`.
    pub fn has_persons_defined(&self) -> bool {
        !self.persons.is_empty() && !self.persons.is_default()
    }
}
