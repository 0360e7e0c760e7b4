use thiserror::Error;

/// Core error types for wardflow operations.
///
/// State errors abort the item being processed but never the engine; the
/// metric label for a failed step is the error's display string, so the
/// wording of these messages is part of the observable behavior.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("queue is empty")]
    EmptyQueue,

    #[error("unknown patient: {0}")]
    UnknownPatient(String),

    #[error("unknown pathway: {0}")]
    UnknownPathway(String),

    #[error("unknown patient reference: {0}")]
    UnknownPatientReference(String),

    #[error("patient {0} is already admitted")]
    AlreadyAdmitted(String),

    #[error("past visits empty")]
    PastVisitsEmpty,

    #[error("invalid persons section")]
    InvalidPersonsSection,

    #[error("invalid merge state: parent {parent} is not the current patient {current}")]
    InvalidMergeState { parent: String, current: String },

    #[error("invalid bed swap state: patient {patient} is not the current patient {current}")]
    InvalidSwapState { patient: String, current: String },

    #[error("unknown patient in bed swap: {0}")]
    UnknownSwapPatient(String),

    #[error("patient {0} has no location for bed swap")]
    MissingSwapLocation(String),

    #[error("transit location mismatch: arrival at {0} does not match the pending location")]
    TransitMismatch(String),

    #[error("missing processor for generic step {0}")]
    MissingProcessor(String),

    #[error("unsupported step kind: {0}")]
    UnsupportedStep(String),

    #[error("document {0} already exists")]
    DocumentExists(String),

    #[error("document {0} does not exist")]
    DocumentMissing(String),

    #[error("unknown location: {0}")]
    UnknownLocation(String),

    #[error("bed {bed} in location {location} already occupied")]
    BedOccupied { bed: String, location: String },

    #[error("location {0} is not a bed")]
    NotABed(String),

    #[error("location {0} already free")]
    BedAlreadyFree(String),

    #[error("processor error: {0}")]
    Processor(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl CoreError {
    pub fn unknown_patient(mrn: impl Into<String>) -> Self {
        Self::UnknownPatient(mrn.into())
    }

    pub fn unknown_pathway(name: impl Into<String>) -> Self {
        Self::UnknownPathway(name.into())
    }

    pub fn unknown_patient_reference(reference: impl Into<String>) -> Self {
        Self::UnknownPatientReference(reference.into())
    }

    pub fn already_admitted(mrn: impl Into<String>) -> Self {
        Self::AlreadyAdmitted(mrn.into())
    }

    pub fn invalid_merge_state(parent: impl Into<String>, current: impl Into<String>) -> Self {
        Self::InvalidMergeState {
            parent: parent.into(),
            current: current.into(),
        }
    }

    pub fn invalid_swap_state(patient: impl Into<String>, current: impl Into<String>) -> Self {
        Self::InvalidSwapState {
            patient: patient.into(),
            current: current.into(),
        }
    }

    pub fn transit_mismatch(location: impl Into<String>) -> Self {
        Self::TransitMismatch(location.into())
    }

    pub fn missing_processor(step: impl Into<String>) -> Self {
        Self::MissingProcessor(step.into())
    }

    pub fn unsupported_step(kind: impl Into<String>) -> Self {
        Self::UnsupportedStep(kind.into())
    }

    pub fn document_exists(id: impl Into<String>) -> Self {
        Self::DocumentExists(id.into())
    }

    pub fn document_missing(id: impl Into<String>) -> Self {
        Self::DocumentMissing(id.into())
    }

    pub fn unknown_location(name: impl Into<String>) -> Self {
        Self::UnknownLocation(name.into())
    }

    pub fn bed_occupied(bed: impl Into<String>, location: impl Into<String>) -> Self {
        Self::BedOccupied {
            bed: bed.into(),
            location: location.into(),
        }
    }

    /// For use by external hook implementations.
    pub fn processor(message: impl Into<String>) -> Self {
        Self::Processor(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Whether this error is a clinical-state error, i.e. the step referenced
    /// a patient, location, or document in a way the current state forbids
    pub fn is_state_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownPatient(_)
                | Self::UnknownPatientReference(_)
                | Self::AlreadyAdmitted(_)
                | Self::PastVisitsEmpty
                | Self::InvalidPersonsSection
                | Self::InvalidMergeState { .. }
                | Self::InvalidSwapState { .. }
                | Self::UnknownSwapPatient(_)
                | Self::MissingSwapLocation(_)
                | Self::TransitMismatch(_)
                | Self::MissingProcessor(_)
                | Self::UnsupportedStep(_)
                | Self::DocumentExists(_)
                | Self::DocumentMissing(_)
                | Self::UnknownLocation(_)
                | Self::BedOccupied { .. }
                | Self::NotABed(_)
                | Self::BedAlreadyFree(_)
        )
    }

    /// Whether this error came from a queue operation
    pub fn is_queue_error(&self) -> bool {
        matches!(self, Self::EmptyQueue)
    }

    /// Get error category for logging/monitoring
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::EmptyQueue => ErrorCategory::Queue,
            Self::Processor(_) => ErrorCategory::Pipeline,
            Self::Json(_) => ErrorCategory::Serialization,
            Self::Io(_) => ErrorCategory::System,
            Self::Configuration(_) | Self::UnknownPathway(_) => ErrorCategory::Configuration,
            _ => ErrorCategory::State,
        }
    }
}

/// Error categories for monitoring and classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Queue,
    State,
    Pipeline,
    Serialization,
    System,
    Configuration,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queue => write!(f, "queue"),
            Self::State => write!(f, "state"),
            Self::Pipeline => write!(f, "pipeline"),
            Self::Serialization => write!(f, "serialization"),
            Self::System => write!(f, "system"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}

/// Convenience result type for wardflow operations
pub type Result<T> = std::result::Result<T, CoreError>;
