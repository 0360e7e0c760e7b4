use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::person::CodedElement;

/// A generic document attached to a patient record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub activity_date_time: Option<OffsetDateTime>,
    pub edit_date_time: Option<OffsetDateTime>,
    pub document_type: String,
    pub completion_status: String,
    pub unique_document_number: String,
    pub observation_identifier: Option<CodedElement>,
    /// Document body, one entry per content line.
    pub content_lines: Vec<String>,
}
