use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::person::CodedElement;

/// Diagnostic service id that marks an order as carrying a clinical note.
pub const DIAGNOSTIC_SERV_DOC: &str = "MDOC";

/// A clinical order and the results reported against it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_profile: Option<CodedElement>,
    /// Placer order number.
    pub placer: String,
    /// Filler order number.
    pub filler: String,
    pub order_date_time: Option<OffsetDateTime>,
    pub collected_date_time: Option<OffsetDateTime>,
    pub received_in_lab_date_time: Option<OffsetDateTime>,
    pub reported_date_time: Option<OffsetDateTime>,
    pub order_control: String,
    pub order_status: String,
    pub results_status: String,
    pub results: Vec<ClinicalResult>,
    /// When set to [`DIAGNOSTIC_SERV_DOC`] this order carries a document.
    pub diagnostic_serv_id: String,
    /// How many results were already sent for this order; lets corrections
    /// continue numbering where the original report stopped.
    pub number_of_previous_results: usize,
}

/// A clinical result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClinicalResult {
    pub test_name: Option<CodedElement>,
    pub value: String,
    pub unit: String,
    pub abnormal_flag: String,
    pub reference_range: String,
    pub observation_date_time: Option<OffsetDateTime>,
    pub status: String,
    pub notes: Vec<String>,
    pub clinical_note: Option<ClinicalNote>,
}

impl ClinicalResult {
    /// Human-readable summary, with the abnormal flag when present.
    pub fn text(&self) -> String {
        let name = self
            .test_name
            .as_ref()
            .map(|t| t.text.as_str())
            .unwrap_or_default();
        let mut out = format!("{name}: {} {}", self.value, self.unit);
        if !self.abnormal_flag.trim().is_empty() {
            out.push_str(&format!(" ({})", self.abnormal_flag));
        }
        out
    }
}

/// A clinical note: a document with information about a patient, kept under
/// the term clinicians use.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClinicalNote {
    pub date_time: Option<OffsetDateTime>,
    pub document_title: String,
    pub document_type: String,
    pub document_id: String,
    pub contents: Vec<ClinicalNoteContent>,
}

/// One content section of a clinical note.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClinicalNoteContent {
    pub observation_date_time: Option<OffsetDateTime>,
    pub content_type: String,
    pub document_encoding: String,
    pub document_content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_text_with_abnormal_flag() {
        let result = ClinicalResult {
            test_name: Some(CodedElement::new("lpdc-3384", "Urea")),
            value: "5.0".to_string(),
            unit: "MMOLL".to_string(),
            abnormal_flag: "HIGH".to_string(),
            ..Default::default()
        };
        assert_eq!(result.text(), "Urea: 5.0 MMOLL (HIGH)");
    }

    #[test]
    fn test_result_text_without_abnormal_flag() {
        let result = ClinicalResult {
            test_name: Some(CodedElement::new("lpdc-2011", "Creatinine")),
            value: "112".to_string(),
            unit: "UMOLL".to_string(),
            ..Default::default()
        };
        assert_eq!(result.text(), "Creatinine: 112 UMOLL");
    }
}
