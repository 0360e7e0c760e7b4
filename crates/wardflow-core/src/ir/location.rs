use serde::{Deserialize, Serialize};

/// A patient location within a clinical facility, down to the bed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientLocation {
    /// Point of care, e.g. a ward name.
    pub poc: String,
    pub room: String,
    pub bed: String,
    pub facility: String,
    pub location_type: String,
    pub building: String,
    pub floor: String,
}

impl PatientLocation {
    /// Human-readable name built from the non-empty fields.
    pub fn name(&self) -> String {
        [
            &self.bed,
            &self.poc,
            &self.room,
            &self.floor,
            &self.building,
            &self.facility,
        ]
        .iter()
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
    }

    /// A location counts as a bed when the bed field is set.
    pub fn is_bed(&self) -> bool {
        !self.bed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_concatenates_non_empty_fields() {
        let loc = PatientLocation {
            poc: "Renal".to_string(),
            bed: "Bed 2".to_string(),
            facility: "Simulated Hospital".to_string(),
            ..Default::default()
        };
        assert_eq!(loc.name(), "Bed 2, Renal, Simulated Hospital");
    }

    #[test]
    fn test_is_bed() {
        let mut loc = PatientLocation {
            poc: "ED".to_string(),
            ..Default::default()
        };
        assert!(!loc.is_bed());
        loc.bed = "Bed 1".to_string();
        assert!(loc.is_bed());
    }
}
