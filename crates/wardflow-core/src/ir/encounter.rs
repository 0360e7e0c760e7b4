use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::location::PatientLocation;

/// Encounter lifecycle status, following the FHIR encounter-status value set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EncounterStatus {
    Planned,
    Arrived,
    InProgress,
    Finished,
    Cancelled,
}

impl std::fmt::Display for EncounterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Planned => write!(f, "planned"),
            Self::Arrived => write!(f, "arrived"),
            Self::InProgress => write!(f, "in-progress"),
            Self::Finished => write!(f, "finished"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// One span of an encounter's status history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusHistory {
    pub status: EncounterStatus,
    pub start: Option<OffsetDateTime>,
    pub end: Option<OffsetDateTime>,
}

/// One span of an encounter's location history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationHistory {
    pub location: PatientLocation,
    pub start: Option<OffsetDateTime>,
    pub end: Option<OffsetDateTime>,
}

/// An interaction between a patient and a healthcare provider, tracking
/// where the patient has been and how the visit's status evolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encounter {
    pub status: EncounterStatus,
    /// Start time of the current status.
    pub status_start: Option<OffsetDateTime>,
    pub status_history: Vec<StatusHistory>,
    pub is_pending: bool,
    pub start: Option<OffsetDateTime>,
    pub end: Option<OffsetDateTime>,
    pub location_history: Vec<LocationHistory>,
    /// Ids into the patient aggregate's order index. Each order belongs to
    /// exactly one encounter.
    pub order_ids: Vec<String>,
    pub diagnoses: Vec<super::person::DiagnosisOrProcedure>,
    pub procedures: Vec<super::person::DiagnosisOrProcedure>,
}

impl Encounter {
    pub fn new(start: Option<OffsetDateTime>, status: EncounterStatus) -> Self {
        Self {
            status,
            status_start: start,
            status_history: Vec::new(),
            is_pending: false,
            start,
            end: None,
            location_history: Vec::new(),
            order_ids: Vec::new(),
            diagnoses: Vec::new(),
            procedures: Vec::new(),
        }
    }

    pub fn has_ended(&self) -> bool {
        matches!(
            self.status,
            EncounterStatus::Finished | EncounterStatus::Cancelled
        )
    }

    /// Ends the current status span and starts a new one. No-op when the
    /// status is unchanged or the start time predates the encounter itself.
    pub fn update_status(&mut self, start_time: Option<OffsetDateTime>, new_status: EncounterStatus) {
        if self.status == new_status {
            return;
        }
        if let (Some(t), Some(enc_start)) = (start_time, self.start)
            && t < enc_start
        {
            return;
        }
        self.status_history.push(StatusHistory {
            status: self.status,
            start: self.status_start,
            end: start_time,
        });
        self.status = new_status;
        self.status_start = start_time;
    }

    /// Closes the current location span and opens one for the new location.
    /// No-op when the location is unchanged.
    pub fn update_location(
        &mut self,
        start_time: Option<OffsetDateTime>,
        new_location: Option<&PatientLocation>,
    ) {
        let Some(new_location) = new_location else {
            return;
        };
        if let Some(last) = self.location_history.last_mut() {
            if last.location == *new_location {
                return;
            }
            last.end = start_time;
        }
        self.location_history.push(LocationHistory {
            location: new_location.clone(),
            start: start_time,
            end: None,
        });
    }

    /// Finishes the encounter: final status, end time, and the last location
    /// span closed.
    pub fn end_encounter(&mut self, end_time: Option<OffsetDateTime>, new_status: EncounterStatus) {
        self.update_status(end_time, new_status);
        self.end = end_time;
        if let Some(last) = self.location_history.last_mut() {
            last.end = end_time;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn loc(poc: &str) -> PatientLocation {
        PatientLocation {
            poc: poc.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_update_status_records_history() {
        let start = datetime!(2024-05-01 09:00:00 UTC);
        let mut enc = Encounter::new(Some(start), EncounterStatus::Planned);
        enc.update_status(
            Some(datetime!(2024-05-01 10:00:00 UTC)),
            EncounterStatus::Arrived,
        );

        assert_eq!(enc.status, EncounterStatus::Arrived);
        assert_eq!(enc.status_history.len(), 1);
        assert_eq!(enc.status_history[0].status, EncounterStatus::Planned);
        assert_eq!(enc.status_history[0].start, Some(start));
        assert_eq!(
            enc.status_history[0].end,
            Some(datetime!(2024-05-01 10:00:00 UTC))
        );
    }

    #[test]
    fn test_update_status_same_status_is_noop() {
        let mut enc = Encounter::new(
            Some(datetime!(2024-05-01 09:00:00 UTC)),
            EncounterStatus::Arrived,
        );
        enc.update_status(
            Some(datetime!(2024-05-01 10:00:00 UTC)),
            EncounterStatus::Arrived,
        );
        assert!(enc.status_history.is_empty());
    }

    #[test]
    fn test_update_status_before_start_is_noop() {
        let mut enc = Encounter::new(
            Some(datetime!(2024-05-01 09:00:00 UTC)),
            EncounterStatus::Arrived,
        );
        enc.update_status(
            Some(datetime!(2024-05-01 08:00:00 UTC)),
            EncounterStatus::Finished,
        );
        assert_eq!(enc.status, EncounterStatus::Arrived);
        assert!(enc.status_history.is_empty());
    }

    #[test]
    fn test_update_location_tracks_spans() {
        let mut enc = Encounter::new(
            Some(datetime!(2024-05-01 09:00:00 UTC)),
            EncounterStatus::Arrived,
        );
        enc.update_location(Some(datetime!(2024-05-01 09:00:00 UTC)), Some(&loc("ED")));
        enc.update_location(Some(datetime!(2024-05-01 11:00:00 UTC)), Some(&loc("Renal")));

        assert_eq!(enc.location_history.len(), 2);
        assert_eq!(
            enc.location_history[0].end,
            Some(datetime!(2024-05-01 11:00:00 UTC))
        );
        assert_eq!(enc.location_history[1].location, loc("Renal"));
        assert!(enc.location_history[1].end.is_none());
    }

    #[test]
    fn test_update_location_same_location_is_noop() {
        let mut enc = Encounter::new(
            Some(datetime!(2024-05-01 09:00:00 UTC)),
            EncounterStatus::Arrived,
        );
        enc.update_location(Some(datetime!(2024-05-01 09:00:00 UTC)), Some(&loc("ED")));
        enc.update_location(Some(datetime!(2024-05-01 10:00:00 UTC)), Some(&loc("ED")));
        assert_eq!(enc.location_history.len(), 1);
        assert!(enc.location_history[0].end.is_none());
    }

    #[test]
    fn test_update_location_none_is_noop() {
        let mut enc = Encounter::new(
            Some(datetime!(2024-05-01 09:00:00 UTC)),
            EncounterStatus::Arrived,
        );
        enc.update_location(Some(datetime!(2024-05-01 09:00:00 UTC)), None);
        assert!(enc.location_history.is_empty());
    }

    #[test]
    fn test_end_encounter_closes_location_span() {
        let mut enc = Encounter::new(
            Some(datetime!(2024-05-01 09:00:00 UTC)),
            EncounterStatus::Arrived,
        );
        enc.update_location(Some(datetime!(2024-05-01 09:00:00 UTC)), Some(&loc("ED")));
        let end = datetime!(2024-05-01 17:00:00 UTC);
        enc.end_encounter(Some(end), EncounterStatus::Finished);

        assert!(enc.has_ended());
        assert_eq!(enc.end, Some(end));
        assert_eq!(enc.location_history[0].end, Some(end));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(EncounterStatus::InProgress.to_string(), "in-progress");
        assert_eq!(EncounterStatus::Planned.to_string(), "planned");
    }
}
