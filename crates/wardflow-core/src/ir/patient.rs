use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::encounter::{Encounter, EncounterStatus};
use super::location::PatientLocation;
use super::order::Order;
use super::person::{Allergy, DiagnosisOrProcedure, Doctor, Person};

/// Administrative account status of the active visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountStatus {
    Planned,
    Arrived,
    Finished,
    Cancelled,
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Planned => write!(f, "PLANNED"),
            Self::Arrived => write!(f, "ARRIVED"),
            Self::Finished => write!(f, "FINISHED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// A patient and everything known about their current and past visits.
///
/// The location slots beyond `location` exist to keep message-relevant
/// history around between steps: a transfer clears `prior_location` once its
/// message is built, a cancel-transfer needs `prior_location_for_cancel_transfer`
/// to re-instate it, and the tracking steps chain temporary side-trips
/// through the temporary slots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientInfo {
    pub person: Person,
    /// Patient class, e.g. INPATIENT or OUTPATIENT.
    pub class: String,
    pub patient_type: String,
    pub visit_id: u64,
    pub hospital_service: String,
    pub admit_reason: String,
    pub location: Option<PatientLocation>,
    pub prior_location: Option<PatientLocation>,
    pub prior_location_for_cancel_transfer: Option<PatientLocation>,
    pub pending_location: Option<PatientLocation>,
    pub prior_pending_location: Option<PatientLocation>,
    pub temporary_location: Option<PatientLocation>,
    pub prior_temporary_location: Option<PatientLocation>,
    pub attending_doctor: Option<Doctor>,
    pub account_status: Option<AccountStatus>,
    pub admission_date: Option<OffsetDateTime>,
    pub discharge_date: Option<OffsetDateTime>,
    pub transfer_date: Option<OffsetDateTime>,
    pub expected_admit_time: Option<OffsetDateTime>,
    pub expected_discharge_time: Option<OffsetDateTime>,
    pub expected_transfer_time: Option<OffsetDateTime>,
    pub allergies: Vec<Allergy>,
    /// Scratch lists for update-person messages; cleared after each one.
    pub diagnoses: Vec<DiagnosisOrProcedure>,
    pub procedures: Vec<DiagnosisOrProcedure>,
    pub encounters: Vec<Encounter>,
}

impl PatientInfo {
    pub fn new(person: Person) -> Self {
        Self {
            person,
            ..Default::default()
        }
    }

    pub fn latest_encounter(&self) -> Option<&Encounter> {
        self.encounters.last()
    }

    pub fn latest_encounter_mut(&mut self) -> Option<&mut Encounter> {
        self.encounters.last_mut()
    }

    /// Creates a new encounter with the given status and location and returns
    /// a handle to it.
    pub fn add_encounter(
        &mut self,
        start_time: Option<OffsetDateTime>,
        status: EncounterStatus,
        location: Option<&PatientLocation>,
    ) -> &mut Encounter {
        let mut encounter = Encounter::new(start_time, status);
        encounter.update_location(start_time, location);
        self.encounters.push(encounter);
        self.encounters.last_mut().unwrap()
    }

    /// Attaches an order to the ongoing encounter, or wraps it in a
    /// single-order encounter when none is active. The wrapping encounter
    /// spans from the order time to its reported time (order time when no
    /// results exist yet).
    pub fn add_order_to_encounter(&mut self, order_id: &str, order: &Order) {
        let location = self.location.clone();
        match self.latest_encounter_mut().filter(|ec| !ec.has_ended()) {
            Some(ec) => {
                ec.update_status(order.order_date_time, EncounterStatus::InProgress);
                ec.update_location(order.order_date_time, location.as_ref());
                ec.order_ids.push(order_id.to_string());
            }
            None => {
                let end_time = order.reported_date_time.or(order.order_date_time);
                let ec = self.add_encounter(
                    order.order_date_time,
                    EncounterStatus::InProgress,
                    location.as_ref(),
                );
                ec.order_ids.push(order_id.to_string());
                ec.end_encounter(end_time, EncounterStatus::Finished);
            }
        }
    }

    /// Attaches diagnoses and procedures to the ongoing encounter, or creates
    /// one finished encounter per entry when none is active. The event time is
    /// used for the spans because the clinical date of a diagnosis is often
    /// outside the encounter period.
    pub fn add_diagnoses_or_procedures_to_encounter(
        &mut self,
        event_time: OffsetDateTime,
        diagnoses: &[DiagnosisOrProcedure],
        procedures: &[DiagnosisOrProcedure],
    ) {
        let t = Some(event_time);
        let location = self.location.clone();
        if let Some(ec) = self.latest_encounter_mut().filter(|ec| !ec.has_ended()) {
            ec.update_status(t, EncounterStatus::InProgress);
            ec.diagnoses.extend_from_slice(diagnoses);
            ec.procedures.extend_from_slice(procedures);
            return;
        }
        for d in diagnoses {
            let ec = self.add_encounter(t, EncounterStatus::InProgress, location.as_ref());
            ec.diagnoses.push(d.clone());
            ec.end_encounter(t, EncounterStatus::Finished);
        }
        for p in procedures {
            let ec = self.add_encounter(t, EncounterStatus::InProgress, location.as_ref());
            ec.procedures.push(p.clone());
            ec.end_encounter(t, EncounterStatus::Finished);
        }
    }

    pub fn is_admitted(&self) -> bool {
        self.admission_date.is_some() && self.discharge_date.is_none()
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

    fn order_at(t: OffsetDateTime) -> Order {
        Order {
            order_date_time: Some(t),
            ..Default::default()
        }
    }

    #[test]
    fn test_add_encounter_sets_location() {
        let mut info = PatientInfo::default();
        let t = datetime!(2024-05-01 09:00:00 UTC);
        info.add_encounter(Some(t), EncounterStatus::Arrived, Some(&loc("ED")));

        let ec = info.latest_encounter().unwrap();
        assert_eq!(ec.status, EncounterStatus::Arrived);
        assert_eq!(ec.location_history.len(), 1);
        assert_eq!(ec.location_history[0].location, loc("ED"));
    }

    #[test]
    fn test_add_order_to_ongoing_encounter() {
        let mut info = PatientInfo::default();
        let t = datetime!(2024-05-01 09:00:00 UTC);
        info.add_encounter(Some(t), EncounterStatus::Arrived, Some(&loc("ED")));
        info.add_order_to_encounter("order-1", &order_at(datetime!(2024-05-01 10:00:00 UTC)));

        let ec = info.latest_encounter().unwrap();
        assert_eq!(ec.order_ids, vec!["order-1".to_string()]);
        assert_eq!(ec.status, EncounterStatus::InProgress);
        assert!(!ec.has_ended());
    }

    #[test]
    fn test_add_order_without_encounter_wraps_it() {
        let mut info = PatientInfo::default();
        let t = datetime!(2024-05-01 10:00:00 UTC);
        info.add_order_to_encounter("order-1", &order_at(t));

        assert_eq!(info.encounters.len(), 1);
        let ec = info.latest_encounter().unwrap();
        assert!(ec.has_ended());
        assert_eq!(ec.start, Some(t));
        assert_eq!(ec.end, Some(t));
        assert_eq!(ec.order_ids, vec!["order-1".to_string()]);
    }

    #[test]
    fn test_add_order_without_encounter_uses_reported_time_as_end() {
        let mut info = PatientInfo::default();
        let ordered = datetime!(2024-05-01 10:00:00 UTC);
        let reported = datetime!(2024-05-01 14:00:00 UTC);
        let mut order = order_at(ordered);
        order.reported_date_time = Some(reported);
        info.add_order_to_encounter("order-1", &order);

        let ec = info.latest_encounter().unwrap();
        assert_eq!(ec.end, Some(reported));
    }

    #[test]
    fn test_diagnoses_attach_to_ongoing_encounter() {
        let mut info = PatientInfo::default();
        let t = datetime!(2024-05-01 09:00:00 UTC);
        info.add_encounter(Some(t), EncounterStatus::Arrived, Some(&loc("ED")));

        let diagnosis = DiagnosisOrProcedure {
            kind: "Working".to_string(),
            ..Default::default()
        };
        info.add_diagnoses_or_procedures_to_encounter(
            datetime!(2024-05-01 10:00:00 UTC),
            &[diagnosis],
            &[],
        );

        assert_eq!(info.encounters.len(), 1);
        assert_eq!(info.latest_encounter().unwrap().diagnoses.len(), 1);
    }

    #[test]
    fn test_diagnoses_without_encounter_create_finished_ones() {
        let mut info = PatientInfo::default();
        let diagnosis = DiagnosisOrProcedure::default();
        let procedure = DiagnosisOrProcedure::default();
        info.add_diagnoses_or_procedures_to_encounter(
            datetime!(2024-05-01 10:00:00 UTC),
            &[diagnosis],
            &[procedure],
        );

        assert_eq!(info.encounters.len(), 2);
        assert!(info.encounters.iter().all(|ec| ec.has_ended()));
    }

    #[test]
    fn test_is_admitted() {
        let mut info = PatientInfo::default();
        assert!(!info.is_admitted());
        info.admission_date = Some(datetime!(2024-05-01 09:00:00 UTC));
        assert!(info.is_admitted());
        info.discharge_date = Some(datetime!(2024-05-02 09:00:00 UTC));
        assert!(!info.is_admitted());
    }

    #[test]
    fn test_account_status_display() {
        assert_eq!(AccountStatus::Arrived.to_string(), "ARRIVED");
        assert_eq!(AccountStatus::Cancelled.to_string(), "CANCELLED");
    }
}
