//! Admission, registration, and pre-admission steps.

use time::{Duration, OffsetDateTime};
use wardflow_core::ir::{AccountStatus, EncounterStatus};
use wardflow_core::{CoreError, Result};
use wardflow_pathway::step::{Admission, PreAdmission, Registration};
use wardflow_state::{Event, Patient};

use crate::demographics::{INPATIENT, OUTPATIENT};
use crate::handlers::ADT;
use crate::hospital::Hospital;
use crate::render::RenderExtra;

impl Hospital {
    /// Admits the patient, consuming a pending reservation when one exists,
    /// otherwise occupying a bed at the step's location.
    pub(super) fn admit_patient(
        &self,
        step: &Admission,
        event: &Event,
        patient: &mut Patient,
        now: OffsetDateTime,
    ) -> Result<()> {
        let info = &mut patient.info;
        if info.class == INPATIENT && info.is_admitted() {
            return Err(CoreError::already_admitted(&info.person.mrn));
        }
        match info.expected_admit_time {
            Some(expected) => {
                info.admission_date = Some(expected);
                info.location = info.pending_location.clone();
            }
            None => {
                info.admission_date = Some(event.event_time);
                info.location = Some(self.occupy_bed(&step.loc, &step.bed)?);
            }
        }

        let admission_date = info.admission_date;
        let location = info.location.clone();
        match info.latest_encounter_mut() {
            Some(encounter) if encounter.is_pending => {
                encounter.update_status(admission_date, EncounterStatus::Arrived);
                encounter.update_location(admission_date, location.as_ref());
                encounter.is_pending = false;
            }
            _ => {
                info.add_encounter(admission_date, EncounterStatus::Arrived, location.as_ref());
            }
        }

        info.admit_reason = step.admit_reason.clone();
        info.pending_location = None;
        info.expected_admit_time = None;
        info.class = INPATIENT.to_string();
        info.visit_id = self.demographics.new_visit_id();
        info.account_status = Some(AccountStatus::Arrived);
        self.demographics.add_allergies(info, &step.allergies);
        self.update_death_info(info, event, now);
        self.render_and_queue(ADT, "A01", info, event, RenderExtra::None)
    }

    /// Registers the patient for an outpatient or planned attendance. A
    /// registration always opens a fresh visit: the admission date and the
    /// visit id are reassigned even when an earlier step already set them.
    pub(super) fn register_patient(
        &self,
        step: &Registration,
        event: &Event,
        patient: &mut Patient,
        now: OffsetDateTime,
    ) -> Result<()> {
        let info = &mut patient.info;
        info.admission_date = Some(event.event_time);
        info.visit_id = self.demographics.new_visit_id();
        self.demographics.add_allergies(info, &step.allergies);
        self.update_death_info(info, event, now);
        info.account_status = Some(AccountStatus::Planned);

        let class = if step.patient_class.is_empty() {
            OUTPATIENT
        } else {
            &step.patient_class
        };
        info.class = class.to_string();
        info.patient_type = class.to_string();

        self.render_and_queue(ADT, "A04", info, event, RenderExtra::None)
    }

    /// Reserves a bed ahead of an admission and records when the patient is
    /// expected.
    pub(super) fn preadmit_patient(
        &self,
        step: &PreAdmission,
        event: &Event,
        patient: &mut Patient,
        now: OffsetDateTime,
    ) -> Result<()> {
        let info = &mut patient.info;
        let pending = self.occupy_bed(&step.loc, &step.bed)?;
        info.pending_location = Some(pending);
        info.expected_admit_time = Some(
            event.event_time + step.expected_admission_time_from_now.unwrap_or(Duration::ZERO),
        );
        info.account_status = Some(AccountStatus::Planned);
        self.demographics.add_allergies(info, &step.allergies);
        self.update_death_info(info, event, now);

        let expected = info.expected_admit_time;
        let encounter = info.add_encounter(expected, EncounterStatus::Planned, None);
        encounter.is_pending = true;

        self.render_and_queue(ADT, "A05", info, event, RenderExtra::None)
    }
}
