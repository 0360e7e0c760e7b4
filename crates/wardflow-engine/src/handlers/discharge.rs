//! Discharge steps and the cancellations that undo a visit.

use time::OffsetDateTime;
use wardflow_core::Result;
use wardflow_core::ir::{AccountStatus, EncounterStatus};
use wardflow_core::metrics::names;
use wardflow_pathway::step::{Discharge, DischargeInError};
use wardflow_state::{Event, Patient};

use crate::handlers::{ADT, set_discharge_date};
use crate::hospital::Hospital;
use crate::render::RenderExtra;

impl Hospital {
    /// Discharges the patient: the visit ends, the bed frees, and the visit
    /// number moves onto the past-visit stack for later delete steps.
    pub(super) fn discharge_patient(
        &self,
        step: &Discharge,
        event: &Event,
        patient: &mut Patient,
        now: OffsetDateTime,
    ) -> Result<()> {
        let info = &mut patient.info;
        let discharge_time = step.discharge_time.unwrap_or(event.event_time);
        set_discharge_date(info, discharge_time);
        info.account_status = Some(AccountStatus::Finished);
        self.demographics.add_allergies(info, &step.allergies);
        self.update_death_info(info, event, now);

        let discharge_date = info.discharge_date;
        if info.latest_encounter().is_none() {
            let location = info.location.clone();
            info.add_encounter(discharge_date, EncounterStatus::InProgress, location.as_ref());
        }
        if let Some(encounter) = info.latest_encounter_mut() {
            encounter.end_encounter(discharge_date, EncounterStatus::Finished);
            encounter.is_pending = false;
        }

        self.render_and_queue(ADT, "A03", info, event, RenderExtra::None)?;
        if let Some(admission_date) = info.admission_date {
            self.metrics.observe(
                names::ADMISSION_DURATION_MINUTES,
                &[("pathway_name", event.pathway_name.as_str())],
                (event.event_time - admission_date).as_seconds_f64() / 60.0,
            );
        }
        patient.push_past_visit(patient.info.visit_id);
        self.reset_patient(patient, &event.pathway_name);
        Ok(())
    }

    /// Emits the discharge message without ending the visit, for pathways
    /// that cancel the discharge afterwards.
    pub(super) fn discharge_patient_in_error(
        &self,
        step: &DischargeInError,
        event: &Event,
        patient: &mut Patient,
        now: OffsetDateTime,
    ) -> Result<()> {
        let info = &mut patient.info;
        let discharge_time = step.discharge_time.unwrap_or(event.event_time);
        set_discharge_date(info, discharge_time);
        info.account_status = Some(AccountStatus::Finished);
        self.demographics.add_allergies(info, &step.allergies);
        self.update_death_info(info, event, now);
        self.render_and_queue(ADT, "A03", info, event, RenderExtra::None)
    }

    /// Reinstates a visit after a discharge sent in error.
    pub(super) fn cancel_discharge(
        &self,
        event: &Event,
        patient: &mut Patient,
        now: OffsetDateTime,
    ) -> Result<()> {
        let info = &mut patient.info;
        self.update_death_info(info, event, now);
        info.account_status = Some(AccountStatus::Arrived);
        info.discharge_date = None;
        self.render_and_queue(ADT, "A13", info, event, RenderExtra::None)
    }

    /// Cancels the whole visit. Like a discharge, the visit number goes to
    /// the past-visit stack and the record resets.
    pub(super) fn cancel_visit(
        &self,
        event: &Event,
        patient: &mut Patient,
        now: OffsetDateTime,
    ) -> Result<()> {
        self.update_death_info(&mut patient.info, event, now);
        patient.info.account_status = Some(AccountStatus::Cancelled);
        self.render_and_queue(ADT, "A11", &patient.info, event, RenderExtra::None)?;
        patient.push_past_visit(patient.info.visit_id);
        self.reset_patient(patient, &event.pathway_name);
        Ok(())
    }

    /// Deletes the most recent past visit. The message carries the deleted
    /// visit number; the current one is restored afterwards.
    pub(super) fn delete_visit(
        &self,
        event: &Event,
        patient: &mut Patient,
        now: OffsetDateTime,
    ) -> Result<()> {
        let deleted_visit = patient.pop_past_visit()?;
        let this_visit = patient.info.visit_id;
        patient.info.visit_id = deleted_visit;
        self.update_death_info(&mut patient.info, event, now);
        let result = self.render_and_queue(ADT, "A23", &patient.info, event, RenderExtra::None);
        patient.info.visit_id = this_visit;
        result
    }
}
