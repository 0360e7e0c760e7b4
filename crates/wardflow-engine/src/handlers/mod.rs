//! Default behavior of each step kind: how it changes the patient record
//! and which message it queues.
//!
//! Handlers work on the patient copy the event loop checked out and leave
//! persisting it to the loop; they only reach into the registry for records
//! of other patients, such as a bed-swap partner. Every step kind is matched
//! here, so adding a kind means deciding its behavior.

mod admission;
mod clinical;
mod discharge;
mod misc;
mod pending;
mod persons;
mod tracking;
mod transfer;

use time::OffsetDateTime;
use tracing::{debug, warn};
use wardflow_core::ir::{PatientInfo, PatientLocation};
use wardflow_core::metrics::names;
use wardflow_core::{CoreError, Result};
use wardflow_pathway::StepKind;
use wardflow_state::{Event, Patient};

use crate::hospital::Hospital;
use crate::render::{RenderExtra, RenderRequest, RenderedMessage};

pub(crate) const ADT: &str = "ADT";
pub(crate) const ORM: &str = "ORM";
pub(crate) const ORR: &str = "ORR";
pub(crate) const ORU: &str = "ORU";
pub(crate) const MDM: &str = "MDM";

impl Hospital {
    /// Applies the step's default behavior to the patient.
    ///
    /// Kinds with no default are errors here: generic steps need a processor
    /// registered for them, and autogenerate steps must have been expanded
    /// into concrete steps before the pathway started.
    pub(crate) fn process_event_type(
        &self,
        event: &mut Event,
        patient: &mut Patient,
        now: OffsetDateTime,
    ) -> Result<()> {
        match &event.step.kind {
            // Delay steps only advance the pathway clock; the event loop
            // already applied the sampled offset to `now`.
            StepKind::Delay(_) => Ok(()),
            StepKind::Admission(step) => self.admit_patient(step, event, patient, now),
            StepKind::Registration(step) => self.register_patient(step, event, patient, now),
            StepKind::PreAdmission(step) => self.preadmit_patient(step, event, patient, now),
            StepKind::Order(step) => {
                // The acknowledgement reply shifts the event's message time,
                // so the payload is detached from the event first.
                let step = step.clone();
                self.place_order(&step, event, patient, now)
            }
            StepKind::Results(step) => self.report_results(step, event, patient, now),
            StepKind::ClinicalNote(step) => self.attach_clinical_note(step, event, patient),
            StepKind::Document(step) => self.process_document(step, event, patient),
            StepKind::Discharge(step) => self.discharge_patient(step, event, patient, now),
            StepKind::DischargeInError(step) => {
                self.discharge_patient_in_error(step, event, patient, now)
            }
            StepKind::CancelDischarge(_) => self.cancel_discharge(event, patient, now),
            StepKind::CancelVisit(_) => self.cancel_visit(event, patient, now),
            StepKind::DeleteVisit(_) => self.delete_visit(event, patient, now),
            StepKind::Transfer(step) => {
                let step = step.clone();
                self.transfer_patient(&step.loc, &step.bed, false, event, patient, now)
            }
            StepKind::TransferInError(step) => {
                let step = step.clone();
                self.transfer_patient(&step.loc, &step.bed, true, event, patient, now)
            }
            StepKind::CancelTransfer(_) => self.cancel_transfer(event, patient, now),
            StepKind::PendingAdmission(step) => {
                self.record_pending_admission(step, event, patient, now)
            }
            StepKind::PendingTransfer(step) => {
                self.record_pending_transfer(step, event, patient, now)
            }
            StepKind::PendingDischarge(step) => {
                self.record_pending_discharge(step, event, patient, now)
            }
            StepKind::CancelPendingAdmission(_) => {
                self.cancel_pending_admission(event, patient, now)
            }
            StepKind::CancelPendingTransfer(_) => self.cancel_pending_transfer(event, patient, now),
            StepKind::CancelPendingDischarge(_) => {
                self.cancel_pending_discharge(event, patient, now)
            }
            StepKind::TrackDeparture(step) => self.track_departure(step, event, patient, now),
            StepKind::TrackArrival(step) => self.track_arrival(step, event, patient, now),
            StepKind::AddPerson(step) => self.add_person(step, event, patient, now),
            StepKind::UpdatePerson(step) => self.update_person(step, event, patient, now),
            StepKind::Merge(step) => self.merge_patients(step, event, patient, now),
            StepKind::BedSwap(step) => self.swap_beds(step, event, patient, now),
            StepKind::UsePatient(step) => {
                let step = step.clone();
                self.switch_patient(&step, event)
            }
            StepKind::HardcodedMessage(step) => {
                self.send_hardcoded_message(step, event, patient, now)
            }
            StepKind::GenerateResources(_) => self.generate_resources(event, patient),
            StepKind::Generic(step) => Err(CoreError::missing_processor(&step.name)),
            StepKind::AutoGenerate(_) => Err(CoreError::unsupported_step("autogenerate")),
        }
    }

    /// Occupies the named bed when the step pins one, otherwise the first
    /// free bed at the point of care.
    fn occupy_bed(&self, loc: &str, bed: &str) -> Result<PatientLocation> {
        if bed.is_empty() {
            self.locations.occupy_available_bed(loc)
        } else {
            self.locations.occupy_specific_bed(loc, bed)
        }
    }

    /// Frees a bed if the location names one. Failures are logged and
    /// counted but never fail the step: the patient record moves on even
    /// when the bed ledger disagrees.
    fn free_specific_location(&self, location: Option<&PatientLocation>, pathway_name: &str) {
        let Some(location) = location else {
            debug!("no location to free");
            return;
        };
        if !location.is_bed() {
            return;
        }
        if let Err(err) = self.locations.free_bed(location) {
            let reason = err.to_string();
            self.metrics.increment(
                names::ERRORS_TOTAL,
                &[("pathway_name", pathway_name), ("reason", &reason)],
            );
            warn!(location = %location.name(), error = %err, "cannot free bed");
        }
    }

    /// Frees the patient's current bed and takes the location out of the
    /// record, returning it for use as a prior location.
    fn free_current_location(
        &self,
        info: &mut PatientInfo,
        pathway_name: &str,
    ) -> Option<PatientLocation> {
        self.free_specific_location(info.location.as_ref(), pathway_name);
        info.location.take()
    }

    /// Clears the visit after a discharge or cancellation so later steps
    /// start from a fresh record. The bed is freed first.
    fn reset_patient(&self, patient: &mut Patient, pathway_name: &str) {
        self.free_current_location(&mut patient.info, pathway_name);
        self.demographics.reset_patient(patient);
    }

    /// Applies the step's death declaration, if any, and releases whatever
    /// the record still holds for a deceased patient: beds are freed,
    /// locations move to their prior slots, and expected times clear.
    fn update_death_info(&self, info: &mut PatientInfo, event: &Event, now: OffsetDateTime) {
        if let Some(status) = event.step.death_status() {
            let person = &mut info.person;
            person.date_of_death = match (status.time_of_death, status.time_since_death) {
                (Some(time_of_death), _) => Some(time_of_death),
                (None, Some(since)) => Some(now - since),
                (None, None) => None,
            };
            person.death_indicator = status.death_indicator.clone();
        }
        if !info.person.is_deceased() {
            return;
        }
        // Temporary locations have no bed capacity to give back.
        if info.temporary_location.is_some() {
            info.prior_temporary_location = info.temporary_location.take();
        }
        if info.location.is_some() {
            info.prior_location = self.free_current_location(info, &event.pathway_name);
        }
        if info.pending_location.is_some() {
            info.expected_admit_time = None;
            info.expected_transfer_time = None;
            self.free_specific_location(info.pending_location.as_ref(), &event.pathway_name);
            info.prior_pending_location = info.pending_location.take();
        }
        info.expected_discharge_time = None;
    }

    /// Orders and documents can arrive for patients no step ever admitted.
    /// Those default to an A&E attendance starting at the event time.
    fn set_admission_details_if_missing(&self, info: &mut PatientInfo, event_time: OffsetDateTime) {
        if info.admission_date.is_some() {
            return;
        }
        info.location = Some(self.locations.ed_location());
        info.admission_date = Some(event_time);
    }

    /// Renders a message for the patient as they look right now and queues
    /// it for delivery at the event's message time.
    fn render_and_queue(
        &self,
        message_type: &str,
        trigger_event: &str,
        info: &PatientInfo,
        event: &Event,
        extra: RenderExtra<'_>,
    ) -> Result<()> {
        self.render_and_queue_at(message_type, trigger_event, info, event, event.event_time, extra)
    }

    /// Like [`Hospital::render_and_queue`] but with an explicit event time,
    /// for steps whose message carries a reserved time instead of the
    /// event's own.
    fn render_and_queue_at(
        &self,
        message_type: &str,
        trigger_event: &str,
        info: &PatientInfo,
        event: &Event,
        event_time: OffsetDateTime,
        extra: RenderExtra<'_>,
    ) -> Result<()> {
        let request = RenderRequest {
            message_type,
            trigger_event,
            patient: info,
            event_time,
            message_time: event.message_time,
            parameters: event.step.parameters.as_ref(),
            extra,
        };
        let body = self.renderer.render(&request)?;
        self.queue_message(
            RenderedMessage {
                message_type: message_type.to_string(),
                trigger_event: trigger_event.to_string(),
                body,
            },
            event,
        );
        Ok(())
    }
}

/// Discharge uses the expected discharge time when one was announced,
/// otherwise the time the step decided on.
fn set_discharge_date(info: &mut PatientInfo, discharge_time: OffsetDateTime) {
    info.discharge_date = match info.expected_discharge_time {
        Some(expected) => Some(expected),
        None => Some(discharge_time),
    };
}
