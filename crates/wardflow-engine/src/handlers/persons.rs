//! Person-level steps: demographics updates, merges, bed swaps, and
//! switching which patient later steps apply to.

use time::OffsetDateTime;
use tracing::{info, warn};
use wardflow_core::{CoreError, Result};
use wardflow_pathway::CURRENT;
use wardflow_pathway::step::{
    AddPerson, BedSwap, Merge, UpdatePerson as UpdatePersonStep, UsePatient,
};
use wardflow_state::{Event, Patient};

use crate::demographics::INPATIENT;
use crate::handlers::ADT;
use crate::hospital::Hospital;
use crate::render::RenderExtra;

impl Hospital {
    /// Announces the person's record without touching the visit.
    pub(super) fn add_person(
        &self,
        step: &AddPerson,
        event: &Event,
        patient: &mut Patient,
        now: OffsetDateTime,
    ) -> Result<()> {
        let info = &mut patient.info;
        self.demographics.add_allergies(info, &step.allergies);
        self.update_death_info(info, event, now);
        self.render_and_queue(ADT, "A28", info, event, RenderExtra::None)
    }

    /// Updates the person's record. Admitted patients get `ADT^A08`, anyone
    /// else `ADT^A31`; the step's diagnoses and procedures attach to the
    /// current encounter once the message is away.
    pub(super) fn update_person(
        &self,
        step: &UpdatePersonStep,
        event: &Event,
        patient: &mut Patient,
        now: OffsetDateTime,
    ) -> Result<()> {
        let info = &mut patient.info;
        self.demographics.update_from_pathway(info, step);
        self.update_death_info(info, event, now);

        let trigger_event = if info.class == INPATIENT { "A08" } else { "A31" };
        self.render_and_queue(ADT, trigger_event, info, event, RenderExtra::None)?;

        let diagnoses = std::mem::take(&mut info.diagnoses);
        let procedures = std::mem::take(&mut info.procedures);
        info.add_diagnoses_or_procedures_to_encounter(event.event_time, &diagnoses, &procedures);
        Ok(())
    }

    /// Merges one or more records into the current patient. A single child
    /// merges as `ADT^A34` unless the step forces the multi-patient
    /// `ADT^A40` form.
    pub(super) fn merge_patients(
        &self,
        step: &Merge,
        event: &Event,
        patient: &mut Patient,
        now: OffsetDateTime,
    ) -> Result<()> {
        self.update_death_info(&mut patient.info, event, now);
        let parent = event.resolve_mrn(&step.parent);
        if parent != CURRENT && parent != event.patient_mrn {
            warn!(
                parent = %parent,
                mrn = %event.patient_mrn,
                "merge parent is not the patient the event runs against"
            );
            return Err(CoreError::invalid_merge_state(parent, &event.patient_mrn));
        }

        if step.children.len() == 1 && !step.force_a40 {
            let children = [event.resolve_mrn(&step.children[0])];
            self.render_and_queue(
                ADT,
                "A34",
                &patient.info,
                event,
                RenderExtra::MergeChildren(&children),
            )
        } else {
            let children: Vec<String> = step
                .children
                .iter()
                .map(|child| event.resolve_mrn(child))
                .collect();
            self.render_and_queue(
                ADT,
                "A40",
                &patient.info,
                event,
                RenderExtra::MergeChildren(&children),
            )
        }
    }

    /// Exchanges the beds of two patients. The first must be the patient
    /// the event runs against; both must exist and hold a location.
    pub(super) fn swap_beds(
        &self,
        step: &BedSwap,
        event: &Event,
        patient: &mut Patient,
        now: OffsetDateTime,
    ) -> Result<()> {
        let main = event.resolve_mrn(&step.patient_1);
        if main != CURRENT && main != event.patient_mrn {
            warn!(
                patient = %main,
                mrn = %event.patient_mrn,
                "bed swap first patient is not the patient the event runs against"
            );
            return Err(CoreError::invalid_swap_state(main, &event.patient_mrn));
        }
        let other_mrn = event.resolve_mrn(&step.patient_2);
        let Some(mut other) = self.patients.get(&other_mrn) else {
            return Err(CoreError::UnknownSwapPatient(other_mrn));
        };
        if patient.info.location.is_none() {
            return Err(CoreError::MissingSwapLocation(event.patient_mrn.clone()));
        }
        if other.info.location.is_none() {
            return Err(CoreError::MissingSwapLocation(other_mrn));
        }

        std::mem::swap(&mut patient.info.location, &mut other.info.location);
        self.update_death_info(&mut patient.info, event, now);

        self.render_and_queue(
            ADT,
            "A17",
            &patient.info,
            event,
            RenderExtra::SwapPartner(&other.info),
        )?;
        // The event loop persists the main patient; the partner is ours to
        // put back.
        self.patients.put(other);
        Ok(())
    }

    /// Points the rest of the event chain at another patient. No message.
    pub(super) fn switch_patient(&self, step: &UsePatient, event: &mut Event) -> Result<()> {
        let use_mrn = event.resolve_mrn(&step.patient);
        if self.patients.get(&use_mrn).is_none() {
            return Err(CoreError::unknown_patient_reference(&use_mrn));
        }
        if use_mrn != event.patient_mrn {
            info!(
                mrn = %use_mrn,
                previous_mrn = %event.patient_mrn,
                "switching the patient the pathway runs against"
            );
            event.patient_mrn = use_mrn;
        }
        Ok(())
    }
}
