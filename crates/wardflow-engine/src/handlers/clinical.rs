//! Orders, results, clinical notes, and documents.
//!
//! These steps can run against patients no step ever admitted, so they all
//! start by defaulting the admission details to an A&E attendance. Orders
//! live in the per-patient index; results and notes look their order up by
//! id and write the updated order back.

use time::OffsetDateTime;
use wardflow_core::{CoreError, Result};
use wardflow_pathway::step::{
    ClinicalNote as ClinicalNoteStep, Document as DocumentStep, Order as OrderStep,
    Results as ResultsStep,
};
use wardflow_state::{Event, Patient};

use crate::demographics::{ORDER_CONTROL_ACKNOWLEDGED, ORDER_CONTROL_WITH_OBSERVATIONS};
use crate::handlers::{MDM, ORM, ORR, ORU};
use crate::hospital::Hospital;
use crate::render::RenderExtra;

impl Hospital {
    /// Places an order, or re-sends an existing one, as `ORM^O01`. Unless
    /// the step opts out, the filler's `ORR^O02` acknowledgement follows
    /// after a short delay.
    pub(super) fn place_order(
        &self,
        step: &OrderStep,
        event: &mut Event,
        patient: &mut Patient,
        now: OffsetDateTime,
    ) -> Result<()> {
        self.set_admission_details_if_missing(&mut patient.info, event.event_time);

        let existing = patient.order(&step.order_id).cloned();
        let (mut order, order_id) = match existing {
            Some(order) => (order, step.order_id.clone()),
            None => {
                let order = self.demographics.new_order(step, event.event_time);
                let order_id = patient.add_order(Some(&step.order_id), order.clone());
                self.update_death_info(&mut patient.info, event, now);
                (order, order_id)
            }
        };
        if !step.order_status.is_empty() {
            order.order_status = step.order_status.clone();
        }

        self.render_and_queue(ORM, "O01", &patient.info, event, RenderExtra::Order(&order))?;
        if step.no_acknowledgement_message {
            patient.set_order(&order_id, order);
            return Ok(());
        }

        // The acknowledgement leaves the filler a little after the order
        // message; everything queued for this event from here on is due at
        // the shifted time.
        order.order_control = ORDER_CONTROL_ACKNOWLEDGED.to_string();
        event.message_time += self.order_ack_delay.sample();
        let result =
            self.render_and_queue(ORR, "O02", &patient.info, event, RenderExtra::Order(&order));
        patient.set_order(&order_id, order);
        result
    }

    /// Reports results against an order, creating the order when the id is
    /// new. The trigger event comes from the step; `R01` is the default.
    pub(super) fn report_results(
        &self,
        step: &ResultsStep,
        event: &Event,
        patient: &mut Patient,
        now: OffsetDateTime,
    ) -> Result<()> {
        self.set_admission_details_if_missing(&mut patient.info, event.event_time);

        let existing = patient.order(&step.order_id).cloned();
        let existed = existing.is_some();
        let mut order = self.demographics.set_results(existing, step, event.event_time)?;
        order.order_control = ORDER_CONTROL_WITH_OBSERVATIONS.to_string();
        let order_id = if existed {
            patient.set_order(&step.order_id, order.clone());
            step.order_id.clone()
        } else {
            patient.add_order(Some(&step.order_id), order.clone())
        };
        self.update_death_info(&mut patient.info, event, now);

        let trigger_event = match step.trigger_event.to_uppercase().as_str() {
            "R03" => "R03",
            "R32" => "R32",
            _ => "R01",
        };
        self.render_and_queue(
            ORU,
            trigger_event,
            &patient.info,
            event,
            RenderExtra::Order(&order),
        )?;

        // A correction re-reports the same results, so the numbering only
        // moves on when no correction is coming.
        if !step.expect_correction {
            order.number_of_previous_results += order.results.len();
            patient.set_order(&order_id, order);
        }
        Ok(())
    }

    /// Merges a clinical note into its document order and reports it as
    /// `ORU^R01`.
    pub(super) fn attach_clinical_note(
        &self,
        step: &ClinicalNoteStep,
        event: &Event,
        patient: &mut Patient,
    ) -> Result<()> {
        self.set_admission_details_if_missing(&mut patient.info, event.event_time);

        let existing = patient.order(&step.document_id).cloned();
        let existed = existing.is_some();
        let mut order = self
            .demographics
            .order_with_note(existing, step, event.event_time)?;
        let order_id = if existed {
            patient.set_order(&step.document_id, order.clone());
            step.document_id.clone()
        } else {
            patient.add_order(Some(&step.document_id), order.clone())
        };

        self.render_and_queue(ORU, "R01", &patient.info, event, RenderExtra::Order(&order))?;
        order.number_of_previous_results += order.results.len();
        patient.set_order(&order_id, order);
        Ok(())
    }

    /// Creates or updates a document and notifies it as `MDM^T02`. Creating
    /// under a taken id and updating a missing id are both state errors.
    pub(super) fn process_document(
        &self,
        step: &DocumentStep,
        event: &Event,
        patient: &mut Patient,
    ) -> Result<()> {
        let document = match step.update_type {
            Some(update_type) => {
                let Some(document) = patient.document_mut(&step.id) else {
                    return Err(CoreError::document_missing(&step.id));
                };
                self.demographics
                    .update_document_content(document, step, update_type);
                document.clone()
            }
            None => {
                if patient.document(&step.id).is_some() {
                    return Err(CoreError::document_exists(&step.id));
                }
                let document = self.demographics.new_document(step, event.event_time);
                patient.add_document(Some(&step.id), document.clone());
                document
            }
        };
        self.render_and_queue(
            MDM,
            "T02",
            &patient.info,
            event,
            RenderExtra::Document(&document),
        )
    }
}
