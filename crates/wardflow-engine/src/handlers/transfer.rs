//! Transfers between beds, including the in-error variant and its cancel.

use time::OffsetDateTime;
use wardflow_core::Result;
use wardflow_core::ir::EncounterStatus;
use wardflow_state::{Event, Patient};

use crate::handlers::ADT;
use crate::hospital::Hospital;
use crate::render::RenderExtra;

impl Hospital {
    /// Moves the patient to a new bed, consuming a pending-transfer
    /// reservation when one exists. An in-error transfer keeps the old bed
    /// occupied, the patient being physically still in it, and remembers it
    /// so a cancel-transfer can put them back.
    pub(super) fn transfer_patient(
        &self,
        loc: &str,
        bed: &str,
        in_error: bool,
        event: &Event,
        patient: &mut Patient,
        now: OffsetDateTime,
    ) -> Result<()> {
        let info = &mut patient.info;
        if in_error {
            info.prior_location = info.location.clone();
            info.prior_location_for_cancel_transfer = info.prior_location.clone();
        } else {
            info.prior_location = self.free_current_location(info, &event.pathway_name);
        }

        // A reserved transfer carries the reserved time into the message.
        let mut event_time = event.event_time;
        match info.expected_transfer_time {
            Some(expected) => {
                info.transfer_date = Some(expected);
                event_time = expected;
                info.location = info.pending_location.clone();
            }
            None => {
                info.transfer_date = Some(event.event_time);
                let location = match self.occupy_bed(loc, bed) {
                    Ok(location) => location,
                    Err(err) => {
                        // Freeing twice is harmless; for an in-error transfer
                        // this gives the still-occupied bed back.
                        self.free_specific_location(
                            info.prior_location.as_ref(),
                            &event.pathway_name,
                        );
                        return Err(err);
                    }
                };
                info.location = Some(location);
            }
        }
        info.pending_location = None;
        info.expected_transfer_time = None;
        self.update_death_info(info, event, now);

        let transfer_date = info.transfer_date;
        let location = info.location.clone();
        if let Some(encounter) = info.latest_encounter_mut() {
            encounter.update_status(transfer_date, EncounterStatus::Arrived);
            encounter.update_location(transfer_date, location.as_ref());
            encounter.is_pending = false;
        } else {
            info.add_encounter(transfer_date, EncounterStatus::Arrived, location.as_ref());
        }

        self.render_and_queue_at(ADT, "A02", info, event, event_time, RenderExtra::None)?;
        info.prior_location = None;
        Ok(())
    }

    /// Undoes an in-error transfer: the current bed frees and the patient
    /// returns to where they physically stayed.
    pub(super) fn cancel_transfer(
        &self,
        event: &Event,
        patient: &mut Patient,
        now: OffsetDateTime,
    ) -> Result<()> {
        let info = &mut patient.info;
        let freed = self.free_current_location(info, &event.pathway_name);
        info.location = info.prior_location_for_cancel_transfer.clone();
        info.prior_location = freed;
        self.update_death_info(info, event, now);

        self.render_and_queue(ADT, "A12", info, event, RenderExtra::None)?;
        info.transfer_date = None;
        info.prior_location = None;
        info.prior_location_for_cancel_transfer = None;
        Ok(())
    }
}
