//! Pending admissions, transfers, and discharges, and their cancellations.
//!
//! Pending steps reserve ahead: a bed goes to `pending_location` and the
//! expected time is recorded so the eventual admission or transfer can
//! consume the reservation. Cancelling gives the bed back.

use time::{Duration, OffsetDateTime};
use wardflow_core::Result;
use wardflow_core::ir::{AccountStatus, EncounterStatus};
use wardflow_pathway::step::{PendingAdmission, PendingDischarge, PendingTransfer};
use wardflow_state::{Event, Patient};

use crate::handlers::ADT;
use crate::hospital::Hospital;
use crate::render::RenderExtra;

impl Hospital {
    /// Reserves a bed for an upcoming admission.
    pub(super) fn record_pending_admission(
        &self,
        step: &PendingAdmission,
        event: &Event,
        patient: &mut Patient,
        now: OffsetDateTime,
    ) -> Result<()> {
        let info = &mut patient.info;
        let pending = self.occupy_bed(&step.loc, &step.bed)?;
        info.account_status = Some(AccountStatus::Planned);
        info.pending_location = Some(pending);
        info.expected_admit_time = Some(
            event.event_time + step.expected_admission_time_from_now.unwrap_or(Duration::ZERO),
        );
        self.update_death_info(info, event, now);

        // The encounter starts when the admission is expected to. Two
        // consecutive pending steps leave the first encounter unfinished;
        // only the latest one is ever looked at.
        let expected = info.expected_admit_time;
        let encounter = info.add_encounter(expected, EncounterStatus::Planned, None);
        encounter.is_pending = true;

        self.render_and_queue(ADT, "A14", info, event, RenderExtra::None)
    }

    /// Reserves a bed for an upcoming transfer.
    pub(super) fn record_pending_transfer(
        &self,
        step: &PendingTransfer,
        event: &Event,
        patient: &mut Patient,
        now: OffsetDateTime,
    ) -> Result<()> {
        let info = &mut patient.info;
        let pending = self.occupy_bed(&step.loc, &step.bed)?;
        info.pending_location = Some(pending);
        info.expected_transfer_time = Some(
            event.event_time + step.expected_transfer_time_from_now.unwrap_or(Duration::ZERO),
        );
        self.update_death_info(info, event, now);

        let expected = info.expected_transfer_time;
        let encounter = info.add_encounter(expected, EncounterStatus::Planned, None);
        encounter.is_pending = true;

        self.render_and_queue(ADT, "A15", info, event, RenderExtra::None)
    }

    /// Announces when the patient is expected to leave. No bed changes
    /// hands.
    pub(super) fn record_pending_discharge(
        &self,
        step: &PendingDischarge,
        event: &Event,
        patient: &mut Patient,
        now: OffsetDateTime,
    ) -> Result<()> {
        let info = &mut patient.info;
        info.expected_discharge_time = Some(
            event.event_time + step.expected_discharge_time_from_now.unwrap_or(Duration::ZERO),
        );
        self.update_death_info(info, event, now);

        let expected = info.expected_discharge_time;
        let location = info.location.clone();
        match info.latest_encounter_mut() {
            Some(encounter) => {
                encounter.update_status(expected, EncounterStatus::Planned);
                encounter.is_pending = true;
            }
            None => {
                let encounter =
                    info.add_encounter(expected, EncounterStatus::Planned, location.as_ref());
                encounter.is_pending = true;
            }
        }

        self.render_and_queue(ADT, "A16", info, event, RenderExtra::None)
    }

    /// Cancels a pending admission and frees the reserved bed.
    pub(super) fn cancel_pending_admission(
        &self,
        event: &Event,
        patient: &mut Patient,
        now: OffsetDateTime,
    ) -> Result<()> {
        let info = &mut patient.info;
        info.prior_pending_location = info.pending_location.take();
        info.account_status = Some(AccountStatus::Cancelled);
        self.update_death_info(info, event, now);

        self.render_and_queue(ADT, "A27", info, event, RenderExtra::None)?;
        self.free_specific_location(info.prior_pending_location.as_ref(), &event.pathway_name);
        info.prior_pending_location = None;
        info.expected_admit_time = None;
        Ok(())
    }

    /// Cancels a pending transfer and frees the reserved bed.
    pub(super) fn cancel_pending_transfer(
        &self,
        event: &Event,
        patient: &mut Patient,
        now: OffsetDateTime,
    ) -> Result<()> {
        let info = &mut patient.info;
        info.prior_pending_location = info.pending_location.take();
        self.update_death_info(info, event, now);

        self.render_and_queue(ADT, "A26", info, event, RenderExtra::None)?;
        self.free_specific_location(info.prior_pending_location.as_ref(), &event.pathway_name);
        info.prior_pending_location = None;
        info.expected_transfer_time = None;
        Ok(())
    }

    /// Withdraws an announced discharge time.
    pub(super) fn cancel_pending_discharge(
        &self,
        event: &Event,
        patient: &mut Patient,
        now: OffsetDateTime,
    ) -> Result<()> {
        let info = &mut patient.info;
        self.update_death_info(info, event, now);
        self.render_and_queue(ADT, "A25", info, event, RenderExtra::None)?;
        info.expected_discharge_time = None;
        Ok(())
    }
}
