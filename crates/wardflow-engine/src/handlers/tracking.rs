//! Departure and arrival tracking between beds, transit, and temporary
//! locations.

use time::OffsetDateTime;
use wardflow_core::ir::PatientLocation;
use wardflow_core::{CoreError, Result};
use wardflow_pathway::TrackMode;
use wardflow_pathway::step::{TrackArrival, TrackDeparture};
use wardflow_state::{Event, Patient};

use crate::handlers::ADT;
use crate::hospital::Hospital;
use crate::render::RenderExtra;

impl Hospital {
    /// Records the patient leaving their current location. `track` moves
    /// them straight into the destination bed, `transit` reserves it until
    /// the arrival confirms, and `temporary` parks them in a location that
    /// holds no bed.
    pub(super) fn track_departure(
        &self,
        step: &TrackDeparture,
        event: &Event,
        patient: &mut Patient,
        now: OffsetDateTime,
    ) -> Result<()> {
        let info = &mut patient.info;
        self.free_specific_location(info.location.as_ref(), &event.pathway_name);
        match step.mode {
            TrackMode::Track => {
                let location = self.occupy_bed(&step.destination_loc, &step.destination_bed)?;
                info.prior_location = info.location.take();
                info.location = Some(location);
            }
            TrackMode::Transit => {
                let pending = self.occupy_bed(&step.destination_loc, &step.destination_bed)?;
                info.prior_location = info.location.take();
                info.pending_location = Some(pending);
            }
            TrackMode::Temporary => {
                if info.temporary_location.is_some() {
                    info.prior_temporary_location = info.temporary_location.take();
                } else {
                    info.prior_location = info.location.take();
                }
                info.temporary_location = Some(PatientLocation {
                    poc: step.destination_loc.clone(),
                    ..Default::default()
                });
                info.location = None;
            }
        }
        self.update_death_info(info, event, now);
        self.render_and_queue(ADT, "A09", info, event, RenderExtra::None)
    }

    /// Records the patient arriving. A transit arrival must name the same
    /// point of care the departure reserved; anything else is a mismatch.
    pub(super) fn track_arrival(
        &self,
        step: &TrackArrival,
        event: &Event,
        patient: &mut Patient,
        now: OffsetDateTime,
    ) -> Result<()> {
        let info = &mut patient.info;
        match step.mode {
            TrackMode::Track => {
                info.prior_location = info.location.clone();
                self.free_specific_location(info.location.as_ref(), &event.pathway_name);
                info.location = Some(self.occupy_bed(&step.loc, &step.bed)?);
            }
            TrackMode::Transit => {
                let Some(pending) = info.pending_location.as_ref() else {
                    return Err(CoreError::transit_mismatch(&step.loc));
                };
                if !self.locations.matches(&step.loc, pending)? {
                    return Err(CoreError::transit_mismatch(&step.loc));
                }
                info.location = info.pending_location.take();
            }
            TrackMode::Temporary => {
                if !step.is_temporary {
                    // Temporary to permanent: the patient gets a real bed.
                    info.prior_temporary_location = info.temporary_location.take();
                    info.location = Some(self.occupy_bed(&step.loc, &step.bed)?);
                } else if info
                    .temporary_location
                    .as_ref()
                    .is_none_or(|temporary| temporary.poc != step.loc)
                {
                    // Temporary to temporary; nothing moves when the new
                    // location is the one they are already in.
                    info.prior_temporary_location = info.temporary_location.take();
                    info.temporary_location = Some(PatientLocation {
                        poc: step.loc.clone(),
                        ..Default::default()
                    });
                }
            }
        }
        self.update_death_info(info, event, now);
        self.render_and_queue(ADT, "A10", info, event, RenderExtra::None)
    }
}
