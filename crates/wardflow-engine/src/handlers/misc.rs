//! Steps that bypass the renderer: canned messages and resource exports.

use time::OffsetDateTime;
use tracing::info;
use wardflow_core::{CoreError, Result};
use wardflow_pathway::step::HardcodedMessage;
use wardflow_state::{Event, Patient};

use crate::hospital::Hospital;

impl Hospital {
    /// Queues a canned message chosen by the step's pattern, personalized
    /// for the patient but otherwise sent as-is.
    pub(super) fn send_hardcoded_message(
        &self,
        step: &HardcodedMessage,
        event: &Event,
        patient: &mut Patient,
        now: OffsetDateTime,
    ) -> Result<()> {
        let Some(hardcoded) = self.hardcoded.as_ref() else {
            return Err(CoreError::configuration(
                "no hardcoded message source configured",
            ));
        };
        let rendered = hardcoded.message(&step.regex, &patient.info.person, now)?;
        self.queue_message(rendered, event);
        Ok(())
    }

    /// Hands the patient record to the resource writer. No message.
    pub(super) fn generate_resources(&self, event: &Event, patient: &Patient) -> Result<()> {
        info!(mrn = %event.patient_mrn, "generating resources");
        self.resource_writer.generate(&patient.info)
    }
}
