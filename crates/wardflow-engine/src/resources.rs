//! Structured snapshots of patient records, written outside the message
//! stream.

use wardflow_core::Result;
use wardflow_core::ir::PatientInfo;

/// Writes a structured representation of a patient record.
///
/// Invoked by the generate-resources step with the record as it stands at
/// that point in the pathway. What a writer produces and where it goes is
/// its own business; the engine only guarantees the call order and a final
/// `close`.
pub trait ResourceWriter: Send + Sync {
    fn generate(&self, patient: &PatientInfo) -> Result<()>;
    fn close(&self) -> Result<()>;
}

/// Discards every record. The default when no writer is configured.
#[derive(Debug, Default)]
pub struct NullResourceWriter;

impl ResourceWriter for NullResourceWriter {
    fn generate(&self, _patient: &PatientInfo) -> Result<()> {
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}
