//! The step vocabulary: every kind of clinical step a pathway can contain,
//! with its kind-specific parameters.
//!
//! Steps serialize with the kind as the outer key, so a JSON form looks like
//! `{"admission": {"loc": "Renal"}, "parameters": {...}}`. Marker steps with
//! no parameters of their own (`cancel_visit`, `delete_visit`, ...) carry an
//! empty struct so that they keep the same shape on the wire.

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use wardflow_core::ir::{Allergy, DiagnosisOrProcedure};

use crate::pathway::PatientId;
use crate::person::PersonTemplate;

/// Keyword asking the generator collaborator to pick a value, accepted
/// wherever a fixed value could otherwise be given.
pub const RANDOM: &str = "RANDOM";

/// Keyword for [`Results::collected_date_time`] and
/// [`Results::received_in_lab_date_time`]: leave the date unset.
pub const EMPTY: &str = "EMPTY";

/// Keyword for [`Results::collected_date_time`] and
/// [`Results::received_in_lab_date_time`]: truncate the date to midnight.
pub const MIDNIGHT: &str = "MIDNIGHT";

/// One step of a pathway: the kind-specific payload plus the optional
/// parameters any step may carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(flatten)]
    pub kind: StepKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Parameters>,
}

impl Step {
    pub fn new(kind: StepKind) -> Self {
        Self {
            kind,
            parameters: None,
        }
    }

    pub fn with_parameters(kind: StepKind, parameters: Parameters) -> Self {
        Self {
            kind,
            parameters: Some(parameters),
        }
    }

    /// The step's kind name, for logging and failure reasons.
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// The death declaration attached to this step, if any.
    pub fn death_status(&self) -> Option<&DeathStatus> {
        self.parameters.as_ref()?.status.as_ref()
    }

    /// Offset between the step taking effect and its message becoming due,
    /// sampled from the step's message delay. Zero when no delay is set.
    pub fn message_delay(&self) -> Duration {
        self.parameters
            .as_ref()
            .and_then(|p| p.delay_message.as_ref())
            .map_or(Duration::ZERO, Delay::sample)
    }

    /// Offset between now and when a historical step happened. Negative by
    /// construction; `None` for live steps.
    pub fn time_from_now(&self) -> Option<Duration> {
        self.parameters.as_ref()?.time_from_now
    }
}

/// The closed set of step kinds. The engine dispatches on this exhaustively,
/// so adding a kind means deciding its handling everywhere it matters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Delay(Delay),
    Admission(Admission),
    Order(Order),
    Results(Results),
    Discharge(Discharge),
    Registration(Registration),
    PreAdmission(PreAdmission),
    Transfer(Transfer),
    Merge(Merge),
    BedSwap(BedSwap),
    TransferInError(TransferInError),
    DischargeInError(DischargeInError),
    CancelVisit(CancelVisit),
    CancelTransfer(CancelTransfer),
    CancelDischarge(CancelDischarge),
    AddPerson(AddPerson),
    UpdatePerson(UpdatePerson),
    PendingAdmission(PendingAdmission),
    PendingDischarge(PendingDischarge),
    PendingTransfer(PendingTransfer),
    CancelPendingAdmission(CancelPendingAdmission),
    CancelPendingDischarge(CancelPendingDischarge),
    CancelPendingTransfer(CancelPendingTransfer),
    DeleteVisit(DeleteVisit),
    TrackDeparture(TrackDeparture),
    TrackArrival(TrackArrival),
    UsePatient(UsePatient),
    #[serde(rename = "autogenerate")]
    AutoGenerate(AutoGenerate),
    ClinicalNote(ClinicalNote),
    HardcodedMessage(HardcodedMessage),
    Document(Document),
    Generic(Generic),
    GenerateResources(GenerateResources),
}

impl StepKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Delay(_) => "delay",
            Self::Admission(_) => "admission",
            Self::Order(_) => "order",
            Self::Results(_) => "results",
            Self::Discharge(_) => "discharge",
            Self::Registration(_) => "registration",
            Self::PreAdmission(_) => "pre_admission",
            Self::Transfer(_) => "transfer",
            Self::Merge(_) => "merge",
            Self::BedSwap(_) => "bed_swap",
            Self::TransferInError(_) => "transfer_in_error",
            Self::DischargeInError(_) => "discharge_in_error",
            Self::CancelVisit(_) => "cancel_visit",
            Self::CancelTransfer(_) => "cancel_transfer",
            Self::CancelDischarge(_) => "cancel_discharge",
            Self::AddPerson(_) => "add_person",
            Self::UpdatePerson(_) => "update_person",
            Self::PendingAdmission(_) => "pending_admission",
            Self::PendingDischarge(_) => "pending_discharge",
            Self::PendingTransfer(_) => "pending_transfer",
            Self::CancelPendingAdmission(_) => "cancel_pending_admission",
            Self::CancelPendingDischarge(_) => "cancel_pending_discharge",
            Self::CancelPendingTransfer(_) => "cancel_pending_transfer",
            Self::DeleteVisit(_) => "delete_visit",
            Self::TrackDeparture(_) => "track_departure",
            Self::TrackArrival(_) => "track_arrival",
            Self::UsePatient(_) => "use_patient",
            Self::AutoGenerate(_) => "autogenerate",
            Self::ClinicalNote(_) => "clinical_note",
            Self::HardcodedMessage(_) => "hardcoded_message",
            Self::Document(_) => "document",
            Self::Generic(_) => "generic",
            Self::GenerateResources(_) => "generate_resources",
        }
    }
}

/// Parameters any step may carry in addition to its kind-specific payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// Delay between the step taking effect and its message being sent.
    pub delay_message: Option<Delay>,
    /// Offset between now and when the event happened. Only allowed in
    /// historical steps and must be negative; positive offsets between live
    /// steps are expressed with delay steps instead.
    pub time_from_now: Option<Duration>,
    /// Death declaration, applied before the step's own handling.
    pub status: Option<DeathStatus>,
    pub sending_application: String,
    pub receiving_application: String,
    pub sending_facility: String,
    pub receiving_facility: String,
    /// Free-form parameters for custom processors.
    pub custom: HashMap<String, String>,
}

/// A patient's death declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeathStatus {
    /// Explicit dead indicator; derived from the times when empty.
    pub death_indicator: String,
    /// Only one of `time_of_death` or `time_since_death` may be set.
    pub time_of_death: Option<OffsetDateTime>,
    pub time_since_death: Option<Duration>,
}

/// A random duration between `from` and `to`. Both ends must be
/// non-negative and `to` must not precede `from`; suppliers validate that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Delay {
    pub from: Duration,
    pub to: Duration,
}

impl Delay {
    pub fn sample(&self) -> Duration {
        if self.to <= self.from {
            return self.from;
        }
        let span = (self.to - self.from).whole_nanoseconds() as i64;
        self.from + Duration::nanoseconds(rand::thread_rng().gen_range(0..span))
    }
}

impl Default for Delay {
    fn default() -> Self {
        Self {
            from: Duration::ZERO,
            to: Duration::ZERO,
        }
    }
}

/// A random integer in `[from, to)`, or `from` when the range is empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Interval {
    pub from: i32,
    pub to: i32,
}

impl Interval {
    pub fn sample(&self) -> i32 {
        if self.to <= self.from {
            return self.from;
        }
        rand::thread_rng().gen_range(self.from..self.to)
    }
}

/// A point in time given either absolutely, relative to now, or explicitly
/// not recorded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateTimeSpec {
    pub time: Option<OffsetDateTime>,
    pub time_from_now: Option<Duration>,
    pub no_date_time_recorded: bool,
}

impl DateTimeSpec {
    pub fn resolve(&self, now: OffsetDateTime) -> Option<OffsetDateTime> {
        if self.time.is_some() {
            return self.time;
        }
        self.time_from_now.map(|offset| now + offset)
    }
}

/// Mode of a tracking step. `Transit` is the two-phase move where departure
/// reserves the destination and arrival confirms it; `Temporary` moves the
/// patient to a side location that holds no bed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackMode {
    #[default]
    Track,
    Transit,
    Temporary,
}

impl std::fmt::Display for TrackMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Track => write!(f, "track"),
            Self::Transit => write!(f, "transit"),
            Self::Temporary => write!(f, "temporary"),
        }
    }
}

/// How a document step applies to an existing document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentUpdateType {
    Append,
    Overwrite,
}

/// Admit the patient to a bed in the given point of care.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Admission {
    pub loc: String,
    pub bed: String,
    pub allergies: Vec<Allergy>,
    pub admit_reason: String,
}

/// Place an order, normally followed by an acknowledgement message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Order {
    /// Links the order with its results steps. May be left empty when the
    /// pathway has a single order-results pair.
    pub order_id: String,
    pub order_profile: String,
    pub order_status: String,
    /// Suppress the acknowledgement that normally follows the order.
    pub no_acknowledgement_message: bool,
}

/// Report a set of results, one observation per entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Results {
    pub order_id: String,
    pub order_profile: String,
    /// If either status is set, both must be.
    pub order_status: String,
    pub results_status: String,
    /// Accepts the [`EMPTY`] and [`MIDNIGHT`] keywords.
    pub collected_date_time: String,
    pub received_in_lab_date_time: String,
    pub results: Vec<TestResult>,
    /// Supported: R01 (default), R03 and R32.
    pub trigger_event: String,
    /// A correction for the same order follows; the previous-results count
    /// does not advance until it arrives.
    pub expect_correction: bool,
}

/// A single test result within a results step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestResult {
    pub test_name: String,
    pub id: String,
    pub result_status: String,
    /// Numerical ("5.4", "<0.5") or textual; a unit is required for
    /// numerical values and forbidden for textual ones.
    pub value: String,
    pub unit: String,
    /// Offset of this observation relative to the collection time.
    pub observation_date_time_offset: Option<Duration>,
    pub reference_range: String,
    /// HIGH or LOW to mark the value abnormal, DEFAULT to derive the flag
    /// from the reference range.
    pub abnormal_flag: String,
    pub notes: Vec<String>,
}

/// Discharge the patient and free their bed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Discharge {
    pub note: String,
    pub allergies: Vec<Allergy>,
    pub discharge_time: Option<OffsetDateTime>,
}

/// Register the patient for an outpatient visit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Registration {
    pub patient_class: String,
    pub allergies: Vec<Allergy>,
}

/// Pre-admit the patient: the visit is known but has not started.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreAdmission {
    pub loc: String,
    pub bed: String,
    pub expected_admission_time_from_now: Option<Duration>,
    pub allergies: Vec<Allergy>,
}

/// Transfer the patient to another point of care.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transfer {
    pub loc: String,
    pub bed: String,
}

/// Merge one or more child patients into the parent patient.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Merge {
    /// Always produce the multi-patient merge form, even with one child.
    pub force_a40: bool,
    pub children: Vec<PatientId>,
    pub parent: PatientId,
}

/// Swap the beds of two patients.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BedSwap {
    pub patient_1: PatientId,
    pub patient_2: PatientId,
}

/// A transfer performed by mistake; the following cancel-transfer restores
/// the previous location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferInError {
    pub loc: String,
    pub bed: String,
}

/// A discharge performed by mistake. Sends the same message as a discharge
/// but keeps the bed occupied, the way a real ward would, so that the
/// following cancel-discharge finds the patient where they were.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DischargeInError {
    pub note: String,
    pub allergies: Vec<Allergy>,
    pub discharge_time: Option<OffsetDateTime>,
}

/// Cancel the latest admission or visit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelVisit {}

/// Cancel the latest transfer and return the patient to their previous
/// location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelTransfer {}

/// Cancel the latest discharge and re-admit the patient.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelDischarge {}

/// Create a new person record. Only allowed as the first step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddPerson {
    pub allergies: Vec<Allergy>,
}

/// Update the person's demographics, diagnoses, procedures or allergies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdatePerson {
    pub person: Option<PersonTemplate>,
    pub diagnoses: Vec<DiagnosisOrProcedure>,
    pub procedures: Vec<DiagnosisOrProcedure>,
    pub allergies: Vec<Allergy>,
}

/// Announce a future admission and reserve the bed for it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PendingAdmission {
    pub loc: String,
    pub bed: String,
    /// When the admission is expected; used for the message only, actual
    /// timing comes from explicit delay steps.
    pub expected_admission_time_from_now: Option<Duration>,
}

/// Announce a future discharge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PendingDischarge {
    pub expected_discharge_time_from_now: Option<Duration>,
}

/// Announce a future transfer and reserve the bed for it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PendingTransfer {
    pub loc: String,
    pub bed: String,
    pub expected_transfer_time_from_now: Option<Duration>,
}

/// Cancel a pending admission and release its reservation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelPendingAdmission {}

/// Cancel a pending discharge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelPendingDischarge {}

/// Cancel a pending transfer and release its reservation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelPendingTransfer {}

/// Delete the most recently discharged or cancelled visit. The active visit,
/// if any, is ignored; cancelling it takes a cancel-visit step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteVisit {}

/// Track the patient leaving their location without a formal transfer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackDeparture {
    pub mode: TrackMode,
    pub destination_loc: String,
    /// Cannot be set in temporary mode.
    pub destination_bed: String,
}

/// Track the patient arriving somewhere after a tracked departure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackArrival {
    pub mode: TrackMode,
    pub loc: String,
    /// Cannot be set in transit mode.
    pub bed: String,
    /// Whether `loc` is a temporary location such as a hallway or X-RAY.
    /// Only meaningful in temporary mode.
    pub is_temporary: bool,
}

/// Switch which patient the following steps apply to. The patient is named
/// by its pathway person id or by MRN; [`crate::CURRENT`] is not allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsePatient {
    pub patient: PatientId,
}

/// Expand into repeated results steps between `from` and `to`, one per
/// `every`. Suppliers expand this at load time; it never reaches the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoGenerate {
    pub result: Option<Results>,
    pub from: Option<Duration>,
    pub to: Option<Duration>,
    pub every: Option<Duration>,
}

/// Send a clinical note: a document about the patient reported as a single
/// observation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicalNote {
    pub date_time: Option<DateTimeSpec>,
    pub document_type: String,
    pub content_type: String,
    pub document_id: String,
    pub document_content: String,
    pub document_title: String,
}

/// Send a canned message whose name matches the regular expression. One of
/// the matching messages is chosen at random.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardcodedMessage {
    pub regex: String,
}

/// Create or update a free-text document for the patient.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Document {
    /// Pathway-level id linking update steps to the document they update.
    /// Required when `update_type` is set.
    pub id: String,
    pub document_type: String,
    pub completion_status: String,
    /// Generated when `None`; an explicit empty string is preserved.
    pub obs_identifier_id: Option<String>,
    pub obs_identifier_text: Option<String>,
    pub obs_identifier_coding_system: Option<String>,
    pub update_type: Option<DocumentUpdateType>,
    pub header_content_lines: Vec<String>,
    pub ending_content_lines: Vec<String>,
    /// Number of random filler lines; picked between 10 and 50 when unset.
    pub num_random_content_lines: Option<Interval>,
}

/// A step with no default behavior; an override processor must handle it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Generic {
    pub name: String,
}

/// Write a resource snapshot of the patient's current state. No message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateResources {}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_step_serde_uses_kind_as_outer_key() {
        let step = Step::new(StepKind::Admission(Admission {
            loc: "Renal".to_string(),
            bed: "Bed 1".to_string(),
            ..Default::default()
        }));
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["admission"]["loc"], "Renal");
        assert!(json.get("parameters").is_none());

        let back: Step = serde_json::from_value(json).unwrap();
        assert_eq!(back, step);
    }

    #[test]
    fn test_step_serde_marker_kind_round_trip() {
        let step = Step::new(StepKind::CancelVisit(CancelVisit {}));
        let json = serde_json::to_string(&step).unwrap();
        assert!(json.contains("cancel_visit"));
        let back: Step = serde_json::from_str(&json).unwrap();
        assert_eq!(back, step);
    }

    #[test]
    fn test_step_serde_with_parameters() {
        let step = Step::with_parameters(
            StepKind::Discharge(Discharge::default()),
            Parameters {
                delay_message: Some(Delay {
                    from: Duration::seconds(1),
                    to: Duration::seconds(5),
                }),
                ..Default::default()
            },
        );
        let json = serde_json::to_string(&step).unwrap();
        let back: Step = serde_json::from_str(&json).unwrap();
        assert_eq!(back, step);
    }

    #[test]
    fn test_step_names() {
        assert_eq!(Step::new(StepKind::Delay(Delay::default())).name(), "delay");
        assert_eq!(
            StepKind::PendingAdmission(PendingAdmission::default()).name(),
            "pending_admission"
        );
        assert_eq!(
            StepKind::AutoGenerate(AutoGenerate::default()).name(),
            "autogenerate"
        );
        assert_eq!(
            StepKind::GenerateResources(GenerateResources {}).name(),
            "generate_resources"
        );
    }

    #[test]
    fn test_delay_sample_within_bounds() {
        let delay = Delay {
            from: Duration::seconds(1),
            to: Duration::seconds(5),
        };
        for _ in 0..100 {
            let sampled = delay.sample();
            assert!(sampled >= delay.from && sampled < delay.to);
        }
    }

    #[test]
    fn test_delay_sample_degenerate() {
        let fixed = Delay {
            from: Duration::seconds(3),
            to: Duration::seconds(3),
        };
        assert_eq!(fixed.sample(), Duration::seconds(3));

        let inverted = Delay {
            from: Duration::seconds(4),
            to: Duration::seconds(2),
        };
        assert_eq!(inverted.sample(), Duration::seconds(4));
    }

    #[test]
    fn test_interval_sample() {
        let interval = Interval { from: 10, to: 50 };
        for _ in 0..100 {
            let sampled = interval.sample();
            assert!((10..50).contains(&sampled));
        }
        assert_eq!(Interval { from: 7, to: 7 }.sample(), 7);
    }

    #[test]
    fn test_message_delay_defaults_to_zero() {
        let step = Step::new(StepKind::Registration(Registration::default()));
        assert_eq!(step.message_delay(), Duration::ZERO);
    }

    #[test]
    fn test_date_time_spec_resolution() {
        let now = datetime!(2024-05-01 10:00:00 UTC);

        let absolute = DateTimeSpec {
            time: Some(datetime!(2024-01-01 00:00:00 UTC)),
            time_from_now: Some(Duration::hours(2)),
            no_date_time_recorded: false,
        };
        assert_eq!(
            absolute.resolve(now),
            Some(datetime!(2024-01-01 00:00:00 UTC))
        );

        let relative = DateTimeSpec {
            time: None,
            time_from_now: Some(-Duration::hours(2)),
            no_date_time_recorded: false,
        };
        assert_eq!(
            relative.resolve(now),
            Some(datetime!(2024-05-01 08:00:00 UTC))
        );

        let unrecorded = DateTimeSpec {
            no_date_time_recorded: true,
            ..Default::default()
        };
        assert_eq!(unrecorded.resolve(now), None);
        assert_eq!(DateTimeSpec::default().resolve(now), None);
    }

    #[test]
    fn test_death_status_accessor() {
        let step = Step::with_parameters(
            StepKind::Discharge(Discharge::default()),
            Parameters {
                status: Some(DeathStatus {
                    death_indicator: "Y".to_string(),
                    time_of_death: Some(datetime!(2024-05-01 09:00:00 UTC)),
                    time_since_death: None,
                }),
                ..Default::default()
            },
        );
        assert_eq!(step.death_status().unwrap().death_indicator, "Y");
        assert!(
            Step::new(StepKind::Discharge(Discharge::default()))
                .death_status()
                .is_none()
        );
    }

    #[test]
    fn test_track_mode_serde_and_display() {
        let departure = TrackDeparture {
            mode: TrackMode::Transit,
            destination_loc: "X-Ray".to_string(),
            destination_bed: String::new(),
        };
        let json = serde_json::to_string(&departure).unwrap();
        assert!(json.contains("\"transit\""));
        assert_eq!(TrackMode::Temporary.to_string(), "temporary");
    }
}
