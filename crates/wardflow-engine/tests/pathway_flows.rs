//! End-to-end pathway runs against an in-memory hospital: events are driven
//! by a logical clock and the resulting messages are captured by a memory
//! transport.

use std::collections::HashMap;
use std::sync::Arc;

use time::Duration;
use time::macros::datetime;
use wardflow_core::metrics::{MetricsSink, names};
use wardflow_core::{Clock, LogicalClock, RecordingSink, Result};
use wardflow_engine::{
    Hospital, HospitalBuilder, LocationDefinition, MemoryTransport, MessageRenderer, RenderExtra,
    RenderRequest, Transport,
};
use wardflow_pathway::step::{
    Admission, Delay, DeleteVisit, Discharge, Merge, Order, PendingAdmission, Registration,
    TrackArrival, TrackDeparture, TrackMode,
};
use wardflow_pathway::{
    CURRENT, Pathway, PatientId, PersonTemplate, RoundRobinSupplier, Step, StepKind,
};

const START: time::OffsetDateTime = datetime!(2024-03-01 12:00:00 UTC);

/// Renders `TYPE^TRIGGER|MRN`, with merge children appended so tests can see
/// which records a merge pulled in.
struct LineRenderer;

impl MessageRenderer for LineRenderer {
    fn render(&self, request: &RenderRequest<'_>) -> Result<String> {
        let mut body = format!(
            "{}^{}|{}",
            request.message_type, request.trigger_event, request.patient.person.mrn
        );
        if let RenderExtra::MergeChildren(children) = &request.extra {
            body.push('|');
            body.push_str(&children.join(","));
        }
        Ok(body)
    }
}

struct TestHospital {
    hospital: Hospital,
    clock: Arc<LogicalClock>,
    transport: Arc<MemoryTransport>,
    metrics: Arc<RecordingSink>,
}

impl TestHospital {
    /// Runs every due event, then delivers every due message.
    fn drain_due(&self) {
        while self.hospital.run_next_event_if_due().expect("event runs") {}
        while self
            .hospital
            .process_next_message_if_due()
            .expect("message processes")
        {}
    }
}

fn wards() -> HashMap<String, LocationDefinition> {
    let mut wards = HashMap::new();
    for name in ["ED", "Ward 1", "Ward 2"] {
        wards.insert(name.to_string(), LocationDefinition::default());
    }
    wards
}

fn build_hospital(pathways: Vec<Pathway>) -> TestHospital {
    build_hospital_with(pathways, |builder| builder)
}

fn build_hospital_with(
    pathways: Vec<Pathway>,
    configure: impl FnOnce(HospitalBuilder) -> HospitalBuilder,
) -> TestHospital {
    let clock = Arc::new(LogicalClock::new(START));
    let transport = Arc::new(MemoryTransport::new());
    let metrics = Arc::new(RecordingSink::new());
    let supplier = RoundRobinSupplier::new(pathways).expect("supplier accepts pathways");
    let builder = Hospital::builder()
        .with_supplier(Arc::new(supplier))
        .with_locations(wards())
        .with_renderer(Arc::new(LineRenderer))
        .with_transport(Arc::clone(&transport) as Arc<dyn Transport>)
        .with_clock(Arc::clone(&clock) as Arc<dyn Clock>)
        .with_metrics(Arc::clone(&metrics) as Arc<dyn MetricsSink>);
    let hospital = configure(builder).build().expect("hospital builds");
    TestHospital {
        hospital,
        clock,
        transport,
        metrics,
    }
}

fn pathway(name: &str, kinds: Vec<StepKind>) -> Pathway {
    let mut pathway = Pathway::new(name);
    pathway.init(name);
    pathway.steps = kinds.into_iter().map(Step::new).collect();
    pathway
}

fn admission_to(loc: &str) -> StepKind {
    StepKind::Admission(Admission {
        loc: loc.to_string(),
        ..Default::default()
    })
}

#[test]
fn admission_then_discharge_sends_messages_in_order_and_frees_the_bed() {
    let flow = pathway(
        "admit_discharge",
        vec![
            admission_to("Ward 1"),
            StepKind::Discharge(Discharge::default()),
        ],
    );
    let test = build_hospital(vec![flow.clone()]);
    let persons = test.hospital.start_pathway(&flow).expect("pathway starts");
    let mrn = persons[0].mrn.clone();

    assert!(test.hospital.run_next_event_if_due().expect("admission runs"));
    assert_eq!(test.hospital.locations().occupied_beds("Ward 1"), 1);

    assert!(test.hospital.run_next_event_if_due().expect("discharge runs"));
    assert_eq!(test.hospital.locations().occupied_beds("Ward 1"), 0);
    assert!(!test.hospital.run_next_event_if_due().expect("queue is empty"));

    assert_eq!(test.hospital.messages_len(), 2);
    assert!(test.hospital.process_next_message_if_due().expect("first message"));
    assert!(test.hospital.process_next_message_if_due().expect("second message"));
    assert_eq!(
        test.transport.sent(),
        vec![format!("ADT^A01|{mrn}"), format!("ADT^A03|{mrn}")]
    );

    // Both steps ran on the same logical second, so the admission lasted
    // zero minutes but was still measured.
    let stays = test.metrics.samples(
        names::ADMISSION_DURATION_MINUTES,
        &[("pathway_name", "admit_discharge")],
    );
    assert_eq!(stays, vec![0.0]);
    assert_eq!(
        test.metrics
            .counter(names::PATHWAYS_TOTAL, &[("pathway_name", "admit_discharge")]),
        1.0
    );
}

#[test]
fn registration_after_admission_opens_a_fresh_visit() {
    /// Renders `TYPE^TRIGGER|VISIT|ADMITTED` so the test can compare visit
    /// ids and admission dates across messages.
    struct VisitRenderer;

    impl MessageRenderer for VisitRenderer {
        fn render(&self, request: &RenderRequest<'_>) -> Result<String> {
            let admitted = request
                .patient
                .admission_date
                .map(|date| date.unix_timestamp())
                .unwrap_or_default();
            Ok(format!(
                "{}^{}|{}|{}",
                request.message_type, request.trigger_event, request.patient.visit_id, admitted
            ))
        }
    }

    let flow = pathway(
        "admit_then_register",
        vec![
            admission_to("Ward 1"),
            StepKind::Delay(Delay {
                from: Duration::hours(1),
                to: Duration::hours(1),
            }),
            StepKind::Registration(Registration::default()),
        ],
    );
    let clock = Arc::new(LogicalClock::new(START));
    let transport = Arc::new(MemoryTransport::new());
    let supplier = RoundRobinSupplier::new(vec![flow.clone()]).expect("supplier accepts pathways");
    let hospital = Hospital::builder()
        .with_supplier(Arc::new(supplier))
        .with_locations(wards())
        .with_renderer(Arc::new(VisitRenderer))
        .with_transport(Arc::clone(&transport) as Arc<dyn Transport>)
        .with_clock(Arc::clone(&clock) as Arc<dyn Clock>)
        .build()
        .expect("hospital builds");
    hospital.start_pathway(&flow).expect("pathway starts");

    assert!(hospital.run_next_event_if_due().expect("admission runs"));
    assert!(hospital.run_next_event_if_due().expect("delay runs"));
    clock.advance(Duration::hours(1));
    assert!(hospital.run_next_event_if_due().expect("registration runs"));
    while hospital.process_next_message_if_due().expect("message processes") {}

    let sent = transport.sent();
    assert_eq!(sent.len(), 2);
    let admission: Vec<&str> = sent[0].split('|').collect();
    let registration: Vec<&str> = sent[1].split('|').collect();
    assert_eq!(admission[0], "ADT^A01");
    assert_eq!(registration[0], "ADT^A04");

    // The registration replaces the visit the admission opened: new visit
    // id, new admission date.
    assert_ne!(admission[1], registration[1]);
    assert_ne!(admission[2], registration[2]);
}

#[test]
fn delay_steps_hold_the_next_event_until_the_clock_reaches_it() {
    let flow = pathway(
        "slow_admit",
        vec![
            StepKind::Delay(Delay {
                from: Duration::minutes(30),
                to: Duration::minutes(30),
            }),
            admission_to("Ward 1"),
        ],
    );
    let test = build_hospital(vec![flow.clone()]);
    test.hospital.start_pathway(&flow).expect("pathway starts");

    // 1. The delay step itself is due immediately and does nothing visible.
    assert!(test.hospital.run_next_event_if_due().expect("delay runs"));
    assert_eq!(test.hospital.messages_len(), 0);

    // 2. The admission is scheduled 30 minutes out.
    assert!(!test.hospital.run_next_event_if_due().expect("not yet due"));
    test.clock.advance(Duration::minutes(29));
    assert!(!test.hospital.run_next_event_if_due().expect("still not due"));
    test.clock.advance(Duration::minutes(1));
    assert!(test.hospital.run_next_event_if_due().expect("admission runs"));
    assert_eq!(test.hospital.messages_len(), 1);
}

#[test]
fn order_acknowledgement_is_queued_after_the_configured_delay() {
    let flow = pathway(
        "lipase_order",
        vec![StepKind::Order(Order {
            order_id: "lipase".to_string(),
            order_profile: "LIPASE".to_string(),
            ..Default::default()
        })],
    );
    let ack_delay = Delay {
        from: Duration::seconds(5),
        to: Duration::seconds(5),
    };
    let test = build_hospital_with(vec![flow.clone()], |builder| {
        builder.with_order_ack_delay(ack_delay)
    });
    let persons = test.hospital.start_pathway(&flow).expect("pathway starts");
    let mrn = persons[0].mrn.clone();

    assert!(test.hospital.run_next_event_if_due().expect("order runs"));
    assert_eq!(test.hospital.messages_len(), 2);

    // The order goes out now, the acknowledgement five seconds later.
    assert!(test.hospital.process_next_message_if_due().expect("order message"));
    assert!(!test.hospital.process_next_message_if_due().expect("ack not due"));
    test.clock.advance(Duration::seconds(5));
    assert!(test.hospital.process_next_message_if_due().expect("ack message"));
    assert_eq!(
        test.transport.sent(),
        vec![format!("ORM^O01|{mrn}"), format!("ORR^O02|{mrn}")]
    );
}

#[test]
fn order_without_acknowledgement_sends_a_single_message() {
    let flow = pathway(
        "silent_order",
        vec![StepKind::Order(Order {
            order_id: "lipase".to_string(),
            no_acknowledgement_message: true,
            ..Default::default()
        })],
    );
    let test = build_hospital(vec![flow.clone()]);
    test.hospital.start_pathway(&flow).expect("pathway starts");

    test.drain_due();
    assert_eq!(test.transport.len(), 1);
}

#[test]
fn pending_admission_reservation_is_consumed_by_the_admission() {
    let flow = pathway(
        "planned_admit",
        vec![
            StepKind::PendingAdmission(PendingAdmission {
                loc: "Ward 1".to_string(),
                expected_admission_time_from_now: Some(Duration::hours(1)),
                ..Default::default()
            }),
            admission_to("Ward 2"),
        ],
    );
    let test = build_hospital(vec![flow.clone()]);
    let persons = test.hospital.start_pathway(&flow).expect("pathway starts");
    let mrn = persons[0].mrn.clone();

    assert!(test.hospital.run_next_event_if_due().expect("pending runs"));
    assert_eq!(test.hospital.locations().occupied_beds("Ward 1"), 1);

    // The admission takes over the reserved bed instead of the one its own
    // step asks for.
    assert!(test.hospital.run_next_event_if_due().expect("admission runs"));
    assert_eq!(test.hospital.locations().occupied_beds("Ward 1"), 1);
    assert_eq!(test.hospital.locations().occupied_beds("Ward 2"), 0);

    test.drain_due();
    assert_eq!(
        test.transport.sent(),
        vec![format!("ADT^A14|{mrn}"), format!("ADT^A01|{mrn}")]
    );
}

#[test]
fn transit_tracking_moves_the_bed_from_origin_to_destination() {
    let flow = pathway(
        "porter_run",
        vec![
            admission_to("Ward 2"),
            StepKind::TrackDeparture(TrackDeparture {
                mode: TrackMode::Transit,
                destination_loc: "Ward 1".to_string(),
                ..Default::default()
            }),
            StepKind::TrackArrival(TrackArrival {
                mode: TrackMode::Transit,
                loc: "Ward 1".to_string(),
                ..Default::default()
            }),
        ],
    );
    let test = build_hospital(vec![flow.clone()]);
    let persons = test.hospital.start_pathway(&flow).expect("pathway starts");
    let mrn = persons[0].mrn.clone();

    assert!(test.hospital.run_next_event_if_due().expect("admission runs"));
    assert_eq!(test.hospital.locations().occupied_beds("Ward 2"), 1);

    // The departure frees the origin bed and reserves the destination.
    assert!(test.hospital.run_next_event_if_due().expect("departure runs"));
    assert_eq!(test.hospital.locations().occupied_beds("Ward 2"), 0);
    assert_eq!(test.hospital.locations().occupied_beds("Ward 1"), 1);

    assert!(test.hospital.run_next_event_if_due().expect("arrival runs"));
    assert_eq!(test.hospital.locations().occupied_beds("Ward 1"), 1);
    assert_eq!(test.hospital.locations().occupied_beds("Ward 2"), 0);

    test.drain_due();
    assert_eq!(
        test.transport.sent(),
        vec![
            format!("ADT^A01|{mrn}"),
            format!("ADT^A09|{mrn}"),
            format!("ADT^A10|{mrn}")
        ]
    );
}

#[test]
fn transit_arrival_at_the_wrong_location_ends_the_pathway() {
    let flow = pathway(
        "lost_porter",
        vec![
            admission_to("ED"),
            StepKind::TrackDeparture(TrackDeparture {
                mode: TrackMode::Transit,
                destination_loc: "Ward 1".to_string(),
                ..Default::default()
            }),
            StepKind::TrackArrival(TrackArrival {
                mode: TrackMode::Transit,
                loc: "Ward 2".to_string(),
                ..Default::default()
            }),
        ],
    );
    let test = build_hospital_with(vec![flow.clone()], |builder| {
        builder.with_evict_after_delete(true)
    });
    let persons = test.hospital.start_pathway(&flow).expect("pathway starts");
    let mrn = persons[0].mrn.clone();

    assert!(test.hospital.run_next_event_if_due().expect("admission runs"));
    assert!(test.hospital.run_next_event_if_due().expect("departure runs"));
    assert_eq!(test.hospital.locations().occupied_beds("ED"), 0);
    assert_eq!(test.hospital.locations().occupied_beds("Ward 1"), 1);
    assert!(test.hospital.run_next_event_if_due().expect("arrival runs"));

    // The admission and departure produced messages; the failed arrival
    // dropped the patient and was counted. Its pending reservation is not
    // released.
    assert_eq!(test.hospital.messages_len(), 2);
    assert!(!test.hospital.patient_exists(&mrn));
    assert_eq!(test.hospital.locations().occupied_beds("Ward 1"), 1);
    assert_eq!(
        test.metrics.counter(
            names::ERRORS_TOTAL,
            &[
                ("pathway_name", "lost_porter"),
                (
                    "reason",
                    "transit location mismatch: arrival at Ward 2 does not match the pending location",
                ),
            ],
        ),
        1.0
    );
}

#[test]
fn delete_visit_without_past_visits_drops_the_patient() {
    let flow = pathway(
        "premature_delete",
        vec![StepKind::DeleteVisit(DeleteVisit::default())],
    );
    let test = build_hospital_with(vec![flow.clone()], |builder| {
        builder.with_evict_after_delete(true)
    });
    let persons = test.hospital.start_pathway(&flow).expect("pathway starts");
    let mrn = persons[0].mrn.clone();

    assert!(test.hospital.run_next_event_if_due().expect("delete runs"));
    assert_eq!(test.hospital.messages_len(), 0);
    assert!(!test.hospital.patient_exists(&mrn));
    assert_eq!(
        test.metrics.counter(
            names::ERRORS_TOTAL,
            &[
                ("pathway_name", "premature_delete"),
                ("reason", "past visits empty"),
            ],
        ),
        1.0
    );
}

#[test]
fn merge_message_names_the_resolved_child_record() {
    let mut flow = Pathway::new("merge_pair");
    flow.persons
        .insert(PatientId::new("surviving"), PersonTemplate::default());
    flow.persons
        .insert(PatientId::new("duplicate"), PersonTemplate::default());
    flow.steps = vec![Step::new(StepKind::Merge(Merge {
        parent: PatientId::new(CURRENT),
        children: vec![PatientId::new("duplicate")],
        force_a40: false,
    }))];

    let test = build_hospital(vec![flow.clone()]);
    let persons = test.hospital.start_pathway(&flow).expect("pathway starts");
    assert_eq!(persons.len(), 2);
    let surviving = persons[0].mrn.clone();
    let duplicate = persons[1].mrn.clone();
    assert_ne!(surviving, duplicate);

    test.drain_due();
    assert_eq!(
        test.transport.sent(),
        vec![format!("ADT^A34|{surviving}|{duplicate}")]
    );
}
