//! The hospital aggregate the whole simulation runs against.
//!
//! A [`Hospital`] owns the event and message queues, the patient registry,
//! and every collaborator a step needs: bed inventory, demographic
//! generation, message rendering, the transport, the metrics sink, and the
//! clock. The runner drives it through two polling entry points,
//! [`Hospital::run_next_event_if_due`] and
//! [`Hospital::process_next_message_if_due`], and feeds it new work with
//! [`Hospital::start_next_pathway`].

use std::collections::HashMap;
use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use tracing::{error, info};
use wardflow_core::ir::Person;
use wardflow_core::metrics::names;
use wardflow_core::{Clock, CoreError, MetricsSink, NullSink, RealTimeClock, Result};
use wardflow_pathway::step::{RANDOM, UpdatePerson as UpdatePersonStep};
use wardflow_pathway::{Consultant, Delay, Parameters, Pathway, PathwaySupplier, PersonTemplate};
use wardflow_state::queue::{EVENT_ITEM_TYPE, MESSAGE_ITEM_TYPE};
use wardflow_state::{Event, OutboundMessage, Patient, PatientRegistry, TimeOrderedQueue};
use wardflow_store::ItemSyncer;

use crate::demographics::Demographics;
use crate::locations::{LocationDefinition, LocationManager};
use crate::processors::Processors;
use crate::render::{HardcodedMessages, MessageRenderer};
use crate::resources::{NullResourceWriter, ResourceWriter};
use crate::transport::Transport;

/// Label value for errors that cannot be attributed to a pathway.
pub(crate) const UNKNOWN: &str = "unknown";

/// Error reason recorded when a queue and its durable mirror diverge.
pub(crate) const INCONSISTENT_QUEUE: &str = "inconsistent event queue";

/// Orders are acknowledged between 1 and 11 seconds after they are placed,
/// unless the hospital is built with a different delay.
fn default_order_ack_delay() -> Delay {
    Delay {
        from: Duration::seconds(1),
        to: Duration::seconds(11),
    }
}

/// When an event takes effect and when its message becomes due. The event
/// honors the step's `time_from_now` offset; the message trails the event
/// by the step's sampled message delay.
pub(crate) fn calculate_times(
    now: OffsetDateTime,
    parameters: Option<&Parameters>,
) -> (OffsetDateTime, OffsetDateTime) {
    let mut event_time = now;
    let mut message_time = now;
    if let Some(parameters) = parameters {
        if let Some(offset) = parameters.time_from_now {
            event_time += offset;
        }
        message_time = event_time
            + parameters
                .delay_message
                .as_ref()
                .map_or(Duration::ZERO, Delay::sample);
    }
    (event_time, message_time)
}

/// A simulated hospital: patients move through pathways, every step mutates
/// their records, and the steps' messages leave through the transport in due
/// time order.
pub struct Hospital {
    pub(crate) events: TimeOrderedQueue<Event>,
    pub(crate) messages: TimeOrderedQueue<OutboundMessage>,
    pub(crate) patients: PatientRegistry,
    pub(crate) processors: Processors,
    pub(crate) locations: LocationManager,
    pub(crate) demographics: Demographics,
    pub(crate) renderer: Arc<dyn MessageRenderer>,
    pub(crate) hardcoded: Option<Arc<dyn HardcodedMessages>>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) resource_writer: Arc<dyn ResourceWriter>,
    pub(crate) supplier: Arc<dyn PathwaySupplier>,
    pub(crate) metrics: Arc<dyn MetricsSink>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) order_ack_delay: Delay,
}

impl std::fmt::Debug for Hospital {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hospital").finish_non_exhaustive()
    }
}

impl Hospital {
    pub fn builder() -> HospitalBuilder {
        HospitalBuilder::new()
    }

    /// Runs the next event if its time has come. Returns whether one ran.
    pub fn run_next_event_if_due(&self) -> Result<bool> {
        if !self.has_due_event() {
            return Ok(false);
        }
        self.run_next_event()?;
        Ok(true)
    }

    /// Processes the next message if its time has come. Returns whether one
    /// was processed.
    pub fn process_next_message_if_due(&self) -> Result<bool> {
        if !self.has_due_message() {
            return Ok(false);
        }
        self.process_next_message()?;
        Ok(true)
    }

    fn has_due_event(&self) -> bool {
        self.events
            .peek()
            .is_some_and(|event| self.is_due(event.event_time))
    }

    fn has_due_message(&self) -> bool {
        self.messages
            .peek()
            .is_some_and(|message| self.is_due(message.message_time))
    }

    /// Whether a queued time counts as due. Sub-second fractions are
    /// ignored, matching the queue's ordering granularity.
    fn is_due(&self, t: OffsetDateTime) -> bool {
        t.unix_timestamp() <= self.clock.now().unix_timestamp()
    }

    /// Asks the supplier for the next pathway and starts it.
    pub fn start_next_pathway(&self) -> Result<()> {
        let pathway = match self.supplier.next_pathway() {
            Ok(pathway) => pathway,
            Err(err) => {
                error!(error = %err, "cannot get next pathway");
                self.metrics.increment(
                    names::ERRORS_TOTAL,
                    &[("pathway_name", UNKNOWN), ("reason", "get_pathway_failure")],
                );
                return Err(err);
            }
        };
        if let Err(err) = self.start_pathway(&pathway) {
            error!(pathway_name = %pathway.name, error = %err, "cannot start pathway");
            self.metrics.increment(
                names::ERRORS_TOTAL,
                &[
                    ("pathway_name", pathway.name.as_str()),
                    ("reason", "pathway_start_failure"),
                ],
            );
            return Err(err);
        }
        Ok(())
    }

    /// Starts a pathway now: creates or refreshes its patients, stores them,
    /// and queues the first event. Returns the persons the pathway runs
    /// against, in declaration order with the main patient first.
    pub fn start_pathway(&self, pathway: &Pathway) -> Result<Vec<Person>> {
        if pathway.persons.is_empty() {
            self.metrics.increment(
                names::ERRORS_TOTAL,
                &[
                    ("pathway_name", pathway.name.as_str()),
                    ("reason", "invalid_persons_section"),
                ],
            );
            return Err(CoreError::InvalidPersonsSection);
        }

        let mut patients = Vec::with_capacity(pathway.persons.len());
        let mut patient_ids = HashMap::with_capacity(pathway.persons.len());
        for (id, template) in pathway.persons.iter() {
            let patient = self.new_or_existing_patient(template, pathway.consultant.as_ref());
            patient_ids.insert(id.clone(), patient.mrn().to_string());
            patients.push(patient);
        }
        let persons = patients
            .iter()
            .map(|patient| patient.info.person.clone())
            .collect();

        info!(
            pathway_name = %pathway.name,
            patients = patients.len(),
            "starting pathway"
        );
        if let Err(err) = self.queue_first_event(pathway, patient_ids, patients) {
            self.metrics.increment(
                names::ERRORS_TOTAL,
                &[
                    ("pathway_name", pathway.name.as_str()),
                    ("reason", "queue_first_event"),
                ],
            );
            return Err(err);
        }
        self.metrics.increment(
            names::PATHWAYS_TOTAL,
            &[("pathway_name", pathway.name.as_str())],
        );
        Ok(persons)
    }

    /// Reuses the registered patient when the template pins an MRN the
    /// registry knows, refreshing the pinned demographic fields; generates a
    /// new patient otherwise.
    fn new_or_existing_patient(
        &self,
        template: &PersonTemplate,
        consultant: Option<&Consultant>,
    ) -> Patient {
        if !template.mrn.is_empty() && template.mrn != RANDOM {
            if let Some(mut existing) = self.patients.get(&template.mrn) {
                self.demographics.update_from_pathway(
                    &mut existing.info,
                    &UpdatePersonStep {
                        person: Some(template.clone()),
                        ..Default::default()
                    },
                );
                return existing;
            }
        }
        let person = self.demographics.new_person(template, self.clock.now());
        let doctor = self.demographics.new_doctor(consultant);
        self.demographics.new_patient(person, Some(doctor))
    }

    /// A pathway by name, from the supplier.
    pub fn get_pathway(&self, name: &str) -> Result<Pathway> {
        self.supplier.get_pathway(name)
    }

    /// Releases the hospital's external resources. Call once, after the
    /// loops have stopped.
    pub fn close(&self) -> Result<()> {
        self.transport.close()?;
        self.resource_writer.close()
    }

    pub fn patients_len(&self) -> usize {
        self.patients.len()
    }

    pub fn events_len(&self) -> usize {
        self.events.len()
    }

    pub fn messages_len(&self) -> usize {
        self.messages.len()
    }

    pub fn patient_exists(&self, mrn: &str) -> bool {
        self.patients.get(mrn).is_some()
    }

    /// The bed inventory, mostly for inspection.
    pub fn locations(&self) -> &LocationManager {
        &self.locations
    }
}

/// Assembles a [`Hospital`], validating that every required collaborator is
/// present. The supplier, locations, renderer, and transport have no
/// sensible defaults; everything else does.
pub struct HospitalBuilder {
    supplier: Option<Arc<dyn PathwaySupplier>>,
    locations: Option<HashMap<String, LocationDefinition>>,
    renderer: Option<Arc<dyn MessageRenderer>>,
    transport: Option<Arc<dyn Transport>>,
    hardcoded: Option<Arc<dyn HardcodedMessages>>,
    resource_writer: Option<Arc<dyn ResourceWriter>>,
    clock: Option<Arc<dyn Clock>>,
    metrics: Option<Arc<dyn MetricsSink>>,
    processors: Processors,
    event_syncer: Option<Arc<dyn ItemSyncer<Event>>>,
    message_syncer: Option<Arc<dyn ItemSyncer<OutboundMessage>>>,
    patient_syncer: Option<Arc<dyn ItemSyncer<Patient>>>,
    evict_after_delete: bool,
    order_ack_delay: Option<Delay>,
}

impl HospitalBuilder {
    pub fn new() -> Self {
        Self {
            supplier: None,
            locations: None,
            renderer: None,
            transport: None,
            hardcoded: None,
            resource_writer: None,
            clock: None,
            metrics: None,
            processors: Processors::default(),
            event_syncer: None,
            message_syncer: None,
            patient_syncer: None,
            evict_after_delete: false,
            order_ack_delay: None,
        }
    }

    pub fn with_supplier(mut self, supplier: Arc<dyn PathwaySupplier>) -> Self {
        self.supplier = Some(supplier);
        self
    }

    pub fn with_locations(mut self, locations: HashMap<String, LocationDefinition>) -> Self {
        self.locations = Some(locations);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn MessageRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_hardcoded_messages(mut self, hardcoded: Arc<dyn HardcodedMessages>) -> Self {
        self.hardcoded = Some(hardcoded);
        self
    }

    pub fn with_resource_writer(mut self, resource_writer: Arc<dyn ResourceWriter>) -> Self {
        self.resource_writer = Some(resource_writer);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_processors(mut self, processors: Processors) -> Self {
        self.processors = processors;
        self
    }

    pub fn with_event_syncer(mut self, syncer: Arc<dyn ItemSyncer<Event>>) -> Self {
        self.event_syncer = Some(syncer);
        self
    }

    pub fn with_message_syncer(mut self, syncer: Arc<dyn ItemSyncer<OutboundMessage>>) -> Self {
        self.message_syncer = Some(syncer);
        self
    }

    pub fn with_patient_syncer(mut self, syncer: Arc<dyn ItemSyncer<Patient>>) -> Self {
        self.patient_syncer = Some(syncer);
        self
    }

    /// Whether deleting a patient also evicts the in-memory copy. Off by
    /// default: the soft-deleted copy stays readable until overwritten.
    pub fn with_evict_after_delete(mut self, evict: bool) -> Self {
        self.evict_after_delete = evict;
        self
    }

    pub fn with_order_ack_delay(mut self, delay: Delay) -> Self {
        self.order_ack_delay = Some(delay);
        self
    }

    pub fn build(self) -> Result<Hospital> {
        let supplier = self
            .supplier
            .ok_or_else(|| CoreError::configuration("pathway supplier is required"))?;
        let definitions = self
            .locations
            .ok_or_else(|| CoreError::configuration("locations are required"))?;
        let renderer = self
            .renderer
            .ok_or_else(|| CoreError::configuration("message renderer is required"))?;
        let transport = self
            .transport
            .ok_or_else(|| CoreError::configuration("transport is required"))?;
        let metrics: Arc<dyn MetricsSink> = self.metrics.unwrap_or_else(|| Arc::new(NullSink));
        let clock: Arc<dyn Clock> = self.clock.unwrap_or_else(|| Arc::new(RealTimeClock));
        let resource_writer: Arc<dyn ResourceWriter> = self
            .resource_writer
            .unwrap_or_else(|| Arc::new(NullResourceWriter));

        let locations = LocationManager::new(definitions, Arc::clone(&metrics))?;
        let events = load_queue(EVENT_ITEM_TYPE, self.event_syncer, &metrics);
        let messages = load_queue(MESSAGE_ITEM_TYPE, self.message_syncer, &metrics);
        let patients = match self.patient_syncer {
            Some(syncer) => PatientRegistry::with_syncer(syncer, self.evict_after_delete),
            None => PatientRegistry::new(self.evict_after_delete),
        };

        Ok(Hospital {
            events,
            messages,
            patients,
            processors: self.processors,
            locations,
            demographics: Demographics::new(),
            renderer,
            hardcoded: self.hardcoded,
            transport,
            resource_writer,
            supplier,
            metrics,
            clock,
            order_ack_delay: self.order_ack_delay.unwrap_or_else(default_order_ack_delay),
        })
    }
}

impl Default for HospitalBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a queue, replaying the syncer's contents when one is given. A
/// replay failure leaves the queue empty but usable, so a corrupt mirror
/// degrades to a fresh start instead of a refused one.
fn load_queue<T: wardflow_state::queue::QueueItem>(
    item_type: &'static str,
    syncer: Option<Arc<dyn ItemSyncer<T>>>,
    metrics: &Arc<dyn MetricsSink>,
) -> TimeOrderedQueue<T> {
    let Some(syncer) = syncer else {
        return TimeOrderedQueue::new(item_type, Arc::clone(metrics));
    };
    let queue = TimeOrderedQueue::with_syncer(item_type, syncer, Arc::clone(metrics));
    match queue.load_from_syncer() {
        Ok(count) => info!(item_type, count, "loaded queue from the syncer"),
        Err(err) => {
            error!(item_type, error = %err, "cannot load queue from the syncer");
            metrics.increment(
                names::ERRORS_TOTAL,
                &[("pathway_name", UNKNOWN), ("reason", "cannot load queue")],
            );
        }
    }
    queue
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_calculate_times_without_parameters() {
        let now = datetime!(2024-05-01 09:00:00 UTC);
        let (event_time, message_time) = calculate_times(now, None);
        assert_eq!(event_time, now);
        assert_eq!(message_time, now);
    }

    #[test]
    fn test_calculate_times_with_historical_offset() {
        let now = datetime!(2024-05-01 09:00:00 UTC);
        let parameters = Parameters {
            time_from_now: Some(Duration::hours(-24)),
            ..Default::default()
        };
        let (event_time, message_time) = calculate_times(now, Some(&parameters));
        assert_eq!(event_time, datetime!(2024-04-30 09:00:00 UTC));
        assert_eq!(message_time, event_time);
    }

    #[test]
    fn test_calculate_times_with_message_delay() {
        let now = datetime!(2024-05-01 09:00:00 UTC);
        let parameters = Parameters {
            delay_message: Some(Delay {
                from: Duration::seconds(30),
                to: Duration::seconds(30),
            }),
            ..Default::default()
        };
        let (event_time, message_time) = calculate_times(now, Some(&parameters));
        assert_eq!(event_time, now);
        assert_eq!(message_time, now + Duration::seconds(30));
    }

    #[test]
    fn test_builder_requires_supplier() {
        let err = HospitalBuilder::new().build().unwrap_err();
        assert!(err.to_string().contains("pathway supplier"));
    }

    #[test]
    fn test_default_order_ack_delay_range() {
        let delay = default_order_ack_delay();
        assert_eq!(delay.from, Duration::seconds(1));
        assert_eq!(delay.to, Duration::seconds(11));
    }
}
