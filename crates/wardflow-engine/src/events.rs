//! The event side of the simulation loop: consuming due events, applying
//! them to patient records, and scheduling the follow-up event of the
//! pathway.

use tracing::{debug, error, info};
use wardflow_core::metrics::names;
use wardflow_core::{CoreError, Result};
use wardflow_pathway::{Pathway, Step, StepKind};
use wardflow_state::{Event, Patient};

use crate::hospital::{Hospital, INCONSISTENT_QUEUE, UNKNOWN, calculate_times};
use crate::processors::EventProcessor;

impl Hospital {
    /// Whether any events are queued, due or not.
    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Consumes the next event from the queue and runs it. Returns an error
    /// when the queue is empty or cannot be read; failures while running
    /// the event itself are absorbed, counted, and end the pathway.
    pub(crate) fn run_next_event(&self) -> Result<()> {
        if !self.has_events() {
            return Err(CoreError::EmptyQueue);
        }
        let consistent_before = self.events.is_consistent();
        let event = match self.events.get() {
            Ok(event) => event,
            Err(err) => {
                self.metrics.increment(
                    names::ERRORS_TOTAL,
                    &[("pathway_name", UNKNOWN), ("reason", "event_queue_get")],
                );
                return Err(err);
            }
        };
        let pathway_name = event.pathway_name.clone();
        self.run_event(event);
        if consistent_before && !self.events.is_consistent() {
            self.metrics.increment(
                names::ERRORS_TOTAL,
                &[
                    ("pathway_name", pathway_name.as_str()),
                    ("reason", INCONSISTENT_QUEUE),
                ],
            );
        }
        Ok(())
    }

    /// Queues the first event of a freshly started pathway. All of the
    /// pathway's patients are stored first so that every step can find
    /// them; the event itself is keyed on the main (first) patient.
    pub(crate) fn queue_first_event(
        &self,
        pathway: &Pathway,
        patient_ids: std::collections::HashMap<wardflow_pathway::PatientId, String>,
        patients: Vec<Patient>,
    ) -> Result<()> {
        let (first, history, steps) = next_steps(&pathway.history, &pathway.steps);
        let first = first.ok_or_else(|| {
            CoreError::configuration(format!("pathway {} has no steps", pathway.name))
        })?;
        let Some(main_patient) = patients.first() else {
            return Err(CoreError::InvalidPersonsSection);
        };
        let mrn = main_patient.mrn().to_string();
        info!(
            pathway_name = %pathway.name,
            event_type = %first.name(),
            mrn = %mrn,
            "queuing first pathway event"
        );

        for patient in patients {
            self.patients.put(patient);
        }

        let now = self.clock.now();
        let (event_time, message_time) = calculate_times(now, first.parameters.as_ref());
        let consistent_before = self.events.is_consistent();
        self.events.put(Event {
            event_time,
            message_time,
            pathway_name: pathway.name.clone(),
            patient_mrn: mrn,
            step: first.clone(),
            history: history.to_vec(),
            steps: steps.to_vec(),
            pathway_started: now,
            is_historical: !pathway.history.is_empty(),
            index: 0,
            patient_ids,
        });
        if consistent_before && !self.events.is_consistent() {
            self.metrics.increment(
                names::ERRORS_TOTAL,
                &[
                    ("pathway_name", pathway.name.as_str()),
                    ("reason", INCONSISTENT_QUEUE),
                ],
            );
        }
        Ok(())
    }

    /// Runs a single event: pre processors, then the built-in handling for
    /// the step type unless an override processor claims the event, then
    /// post processors, and finally the scheduling of the pathway's next
    /// event. A failure at any stage stops the pathway and evicts the
    /// patient, so that later steps cannot run against a record in an
    /// undefined state.
    fn run_event(&self, mut event: Event) {
        let pathway_name = event.pathway_name.clone();
        let Some(mut patient) = self.patients.get(&event.patient_mrn) else {
            error!(
                pathway_name = %pathway_name,
                mrn = %event.patient_mrn,
                "unknown MRN in event"
            );
            self.metrics.increment(
                names::ERRORS_TOTAL,
                &[
                    ("pathway_name", pathway_name.as_str()),
                    ("reason", "unknown_mrn"),
                ],
            );
            return;
        };

        // The pathway clock. Historical steps happen before the pathway
        // starts, so they do not move it; delay steps do nothing but move
        // it.
        let mut now = event.event_time;
        if event.is_historical {
            now = event.pathway_started;
        }
        if let StepKind::Delay(delay) = &event.step.kind {
            now += delay.sample();
        }

        if let Err(err) =
            self.run_event_processors(&mut event, &mut patient, &self.processors.event_pre)
        {
            error!(
                pathway_name = %pathway_name,
                error = %err,
                "event pre processing failed"
            );
            self.metrics.increment(
                names::ERRORS_TOTAL,
                &[
                    ("pathway_name", pathway_name.as_str()),
                    ("reason", "event_pre_processor"),
                ],
            );
            self.patients.delete(&event.patient_mrn);
            return;
        }

        let processed = match self.run_event_processors(
            &mut event,
            &mut patient,
            &self.processors.event_override,
        ) {
            Ok(processed) => processed,
            Err(err) => {
                error!(
                    pathway_name = %pathway_name,
                    error = %err,
                    "event override processing failed"
                );
                self.metrics.increment(
                    names::ERRORS_TOTAL,
                    &[
                        ("pathway_name", pathway_name.as_str()),
                        ("reason", "event_override_processor"),
                    ],
                );
                self.patients.delete(&event.patient_mrn);
                return;
            }
        };

        if !processed {
            if let Err(err) = self.process_event_type(&mut event, &mut patient, now) {
                let reason = err.to_string();
                error!(
                    pathway_name = %pathway_name,
                    mrn = %event.patient_mrn,
                    event_type = %event.step.name(),
                    error = %err,
                    "cannot process event type, deleting patient"
                );
                self.metrics.increment(
                    names::ERRORS_TOTAL,
                    &[
                        ("pathway_name", pathway_name.as_str()),
                        ("reason", reason.as_str()),
                    ],
                );
                self.patients.delete(&event.patient_mrn);
                return;
            }
        }

        if let Err(err) =
            self.run_event_processors(&mut event, &mut patient, &self.processors.event_post)
        {
            error!(
                pathway_name = %pathway_name,
                error = %err,
                "event post processing failed"
            );
            self.metrics.increment(
                names::ERRORS_TOTAL,
                &[
                    ("pathway_name", pathway_name.as_str()),
                    ("reason", "event_post_processor"),
                ],
            );
            self.patients.delete(&event.patient_mrn);
            return;
        }

        self.patients.put(patient);

        // Event processing might have changed the patient the rest of the
        // pathway runs against.
        let mrn = event.patient_mrn.clone();
        let (first, history, steps) = next_steps(&event.history, &event.steps);
        match first {
            Some(first) => {
                let (event_time, message_time) = calculate_times(now, first.parameters.as_ref());
                info!(
                    pathway_name = %pathway_name,
                    mrn = %mrn,
                    next_event_type = %first.name(),
                    "queuing next event"
                );
                let consistent_before = self.events.is_consistent();
                self.events.put(Event {
                    event_time,
                    message_time,
                    pathway_name: pathway_name.clone(),
                    patient_mrn: mrn,
                    step: first.clone(),
                    history: history.to_vec(),
                    steps: steps.to_vec(),
                    pathway_started: event.pathway_started,
                    is_historical: !event.history.is_empty(),
                    index: event.index + 1,
                    patient_ids: event.patient_ids.clone(),
                });
                if consistent_before && !self.events.is_consistent() {
                    self.metrics.increment(
                        names::ERRORS_TOTAL,
                        &[
                            ("pathway_name", pathway_name.as_str()),
                            ("reason", INCONSISTENT_QUEUE),
                        ],
                    );
                }
            }
            None => {
                info!(pathway_name = %pathway_name, mrn = %mrn, "pathway finished");
                self.patients.delete(&mrn);
                // Steps are in chronological order, so the time of the
                // last event is when the pathway finishes. Pathways with
                // historical steps only have no duration to report.
                if event.steps.is_empty() && !event.is_historical {
                    self.metrics.observe(
                        names::PATHWAY_DURATION_MINUTES,
                        &[("pathway_name", pathway_name.as_str())],
                        (now - event.pathway_started).as_seconds_f64() / 60.0,
                    );
                }
            }
        }
    }

    pub(crate) fn run_event_processors(
        &self,
        event: &mut Event,
        patient: &mut Patient,
        processors: &[Box<dyn EventProcessor>],
    ) -> Result<bool> {
        let mut processed = false;
        for processor in processors {
            if !processor.matches(event) {
                continue;
            }
            debug!(event_type = %event.step.name(), "running custom event processor");
            processed = true;
            for message in processor.process(event, patient)? {
                self.queue_message(message, event);
            }
        }
        Ok(processed)
    }
}

/// Splits off the next step to run: historical steps first, then the
/// pathway proper. Returns the step together with the remaining historical
/// and pathway steps.
fn next_steps<'a>(
    history: &'a [Step],
    steps: &'a [Step],
) -> (Option<&'a Step>, &'a [Step], &'a [Step]) {
    if let [first, rest @ ..] = history {
        (Some(first), rest, steps)
    } else if let [first, rest @ ..] = steps {
        (Some(first), &[], rest)
    } else {
        (None, &[], &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wardflow_pathway::step::Delay;

    fn step(kind: StepKind) -> Step {
        Step {
            kind,
            parameters: None,
        }
    }

    #[test]
    fn test_next_steps_prefers_history() {
        let history = vec![step(StepKind::Registration(Default::default()))];
        let steps = vec![step(StepKind::Admission(Default::default()))];
        let (first, remaining_history, remaining_steps) = next_steps(&history, &steps);
        assert_eq!(first.unwrap().name(), "registration");
        assert!(remaining_history.is_empty());
        assert_eq!(remaining_steps.len(), 1);
    }

    #[test]
    fn test_next_steps_consumes_pathway_in_order() {
        let steps = vec![
            step(StepKind::Admission(Default::default())),
            step(StepKind::Delay(Delay::default())),
            step(StepKind::Discharge(Default::default())),
        ];
        let (first, _, remaining) = next_steps(&[], &steps);
        assert_eq!(first.unwrap().name(), "admission");
        assert_eq!(remaining.len(), 2);

        let (second, _, remaining) = next_steps(&[], remaining);
        assert_eq!(second.unwrap().name(), "delay");
        assert_eq!(remaining.len(), 1);
    }

    #[test]
    fn test_next_steps_empty() {
        let (first, history, steps) = next_steps(&[], &[]);
        assert!(first.is_none());
        assert!(history.is_empty());
        assert!(steps.is_empty());
    }
}
