//! Injected metrics capability.
//!
//! The simulation core never owns process-wide metrics state. Components
//! receive a [`MetricsSink`] handle at construction; the server wires in a
//! Prometheus-backed sink, tests use [`RecordingSink`], and everything else
//! defaults to [`NullSink`].

use parking_lot::Mutex;
use std::collections::HashMap;

/// Metric names and histogram buckets used across the simulator.
pub mod names {
    pub const PATHWAYS_TOTAL: &str = "wardflow_pathways_total";
    pub const MESSAGES_TOTAL: &str = "wardflow_messages_total";
    pub const ERRORS_TOTAL: &str = "wardflow_errors_total";
    pub const PATHWAY_DURATION_MINUTES: &str = "wardflow_pathway_duration_minutes";
    pub const ADMISSION_DURATION_MINUTES: &str = "wardflow_admission_duration_minutes";
    pub const MESSAGE_DELAY_SECONDS: &str = "wardflow_message_delay_seconds";
    pub const PENDING_ITEMS: &str = "wardflow_pending_items";
    pub const OCCUPIED_BEDS: &str = "wardflow_occupied_beds";

    pub const DURATION_MINUTES_BUCKETS: [f64; 9] =
        [1.0, 5.0, 10.0, 30.0, 60.0, 180.0, 720.0, 1440.0, 2880.0];
    pub const DELAY_SECONDS_BUCKETS: [f64; 6] = [1.0, 5.0, 10.0, 30.0, 60.0, 180.0];
}

/// Label set for one metric update, in `(key, value)` pairs.
pub type Labels<'a> = &'a [(&'static str, &'a str)];

/// Sink for the simulator's counters, histograms, and gauges.
pub trait MetricsSink: Send + Sync {
    /// Add 1 to a counter.
    fn increment(&self, name: &'static str, labels: Labels);

    /// Record one histogram observation.
    fn observe(&self, name: &'static str, labels: Labels, value: f64);

    /// Add a (possibly negative) delta to a gauge.
    fn gauge_add(&self, name: &'static str, labels: Labels, delta: f64);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl MetricsSink for NullSink {
    fn increment(&self, _name: &'static str, _labels: Labels) {}
    fn observe(&self, _name: &'static str, _labels: Labels, _value: f64) {}
    fn gauge_add(&self, _name: &'static str, _labels: Labels, _delta: f64) {}
}

/// Keeps every update in memory so tests can assert on counts and samples.
#[derive(Debug, Default)]
pub struct RecordingSink {
    counters: Mutex<HashMap<String, f64>>,
    observations: Mutex<HashMap<String, Vec<f64>>>,
    gauges: Mutex<HashMap<String, f64>>,
}

fn series_key(name: &str, labels: Labels) -> String {
    let mut key = String::from(name);
    key.push('{');
    for (i, (k, v)) in labels.iter().enumerate() {
        if i > 0 {
            key.push(',');
        }
        key.push_str(k);
        key.push('=');
        key.push_str(v);
    }
    key.push('}');
    key
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a counter series, zero if never incremented.
    pub fn counter(&self, name: &str, labels: Labels) -> f64 {
        self.counters
            .lock()
            .get(&series_key(name, labels))
            .copied()
            .unwrap_or(0.0)
    }

    /// Sum of all counter series with the given name, regardless of labels.
    pub fn counter_sum(&self, name: &str) -> f64 {
        let prefix = format!("{name}{{");
        self.counters
            .lock()
            .iter()
            .filter(|(k, _)| k.starts_with(&prefix))
            .map(|(_, v)| v)
            .sum()
    }

    /// All samples observed for a histogram series.
    pub fn samples(&self, name: &str, labels: Labels) -> Vec<f64> {
        self.observations
            .lock()
            .get(&series_key(name, labels))
            .cloned()
            .unwrap_or_default()
    }

    /// Current value of a gauge series, zero if never touched.
    pub fn gauge(&self, name: &str, labels: Labels) -> f64 {
        self.gauges
            .lock()
            .get(&series_key(name, labels))
            .copied()
            .unwrap_or(0.0)
    }
}

impl MetricsSink for RecordingSink {
    fn increment(&self, name: &'static str, labels: Labels) {
        *self
            .counters
            .lock()
            .entry(series_key(name, labels))
            .or_insert(0.0) += 1.0;
    }

    fn observe(&self, name: &'static str, labels: Labels, value: f64) {
        self.observations
            .lock()
            .entry(series_key(name, labels))
            .or_default()
            .push(value);
    }

    fn gauge_add(&self, name: &'static str, labels: Labels, delta: f64) {
        *self
            .gauges
            .lock()
            .entry(series_key(name, labels))
            .or_insert(0.0) += delta;
    }
}
