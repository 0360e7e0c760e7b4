//! Prometheus export for the simulator's metrics.
//!
//! The engine reports through the [`MetricsSink`] capability; this module
//! provides the production sink backed by the `metrics` facade and the
//! Prometheus recorder behind the `/metrics` route.

use metrics::{Label, counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use wardflow_core::MetricsSink;
use wardflow_core::metrics::{Labels, names};

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics exporter.
///
/// This should be called once at startup.
/// Returns `true` if initialization succeeded, `false` if already initialized.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        tracing::debug!("Prometheus metrics already initialized");
        return false;
    }

    // Pull-based recorder; /metrics renders from the handle.
    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(names::PATHWAY_DURATION_MINUTES.to_string()),
            &names::DURATION_MINUTES_BUCKETS,
        )
        .and_then(|b| {
            b.set_buckets_for_metric(
                Matcher::Full(names::ADMISSION_DURATION_MINUTES.to_string()),
                &names::DURATION_MINUTES_BUCKETS,
            )
        })
        .and_then(|b| {
            b.set_buckets_for_metric(
                Matcher::Full(names::MESSAGE_DELAY_SECONDS.to_string()),
                &names::DELAY_SECONDS_BUCKETS,
            )
        });
    let builder = match builder {
        Ok(b) => b,
        Err(e) => {
            tracing::error!(error = %e, "Invalid histogram bucket configuration");
            return false;
        }
    };

    match builder.install_recorder() {
        Ok(handle) => {
            if PROMETHEUS_HANDLE.set(handle).is_err() {
                tracing::warn!("Failed to store Prometheus handle (already set)");
                return false;
            }
            tracing::info!("Prometheus metrics initialized");
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Prometheus recorder");
            false
        }
    }
}

/// Render all metrics in Prometheus text format.
///
/// Returns `None` if metrics were not initialized.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|handle| handle.render())
}

/// Sink that forwards engine metrics to the installed recorder.
#[derive(Debug, Default)]
pub struct PrometheusSink;

fn owned_labels(labels: Labels) -> Vec<Label> {
    labels
        .iter()
        .map(|(key, value)| Label::new(*key, value.to_string()))
        .collect()
}

impl MetricsSink for PrometheusSink {
    fn increment(&self, name: &'static str, labels: Labels) {
        counter!(name, owned_labels(labels)).increment(1);
    }

    fn observe(&self, name: &'static str, labels: Labels, value: f64) {
        histogram!(name, owned_labels(labels)).record(value);
    }

    fn gauge_add(&self, name: &'static str, labels: Labels, delta: f64) {
        if delta >= 0.0 {
            gauge!(name, owned_labels(labels)).increment(delta);
        } else {
            gauge!(name, owned_labels(labels)).decrement(-delta);
        }
    }
}
