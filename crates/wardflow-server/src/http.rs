//! The control-plane HTTP surface: the rate slider, on-demand pathway
//! starts, health, and Prometheus metrics.
//!
//! The rate and pathway endpoints keep a plain-text protocol so the
//! dashboard (and `curl`) can drive them without a client library. Every
//! rejected request answers 500 with a human-readable reason.

use std::sync::{Arc, LazyLock};

use axum::Router;
use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use parking_lot::Mutex;
use regex::Regex;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use wardflow_engine::Hospital;
use wardflow_rate::RateController;

use crate::metrics::render_metrics;

/// Pathway names accepted by the starter endpoint.
static PATHWAY_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[a-zA-Z0-9_]+$").expect("pathway name pattern compiles"));

#[derive(Clone)]
pub struct AppState {
    hospital: Arc<Hospital>,
    rate: Arc<RateController>,
    /// Outcome of the last starter request, handed out (and cleared) by the
    /// next GET.
    starter_response: Arc<Mutex<String>>,
}

impl AppState {
    pub fn new(hospital: Arc<Hospital>, rate: Arc<RateController>) -> Self {
        Self {
            hospital,
            rate,
            starter_response: Arc::new(Mutex::new(String::new())),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/rate", any(rate_endpoint))
        .route("/pathway", any(pathway_endpoint))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics_endpoint))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn metrics_endpoint() -> Response {
    match render_metrics() {
        Some(body) => body.into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics exporter not initialized",
        )
            .into_response(),
    }
}

/// GET returns the current rate as a plain decimal string; POST with a
/// `value=<float>` body updates it.
async fn rate_endpoint(State(state): State<AppState>, method: Method, body: String) -> Response {
    match method {
        Method::GET => state.rate.rate().to_string().into_response(),
        Method::POST => set_rate(&state, &body),
        Method::PUT | Method::DELETE => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Method \"{method}\" not implemented"),
        )
            .into_response(),
        other => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Unknown method: \"{other}\""),
        )
            .into_response(),
    }
}

fn set_rate(state: &AppState, body: &str) -> Response {
    let Some(value) = body.strip_prefix("value=") else {
        warn!(body, "rate request body is missing the value= prefix");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Error extracting value: the request must be in the format \"value=X\"",
        )
            .into_response();
    };
    let rate: f64 = match value.parse() {
        Ok(rate) => rate,
        Err(err) => {
            warn!(value, error = %err, "cannot parse rate value");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error parsing value to float",
            )
                .into_response();
        }
    };
    if rate < 0.0 {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Invalid value: the rate must not be negative, but was: {rate}"),
        )
            .into_response();
    }
    // A repeated POST with the unchanged value is fine and changes nothing.
    if state.rate.set_rate(rate) {
        info!(rate, "pathway rate updated");
    }
    StatusCode::OK.into_response()
}

/// POST with a pathway name starts that pathway immediately; GET returns
/// (and clears) the outcome of the last start request.
async fn pathway_endpoint(State(state): State<AppState>, method: Method, body: String) -> Response {
    match method {
        Method::GET => std::mem::take(&mut *state.starter_response.lock()).into_response(),
        Method::POST => {
            let outcome = start_pathway(&state, body.trim());
            *state.starter_response.lock() = outcome.clone();
            outcome.into_response()
        }
        Method::PUT | Method::DELETE => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Method \"{method}\" not implemented"),
        )
            .into_response(),
        other => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Unknown method: \"{other}\""),
        )
            .into_response(),
    }
}

fn start_pathway(state: &AppState, name: &str) -> String {
    if !PATHWAY_NAME.is_match(name) {
        return format!("Cannot start pathway: invalid pathway name {name:?}");
    }
    let pathway = match state.hospital.get_pathway(name) {
        Ok(pathway) => pathway,
        Err(err) => return format!("Cannot start pathway {name}: {err}"),
    };
    match state.hospital.start_pathway(&pathway) {
        Ok(persons) => {
            let mrns: Vec<&str> = persons.iter().map(|person| person.mrn.as_str()).collect();
            format!("Started pathway {name} for {}", mrns.join(", "))
        }
        Err(err) => format!("Cannot start pathway {name}: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use std::collections::HashMap;
    use std::time::Duration;
    use tower::ServiceExt;
    use wardflow_engine::{LocationDefinition, MemoryTransport};
    use wardflow_pathway::step::Admission;
    use wardflow_pathway::{Pathway, RoundRobinSupplier, Step, StepKind};

    use crate::render::PlainRenderer;

    fn admit_pathway(name: &str) -> Pathway {
        let mut pathway = Pathway::new(name);
        pathway.init(name);
        pathway.steps = vec![Step::new(StepKind::Admission(Admission {
            loc: "Ward 1".to_string(),
            ..Default::default()
        }))];
        pathway
    }

    fn state() -> (AppState, Arc<Hospital>) {
        let mut locations = HashMap::new();
        for name in ["ED", "Ward 1"] {
            locations.insert(name.to_string(), LocationDefinition::default());
        }
        let supplier = RoundRobinSupplier::new(vec![admit_pathway("walk_in")]).unwrap();
        let hospital = Arc::new(
            Hospital::builder()
                .with_supplier(Arc::new(supplier))
                .with_locations(locations)
                .with_renderer(Arc::new(PlainRenderer))
                .with_transport(Arc::new(MemoryTransport::new()))
                .build()
                .unwrap(),
        );
        let rate = Arc::new(RateController::new(1.0, Duration::from_secs(3600)));
        (AppState::new(Arc::clone(&hospital), rate), hospital)
    }

    async fn call(router: &Router, method: &str, uri: &str, body: &str) -> (StatusCode, String) {
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_rate_round_trip() {
        let (state, _) = state();
        let app = router(state);

        let (status, body) = call(&app, "GET", "/rate", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "1");

        let (status, _) = call(&app, "POST", "/rate", "value=2.5").await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = call(&app, "GET", "/rate", "").await;
        assert_eq!(body, "2.5");
    }

    #[tokio::test]
    async fn test_rate_rejects_malformed_bodies() {
        let (state, _) = state();
        let app = router(state);

        let (status, body) = call(&app, "POST", "/rate", "2.5").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("value=X"), "body: {body}");

        let (status, body) = call(&app, "POST", "/rate", "value=fast").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "Error parsing value to float");

        let (status, body) = call(&app, "POST", "/rate", "value=-1").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("must not be negative"), "body: {body}");

        // None of the rejected posts changed the rate.
        let (_, body) = call(&app, "GET", "/rate", "").await;
        assert_eq!(body, "1");
    }

    #[tokio::test]
    async fn test_rate_unimplemented_methods() {
        let (state, _) = state();
        let app = router(state);

        let (status, body) = call(&app, "PUT", "/rate", "value=2").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "Method \"PUT\" not implemented");

        let (status, body) = call(&app, "PATCH", "/rate", "").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "Unknown method: \"PATCH\"");
    }

    #[tokio::test]
    async fn test_pathway_start_and_outcome() {
        let (state, hospital) = state();
        let app = router(state);

        let (status, body) = call(&app, "POST", "/pathway", "walk_in").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with("Started pathway walk_in for "), "body: {body}");
        assert_eq!(hospital.events_len(), 1);

        // GET returns the stored outcome once, then it is gone.
        let (_, body) = call(&app, "GET", "/pathway", "").await;
        assert!(body.starts_with("Started pathway walk_in"), "body: {body}");
        let (_, body) = call(&app, "GET", "/pathway", "").await;
        assert_eq!(body, "");
    }

    #[tokio::test]
    async fn test_pathway_start_unknown_name() {
        let (state, _) = state();
        let app = router(state);

        let (status, body) = call(&app, "POST", "/pathway", "not_defined").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            "Cannot start pathway not_defined: unknown pathway: not_defined"
        );

        let (_, body) = call(&app, "POST", "/pathway", "bad name!").await;
        assert!(body.contains("invalid pathway name"), "body: {body}");
    }

    #[tokio::test]
    async fn test_healthz() {
        let (state, _) = state();
        let app = router(state);
        let (status, body) = call(&app, "GET", "/healthz", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }
}
