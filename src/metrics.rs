//! Prometheus metrics for the composition root: agent-loop step
//! latency/attempts and the CDP adapter's own counters, exposed on
//! `/metrics` the way the teacher's metrics server does.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::State,
    http::HeaderValue,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use cdp_adapter::metrics::{self as cdp_metrics, AdapterMetricsSnapshot};
use once_cell::sync::{Lazy, OnceCell};
use prometheus::{
    histogram_opts, Encoder, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use tokio::{net::TcpListener, task::JoinHandle};
use tracing::{debug, error, info};

static GLOBAL_REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);
static REGISTER_ONCE: OnceCell<()> = OnceCell::new();
static EXECUTION_STEP_LATENCY: OnceCell<HistogramVec> = OnceCell::new();
static EXECUTION_STEP_ATTEMPTS: OnceCell<IntCounterVec> = OnceCell::new();
static AGENT_RUN_EVENTS: OnceCell<IntCounterVec> = OnceCell::new();

pub fn register_metrics() {
    REGISTER_ONCE.get_or_init(|| {
        let registry = global_registry();
        register_execution_metrics(registry);
        register_agent_run_metrics(registry);
    });
}

/// The adapter tracks its own counters as plain atomics (no `Registry`
/// hookup); pull a point-in-time snapshot for diagnostics/logging.
pub fn cdp_adapter_snapshot() -> AdapterMetricsSnapshot {
    cdp_metrics::snapshot()
}

fn register_execution_metrics(registry: &Registry) {
    let latency = HistogramVec::new(
        histogram_opts!(
            "soul_agent_step_latency_ms",
            "Wall-clock latency per agent step (milliseconds)",
            vec![5.0, 10.0, 20.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2000.0, 5000.0, 10000.0]
        ),
        &["phase", "action", "result"],
    )
    .expect("create execution latency histogram");
    if let Err(err) = registry.register(Box::new(latency.clone())) {
        error!(?err, "failed to register execution latency histogram");
    }
    let _ = EXECUTION_STEP_LATENCY.set(latency);

    let attempts = IntCounterVec::new(
        Opts::new(
            "soul_agent_step_attempts_total",
            "Total action execution attempts recorded per agent step",
        ),
        &["action", "result"],
    )
    .expect("create execution attempts counter");
    if let Err(err) = registry.register(Box::new(attempts.clone())) {
        error!(?err, "failed to register execution attempts counter");
    }
    let _ = EXECUTION_STEP_ATTEMPTS.set(attempts);
}

fn register_agent_run_metrics(registry: &Registry) {
    let events = IntCounterVec::new(
        Opts::new(
            "soul_agent_run_events_total",
            "Agent run terminal states by outcome",
        ),
        &["terminal_state"],
    )
    .expect("create agent run counter");
    if let Err(err) = registry.register(Box::new(events.clone())) {
        error!(?err, "failed to register agent run metrics");
    }
    let _ = AGENT_RUN_EVENTS.set(events);
}

pub fn observe_execution_step(action: &str, result: &str, run_ms: u64, attempts: u64) {
    register_metrics();
    if let Some(histogram) = EXECUTION_STEP_LATENCY.get() {
        histogram
            .with_label_values(&["run", action, result])
            .observe(run_ms as f64);
    }
    if let Some(counter) = EXECUTION_STEP_ATTEMPTS.get() {
        counter.with_label_values(&[action, result]).inc_by(attempts);
    }
}

pub fn record_run_terminal_state(terminal_state: &str) {
    register_metrics();
    if let Some(counter) = AGENT_RUN_EVENTS.get() {
        counter.with_label_values(&[terminal_state]).inc();
    }
}

pub fn spawn_metrics_server(port: u16) -> Option<JoinHandle<()>> {
    if port == 0 {
        return None;
    }

    register_metrics();
    let registry = Arc::new(global_registry().clone());
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(registry);

    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    info!(%addr, "metrics server listening");
    Some(tokio::spawn(async move {
        match TcpListener::bind(addr).await {
            Ok(listener) => {
                if let Err(err) = axum::serve(listener, app.into_make_service()).await {
                    error!(?err, "metrics server exited with error");
                }
            }
            Err(err) => {
                error!(?err, "failed to bind metrics listener");
            }
        }
    }))
}

async fn metrics_handler(State(registry): State<Arc<Registry>>) -> Response {
    let encoder = TextEncoder::new();
    let format_type = encoder.format_type().to_string();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        error!(?err, "failed to encode prometheus metrics");
        return (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            "metric encode error",
        )
            .into_response();
    }

    match String::from_utf8(buffer) {
        Ok(body) => match HeaderValue::from_str(&format_type) {
            Ok(value) => ([(axum::http::header::CONTENT_TYPE, value)], body).into_response(),
            Err(err) => {
                error!(?err, "failed to build content-type header");
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "metric encode error",
                )
                    .into_response()
            }
        },
        Err(err) => {
            error!(?err, "failed to convert prometheus metrics to utf8");
            (
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                "metric encode error",
            )
                .into_response()
        }
    }
}

pub fn global_registry() -> &'static Registry {
    &GLOBAL_REGISTRY
}

pub fn debug_watchdog_event(kind: &str) {
    debug!(target = "watchdog", %kind, "watchdog event");
}
