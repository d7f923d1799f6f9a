// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the corezone operator.
//!
//! All metrics use the namespace prefix `corezone_firestoned_io_` (prometheus-safe
//! version of "corezone.firestoned.io") and are served on `/metrics` by [`router`].
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - Reconciliation outcomes and durations per kind
//! - **Error Metrics** - Errors per kind and failure class
//! - **Deployment Gate Metrics** - Readiness waits per outcome
//! - **Artifact Metrics** - Zone and Corefile writes
//!
//! # Example
//!
//! ```rust,no_run
//! use corezone::metrics::record_reconciliation_success;
//!
//! record_reconciliation_success("DNSZone", std::time::Duration::from_secs(1));
//! ```

use axum::{http::StatusCode, routing::get, Router};
use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::net::SocketAddr;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{error, info};

/// Namespace prefix for all corezone metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "corezone_firestoned_io";

/// Gate outcome label for a rollout that became ready in time
pub const GATE_OUTCOME_READY: &str = "ready";

/// Gate outcome label for a rollout that hit its deadline
pub const GATE_OUTCOME_TIMEOUT: &str = "timeout";

/// Gate outcome label for a probe that failed while polling
pub const GATE_OUTCOME_PROBE_ERROR: &str = "probe_error";

/// Gate outcome label for a connector whose inputs were unchanged
pub const GATE_OUTCOME_SKIPPED: &str = "skipped";

/// Global Prometheus metrics registry
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total number of reconciliations by resource type and status
///
/// Labels:
/// - `resource_type`: Kind of resource (`DNSConnector`, `DNSZone`, `DNSRecord`)
/// - `status`: Outcome (`success`, `error`)
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reconciliations_total"),
        "Total number of reconciliations by resource type and status",
    );
    let counter = CounterVec::new(opts, &["resource_type", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of reconciliations in seconds
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of reconciliations in seconds by resource type",
    )
    .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 300.0]);
    let histogram = HistogramVec::new(opts, &["resource_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Error Metrics
// ============================================================================

/// Total number of errors by resource type and failure class
///
/// Labels:
/// - `resource_type`: Kind of resource
/// - `error_type`: `not_found`, `validation`, `conflict`, `timeout`, `structural`, `api`
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_errors_total"),
        "Total number of errors by resource type and error category",
    );
    let counter = CounterVec::new(opts, &["resource_type", "error_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Deployment Gate Metrics
// ============================================================================

/// Total number of readiness waits by outcome
pub static GATE_WAITS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_gate_waits_total"),
        "Total number of CoreDNS readiness waits by outcome",
    );
    let counter = CounterVec::new(opts, &["outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Time spent waiting for CoreDNS readiness
pub static GATE_WAIT_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_gate_wait_duration_seconds"),
        "Time spent waiting for CoreDNS to become ready after a change",
    )
    .buckets(vec![1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0]);
    let histogram = HistogramVec::new(opts, &["outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Artifact Metrics
// ============================================================================

/// Total number of generated artifact writes
///
/// Labels:
/// - `artifact`: `zone_configmap` or `corefile`
/// - `operation`: `created` or `updated`
pub static ARTIFACT_WRITES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_artifact_writes_total"),
        "Total number of generated artifact writes by artifact and operation",
    );
    let counter = CounterVec::new(opts, &["artifact", "operation"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a successful reconciliation
pub fn record_reconciliation_success(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "success"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record a failed reconciliation
pub fn record_reconciliation_error(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "error"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record an error
///
/// # Arguments
/// * `resource_type` - The kind of resource where the error occurred
/// * `error_type` - Failure class (see [`crate::errors::ReconcileFailure::metric_label`])
pub fn record_error(resource_type: &str, error_type: &str) {
    ERRORS_TOTAL
        .with_label_values(&[resource_type, error_type])
        .inc();
}

/// Record the outcome of one Deployment Gate wait
pub fn record_gate_wait(outcome: &str, duration: Duration) {
    GATE_WAITS_TOTAL.with_label_values(&[outcome]).inc();
    GATE_WAIT_DURATION_SECONDS
        .with_label_values(&[outcome])
        .observe(duration.as_secs_f64());
}

/// Record a write of a generated artifact
pub fn record_artifact_write(artifact: &str, operation: &str) {
    ARTIFACT_WRITES_TOTAL
        .with_label_values(&[artifact, operation])
        .inc();
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}

async fn metrics_handler() -> (StatusCode, String) {
    match gather_metrics() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// Router exposing `/metrics`.
pub fn router() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

/// Serve `/metrics` on `addr` until the process exits.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve_metrics(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Serving metrics");
    axum::serve(listener, router()).await?;
    Ok(())
}
