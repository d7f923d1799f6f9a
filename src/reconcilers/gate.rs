// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Deployment Gate: wait for CoreDNS to finish rolling out.
//!
//! After the connector writes a new Corefile and mounts, it waits `settle`, then
//! re-reads the workload every `interval` until the rollout is complete. The whole
//! wait is bounded by `tokio::time::timeout`; dropping the future (for example on
//! shutdown) cancels it. Nothing is held across polls.

use crate::errors::GateError;
use crate::metrics::{
    record_gate_wait, GATE_OUTCOME_PROBE_ERROR, GATE_OUTCOME_READY, GATE_OUTCOME_TIMEOUT,
};
use crate::reconcilers::workload::{Readiness, ServerWorkload};
use std::future::Future;
use std::time::Duration;
use tokio::time::{interval as ticker, sleep, timeout as deadline, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Poll `probe` until it reports a complete rollout.
///
/// # Errors
///
/// [`GateError::Timeout`] when `timeout` elapses first, [`GateError::Probe`] when
/// reading the workload fails.
pub async fn wait_until_ready<F, Fut>(
    mut probe: F,
    timeout: Duration,
    settle: Duration,
    interval: Duration,
) -> Result<Readiness, GateError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<Readiness>>,
{
    let started = Instant::now();

    let poll = async {
        sleep(settle).await;
        let mut ticks = ticker(interval.max(Duration::from_millis(1)));
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticks.tick().await;
            let readiness = probe()
                .await
                .map_err(|e| GateError::Probe(format!("{e:#}")))?;
            if readiness.is_complete() {
                return Ok(readiness);
            }
            debug!(
                desired = readiness.desired,
                ready = readiness.ready,
                updated = readiness.updated,
                "CoreDNS not ready yet"
            );
        }
    };

    let outcome = match deadline(timeout, poll).await {
        Ok(result) => result,
        Err(_) => Err(GateError::Timeout { timeout }),
    };

    let label = match &outcome {
        Ok(_) => GATE_OUTCOME_READY,
        Err(GateError::Timeout { .. }) => GATE_OUTCOME_TIMEOUT,
        Err(GateError::Probe(_)) => GATE_OUTCOME_PROBE_ERROR,
    };
    record_gate_wait(label, started.elapsed());
    outcome
}

/// Wait for `workload` to finish rolling out.
///
/// # Errors
///
/// See [`wait_until_ready`].
pub async fn wait_for_workload(
    workload: &dyn ServerWorkload,
    timeout: Duration,
    settle: Duration,
    interval: Duration,
) -> Result<Readiness, GateError> {
    info!(
        kind = %workload.kind(),
        name = %workload.name(),
        timeout_secs = timeout.as_secs(),
        "Waiting for CoreDNS rollout"
    );
    let result = wait_until_ready(|| workload.readiness(), timeout, settle, interval).await;
    match &result {
        Ok(readiness) => info!(
            kind = %workload.kind(),
            name = %workload.name(),
            ready = readiness.ready,
            "CoreDNS rollout complete"
        ),
        Err(e) => warn!(kind = %workload.kind(), name = %workload.name(), "{e}"),
    }
    result
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod gate_tests;
