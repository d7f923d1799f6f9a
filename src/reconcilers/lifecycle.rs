// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Finalizer-gated teardown as an explicit state machine.
//!
//! A resource is `Active` until its deletion timestamp is set. While it still
//! carries its finalizer it is `Deleting` and walks through its cleanup steps in
//! order; once the finalizer is gone it is `Removed`.
//!
//! ```text
//! DNSRecord     Active -> Deleting -> RemoveFinalizer -> Removed
//! DNSZone       Active -> Deleting -> NotifyRecords -> ReleaseArtifact -> RemoveFinalizer -> Removed
//! DNSConnector  Active -> Deleting -> RestoreConfig -> DetachArtifacts -> RemoveFinalizer -> Removed
//! ```
//!
//! The controller may be interrupted anywhere in the sequence. Every step is
//! idempotent and the current step is re-derived from the observed cluster
//! state on each invocation, so a retry simply resumes.

use crate::reconcilers::finalizers::has_finalizer;
use anyhow::Result;
use async_trait::async_trait;
use kube::{Resource, ResourceExt};
use std::fmt;
use tracing::{debug, info};

/// Phase of a resource's lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TeardownPhase {
    Active,
    Deleting,
    /// Tell every record of a zone that the zone is gone
    NotifyRecords,
    /// Remove the zone finalizer from the zone `ConfigMap`
    ReleaseArtifact,
    /// Put the backed-up Corefile back into the CoreDNS `ConfigMap`
    RestoreConfig,
    /// Remove zone mounts from the CoreDNS workload
    DetachArtifacts,
    /// Drop the resource's own finalizer (always last)
    RemoveFinalizer,
    Removed,
}

impl TeardownPhase {
    /// Coarse phase from metadata alone.
    #[must_use]
    pub fn of<K: Resource + ResourceExt>(resource: &K, finalizer: &str) -> Self {
        match (
            resource.meta().deletion_timestamp.is_some(),
            has_finalizer(resource, finalizer),
        ) {
            (false, _) => Self::Active,
            (true, true) => Self::Deleting,
            (true, false) => Self::Removed,
        }
    }
}

impl fmt::Display for TeardownPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Record cleanup steps.
pub const RECORD_STEPS: &[TeardownPhase] = &[TeardownPhase::RemoveFinalizer];

/// Zone cleanup steps.
pub const ZONE_STEPS: &[TeardownPhase] = &[
    TeardownPhase::NotifyRecords,
    TeardownPhase::ReleaseArtifact,
    TeardownPhase::RemoveFinalizer,
];

/// Connector cleanup steps.
pub const CONNECTOR_STEPS: &[TeardownPhase] = &[
    TeardownPhase::RestoreConfig,
    TeardownPhase::DetachArtifacts,
    TeardownPhase::RemoveFinalizer,
];

/// Cleanup of one resource.
#[async_trait]
pub trait Teardown: Send + Sync {
    /// Resource description for log lines (`DNSZone ns/name`).
    fn describe(&self) -> String;

    /// Ordered cleanup steps. `RemoveFinalizer` must be last.
    fn steps(&self) -> &'static [TeardownPhase];

    /// Whether the observed state shows `step` as already done.
    async fn is_done(&self, step: TeardownPhase) -> Result<bool>;

    /// Perform `step`. Must be safe to repeat.
    async fn run(&self, step: TeardownPhase) -> Result<()>;
}

/// Drive `teardown` from its current step to `Removed`.
///
/// A failing step stops the walk; the resource keeps its finalizer and the next
/// reconciliation resumes from that step.
///
/// # Errors
///
/// Returns the first step error.
pub async fn run_teardown(teardown: &dyn Teardown) -> Result<TeardownPhase> {
    for &step in teardown.steps() {
        if teardown.is_done(step).await? {
            debug!(resource = %teardown.describe(), phase = %step, "Teardown step already done");
            continue;
        }
        info!(resource = %teardown.describe(), phase = %step, "Running teardown step");
        teardown.run(step).await?;
    }
    info!(resource = %teardown.describe(), "Teardown complete");
    Ok(TeardownPhase::Removed)
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod lifecycle_tests;
