// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes reconciliation controllers for corezone resources.
//!
//! Each reconciler handles one custom resource kind and turns its spec into
//! generated artifacts, then reports the result back through the `Ready`
//! condition.
//!
//! # Reconciliation Architecture
//!
//! corezone follows the standard Kubernetes controller pattern, over a
//! three-level hierarchy where children name their parents:
//!
//! 1. **`DNSRecord`** - [`reconcile_dnsrecord`] renders and validates one record
//!    against its zone origin and stores the text in its status
//! 2. **`DNSZone`** - [`reconcile_dnszone`] assembles the zone file from its
//!    valid records and writes the zone `ConfigMap`
//! 3. **`DNSConnector`** - [`reconcile_dnsconnector`] merges every zone into the
//!    Corefile, mounts the zone files into CoreDNS and waits for the rollout
//!
//! Deletion of any of them runs the explicit teardown sequence of [`lifecycle`].
//!
//! # Example: Using a Reconciler
//!
//! ```rust,no_run
//! use corezone::reconcilers::reconcile_dnszone;
//! use corezone::crd::DNSZone;
//! use corezone::context::Context;
//! use std::sync::Arc;
//!
//! async fn reconcile_zone(ctx: Arc<Context>, dnszone: DNSZone) -> anyhow::Result<()> {
//!     let outcome = reconcile_dnszone(ctx, dnszone).await?;
//!     println!("{outcome:?}");
//!     Ok(())
//! }
//! ```

pub mod dnsconnector;
pub mod dnsrecord;
pub mod dnszone;
pub mod finalizers;
pub mod gate;
pub mod lifecycle;
pub mod propagation;
pub mod status;
pub mod workload;

pub use dnsconnector::reconcile_dnsconnector;
pub use dnsrecord::reconcile_dnsrecord;
pub use dnszone::reconcile_dnszone;

use anyhow::{Context as _, Result};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource, ResourceExt};

/// How a reconciliation ended, used to pick the requeue interval.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The resource reports `Ready=True` in its final state
    Ready,
    /// The resource is waiting on something (its parent, a rollout)
    Pending,
    /// Teardown finished; the object is about to disappear
    Removed,
}

impl Outcome {
    #[must_use]
    pub fn from_ready(ready: bool) -> Self {
        if ready {
            Self::Ready
        } else {
            Self::Pending
        }
    }
}

/// Check if a resource's spec has changed by comparing generation with `observed_generation`.
///
/// The `metadata.generation` field is incremented by Kubernetes only when the spec changes,
/// while `status.observed_generation` is set by the controller after processing a spec.
///
/// # Returns
///
/// * `true` - Reconciliation is needed (spec changed or first reconciliation)
/// * `false` - No reconciliation needed (spec unchanged, status-only update)
#[must_use]
pub fn should_reconcile(current_generation: Option<i64>, observed_generation: Option<i64>) -> bool {
    match (current_generation, observed_generation) {
        (Some(current), Some(observed)) => current != observed,
        (Some(_), None) => true, // First reconciliation
        _ => false,              // No generation tracking available
    }
}

/// Check if a status value has actually changed compared to the current status.
///
/// In kube-rs, status updates trigger "object updated" events which cause new
/// reconciliations, so unchanged values must not be written back.
#[must_use]
pub fn status_changed<T: PartialEq>(current_value: &Option<T>, new_value: &Option<T>) -> bool {
    current_value != new_value
}

/// Read the latest version of `resource`, or `None` if it is gone.
///
/// Status writes carry the `resourceVersion` of the object they were computed
/// from, so reconcilers re-read after their own metadata patches.
///
/// # Errors
///
/// Returns an error if the API call fails.
pub async fn refetch<K>(client: &Client, resource: &K) -> Result<Option<K>>
where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::de::DeserializeOwned,
{
    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();
    let api: Api<K> = Api::namespaced(client.clone(), &namespace);
    api.get_opt(&name)
        .await
        .with_context(|| format!("failed to read {} {namespace}/{name}", K::kind(&())))
}

#[cfg(test)]
mod mod_tests;
