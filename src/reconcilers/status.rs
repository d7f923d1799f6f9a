// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status condition helpers for Kubernetes resources.
//!
//! This module provides utility functions for creating and managing Kubernetes
//! status conditions following the standard conventions.
//!
//! # Condition Format
//!
//! Kubernetes conditions follow a standard format:
//! - `type`: The aspect of the resource being reported (corezone only uses `Ready`)
//! - `status`: "True", "False", or "Unknown"
//! - `reason`: A programmatic identifier (CamelCase)
//! - `message`: A human-readable explanation
//! - `lastTransitionTime`: RFC3339 timestamp when the status value changed
//! - `observedGeneration`: the `metadata.generation` the condition describes
//!
//! # Example
//!
//! ```rust,no_run
//! use corezone::reconcilers::status::create_condition;
//!
//! let condition = create_condition(
//!     "Ready",
//!     "True",
//!     "Active",
//!     "CoreDNS Ready",
//!     Some(3),
//! );
//! assert_eq!(condition.observed_generation, Some(3));
//! ```

use crate::crd::{
    Condition, DNSConnector, DNSConnectorStatus, DNSRecord, DNSRecordStatus, DNSZone, DNSZoneStatus,
};
use crate::status_reasons::CONDITION_TYPE_READY;
use anyhow::{Context as _, Result};
use chrono::Utc;
use kube::api::{Patch, PatchParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

/// Create a new Kubernetes condition with the current timestamp.
#[must_use]
pub fn create_condition(
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
    observed_generation: Option<i64>,
) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        last_transition_time: Some(Utc::now().to_rfc3339()),
        observed_generation,
    }
}

/// Find a condition by type in a list of conditions.
#[must_use]
pub fn find_condition<'a>(
    conditions: &'a [Condition],
    condition_type: &str,
) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}

/// The `Ready` condition, if any.
#[must_use]
pub fn ready_condition(conditions: &[Condition]) -> Option<&Condition> {
    find_condition(conditions, CONDITION_TYPE_READY)
}

/// Reason of the `Ready` condition, if any.
#[must_use]
pub fn ready_reason(conditions: &[Condition]) -> Option<&str> {
    ready_condition(conditions).and_then(|c| c.reason.as_deref())
}

/// Update or add a condition in a mutable conditions list (in-memory, no API call).
///
/// `lastTransitionTime` is kept when the status value does not change, so writing
/// the same condition twice yields an identical list.
pub fn update_condition_in_memory(
    conditions: &mut Vec<Condition>,
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
    observed_generation: Option<i64>,
) {
    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == condition_type) {
        let last_transition_time = if existing.status == status {
            existing
                .last_transition_time
                .clone()
                .unwrap_or_else(|| Utc::now().to_rfc3339())
        } else {
            Utc::now().to_rfc3339()
        };

        existing.status = status.to_string();
        existing.reason = Some(reason.to_string());
        existing.message = Some(message.to_string());
        existing.last_transition_time = Some(last_transition_time);
        existing.observed_generation = observed_generation;
    } else {
        conditions.push(create_condition(
            condition_type,
            status,
            reason,
            message,
            observed_generation,
        ));
    }
}

/// Set the `Ready` condition (in-memory).
pub fn set_ready(
    conditions: &mut Vec<Condition>,
    status: &str,
    reason: &str,
    message: &str,
    observed_generation: Option<i64>,
) {
    update_condition_in_memory(
        conditions,
        CONDITION_TYPE_READY,
        status,
        reason,
        message,
        observed_generation,
    );
}

/// Persist `status` on `resource` with a JSON merge patch.
///
/// The patch carries the `resourceVersion` the caller read, so a concurrent write
/// makes the API server answer 409 and the whole reconciliation is retried.
///
/// # Errors
///
/// Returns an error if the API call fails (including conflicts).
pub async fn patch_status<K, S>(client: &Client, resource: &K, status: &S) -> Result<()>
where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::de::DeserializeOwned,
    S: Serialize,
{
    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();
    let api: Api<K> = Api::namespaced(client.clone(), &namespace);

    let mut patch = json!({ "status": status });
    if let Some(version) = resource.resource_version() {
        patch["metadata"] = json!({ "resourceVersion": version });
    }

    api.patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
        .await
        .with_context(|| {
            format!(
                "failed to update status of {} {namespace}/{name}",
                K::kind(&())
            )
        })?;

    debug!(namespace = %namespace, name = %name, kind = %K::kind(&()), "Status updated");
    Ok(())
}

/// A status block carrying a conditions list.
pub trait ConditionedStatus: Clone + Default + PartialEq + Serialize + Send + Sync {
    fn conditions(&self) -> &[Condition];

    fn conditions_mut(&mut self) -> &mut Vec<Condition>;
}

macro_rules! conditioned_status {
    ($($status:ty),*) => {
        $(
            impl ConditionedStatus for $status {
                fn conditions(&self) -> &[Condition] {
                    &self.conditions
                }

                fn conditions_mut(&mut self) -> &mut Vec<Condition> {
                    &mut self.conditions
                }
            }
        )*
    };
}

conditioned_status!(DNSConnectorStatus, DNSZoneStatus, DNSRecordStatus);

/// A corezone custom resource and its status block.
pub trait WithStatus {
    type Status: ConditionedStatus;

    fn status_ref(&self) -> Option<&Self::Status>;
}

macro_rules! with_status {
    ($($kind:ty => $status:ty),*) => {
        $(
            impl WithStatus for $kind {
                type Status = $status;

                fn status_ref(&self) -> Option<&$status> {
                    self.status.as_ref()
                }
            }
        )*
    };
}

with_status!(
    DNSConnector => DNSConnectorStatus,
    DNSZone => DNSZoneStatus,
    DNSRecord => DNSRecordStatus
);

/// `current` with its `Ready` condition set, or `None` when that changes nothing.
#[must_use]
pub fn with_ready<S: ConditionedStatus>(
    current: Option<&S>,
    status: &str,
    reason: &str,
    message: &str,
    observed_generation: Option<i64>,
) -> Option<S> {
    let mut next = current.cloned().unwrap_or_default();
    set_ready(
        next.conditions_mut(),
        status,
        reason,
        message,
        observed_generation,
    );
    (current != Some(&next)).then_some(next)
}

/// Set the `Ready` condition of `resource` and persist it if anything changed.
///
/// `resource` should be freshly read; the write carries its `resourceVersion`.
/// Returns whether a write happened.
///
/// # Errors
///
/// Returns an error if the API call fails.
pub async fn write_ready<K>(
    client: &Client,
    resource: &K,
    status: &str,
    reason: &str,
    message: &str,
) -> Result<bool>
where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + WithStatus
        + Clone
        + std::fmt::Debug
        + serde::de::DeserializeOwned,
{
    let Some(next) = with_ready(
        resource.status_ref(),
        status,
        reason,
        message,
        resource.meta().generation,
    ) else {
        return Ok(false);
    };
    patch_status(client, resource, &next).await?;
    Ok(true)
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
