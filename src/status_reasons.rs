// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Standard Kubernetes status condition reasons for corezone resources.
//!
//! This module defines constants for condition reasons following Kubernetes conventions.
//! Reasons are programmatic identifiers in CamelCase that explain why a condition has
//! a particular status.
//!
//! # Condition Hierarchy
//!
//! Status flows down the dependency graph once a parent finishes its own work:
//!
//! - **`DNSConnector`** → marks every zone it merged as `Active`
//! - **`DNSZone`** → marks every record it rendered into the zone file as `Ready`
//!
//! # Condition Types
//!
//! Every resource has a single `type: Ready` condition.
//!
//! # Example Status
//!
//! ```yaml
//! status:
//!   conditions:
//!     - type: Ready
//!       status: "True"
//!       reason: Active
//!       message: "Picked up by DNSConnector"
//!       observedGeneration: 3
//! ```

/// The single condition type carried by every corezone resource.
pub const CONDITION_TYPE_READY: &str = "Ready";

/// Condition status values.
pub const STATUS_TRUE: &str = "True";
pub const STATUS_FALSE: &str = "False";
pub const STATUS_UNKNOWN: &str = "Unknown";

// ============================================================================
// DNSConnector Reasons
// ============================================================================

/// CoreDNS picked up the merged configuration and all replicas are ready.
pub const REASON_CONNECTOR_ACTIVE: &str = "Active";

/// A referenced object (Corefile `ConfigMap`, CoreDNS workload, backup) is missing or unreadable.
pub const REASON_CONNECTOR_ERROR: &str = "Error";

/// The merged configuration was written and CoreDNS is rolling out.
pub const REASON_CONNECTOR_UPDATING: &str = "Updating";

/// Merging, attaching, or the readiness gate failed.
///
/// The previous Corefile backup is left untouched for recovery.
pub const REASON_CONNECTOR_UPDATE_ERROR: &str = "UpdateError";

/// State has not been determined yet.
pub const REASON_CONNECTOR_UNKNOWN: &str = "Unknown";

// ============================================================================
// DNSZone Reasons
// ============================================================================

/// The zone was merged into the Corefile by its connector.
pub const REASON_ZONE_ACTIVE: &str = "Active";

/// The zone `ConfigMap` is built and waits for its connector.
pub const REASON_ZONE_PENDING: &str = "Pending";

/// Building or validating the zone file failed; the previous artifact is preserved.
pub const REASON_ZONE_UPDATE_ERROR: &str = "UpdateError";

/// The zone `ConfigMap` is built but the named connector does not exist.
pub const REASON_ZONE_NO_CONNECTOR: &str = "NoConnector";

/// The zone header could not be rendered.
pub const REASON_ZONE_DEGRADED: &str = "Degraded";

/// State has not been determined yet.
pub const REASON_ZONE_UNKNOWN: &str = "Unknown";

// ============================================================================
// DNSRecord Reasons
// ============================================================================

/// The record was rendered into its zone file.
pub const REASON_RECORD_READY: &str = "Ready";

/// The record is rendered and validated but not yet part of a zone file,
/// or its zone went away.
pub const REASON_RECORD_PENDING: &str = "Pending";

/// The rendered record failed zone-file validation.
pub const REASON_RECORD_DEGRADED: &str = "Degraded";

/// State has not been determined yet.
pub const REASON_RECORD_UNKNOWN: &str = "Unknown";

// ============================================================================
// Messages
// ============================================================================

/// Message set on a record after it has been rendered and validated.
pub const MESSAGE_RECORD_CONSTRUCTED: &str = "Record has been constructed";

/// Message set on a zone once its connector merged it.
pub const MESSAGE_PICKED_UP_BY_CONNECTOR: &str = "Picked up by DNSConnector";

/// Message set on a connector once CoreDNS is ready.
pub const MESSAGE_COREDNS_READY: &str = "CoreDNS Ready";

/// Message set on a connector while CoreDNS rolls out.
pub const MESSAGE_COREDNS_UPDATING: &str = "coredns is being updated";

/// Message set on a record after its zone included it in the zone file.
#[must_use]
pub fn record_joined_message(zone_name: &str) -> String {
    format!("Record has joined to the DNSZone: {zone_name}")
}

/// Message set on a record when its zone is being deleted.
#[must_use]
pub fn zone_removed_message(zone_name: &str) -> String {
    format!("DNSZone has been removed: {zone_name}")
}

/// Message set on a zone after its `ConfigMap` was written.
#[must_use]
pub fn zone_configmap_created_message(configmap_name: &str) -> String {
    format!("Zone ConfigMap has been created: {configmap_name}")
}
