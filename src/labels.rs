// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label, annotation, and finalizer constants used across all reconcilers.
//!
//! This module defines standard Kubernetes labels and corezone-specific annotations
//! to ensure consistency across all resources created or modified by the controller.

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Standard label for the component name within the architecture
pub const K8S_COMPONENT: &str = "app.kubernetes.io/component";

/// Standard label for the name of a higher-level application this one is part of
pub const K8S_PART_OF: &str = "app.kubernetes.io/part-of";

// ============================================================================
// Kubernetes Standard Label Values
// ============================================================================

/// Value for `app.kubernetes.io/managed-by` on objects generated by this operator
pub const MANAGED_BY_COREZONE: &str = "corezone";

/// Value for `app.kubernetes.io/part-of`
pub const PART_OF_COREZONE: &str = "corezone";

/// Component value for generated zone `ConfigMaps`
pub const COMPONENT_ZONE_FILE: &str = "zone-file";

/// Component value for the Corefile backup `ConfigMap`
pub const COMPONENT_COREFILE_BACKUP: &str = "corefile-backup";

// ============================================================================
// Zone Artifact Annotations
// ============================================================================

/// Serial number of the zone file held by a zone `ConfigMap`
pub const ANNOTATION_SERIAL_NUMBER: &str = "corezone.firestoned.io/serial-number";

/// Domain served by a zone `ConfigMap`
pub const ANNOTATION_DOMAIN_NAME: &str = "corezone.firestoned.io/domain-name";

/// Name of the `DNSZone` that owns a zone `ConfigMap`
pub const ANNOTATION_DNS_ZONE_REF: &str = "corezone.firestoned.io/dnszone-ref";

// ============================================================================
// Workload Annotations
// ============================================================================

/// Pod template annotation whose change makes CoreDNS roll out (value is a unix timestamp)
pub const ANNOTATION_RECONCILIATION_REQUEST: &str =
    "corezone.firestoned.io/reconciliation-request";

// ============================================================================
// Finalizers
// ============================================================================

/// Finalizer for `DNSConnector` resources and the Corefile backup `ConfigMap`
pub const FINALIZER_DNS_CONNECTOR: &str = "corezone.firestoned.io/dnsconnector-finalizer";

/// Finalizer for `DNSZone` resources and their zone `ConfigMaps`
pub const FINALIZER_DNS_ZONE: &str = "corezone.firestoned.io/dnszone-finalizer";

/// Finalizer for `DNSRecord` resources
pub const FINALIZER_DNS_RECORD: &str = "corezone.firestoned.io/dnsrecord-finalizer";
