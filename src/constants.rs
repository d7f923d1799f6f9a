// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the corezone operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for all corezone CRDs
pub const API_GROUP: &str = "corezone.firestoned.io";

/// API version for all corezone CRDs
pub const API_VERSION: &str = "v1alpha1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "corezone.firestoned.io/v1alpha1";

/// Kind name for `DNSConnector` resource
pub const KIND_DNS_CONNECTOR: &str = "DNSConnector";

/// Kind name for `DNSZone` resource
pub const KIND_DNS_ZONE: &str = "DNSZone";

/// Kind name for `DNSRecord` resource
pub const KIND_DNS_RECORD: &str = "DNSRecord";

// ============================================================================
// DNS Protocol Constants
// ============================================================================

/// Port CoreDNS serves each managed zone block on
pub const DNS_PORT: u16 = 53;

/// Default zone TTL (1 day)
pub const DEFAULT_ZONE_TTL_SECS: u32 = 86_400;

/// Default SOA refresh interval (2 hours)
pub const DEFAULT_SOA_REFRESH_SECS: u32 = 7_200;

/// Default SOA retry interval (1 hour)
pub const DEFAULT_SOA_RETRY_SECS: u32 = 3_600;

/// Default SOA expire time (14 days)
pub const DEFAULT_SOA_EXPIRE_SECS: u32 = 1_209_600;

/// Default SOA minimum / negative caching TTL (1 day)
pub const DEFAULT_SOA_MINIMUM_TTL_SECS: u32 = 86_400;

/// Default hostname label of a zone's primary nameserver
pub const DEFAULT_PRIMARY_NS_HOSTNAME: &str = "ns1";

/// Suffix for IPv4 reverse lookup names
pub const IN_ADDR_ARPA_SUFFIX: &str = "in-addr.arpa.";

/// Width of a zone serial (`MMDDHHMMSS`)
pub const ZONE_SERIAL_WIDTH: usize = 10;

/// chrono format string used to derive a zone serial from wall-clock time
pub const ZONE_SERIAL_FORMAT: &str = "%m%d%H%M%S";

// ============================================================================
// CoreDNS Constants
// ============================================================================

/// Default name of the CoreDNS `ConfigMap`
pub const DEFAULT_COREDNS_CONFIGMAP: &str = "coredns";

/// Default key holding the Corefile inside the CoreDNS `ConfigMap`
pub const DEFAULT_COREFILE_KEY: &str = "Corefile";

/// Default directory zone files are mounted under inside CoreDNS pods
pub const DEFAULT_ZONEFILES_MOUNT_DIR: &str = "/opt/coredns";

/// Default prefix for generated zone `ConfigMaps`
pub const DEFAULT_ZONE_CONFIGMAP_PREFIX: &str = "coredns-zone-";

/// Suffix appended to the CoreDNS `ConfigMap` name to form its one-time backup
pub const ORIGINAL_CONFIGMAP_BACKUP_SUFFIX: &str = "-original-configmap";

/// File extension of a zone file inside a zone `ConfigMap` and on disk
pub const ZONE_FILE_EXTENSION: &str = ".zone";

/// Prefix of volume names that carry zone artifacts in the CoreDNS pod template
pub const ZONE_VOLUME_PREFIX: &str = "dnszone-";

/// Marker that opens a managed block in the Corefile (followed by the domain)
pub const MANAGED_BLOCK_BEGIN_PREFIX: &str = "# COREDNS CONTROLLER MANAGED BLOCK BEGINNING -- ";

/// Marker that closes a managed block in the Corefile (followed by the domain)
pub const MANAGED_BLOCK_END_PREFIX: &str = "# COREDNS CONTROLLER MANAGED BLOCK END -- ";

// ============================================================================
// Deployment Gate Constants
// ============================================================================

/// Default time to wait for CoreDNS to roll out after a change (5 minutes)
pub const DEFAULT_WAIT_FOR_UPDATE_TIMEOUT_SECS: u32 = 300;

/// Default delay before the first readiness poll
pub const DEFAULT_SETTLE_DELAY_SECS: u64 = 6;

/// Default interval between readiness polls
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 3;

/// Default debounce applied to watch-triggered reconciliations
pub const DEFAULT_WATCH_DEBOUNCE_SECS: u64 = 3;

// ============================================================================
// Controller Timing Constants
// ============================================================================

/// Requeue interval for resources that are fully reconciled (5 minutes)
pub const DEFAULT_REQUEUE_READY_SECS: u64 = 300;

/// Requeue interval for resources that are still converging (30 seconds)
pub const DEFAULT_REQUEUE_PENDING_SECS: u64 = 30;

/// Requeue interval after a reconciliation error (30 seconds)
pub const DEFAULT_ERROR_REQUEUE_SECS: u64 = 30;

/// Requeue interval after an optimistic-concurrency conflict
pub const DEFAULT_CONFLICT_REQUEUE_SECS: u64 = 1;

/// Number of tokio worker threads for the controller runtime
pub const DEFAULT_WORKER_THREADS: usize = 4;

/// Default bind address of the metrics HTTP server
pub const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:8080";

// ============================================================================
// Kubernetes API Constants
// ============================================================================

/// HTTP status the API server returns when an object does not exist
pub const HTTP_NOT_FOUND: u16 = 404;

/// HTTP status the API server returns on a resourceVersion mismatch
pub const HTTP_CONFLICT: u16 = 409;
