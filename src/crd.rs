// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions (CRDs) for CoreDNS zone management.
//!
//! This module defines the three Kubernetes Custom Resource Definitions used by
//! corezone to manage CoreDNS zone files declaratively.
//!
//! # Resource Types
//!
//! - [`DNSConnector`] - Binds corezone to one running CoreDNS server (its Corefile
//!   `ConfigMap` and its Deployment, StatefulSet, or DaemonSet)
//! - [`DNSZone`] - One authoritative zone, rendered into a zone file `ConfigMap`
//! - [`DNSRecord`] - One resource record inside a zone
//!
//! Zones name their connector and records name their zone; parents never list
//! their children in their spec.
//!
//! # Example: Creating DNS Records
//!
//! ```rust,no_run
//! use corezone::crd::{DNSRecordSpec, RecordSpec, RecordType, ZoneReference};
//!
//! let www = DNSRecordSpec {
//!     record: RecordSpec {
//!         name: "www".to_string(),
//!         value: "10.0.0.5".to_string(),
//!         r#type: RecordType::A,
//!         ttl: Some(300),
//!         set_ptr: Some(true),
//!     },
//!     dns_zone_ref: ZoneReference {
//!         name: "example-com".to_string(),
//!     },
//! };
//! ```

use crate::constants::{
    DEFAULT_COREDNS_CONFIGMAP, DEFAULT_COREFILE_KEY, DEFAULT_PRIMARY_NS_HOSTNAME,
    DEFAULT_SOA_EXPIRE_SECS, DEFAULT_SOA_MINIMUM_TTL_SECS, DEFAULT_SOA_REFRESH_SECS,
    DEFAULT_SOA_RETRY_SECS, DEFAULT_WAIT_FOR_UPDATE_TIMEOUT_SECS, DEFAULT_ZONEFILES_MOUNT_DIR,
    DEFAULT_ZONE_CONFIGMAP_PREFIX, DEFAULT_ZONE_TTL_SECS,
};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Standard Kubernetes condition.
///
/// Every corezone resource carries a single condition of `type: Ready`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition. corezone only uses `Ready`.
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,

    /// The `metadata.generation` the condition was computed from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

// ============================================================================
// DNSConnector
// ============================================================================

/// Shape of the workload running CoreDNS.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
    DaemonSet,
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Deployment => "Deployment",
            Self::StatefulSet => "StatefulSet",
            Self::DaemonSet => "DaemonSet",
        };
        f.write_str(s)
    }
}

/// Reference to the `ConfigMap` holding the CoreDNS Corefile.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CorednsConfigMapRef {
    /// Name of the CoreDNS `ConfigMap`.
    #[serde(default = "default_coredns_configmap")]
    pub name: String,

    /// Key inside the `ConfigMap` that holds the Corefile.
    #[serde(default = "default_corefile_key")]
    pub corefile_key: String,
}

impl Default for CorednsConfigMapRef {
    fn default() -> Self {
        Self {
            name: default_coredns_configmap(),
            corefile_key: default_corefile_key(),
        }
    }
}

/// Reference to the workload running CoreDNS.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CorednsWorkloadRef {
    /// Workload kind: Deployment, `StatefulSet`, or `DaemonSet`.
    #[serde(rename = "type")]
    pub kind: WorkloadKind,

    /// Workload name in the connector's namespace.
    pub name: String,

    /// Directory inside the CoreDNS container where zone files are mounted.
    #[serde(default = "default_zonefiles_mount_dir")]
    pub zonefiles_mount_dir: String,
}

/// `DNSConnector` connects corezone to one CoreDNS server.
///
/// The connector merges every ready zone of its namespace that names it into the
/// Corefile, mounts the zone files into the CoreDNS pods, and waits for the rollout.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
#[kube(
    group = "corezone.firestoned.io",
    version = "v1alpha1",
    kind = "DNSConnector",
    namespaced,
    shortname = "dnsconn",
    doc = "DNSConnector binds a CoreDNS server (Corefile ConfigMap plus workload) to the zones that reference it.",
    printcolumn = r#"{"name":"Workload","type":"string","jsonPath":".spec.corednsDeployment.name"}"#,
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type=='Ready')].status"}"#,
    printcolumn = r#"{"name":"Reason","type":"string","jsonPath":".status.conditions[?(@.type=='Ready')].reason"}"#
)]
#[kube(status = "DNSConnectorStatus")]
#[serde(rename_all = "camelCase")]
pub struct DNSConnectorSpec {
    /// Seconds to wait for CoreDNS to become ready after a change.
    #[serde(default = "default_wait_for_update_timeout")]
    pub wait_for_update_timeout: u32,

    /// The CoreDNS Corefile `ConfigMap`.
    #[serde(default, rename = "corednsCM")]
    pub coredns_cm: CorednsConfigMapRef,

    /// The CoreDNS workload.
    pub coredns_deployment: CorednsWorkloadRef,

    /// Extra directives injected into every managed zone block (e.g. `log`, `errors`).
    #[serde(default)]
    pub coredns_zone_enabled_plugins: Vec<String>,
}

/// One zone merged into the Corefile by a connector.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionedZone {
    /// `DNSZone` name.
    pub name: String,
    /// Domain served.
    pub domain: String,
    /// Serial of the zone file CoreDNS was rolled out with.
    pub serial_number: String,
}

/// `DNSConnector` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DNSConnectorStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provisioned_zones: Vec<ProvisionedZone>,
}

// ============================================================================
// DNSZone
// ============================================================================

/// Address record type used for the primary nameserver glue record.
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub enum NameserverRecordType {
    #[default]
    A,
    AAAA,
}

impl fmt::Display for NameserverRecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => f.write_str("A"),
            Self::AAAA => f.write_str("AAAA"),
        }
    }
}

/// Primary nameserver of a zone.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryNameserver {
    /// Hostname label of the nameserver inside the zone (e.g. `ns1`).
    #[serde(default = "default_primary_ns_hostname")]
    pub hostname: String,

    /// IP address of the nameserver.
    pub ip_address: String,

    /// Address record type of `ipAddress`.
    #[serde(default)]
    pub record_type: NameserverRecordType,
}

/// `DNSZone` describes one authoritative zone served by CoreDNS.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
#[kube(
    group = "corezone.firestoned.io",
    version = "v1alpha1",
    kind = "DNSZone",
    namespaced,
    shortname = "dnsz",
    doc = "DNSZone represents an authoritative DNS zone rendered into a zone file ConfigMap and served by the CoreDNS instance of its DNSConnector.",
    printcolumn = r#"{"name":"Domain","type":"string","jsonPath":".spec.domain"}"#,
    printcolumn = r#"{"name":"Serial","type":"string","jsonPath":".status.currentZoneSerial"}"#,
    printcolumn = r#"{"name":"Records","type":"integer","jsonPath":".status.recordCount"}"#,
    printcolumn = r#"{"name":"Reason","type":"string","jsonPath":".status.conditions[?(@.type=='Ready')].reason"}"#
)]
#[kube(status = "DNSZoneStatus")]
#[serde(rename_all = "camelCase")]
pub struct DNSZoneSpec {
    /// Prefix of the generated zone `ConfigMap` name.
    #[serde(default = "default_zone_configmap_prefix")]
    pub cm_prefix: String,

    /// Domain served by the zone (e.g. `example.com`).
    #[schemars(regex(
        pattern = r"^([a-zA-Z0-9_]([a-zA-Z0-9_-]{0,61}[a-zA-Z0-9])?\.)*[a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.?$"
    ))]
    pub domain: String,

    /// Primary nameserver written into the SOA and NS records.
    #[serde(rename = "primaryNS")]
    pub primary_ns: PrimaryNameserver,

    /// Responsible person mailbox in zone-file form (e.g. `admin.example.com`).
    pub resp_person_email: String,

    /// Default TTL of the zone.
    #[serde(default = "default_zone_ttl")]
    pub ttl: u32,

    /// SOA refresh interval.
    #[serde(default = "default_refresh_rate")]
    pub refresh_rate: u32,

    /// SOA retry interval.
    #[serde(default = "default_retry_interval")]
    pub retry_interval: u32,

    /// SOA expire time.
    #[serde(default = "default_expire_time")]
    pub expire_time: u32,

    /// SOA minimum TTL.
    #[serde(default = "default_minimum_ttl", rename = "minimumTTL")]
    pub minimum_ttl: u32,

    /// Name of the `DNSConnector` (same namespace) that serves this zone.
    pub connector_name: String,
}

/// `DNSZone` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DNSZoneStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    /// Serial of the zone file currently stored in the zone `ConfigMap`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_zone_serial: Option<String>,
    /// Number of record lines in the zone file body.
    #[serde(default)]
    pub record_count: usize,
    /// Whether the last rendered zone file passed validation.
    #[serde(default)]
    pub validation_passed: bool,
    /// Name of the generated zone `ConfigMap`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_configmap: Option<String>,
    /// Set once the zone has been successfully built; a failed rebuild keeps the last good artifact.
    #[serde(default)]
    pub checkpoint: bool,
}

// ============================================================================
// DNSRecord
// ============================================================================

/// Supported RFC1035 record types.
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
pub enum RecordType {
    A,
    AAAA,
    CNAME,
    MX,
    TXT,
    NS,
    PTR,
    SRV,
    CAA,
    DNSKEY,
    DS,
    NAPTR,
    RRSIG,
    DNAME,
    HINFO,
}

impl RecordType {
    /// Every supported type, in declaration order.
    pub const ALL: [RecordType; 15] = [
        Self::A,
        Self::AAAA,
        Self::CNAME,
        Self::MX,
        Self::TXT,
        Self::NS,
        Self::PTR,
        Self::SRV,
        Self::CAA,
        Self::DNSKEY,
        Self::DS,
        Self::NAPTR,
        Self::RRSIG,
        Self::DNAME,
        Self::HINFO,
    ];

    /// Zone-file mnemonic of the type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::AAAA => "AAAA",
            Self::CNAME => "CNAME",
            Self::MX => "MX",
            Self::TXT => "TXT",
            Self::NS => "NS",
            Self::PTR => "PTR",
            Self::SRV => "SRV",
            Self::CAA => "CAA",
            Self::DNSKEY => "DNSKEY",
            Self::DS => "DS",
            Self::NAPTR => "NAPTR",
            Self::RRSIG => "RRSIG",
            Self::DNAME => "DNAME",
            Self::HINFO => "HINFO",
        }
    }

    /// Parse a zone-file mnemonic (case-insensitive).
    #[must_use]
    pub fn from_mnemonic(s: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The resource record itself.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordSpec {
    /// Owner name. Relative names are qualified with the zone domain; `@` is the apex.
    pub name: String,

    /// Record data in zone-file syntax (e.g. `10.0.0.5`, `10 mail`, `"v=spf1 -all"`).
    pub value: String,

    /// Record type.
    pub r#type: RecordType,

    /// TTL override; the zone `$TTL` applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,

    /// Generate a matching `in-addr.arpa.` PTR record (A records only).
    #[serde(default, rename = "setPTR", skip_serializing_if = "Option::is_none")]
    pub set_ptr: Option<bool>,
}

/// Reference to a `DNSZone` in the same namespace.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct ZoneReference {
    /// `DNSZone` name.
    pub name: String,
}

/// `DNSRecord` is one resource record of a `DNSZone`.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
#[kube(
    group = "corezone.firestoned.io",
    version = "v1alpha1",
    kind = "DNSRecord",
    namespaced,
    shortname = "dnsrec",
    doc = "DNSRecord is a single RFC1035 resource record rendered into the zone file of the DNSZone it references.",
    printcolumn = r#"{"name":"Zone","type":"string","jsonPath":".spec.dnsZoneRef.name"}"#,
    printcolumn = r#"{"name":"Type","type":"string","jsonPath":".spec.record.type"}"#,
    printcolumn = r#"{"name":"Valid","type":"boolean","jsonPath":".status.validationPassed"}"#,
    printcolumn = r#"{"name":"Reason","type":"string","jsonPath":".status.conditions[?(@.type=='Ready')].reason"}"#
)]
#[kube(status = "DNSRecordStatus")]
#[serde(rename_all = "camelCase")]
pub struct DNSRecordSpec {
    /// The record.
    pub record: RecordSpec,

    /// The zone this record belongs to.
    pub dns_zone_ref: ZoneReference,
}

/// `DNSRecord` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DNSRecordStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    /// Whether the rendered text passed zone-file validation.
    #[serde(default)]
    pub validation_passed: bool,
    /// Rendered zone-file text (one or two lines). Serialized as `null` when
    /// absent so a status merge patch clears it.
    pub generated_record: Option<String>,
    /// Whether a PTR line was generated.
    #[serde(default, rename = "autoIPv4PTR")]
    pub auto_ipv4_ptr: bool,
    /// Zone origin the record was rendered against.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    /// `DNSZone` the record was last rendered for. Lets the previous zone drop
    /// the record when `dnsZoneRef` changes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_ref: Option<String>,
}

// ============================================================================
// Defaults
// ============================================================================

fn default_coredns_configmap() -> String {
    DEFAULT_COREDNS_CONFIGMAP.to_string()
}

fn default_corefile_key() -> String {
    DEFAULT_COREFILE_KEY.to_string()
}

fn default_zonefiles_mount_dir() -> String {
    DEFAULT_ZONEFILES_MOUNT_DIR.to_string()
}

fn default_wait_for_update_timeout() -> u32 {
    DEFAULT_WAIT_FOR_UPDATE_TIMEOUT_SECS
}

fn default_zone_configmap_prefix() -> String {
    DEFAULT_ZONE_CONFIGMAP_PREFIX.to_string()
}

fn default_primary_ns_hostname() -> String {
    DEFAULT_PRIMARY_NS_HOSTNAME.to_string()
}

fn default_zone_ttl() -> u32 {
    DEFAULT_ZONE_TTL_SECS
}

fn default_refresh_rate() -> u32 {
    DEFAULT_SOA_REFRESH_SECS
}

fn default_retry_interval() -> u32 {
    DEFAULT_SOA_RETRY_SECS
}

fn default_expire_time() -> u32 {
    DEFAULT_SOA_EXPIRE_SECS
}

fn default_minimum_ttl() -> u32 {
    DEFAULT_SOA_MINIMUM_TTL_SECS
}
