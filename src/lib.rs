// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # corezone - CoreDNS Zone Operator for Kubernetes
//!
//! corezone is a Kubernetes operator that manages authoritative DNS zones served by
//! an existing CoreDNS installation through Custom Resource Definitions (CRDs).
//!
//! ## Overview
//!
//! Three custom resources form a hierarchy where each child names its parent:
//!
//! - `DNSRecord` - one resource record, rendered and validated on its own
//! - `DNSZone` - assembles its records into a zone file stored in a `ConfigMap`
//! - `DNSConnector` - merges every zone into the CoreDNS Corefile, mounts the zone
//!   files into the CoreDNS pods and waits for the rollout
//!
//! ## Modules
//!
//! - [`crd`] - Custom Resource Definition types
//! - [`reconcilers`] - Reconciliation logic for each resource type
//! - [`controllers`] - Controller wiring, watches and requeue policy
//! - [`zonefile`] - Record rendering, zone file assembly and validation
//! - [`corefile`] - Managed blocks in the Corefile
//! - [`artifacts`] - Generated `ConfigMaps`
//!
//! ## Example
//!
//! ```rust,no_run
//! use corezone::crd::{DNSZoneSpec, NameserverRecordType, PrimaryNameserver};
//!
//! let zone_spec = DNSZoneSpec {
//!     cm_prefix: "coredns-zone-".to_string(),
//!     domain: "example.com".to_string(),
//!     primary_ns: PrimaryNameserver {
//!         hostname: "ns1".to_string(),
//!         ip_address: "10.0.0.53".to_string(),
//!         record_type: NameserverRecordType::A,
//!     },
//!     resp_person_email: "admin.example.com".to_string(),
//!     ttl: 86400,
//!     refresh_rate: 7200,
//!     retry_interval: 3600,
//!     expire_time: 1_209_600,
//!     minimum_ttl: 86400,
//!     connector_name: "coredns".to_string(),
//! };
//! ```

pub mod artifacts;
pub mod config;
pub mod constants;
pub mod context;
pub mod controllers;
pub mod corefile;
pub mod crd;
pub mod crd_yaml;
pub mod errors;
pub mod labels;
pub mod metrics;
pub mod reconcilers;
pub mod status_reasons;
pub mod zonefile;
