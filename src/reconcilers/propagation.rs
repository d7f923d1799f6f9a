// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Dependency Propagator.
//!
//! Children never call into their parents directly. A record event is mapped to
//! a reconciliation request for its zone (and for its previous zone after a
//! move) and a zone event to one for its
//! connector; the controllers debounce and deduplicate those requests.
//!
//! In the other direction, a parent that finished its own work writes the
//! `Ready` condition of its children: the connector marks its zones picked up,
//! the zone marks its records joined (or removed, on teardown). Each child is
//! re-read right before its status is written, and a failure on one child does
//! not stop the others.

use crate::crd::{DNSConnector, DNSRecord, DNSZone};
use crate::reconcilers::status::{write_ready, WithStatus};
use crate::status_reasons::{
    record_joined_message, zone_removed_message, MESSAGE_PICKED_UP_BY_CONNECTOR,
    REASON_RECORD_PENDING, REASON_RECORD_READY, REASON_ZONE_ACTIVE, STATUS_FALSE, STATUS_TRUE,
};
use crate::zonefile::zone_origin;
use anyhow::{anyhow, Result};
use kube::api::ListParams;
use kube::core::NamespaceResourceScope;
use kube::runtime::reflector::ObjectRef;
use kube::{Api, Client, Resource, ResourceExt};
use std::sync::Arc;
use tracing::{debug, warn};

// ============================================================================
// Watch mappers
// ============================================================================

/// The zone a record belongs to, plus the zone it was last rendered for when
/// `dnsZoneRef` has moved since, so that zone drops the record's lines.
#[must_use]
pub fn record_to_zones(record: &DNSRecord) -> Vec<ObjectRef<DNSZone>> {
    let Some(namespace) = record.namespace() else {
        return Vec::new();
    };
    let current = record.spec.dns_zone_ref.name.as_str();
    let previous = record
        .status
        .as_ref()
        .and_then(|s| s.zone_ref.as_deref())
        .filter(|previous| *previous != current);

    [Some(current), previous]
        .into_iter()
        .flatten()
        .filter(|zone| !zone.is_empty())
        .map(|zone| ObjectRef::new(zone).within(&namespace))
        .collect()
}

/// The connector a zone is served by.
#[must_use]
pub fn zone_to_connector(zone: &DNSZone) -> Option<ObjectRef<DNSConnector>> {
    let namespace = zone.namespace()?;
    let connector = zone.spec.connector_name.as_str();
    (!connector.is_empty()).then(|| ObjectRef::new(connector).within(&namespace))
}

/// Records of `zone` that were rendered against a different origin and must be rebuilt.
#[must_use]
pub fn zone_to_records(zone: &DNSZone, records: &[Arc<DNSRecord>]) -> Vec<ObjectRef<DNSRecord>> {
    let Some(namespace) = zone.namespace() else {
        return Vec::new();
    };
    let zone_name = zone.name_any();
    let origin = zone_origin(&zone.spec.domain);

    records
        .iter()
        .filter(|record| {
            record.namespace().as_deref() == Some(namespace.as_str())
                && record.spec.dns_zone_ref.name == zone_name
                && record.status.as_ref().and_then(|s| s.origin.as_deref()) != Some(origin.as_str())
        })
        .map(|record| ObjectRef::new(&record.name_any()).within(&namespace))
        .collect()
}

// ============================================================================
// Listing
// ============================================================================

/// Records in `namespace` that reference `zone_name`, sorted by name.
///
/// # Errors
///
/// Returns an error if the list call fails.
pub async fn list_zone_records(
    client: &Client,
    namespace: &str,
    zone_name: &str,
) -> Result<Vec<DNSRecord>> {
    let api: Api<DNSRecord> = Api::namespaced(client.clone(), namespace);
    let mut records: Vec<DNSRecord> = api
        .list(&ListParams::default())
        .await?
        .items
        .into_iter()
        .filter(|r| r.spec.dns_zone_ref.name == zone_name)
        .collect();
    records.sort_by_key(ResourceExt::name_any);
    Ok(records)
}

/// Zones in `namespace` that name `connector_name`, sorted by name.
///
/// # Errors
///
/// Returns an error if the list call fails.
pub async fn list_connector_zones(
    client: &Client,
    namespace: &str,
    connector_name: &str,
) -> Result<Vec<DNSZone>> {
    let api: Api<DNSZone> = Api::namespaced(client.clone(), namespace);
    let mut zones: Vec<DNSZone> = api
        .list(&ListParams::default())
        .await?
        .items
        .into_iter()
        .filter(|z| z.spec.connector_name == connector_name)
        .collect();
    zones.sort_by_key(ResourceExt::name_any);
    Ok(zones)
}

// ============================================================================
// Status fan-out
// ============================================================================

/// Write the `Ready` condition on each named child, re-reading it first.
///
/// Every child is attempted; missing or deleting children are skipped. The
/// error, if any, counts the children that could not be updated.
async fn fan_out<K>(
    client: &Client,
    namespace: &str,
    names: &[String],
    condition: (&str, &str, &str),
) -> Result<usize>
where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + WithStatus
        + Clone
        + std::fmt::Debug
        + serde::de::DeserializeOwned,
{
    let (status, reason, message) = condition;
    let api: Api<K> = Api::namespaced(client.clone(), namespace);
    let mut written = 0;
    let mut failed = 0;

    for name in names {
        let fresh = match api.get_opt(name).await {
            Ok(Some(fresh)) => fresh,
            Ok(None) => {
                debug!(namespace = %namespace, name = %name, "Child vanished before its status was written");
                continue;
            }
            Err(e) => {
                warn!(namespace = %namespace, name = %name, "Failed to read {}: {e}", K::kind(&()));
                failed += 1;
                continue;
            }
        };
        if fresh.meta().deletion_timestamp.is_some() {
            continue;
        }
        match write_ready(client, &fresh, status, reason, message).await {
            Ok(true) => written += 1,
            Ok(false) => {}
            Err(e) => {
                warn!(namespace = %namespace, name = %name, "Failed to update {} status: {e:#}", K::kind(&()));
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(anyhow!(
            "failed to update {failed} of {} {} status(es)",
            names.len(),
            K::kind(&())
        ));
    }
    Ok(written)
}

/// Mark `zones` as picked up by their connector.
///
/// # Errors
///
/// Returns an error if any zone could not be updated.
pub async fn notify_zones_picked_up(
    client: &Client,
    namespace: &str,
    zones: &[String],
) -> Result<usize> {
    fan_out::<DNSZone>(
        client,
        namespace,
        zones,
        (STATUS_TRUE, REASON_ZONE_ACTIVE, MESSAGE_PICKED_UP_BY_CONNECTOR),
    )
    .await
}

/// Mark `records` as joined to `zone_name`.
///
/// # Errors
///
/// Returns an error if any record could not be updated.
pub async fn notify_records_joined(
    client: &Client,
    namespace: &str,
    zone_name: &str,
    records: &[String],
) -> Result<usize> {
    let message = record_joined_message(zone_name);
    fan_out::<DNSRecord>(
        client,
        namespace,
        records,
        (STATUS_TRUE, REASON_RECORD_READY, &message),
    )
    .await
}

/// Tell `records` that `zone_name` is gone. The records themselves are kept.
///
/// # Errors
///
/// Returns an error if any record could not be updated.
pub async fn notify_records_zone_removed(
    client: &Client,
    namespace: &str,
    zone_name: &str,
    records: &[String],
) -> Result<usize> {
    let message = zone_removed_message(zone_name);
    fan_out::<DNSRecord>(
        client,
        namespace,
        records,
        (STATUS_FALSE, REASON_RECORD_PENDING, &message),
    )
    .await
}

#[cfg(test)]
#[path = "propagation_tests.rs"]
mod propagation_tests;
