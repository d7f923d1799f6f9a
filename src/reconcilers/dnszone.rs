// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `DNSZone` reconciliation logic.
//!
//! The zone file is assembled from the zone spec and the generated text of every
//! eligible record, validated as a whole, and stored in the zone `ConfigMap`.
//! A rebuild that only moves the SOA serial leaves the `ConfigMap` and the zone
//! status untouched, so record status churn never restarts CoreDNS.
//!
//! A zone that fails validation keeps its previous `ConfigMap`; if it was
//! serving before (`checkpoint`), the connector keeps serving that version.

use crate::artifacts::{
    artifact_serial, build_zone_configmap, update_zone_configmap, zone_artifact_unchanged,
};
use crate::context::Context;
use crate::crd::{DNSConnector, DNSRecord, DNSZone, DNSZoneStatus};
use crate::errors::{ReconcileFailure, ValidationError};
use crate::labels::FINALIZER_DNS_ZONE;
use crate::metrics::record_artifact_write;
use crate::reconcilers::finalizers::{ensure_finalizer, has_finalizer, remove_finalizer};
use crate::reconcilers::lifecycle::{run_teardown, Teardown, TeardownPhase, ZONE_STEPS};
use crate::reconcilers::propagation::{
    list_zone_records, notify_records_joined, notify_records_zone_removed,
};
use crate::reconcilers::status::{patch_status, ready_condition, ready_reason, set_ready};
use crate::reconcilers::{refetch, status_changed, Outcome};
use crate::status_reasons::{
    zone_configmap_created_message, zone_removed_message, REASON_ZONE_ACTIVE,
    REASON_ZONE_NO_CONNECTOR, REASON_ZONE_PENDING, REASON_ZONE_UPDATE_ERROR, STATUS_FALSE,
    STATUS_TRUE,
};
use crate::zonefile::zone::{validate_zone_file, zone_configmap_name};
use crate::zonefile::{build_zone_file, serial_at, zone_origin, ZoneFile};
use anyhow::{Context as _, Result};
use async_trait::async_trait;
use chrono::Utc;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::PostParams;
use kube::{Api, Client, ResourceExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

const ARTIFACT_ZONE_CONFIGMAP: &str = "zone_configmap";

/// Reconciles a `DNSZone`.
///
/// # Errors
///
/// Returns an error if an API call fails, or after recording a zone
/// validation failure in the zone status.
pub async fn reconcile_dnszone(ctx: Arc<Context>, zone: DNSZone) -> Result<Outcome> {
    let client = &ctx.client;
    let namespace = zone.namespace().unwrap_or_default();
    let name = zone.name_any();

    info!("Reconciling DNSZone: {}/{}", namespace, name);
    debug!(
        namespace = %namespace,
        name = %name,
        generation = ?zone.metadata.generation,
        domain = %zone.spec.domain,
        connector = %zone.spec.connector_name,
        "Starting DNSZone reconciliation"
    );

    match TeardownPhase::of(&zone, FINALIZER_DNS_ZONE) {
        TeardownPhase::Active => {}
        TeardownPhase::Removed => return Ok(Outcome::Removed),
        _ => {
            let teardown = ZoneTeardown {
                client: client.clone(),
                zone,
            };
            run_teardown(&teardown).await?;
            return Ok(Outcome::Removed);
        }
    }

    ensure_finalizer(client, &zone, FINALIZER_DNS_ZONE).await?;
    let Some(zone) = refetch(client, &zone).await? else {
        return Ok(Outcome::Removed);
    };

    let records = list_zone_records(client, &namespace, &name).await?;
    let origin = zone_origin(&zone.spec.domain);
    let eligible = eligible_records(&records, &origin);
    let file = build_zone_file(
        &zone.spec,
        eligible
            .iter()
            .filter_map(|r| r.status.as_ref()?.generated_record.as_deref()),
        &serial_at(Utc::now()),
    );
    debug!(
        namespace = %namespace,
        name = %name,
        records = eligible.len(),
        lines = file.record_count,
        serial = %file.serial,
        "Zone file built"
    );

    let connectors: Api<DNSConnector> = Api::namespaced(client.clone(), &namespace);
    let connector_exists = connectors
        .get_opt(&zone.spec.connector_name)
        .await
        .with_context(|| {
            format!(
                "failed to read DNSConnector {namespace}/{}",
                zone.spec.connector_name
            )
        })?
        .is_some();

    if let Err(e) = validate_zone_file(&file.text) {
        let next = failed_status(&zone, &e);
        if status_changed(&zone.status, &Some(next.clone())) {
            patch_status(client, &zone, &next).await?;
        }
        warn!(namespace = %namespace, name = %name, "Zone validation failure: {e}");
        return Err(ReconcileFailure::Validation(format!("DNSZone {namespace}/{name}: {e}")).into());
    }

    let (serial, artifact_changed) = write_zone_artifact(client, &zone, &file).await?;
    let next = built_status(&zone, &file, &serial, artifact_changed, connector_exists);
    if status_changed(&zone.status, &Some(next.clone())) {
        patch_status(client, &zone, &next).await?;
        info!(
            namespace = %namespace,
            name = %name,
            serial = %serial,
            records = file.record_count,
            "Zone status updated"
        );
    }

    let names: Vec<String> = eligible.iter().map(|r| r.name_any()).collect();
    notify_records_joined(client, &namespace, &name, &names).await?;

    let active = ready_reason(&next.conditions) == Some(REASON_ZONE_ACTIVE);
    Ok(Outcome::from_ready(active))
}

/// Records that go into the zone file, sorted by object name.
///
/// A record is eligible when it passed validation, is not being deleted and
/// was rendered against the current origin.
#[must_use]
pub fn eligible_records<'a>(records: &'a [DNSRecord], origin: &str) -> Vec<&'a DNSRecord> {
    let mut eligible: Vec<&DNSRecord> = records
        .iter()
        .filter(|r| r.metadata.deletion_timestamp.is_none())
        .filter(|r| {
            r.status.as_ref().is_some_and(|s| {
                s.validation_passed
                    && s.generated_record.is_some()
                    && s.origin.as_deref() == Some(origin)
            })
        })
        .collect();
    eligible.sort_by_key(|r| r.name_any());
    eligible
}

/// Condition message for a zone file that failed validation.
#[must_use]
pub fn validation_failure_message(checkpoint: bool, error: &ValidationError) -> String {
    if checkpoint {
        format!("Zone validation failure. Preserving the previous version. Error: {error}")
    } else {
        format!("Zone validation failure. Error: {error}")
    }
}

/// Status after a failed build. Everything describing the last good artifact is kept.
#[must_use]
pub fn failed_status(zone: &DNSZone, error: &ValidationError) -> DNSZoneStatus {
    let mut next = zone.status.clone().unwrap_or_default();
    next.validation_passed = false;
    set_ready(
        &mut next.conditions,
        STATUS_FALSE,
        REASON_ZONE_UPDATE_ERROR,
        &validation_failure_message(next.checkpoint, error),
        zone.metadata.generation,
    );
    next
}

/// Status after a successful build.
///
/// When the artifact did not change and the zone was already picked up by a
/// running connector, its `Active` condition is kept.
#[must_use]
pub fn built_status(
    zone: &DNSZone,
    file: &ZoneFile,
    serial: &str,
    artifact_changed: bool,
    connector_exists: bool,
) -> DNSZoneStatus {
    let current = zone.status.clone().unwrap_or_default();
    let cm_name = zone_configmap_name(&zone.spec, &zone.name_any());
    let mut next = DNSZoneStatus {
        conditions: current.conditions.clone(),
        observed_generation: zone.metadata.generation,
        current_zone_serial: Some(serial.to_string()),
        record_count: file.record_count,
        validation_passed: true,
        zone_configmap: Some(cm_name.clone()),
        checkpoint: true,
    };

    let picked_up = ready_condition(&current.conditions).is_some_and(|c| {
        c.status == STATUS_TRUE && c.reason.as_deref() == Some(REASON_ZONE_ACTIVE)
    });
    if artifact_changed || !connector_exists || !picked_up {
        let reason = if connector_exists {
            REASON_ZONE_PENDING
        } else {
            REASON_ZONE_NO_CONNECTOR
        };
        set_ready(
            &mut next.conditions,
            STATUS_TRUE,
            reason,
            &zone_configmap_created_message(&cm_name),
            zone.metadata.generation,
        );
    }
    next
}

/// Create or update the zone `ConfigMap`.
///
/// Returns the serial the artifact now carries and whether it was written.
async fn write_zone_artifact(
    client: &Client,
    zone: &DNSZone,
    file: &ZoneFile,
) -> Result<(String, bool)> {
    let namespace = zone.namespace().unwrap_or_default();
    let desired = build_zone_configmap(zone, file);
    let cm_name = desired.name_any();
    let api: Api<ConfigMap> = Api::namespaced(client.clone(), &namespace);

    let existing = api
        .get_opt(&cm_name)
        .await
        .with_context(|| format!("failed to read zone ConfigMap {namespace}/{cm_name}"))?;

    match existing {
        None => {
            api.create(&PostParams::default(), &desired)
                .await
                .with_context(|| format!("failed to create zone ConfigMap {namespace}/{cm_name}"))?;
            record_artifact_write(ARTIFACT_ZONE_CONFIGMAP, "created");
            info!(namespace = %namespace, configmap = %cm_name, serial = %file.serial, "Created zone ConfigMap");
            Ok((file.serial.clone(), true))
        }
        Some(existing) if zone_artifact_unchanged(&existing, &desired) => {
            debug!(namespace = %namespace, configmap = %cm_name, "Zone ConfigMap unchanged apart from its serial");
            let serial = artifact_serial(&existing)
                .map_or_else(|| file.serial.clone(), str::to_string);
            ensure_finalizer(client, &existing, FINALIZER_DNS_ZONE).await?;
            Ok((serial, false))
        }
        Some(existing) => {
            let updated = update_zone_configmap(existing, &desired);
            api.replace(&cm_name, &PostParams::default(), &updated)
                .await
                .with_context(|| format!("failed to update zone ConfigMap {namespace}/{cm_name}"))?;
            record_artifact_write(ARTIFACT_ZONE_CONFIGMAP, "updated");
            info!(namespace = %namespace, configmap = %cm_name, serial = %file.serial, "Updated zone ConfigMap");
            Ok((file.serial.clone(), true))
        }
    }
}

/// Zone cleanup: tell the records, release the artifact, drop the finalizer.
struct ZoneTeardown {
    client: Client,
    zone: DNSZone,
}

impl ZoneTeardown {
    fn namespace(&self) -> String {
        self.zone.namespace().unwrap_or_default()
    }

    async fn records_to_notify(&self) -> Result<Vec<DNSRecord>> {
        let records =
            list_zone_records(&self.client, &self.namespace(), &self.zone.name_any()).await?;
        Ok(records
            .into_iter()
            .filter(|r| r.metadata.deletion_timestamp.is_none())
            .filter(|r| r.status.as_ref().is_some_and(|s| s.validation_passed))
            .collect())
    }

    async fn artifact(&self) -> Result<Option<ConfigMap>> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), &self.namespace());
        let cm_name = zone_configmap_name(&self.zone.spec, &self.zone.name_any());
        api.get_opt(&cm_name)
            .await
            .with_context(|| format!("failed to read zone ConfigMap {cm_name}"))
    }
}

#[async_trait]
impl Teardown for ZoneTeardown {
    fn describe(&self) -> String {
        format!("DNSZone {}/{}", self.namespace(), self.zone.name_any())
    }

    fn steps(&self) -> &'static [TeardownPhase] {
        ZONE_STEPS
    }

    async fn is_done(&self, step: TeardownPhase) -> Result<bool> {
        match step {
            TeardownPhase::NotifyRecords => {
                let message = zone_removed_message(&self.zone.name_any());
                Ok(self.records_to_notify().await?.iter().all(|r| {
                    r.status
                        .as_ref()
                        .and_then(|s| ready_condition(&s.conditions))
                        .is_some_and(|c| c.message.as_deref() == Some(message.as_str()))
                }))
            }
            TeardownPhase::ReleaseArtifact => Ok(self
                .artifact()
                .await?
                .is_none_or(|cm| !has_finalizer(&cm, FINALIZER_DNS_ZONE))),
            TeardownPhase::RemoveFinalizer => Ok(!has_finalizer(&self.zone, FINALIZER_DNS_ZONE)),
            _ => Ok(true),
        }
    }

    async fn run(&self, step: TeardownPhase) -> Result<()> {
        match step {
            TeardownPhase::NotifyRecords => {
                let names: Vec<String> = self
                    .records_to_notify()
                    .await?
                    .iter()
                    .map(ResourceExt::name_any)
                    .collect();
                let notified = notify_records_zone_removed(
                    &self.client,
                    &self.namespace(),
                    &self.zone.name_any(),
                    &names,
                )
                .await?;
                info!(zone = %self.describe(), records = notified, "Records told the zone is gone");
            }
            TeardownPhase::ReleaseArtifact => {
                if let Some(cm) = self.artifact().await? {
                    remove_finalizer(&self.client, &cm, FINALIZER_DNS_ZONE).await?;
                }
            }
            TeardownPhase::RemoveFinalizer => {
                remove_finalizer(&self.client, &self.zone, FINALIZER_DNS_ZONE).await?;
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "dnszone_tests.rs"]
mod dnszone_tests;
