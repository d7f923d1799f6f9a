// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `DNSConnector` reconciliation logic.
//!
//! The connector owns the CoreDNS side of the system:
//!
//! 1. Back up the CoreDNS `ConfigMap` once, before anything is merged into it
//! 2. Collect the zone `ConfigMaps` of every zone that names this connector
//! 3. Merge their managed blocks into the Corefile and mount the zone files
//! 4. Roll CoreDNS out and wait for it through the Deployment Gate
//! 5. Mark the connector `Active` and its zones picked up
//!
//! Steps 4 and 5 are skipped when the Corefile, the mounts and the zone serials
//! are all unchanged and the last rollout succeeded.
//!
//! On deletion the backed-up Corefile is restored and the mounts are removed
//! before the connector finalizer goes.

use crate::artifacts::{backup_configmap_name, build_backup_configmap, restore_from_backup};
use crate::context::Context;
use crate::corefile::{corefile_text, has_managed_blocks, merge_corefile, ZoneArtifactRef};
use crate::crd::{DNSConnector, DNSConnectorStatus, ProvisionedZone};
use crate::errors::{is_conflict, GateError, ReconcileFailure};
use crate::labels::FINALIZER_DNS_CONNECTOR;
use crate::metrics::{record_artifact_write, record_gate_wait, GATE_OUTCOME_SKIPPED};
use crate::reconcilers::finalizers::{ensure_finalizer, has_finalizer, remove_finalizer};
use crate::reconcilers::gate::wait_for_workload;
use crate::reconcilers::lifecycle::{run_teardown, Teardown, TeardownPhase, CONNECTOR_STEPS};
use crate::reconcilers::propagation::{list_connector_zones, notify_zones_picked_up};
use crate::reconcilers::status::{patch_status, ready_condition, set_ready, write_ready};
use crate::reconcilers::workload::{workload_for, ServerWorkload};
use crate::reconcilers::{refetch, Outcome};
use crate::status_reasons::{
    MESSAGE_COREDNS_READY, MESSAGE_COREDNS_UPDATING, REASON_CONNECTOR_ACTIVE,
    REASON_CONNECTOR_ERROR, REASON_CONNECTOR_UPDATE_ERROR, REASON_CONNECTOR_UPDATING,
    STATUS_FALSE, STATUS_TRUE,
};
use anyhow::{Context as _, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::{DeleteParams, PostParams};
use kube::{Api, Client, ResourceExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const ARTIFACT_COREFILE: &str = "corefile";
const ARTIFACT_COREFILE_BACKUP: &str = "corefile_backup";

/// A zone served by the connector, with the artifact it is served from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServedZone {
    /// `DNSZone` name
    pub zone: String,
    pub artifact: ZoneArtifactRef,
}

/// Reconciles a `DNSConnector`.
///
/// # Errors
///
/// Returns an error if an API call fails, the Corefile cannot be merged, or
/// CoreDNS does not become ready in time. Every failure except a conflict is
/// also reported in the connector's `Ready` condition.
pub async fn reconcile_dnsconnector(ctx: Arc<Context>, connector: DNSConnector) -> Result<Outcome> {
    let client = &ctx.client;
    let namespace = connector.namespace().unwrap_or_default();
    let name = connector.name_any();

    info!("Reconciling DNSConnector: {}/{}", namespace, name);
    debug!(
        namespace = %namespace,
        name = %name,
        generation = ?connector.metadata.generation,
        workload = %connector.spec.coredns_deployment.name,
        configmap = %connector.spec.coredns_cm.name,
        "Starting DNSConnector reconciliation"
    );

    match TeardownPhase::of(&connector, FINALIZER_DNS_CONNECTOR) {
        TeardownPhase::Active => {}
        TeardownPhase::Removed => return Ok(Outcome::Removed),
        _ => {
            let teardown = ConnectorTeardown::new(client.clone(), connector);
            run_teardown(&teardown).await?;
            return Ok(Outcome::Removed);
        }
    }

    ensure_finalizer(client, &connector, FINALIZER_DNS_CONNECTOR).await?;
    let Some(connector) = refetch(client, &connector).await? else {
        return Ok(Outcome::Removed);
    };

    match converge(&ctx, &connector).await {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            report_failure(client, &connector, &e).await;
            Err(e)
        }
    }
}

async fn converge(ctx: &Context, connector: &DNSConnector) -> Result<Outcome> {
    let client = &ctx.client;
    let namespace = connector.namespace().unwrap_or_default();
    let name = connector.name_any();
    let spec = &connector.spec;
    let mount_dir = &spec.coredns_deployment.zonefiles_mount_dir;

    let configmaps: Api<ConfigMap> = Api::namespaced(client.clone(), &namespace);
    let coredns_cm = configmaps
        .get_opt(&spec.coredns_cm.name)
        .await
        .with_context(|| format!("failed to read ConfigMap {namespace}/{}", spec.coredns_cm.name))?
        .ok_or_else(|| ReconcileFailure::not_found("ConfigMap", &spec.coredns_cm.name))?;

    ensure_backup(client, &configmaps, &coredns_cm, &spec.coredns_cm.corefile_key).await?;

    let served = served_zones(client, &namespace, &name).await?;
    let artifacts: Vec<ZoneArtifactRef> = served.iter().map(|s| s.artifact.clone()).collect();

    let corefile = corefile_text(&coredns_cm, &spec.coredns_cm.corefile_key)
        .map_err(ReconcileFailure::from)?;
    let merged = merge_corefile(corefile, &artifacts, mount_dir, &spec.coredns_zone_enabled_plugins)
        .map_err(ReconcileFailure::from)?;

    let corefile_changed = merged != corefile;
    if corefile_changed {
        let mut updated = coredns_cm.clone();
        updated
            .data
            .get_or_insert_with(Default::default)
            .insert(spec.coredns_cm.corefile_key.clone(), merged);
        configmaps
            .replace(&spec.coredns_cm.name, &PostParams::default(), &updated)
            .await
            .with_context(|| format!("failed to update Corefile in {namespace}/{}", spec.coredns_cm.name))?;
        record_artifact_write(ARTIFACT_COREFILE, "updated");
        info!(namespace = %namespace, name = %name, zones = served.len(), "Corefile updated");
    }

    let workload = workload_for(client.clone(), &namespace, &spec.coredns_deployment);
    let volumes_changed = workload.attach_artifacts(&artifacts, mount_dir).await?;

    let provisioned = provisioned_zones(&served);
    let zone_names: Vec<String> = served.iter().map(|s| s.zone.clone()).collect();

    if !rollout_needed(
        corefile_changed,
        volumes_changed,
        connector.status.as_ref(),
        &provisioned,
    ) {
        debug!(namespace = %namespace, name = %name, "CoreDNS already serves every zone, skipping rollout");
        record_gate_wait(GATE_OUTCOME_SKIPPED, Duration::ZERO);
        finish(client, connector, provisioned, &zone_names).await?;
        return Ok(Outcome::Ready);
    }

    write_ready(
        client,
        connector,
        STATUS_FALSE,
        REASON_CONNECTOR_UPDATING,
        MESSAGE_COREDNS_UPDATING,
    )
    .await?;

    workload.trigger_pickup().await?;
    wait_for_workload(
        workload.as_ref(),
        gate_timeout(connector),
        ctx.config.settle_delay(),
        ctx.config.poll_interval(),
    )
    .await?;

    let Some(connector) = refetch(client, connector).await? else {
        return Ok(Outcome::Removed);
    };
    finish(client, &connector, provisioned, &zone_names).await?;
    Ok(Outcome::Ready)
}

/// Record the served zones, mark the connector `Active` and tell the zones.
async fn finish(
    client: &Client,
    connector: &DNSConnector,
    provisioned: Vec<ProvisionedZone>,
    zone_names: &[String],
) -> Result<()> {
    let next = active_status(connector, provisioned);
    if connector.status.as_ref() != Some(&next) {
        patch_status(client, connector, &next).await?;
        info!(
            namespace = %connector.namespace().unwrap_or_default(),
            name = %connector.name_any(),
            zones = next.provisioned_zones.len(),
            "CoreDNS ready"
        );
    }

    notify_zones_picked_up(
        client,
        &connector.namespace().unwrap_or_default(),
        zone_names,
    )
    .await?;
    Ok(())
}

/// Put the failure into the `Ready` condition. Conflicts are left to the retry.
async fn report_failure(client: &Client, connector: &DNSConnector, error: &anyhow::Error) {
    if is_conflict(error) {
        return;
    }
    let (reason, message) = failure_condition(error);

    let fresh = match refetch(client, connector).await {
        Ok(Some(fresh)) => fresh,
        Ok(None) => return,
        Err(e) => {
            warn!(name = %connector.name_any(), "Failed to re-read DNSConnector: {e:#}");
            return;
        }
    };
    if let Err(e) = write_ready(client, &fresh, STATUS_FALSE, reason, &message).await {
        warn!(name = %connector.name_any(), "Failed to report DNSConnector failure: {e:#}");
    }
}

/// Reason and message for a failed reconciliation.
#[must_use]
pub fn failure_condition(error: &anyhow::Error) -> (&'static str, String) {
    match error.chain().find_map(|cause| cause.downcast_ref::<GateError>()) {
        Some(gate) => (
            REASON_CONNECTOR_UPDATE_ERROR,
            format!("healthcheck failure: {gate}"),
        ),
        None => (REASON_CONNECTOR_ERROR, format!("{error:#}")),
    }
}

/// Gate deadline of a connector.
#[must_use]
pub fn gate_timeout(connector: &DNSConnector) -> Duration {
    Duration::from_secs(u64::from(connector.spec.wait_for_update_timeout))
}

/// Status entries for the served zones.
#[must_use]
pub fn provisioned_zones(served: &[ServedZone]) -> Vec<ProvisionedZone> {
    served
        .iter()
        .map(|s| ProvisionedZone {
            name: s.zone.clone(),
            domain: s.artifact.domain.clone(),
            serial_number: s.artifact.serial.clone().unwrap_or_default(),
        })
        .collect()
}

/// Whether CoreDNS has to roll out.
///
/// Nothing to do when the Corefile and mounts were already in place, the zone
/// serials are the ones CoreDNS was last rolled out with, and that rollout
/// succeeded.
#[must_use]
pub fn rollout_needed(
    corefile_changed: bool,
    volumes_changed: bool,
    current: Option<&DNSConnectorStatus>,
    provisioned: &[ProvisionedZone],
) -> bool {
    let Some(current) = current else {
        return true;
    };
    let active = ready_condition(&current.conditions).is_some_and(|c| {
        c.status == STATUS_TRUE && c.reason.as_deref() == Some(REASON_CONNECTOR_ACTIVE)
    });
    corefile_changed || volumes_changed || current.provisioned_zones != provisioned || !active
}

/// Status of a connector whose CoreDNS serves `provisioned`.
#[must_use]
pub fn active_status(
    connector: &DNSConnector,
    provisioned: Vec<ProvisionedZone>,
) -> DNSConnectorStatus {
    let mut next = connector.status.clone().unwrap_or_default();
    next.observed_generation = connector.metadata.generation;
    next.provisioned_zones = provisioned;
    set_ready(
        &mut next.conditions,
        STATUS_TRUE,
        REASON_CONNECTOR_ACTIVE,
        MESSAGE_COREDNS_READY,
        connector.metadata.generation,
    );
    next
}

/// Zones of this connector whose `ConfigMap` exists, sorted by domain.
///
/// Zones being deleted are left out, so their blocks and mounts are removed.
async fn served_zones(client: &Client, namespace: &str, connector: &str) -> Result<Vec<ServedZone>> {
    let zones = list_connector_zones(client, namespace, connector).await?;
    let configmaps: Api<ConfigMap> = Api::namespaced(client.clone(), namespace);

    let mut served = Vec::new();
    for zone in zones
        .iter()
        .filter(|z| z.metadata.deletion_timestamp.is_none())
    {
        let Some(cm_name) = zone.status.as_ref().and_then(|s| s.zone_configmap.as_deref()) else {
            debug!(zone = %zone.name_any(), "Zone has no ConfigMap yet");
            continue;
        };
        let Some(cm) = configmaps
            .get_opt(cm_name)
            .await
            .with_context(|| format!("failed to read zone ConfigMap {namespace}/{cm_name}"))?
        else {
            debug!(zone = %zone.name_any(), configmap = %cm_name, "Zone ConfigMap not found");
            continue;
        };
        served.push(ServedZone {
            zone: zone.name_any(),
            artifact: ZoneArtifactRef::from_configmap(&cm).map_err(ReconcileFailure::from)?,
        });
    }
    served.sort_by(|a, b| a.artifact.cmp(&b.artifact));
    Ok(served)
}

/// Create the Corefile backup if it does not exist yet.
async fn ensure_backup(
    client: &Client,
    configmaps: &Api<ConfigMap>,
    coredns_cm: &ConfigMap,
    corefile_key: &str,
) -> Result<()> {
    let backup_name = backup_configmap_name(&coredns_cm.name_any());
    if let Some(backup) = configmaps
        .get_opt(&backup_name)
        .await
        .with_context(|| format!("failed to read Corefile backup {backup_name}"))?
    {
        return ensure_finalizer(client, &backup, FINALIZER_DNS_CONNECTOR).await;
    }

    if corefile_text(coredns_cm, corefile_key).is_ok_and(has_managed_blocks) {
        warn!(
            configmap = %coredns_cm.name_any(),
            "Corefile already holds managed blocks; the backup will include them"
        );
    }
    configmaps
        .create(&PostParams::default(), &build_backup_configmap(coredns_cm))
        .await
        .with_context(|| format!("failed to create Corefile backup {backup_name}"))?;
    record_artifact_write(ARTIFACT_COREFILE_BACKUP, "created");
    info!(configmap = %coredns_cm.name_any(), backup = %backup_name, "Backed up CoreDNS ConfigMap");
    Ok(())
}

/// Whether the CoreDNS `ConfigMap` is back to its original content.
///
/// Without a backup this only holds when no managed block is left, which is
/// the state after an interrupted teardown that already deleted the backup.
///
/// # Errors
///
/// Returns `NotFound` for a missing backup while managed blocks remain.
pub fn restore_done(
    coredns_cm: Option<&ConfigMap>,
    backup: Option<&ConfigMap>,
    corefile_key: &str,
) -> Result<bool, ReconcileFailure> {
    let Some(coredns_cm) = coredns_cm else {
        return Ok(true);
    };
    match backup {
        Some(backup) => Ok(backup.data == coredns_cm.data),
        None => {
            let merged = corefile_text(coredns_cm, corefile_key).is_ok_and(has_managed_blocks);
            if merged {
                Err(ReconcileFailure::not_found(
                    "ConfigMap",
                    &backup_configmap_name(&coredns_cm.name_any()),
                ))
            } else {
                Ok(true)
            }
        }
    }
}

/// Connector cleanup: restore the Corefile, unmount the zones, drop the finalizer.
struct ConnectorTeardown {
    client: Client,
    connector: DNSConnector,
    configmaps: Api<ConfigMap>,
    workload: Box<dyn ServerWorkload>,
}

impl ConnectorTeardown {
    fn new(client: Client, connector: DNSConnector) -> Self {
        let namespace = connector.namespace().unwrap_or_default();
        Self {
            configmaps: Api::namespaced(client.clone(), &namespace),
            workload: workload_for(
                client.clone(),
                &namespace,
                &connector.spec.coredns_deployment,
            ),
            client,
            connector,
        }
    }

    fn backup_name(&self) -> String {
        backup_configmap_name(&self.connector.spec.coredns_cm.name)
    }

    async fn configmaps(&self) -> Result<(Option<ConfigMap>, Option<ConfigMap>)> {
        let coredns = self
            .configmaps
            .get_opt(&self.connector.spec.coredns_cm.name)
            .await
            .context("failed to read CoreDNS ConfigMap")?;
        let backup = self
            .configmaps
            .get_opt(&self.backup_name())
            .await
            .context("failed to read Corefile backup")?;
        Ok((coredns, backup))
    }
}

#[async_trait]
impl Teardown for ConnectorTeardown {
    fn describe(&self) -> String {
        format!(
            "DNSConnector {}/{}",
            self.connector.namespace().unwrap_or_default(),
            self.connector.name_any()
        )
    }

    fn steps(&self) -> &'static [TeardownPhase] {
        CONNECTOR_STEPS
    }

    async fn is_done(&self, step: TeardownPhase) -> Result<bool> {
        match step {
            TeardownPhase::RestoreConfig => {
                let (coredns, backup) = self.configmaps().await?;
                Ok(restore_done(
                    coredns.as_ref(),
                    backup.as_ref(),
                    &self.connector.spec.coredns_cm.corefile_key,
                )?)
            }
            TeardownPhase::DetachArtifacts => Ok(!self.workload.has_artifacts().await?),
            TeardownPhase::RemoveFinalizer => {
                Ok(!has_finalizer(&self.connector, FINALIZER_DNS_CONNECTOR))
            }
            _ => Ok(true),
        }
    }

    async fn run(&self, step: TeardownPhase) -> Result<()> {
        match step {
            TeardownPhase::RestoreConfig => {
                let (Some(coredns), Some(backup)) = self.configmaps().await? else {
                    return Err(
                        ReconcileFailure::not_found("ConfigMap", &self.backup_name()).into(),
                    );
                };
                let name = coredns.name_any();
                self.configmaps
                    .replace(&name, &PostParams::default(), &restore_from_backup(coredns, &backup))
                    .await
                    .with_context(|| format!("failed to restore CoreDNS ConfigMap {name}"))?;
                record_artifact_write(ARTIFACT_COREFILE, "restored");
                info!(connector = %self.describe(), configmap = %name, "Restored original Corefile");
            }
            TeardownPhase::DetachArtifacts => {
                if self.workload.detach_artifacts().await? {
                    self.workload.trigger_pickup().await?;
                }
            }
            TeardownPhase::RemoveFinalizer => {
                let (_, backup) = self.configmaps().await?;
                if let Some(backup) = backup {
                    remove_finalizer(&self.client, &backup, FINALIZER_DNS_CONNECTOR).await?;
                    self.configmaps
                        .delete(&self.backup_name(), &DeleteParams::default())
                        .await
                        .with_context(|| format!("failed to delete Corefile backup {}", self.backup_name()))?;
                    record_artifact_write(ARTIFACT_COREFILE_BACKUP, "deleted");
                }
                remove_finalizer(&self.client, &self.connector, FINALIZER_DNS_CONNECTOR).await?;
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "dnsconnector_tests.rs"]
mod dnsconnector_tests;
