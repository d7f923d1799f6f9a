// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The CoreDNS workload a connector drives.
//!
//! CoreDNS may run as a Deployment, a StatefulSet or a DaemonSet. The connector
//! only needs four capabilities from it, captured by [`ServerWorkload`]:
//! read its rollout readiness, mount zone `ConfigMaps` into its pod template,
//! remove those mounts, and make it roll out.
//!
//! The three shapes share one implementation, [`PodWorkload`], parameterized by
//! the small [`PodTemplated`] trait that knows where each shape keeps its pod
//! template and rollout counters.

use crate::constants::ZONE_VOLUME_PREFIX;
use crate::corefile::ZoneArtifactRef;
use crate::crd::{CorednsWorkloadRef, WorkloadKind};
use crate::errors::ReconcileFailure;
use crate::labels::ANNOTATION_RECONCILIATION_REQUEST;
use crate::zonefile::zone::zone_data_key;
use anyhow::{Context as _, Result};
use async_trait::async_trait;
use chrono::Utc;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{
    ConfigMapVolumeSource, KeyToPath, PodTemplateSpec, Volume, VolumeMount,
};
use kube::api::{Patch, PatchParams, PostParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource};
use serde_json::json;
use std::collections::BTreeSet;
use std::fmt::Debug;
use tracing::{debug, info};

/// Rollout counters of a workload, read fresh on every poll.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Readiness {
    pub desired: i32,
    pub ready: i32,
    pub updated: i32,
    /// Whether the workload controller has seen the latest spec
    pub generation_observed: bool,
}

impl Readiness {
    /// A rollout is complete once the controller caught up with the spec and every
    /// desired replica is both updated and ready.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.generation_observed && self.updated >= self.desired && self.ready == self.desired
    }
}

/// Capabilities the connector needs from a CoreDNS workload.
#[async_trait]
pub trait ServerWorkload: Send + Sync {
    fn kind(&self) -> WorkloadKind;

    fn name(&self) -> &str;

    /// Current rollout readiness.
    async fn readiness(&self) -> Result<Readiness>;

    /// Make the pod template mount exactly `zones` under `mount_dir`.
    ///
    /// Returns whether the pod template changed.
    async fn attach_artifacts(&self, zones: &[ZoneArtifactRef], mount_dir: &str) -> Result<bool>;

    /// Remove every zone mount. A missing workload is not an error.
    ///
    /// Returns whether the pod template changed.
    async fn detach_artifacts(&self) -> Result<bool>;

    /// Whether any zone mount is still present. A missing workload has none.
    async fn has_artifacts(&self) -> Result<bool>;

    /// Cause an observable pod template change so CoreDNS restarts with the new files.
    async fn trigger_pickup(&self) -> Result<()>;
}

/// Where a workload shape keeps its pod template and rollout counters.
pub trait PodTemplated:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + serde::Serialize
    + serde::de::DeserializeOwned
    + Send
    + Sync
    + 'static
{
    const KIND: WorkloadKind;

    fn pod_template_mut(&mut self) -> Option<&mut PodTemplateSpec>;

    fn readiness(&self) -> Readiness;
}

fn generation_observed(generation: Option<i64>, observed: Option<i64>) -> bool {
    match (generation, observed) {
        (Some(generation), Some(observed)) => observed >= generation,
        (None, _) => true,
        (Some(_), None) => false,
    }
}

impl PodTemplated for Deployment {
    const KIND: WorkloadKind = WorkloadKind::Deployment;

    fn pod_template_mut(&mut self) -> Option<&mut PodTemplateSpec> {
        self.spec.as_mut().map(|spec| &mut spec.template)
    }

    fn readiness(&self) -> Readiness {
        let status = self.status.clone().unwrap_or_default();
        Readiness {
            desired: self.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1),
            ready: status.ready_replicas.unwrap_or(0),
            updated: status.updated_replicas.unwrap_or(0),
            generation_observed: generation_observed(
                self.metadata.generation,
                status.observed_generation,
            ),
        }
    }
}

impl PodTemplated for StatefulSet {
    const KIND: WorkloadKind = WorkloadKind::StatefulSet;

    fn pod_template_mut(&mut self) -> Option<&mut PodTemplateSpec> {
        self.spec.as_mut().map(|spec| &mut spec.template)
    }

    fn readiness(&self) -> Readiness {
        let status = self.status.clone().unwrap_or_default();
        Readiness {
            desired: self.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1),
            ready: status.ready_replicas.unwrap_or(0),
            updated: status.updated_replicas.unwrap_or(0),
            generation_observed: generation_observed(
                self.metadata.generation,
                status.observed_generation,
            ),
        }
    }
}

impl PodTemplated for DaemonSet {
    const KIND: WorkloadKind = WorkloadKind::DaemonSet;

    fn pod_template_mut(&mut self) -> Option<&mut PodTemplateSpec> {
        self.spec.as_mut().map(|spec| &mut spec.template)
    }

    fn readiness(&self) -> Readiness {
        let status = self.status.clone().unwrap_or_default();
        Readiness {
            desired: status.desired_number_scheduled,
            ready: status.number_ready,
            updated: status.updated_number_scheduled.unwrap_or(0),
            generation_observed: generation_observed(
                self.metadata.generation,
                status.observed_generation,
            ),
        }
    }
}

/// A CoreDNS workload of shape `K`.
pub struct PodWorkload<K> {
    api: Api<K>,
    name: String,
}

impl<K: PodTemplated> PodWorkload<K> {
    #[must_use]
    pub fn new(client: Client, namespace: &str, name: &str) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
            name: name.to_string(),
        }
    }

    /// Edit the pod template and write the workload back if `edit` changed it.
    ///
    /// Returns `None` when the workload does not exist.
    async fn rewrite_template<F>(&self, edit: F) -> Result<Option<bool>>
    where
        F: FnOnce(&mut PodTemplateSpec) -> bool + Send,
    {
        let Some(mut workload) = self
            .api
            .get_opt(&self.name)
            .await
            .with_context(|| format!("failed to read {} {}", K::KIND, self.name))?
        else {
            return Ok(None);
        };

        let Some(template) = workload.pod_template_mut() else {
            return Ok(Some(false));
        };
        if !edit(template) {
            return Ok(Some(false));
        }

        // replace() sends the resourceVersion we read, so a concurrent edit conflicts
        self.api
            .replace(&self.name, &PostParams::default(), &workload)
            .await
            .with_context(|| format!("failed to update {} {}", K::KIND, self.name))?;
        Ok(Some(true))
    }
}

#[async_trait]
impl<K: PodTemplated> ServerWorkload for PodWorkload<K> {
    fn kind(&self) -> WorkloadKind {
        K::KIND
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn readiness(&self) -> Result<Readiness> {
        let workload = self
            .api
            .get(&self.name)
            .await
            .with_context(|| format!("failed to read {} {}", K::KIND, self.name))?;
        Ok(PodTemplated::readiness(&workload))
    }

    async fn attach_artifacts(&self, zones: &[ZoneArtifactRef], mount_dir: &str) -> Result<bool> {
        let changed = self
            .rewrite_template(|template| apply_zone_volumes(template, zones, mount_dir))
            .await?
            .ok_or_else(|| ReconcileFailure::not_found(&K::KIND.to_string(), &self.name))?;
        if changed {
            info!(kind = %K::KIND, name = %self.name, zones = zones.len(), "Updated CoreDNS zone mounts");
        }
        Ok(changed)
    }

    async fn detach_artifacts(&self) -> Result<bool> {
        let Some(changed) = self
            .rewrite_template(|template| apply_zone_volumes(template, &[], ""))
            .await?
        else {
            debug!(kind = %K::KIND, name = %self.name, "CoreDNS workload not found, nothing to detach");
            return Ok(false);
        };
        if changed {
            info!(kind = %K::KIND, name = %self.name, "Removed CoreDNS zone mounts");
        }
        Ok(changed)
    }

    async fn has_artifacts(&self) -> Result<bool> {
        let mut workload = self
            .api
            .get_opt(&self.name)
            .await
            .with_context(|| format!("failed to read {} {}", K::KIND, self.name))?;
        Ok(workload
            .as_mut()
            .and_then(PodTemplated::pod_template_mut)
            .is_some_and(|template| has_zone_volumes(template)))
    }

    async fn trigger_pickup(&self) -> Result<()> {
        let patch = json!({
            "spec": { "template": { "metadata": { "annotations": {
                ANNOTATION_RECONCILIATION_REQUEST: Utc::now().timestamp().to_string()
            }}}}
        });
        self.api
            .patch(&self.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .with_context(|| format!("failed to trigger rollout of {} {}", K::KIND, self.name))?;
        info!(kind = %K::KIND, name = %self.name, "Triggered CoreDNS rollout");
        Ok(())
    }
}

/// Build the workload handle for a connector's `corednsDeployment` reference.
#[must_use]
pub fn workload_for(
    client: Client,
    namespace: &str,
    reference: &CorednsWorkloadRef,
) -> Box<dyn ServerWorkload> {
    match reference.kind {
        WorkloadKind::Deployment => {
            Box::new(PodWorkload::<Deployment>::new(client, namespace, &reference.name))
        }
        WorkloadKind::StatefulSet => {
            Box::new(PodWorkload::<StatefulSet>::new(client, namespace, &reference.name))
        }
        WorkloadKind::DaemonSet => {
            Box::new(PodWorkload::<DaemonSet>::new(client, namespace, &reference.name))
        }
    }
}

// ============================================================================
// Pod template editing
// ============================================================================

/// Volume name carrying the zone file of `domain` (`dnszone-example-com`).
#[must_use]
pub fn zone_volume_name(domain: &str) -> String {
    format!(
        "{ZONE_VOLUME_PREFIX}{}",
        domain.trim_end_matches('.').replace('.', "-")
    )
}

/// `ConfigMap` volume for one zone artifact.
#[must_use]
pub fn zone_volume(zone: &ZoneArtifactRef) -> Volume {
    let key = zone_data_key(&zone.domain);
    Volume {
        name: zone_volume_name(&zone.domain),
        config_map: Some(ConfigMapVolumeSource {
            name: zone.configmap.clone(),
            items: Some(vec![KeyToPath {
                key: key.clone(),
                path: key,
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Read-only mount of one zone file at `{mount_dir}/{domain}.zone`.
#[must_use]
pub fn zone_volume_mount(zone: &ZoneArtifactRef, mount_dir: &str) -> VolumeMount {
    VolumeMount {
        name: zone_volume_name(&zone.domain),
        mount_path: zone.mount_path(mount_dir),
        sub_path: Some(zone_data_key(&zone.domain)),
        read_only: Some(true),
        ..Default::default()
    }
}

/// Make `template` mount exactly the zone artifacts in `zones`.
///
/// Zone volumes and mounts that are no longer desired are removed, other volumes
/// and mounts are left alone, and desired ones are added once to every
/// container. Returns whether anything changed.
pub fn apply_zone_volumes(
    template: &mut PodTemplateSpec,
    zones: &[ZoneArtifactRef],
    mount_dir: &str,
) -> bool {
    let Some(pod) = template.spec.as_mut() else {
        return false;
    };

    let desired_volumes: Vec<Volume> = zones.iter().map(zone_volume).collect();
    let desired_mounts: Vec<VolumeMount> = zones
        .iter()
        .map(|zone| zone_volume_mount(zone, mount_dir))
        .collect();
    let desired_names: BTreeSet<&str> = desired_volumes.iter().map(|v| v.name.as_str()).collect();
    let is_stale = |name: &str| name.starts_with(ZONE_VOLUME_PREFIX) && !desired_names.contains(name);

    let mut changed = false;

    let volumes = pod.volumes.get_or_insert_with(Vec::new);
    let before = volumes.len();
    volumes.retain(|v| !is_stale(&v.name));
    changed |= volumes.len() != before;
    for desired in &desired_volumes {
        match volumes.iter_mut().find(|v| v.name == desired.name) {
            Some(existing) if existing == desired => {}
            Some(existing) => {
                *existing = desired.clone();
                changed = true;
            }
            None => {
                volumes.push(desired.clone());
                changed = true;
            }
        }
    }
    if volumes.is_empty() {
        pod.volumes = None;
    }

    for container in &mut pod.containers {
        let mounts = container.volume_mounts.get_or_insert_with(Vec::new);
        let before = mounts.len();
        mounts.retain(|m| !is_stale(&m.name));
        changed |= mounts.len() != before;
        for desired in &desired_mounts {
            match mounts.iter_mut().find(|m| m.name == desired.name) {
                Some(existing) if existing == desired => {}
                Some(existing) => {
                    *existing = desired.clone();
                    changed = true;
                }
                None => {
                    mounts.push(desired.clone());
                    changed = true;
                }
            }
        }
        if mounts.is_empty() {
            container.volume_mounts = None;
        }
    }

    changed
}

/// Whether the pod template still carries any `dnszone-*` volume or mount.
#[must_use]
pub fn has_zone_volumes(template: &PodTemplateSpec) -> bool {
    let Some(pod) = template.spec.as_ref() else {
        return false;
    };
    let volumes = pod
        .volumes
        .iter()
        .flatten()
        .any(|v| v.name.starts_with(ZONE_VOLUME_PREFIX));
    let mounts = pod
        .containers
        .iter()
        .flat_map(|c| c.volume_mounts.iter().flatten())
        .any(|m| m.name.starts_with(ZONE_VOLUME_PREFIX));
    volumes || mounts
}

#[cfg(test)]
#[path = "workload_tests.rs"]
mod workload_tests;
