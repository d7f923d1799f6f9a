// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes objects generated by corezone.
//!
//! Two kinds of `ConfigMap` are produced:
//!
//! - the **zone artifact** of a `DNSZone`, named `{cmPrefix}{zone}`, holding the
//!   rendered zone file under `{domain}.zone`. It is owned by the zone and carries
//!   the zone finalizer until the zone's teardown releases it.
//! - the **Corefile backup** of a `DNSConnector`, named
//!   `{corednsCM.name}-original-configmap`, a one-time copy of the CoreDNS
//!   `ConfigMap` taken before the first merge and restored on connector deletion.

use crate::constants::{API_GROUP_VERSION, KIND_DNS_ZONE, ORIGINAL_CONFIGMAP_BACKUP_SUFFIX};
use crate::crd::DNSZone;
use crate::labels::{
    ANNOTATION_DNS_ZONE_REF, ANNOTATION_DOMAIN_NAME, ANNOTATION_SERIAL_NUMBER,
    COMPONENT_COREFILE_BACKUP, COMPONENT_ZONE_FILE, FINALIZER_DNS_CONNECTOR, FINALIZER_DNS_ZONE,
    K8S_COMPONENT, K8S_MANAGED_BY, K8S_PART_OF, MANAGED_BY_COREZONE, PART_OF_COREZONE,
};
use crate::zonefile::zone::{equal_ignoring_serial, zone_configmap_name, zone_data_key};
use crate::zonefile::ZoneFile;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::ResourceExt;
use std::collections::BTreeMap;

/// Standard labels of a generated object.
#[must_use]
pub fn build_labels(component: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(K8S_MANAGED_BY.into(), MANAGED_BY_COREZONE.into());
    labels.insert(K8S_COMPONENT.into(), component.into());
    labels.insert(K8S_PART_OF.into(), PART_OF_COREZONE.into());
    labels
}

/// Owner reference making the zone `ConfigMap` a child of its `DNSZone`.
#[must_use]
pub fn build_owner_references(zone: &DNSZone) -> Vec<OwnerReference> {
    vec![OwnerReference {
        api_version: API_GROUP_VERSION.to_string(),
        kind: KIND_DNS_ZONE.to_string(),
        name: zone.name_any(),
        uid: zone.metadata.uid.clone().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }]
}

/// Annotations identifying a zone artifact.
#[must_use]
pub fn build_zone_annotations(zone: &DNSZone, serial: &str) -> BTreeMap<String, String> {
    let mut annotations = BTreeMap::new();
    annotations.insert(ANNOTATION_SERIAL_NUMBER.into(), serial.into());
    annotations.insert(
        ANNOTATION_DOMAIN_NAME.into(),
        zone.spec.domain.trim_end_matches('.').into(),
    );
    annotations.insert(ANNOTATION_DNS_ZONE_REF.into(), zone.name_any());
    annotations
}

/// The zone artifact for `zone` holding `file`.
#[must_use]
pub fn build_zone_configmap(zone: &DNSZone, file: &ZoneFile) -> ConfigMap {
    let mut data = BTreeMap::new();
    data.insert(zone_data_key(&zone.spec.domain), file.text.clone());

    ConfigMap {
        metadata: ObjectMeta {
            name: Some(zone_configmap_name(&zone.spec, &zone.name_any())),
            namespace: zone.namespace(),
            labels: Some(build_labels(COMPONENT_ZONE_FILE)),
            annotations: Some(build_zone_annotations(zone, &file.serial)),
            owner_references: Some(build_owner_references(zone)),
            finalizers: Some(vec![FINALIZER_DNS_ZONE.to_string()]),
            ..Default::default()
        },
        data: Some(data),
        ..Default::default()
    }
}

/// Whether `existing` already serves `desired`, ignoring the SOA serial.
#[must_use]
pub fn zone_artifact_unchanged(existing: &ConfigMap, desired: &ConfigMap) -> bool {
    let identity_matches = [ANNOTATION_DOMAIN_NAME, ANNOTATION_DNS_ZONE_REF]
        .iter()
        .all(|key| existing.annotations().get(*key) == desired.annotations().get(*key));
    if !identity_matches {
        return false;
    }

    let (Some(current), Some(wanted)) = (existing.data.as_ref(), desired.data.as_ref()) else {
        return false;
    };
    current.len() == wanted.len()
        && wanted.iter().all(|(key, text)| {
            current
                .get(key)
                .is_some_and(|previous| equal_ignoring_serial(previous, text))
        })
}

/// `existing` rewritten to carry the data and identity of `desired`.
///
/// Foreign labels and annotations are kept. The result still holds the
/// `resourceVersion` that was read, so replacing it is a compare-and-swap.
#[must_use]
pub fn update_zone_configmap(mut existing: ConfigMap, desired: &ConfigMap) -> ConfigMap {
    existing
        .labels_mut()
        .extend(desired.labels().iter().map(|(k, v)| (k.clone(), v.clone())));
    existing.annotations_mut().extend(
        desired
            .annotations()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone())),
    );
    if !existing.finalizers().iter().any(|f| f == FINALIZER_DNS_ZONE) {
        existing.finalizers_mut().push(FINALIZER_DNS_ZONE.to_string());
    }
    existing.metadata.owner_references = desired.metadata.owner_references.clone();
    existing.data.clone_from(&desired.data);
    existing
}

/// Serial recorded on a zone artifact.
#[must_use]
pub fn artifact_serial(cm: &ConfigMap) -> Option<&str> {
    cm.annotations()
        .get(ANNOTATION_SERIAL_NUMBER)
        .map(String::as_str)
}

/// Name of the Corefile backup of the CoreDNS `ConfigMap` `coredns_cm`.
#[must_use]
pub fn backup_configmap_name(coredns_cm: &str) -> String {
    format!("{coredns_cm}{ORIGINAL_CONFIGMAP_BACKUP_SUFFIX}")
}

/// One-time copy of the untouched CoreDNS `ConfigMap`.
#[must_use]
pub fn build_backup_configmap(original: &ConfigMap) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(backup_configmap_name(&original.name_any())),
            namespace: original.namespace(),
            labels: Some(build_labels(COMPONENT_COREFILE_BACKUP)),
            finalizers: Some(vec![FINALIZER_DNS_CONNECTOR.to_string()]),
            ..Default::default()
        },
        data: original.data.clone(),
        binary_data: original.binary_data.clone(),
        ..Default::default()
    }
}

/// `current` with its data put back from `backup`.
#[must_use]
pub fn restore_from_backup(mut current: ConfigMap, backup: &ConfigMap) -> ConfigMap {
    current.data.clone_from(&backup.data);
    current.binary_data.clone_from(&backup.binary_data);
    current
}

#[cfg(test)]
#[path = "artifacts_tests.rs"]
mod artifacts_tests;
