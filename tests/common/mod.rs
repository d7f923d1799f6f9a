// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

// Common test utilities for integration tests

#![allow(dead_code)]

use corezone::crd::{
    DNSRecord, DNSRecordSpec, DNSZone, DNSZoneSpec, NameserverRecordType, PrimaryNameserver,
    RecordSpec, RecordType, ZoneReference,
};
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, PostParams};
use kube::client::Client;
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Get a Kubernetes client or skip the test if not in a cluster
pub async fn get_kube_client_or_skip() -> Option<Client> {
    match Client::try_default().await {
        Ok(client) => {
            println!("✓ Successfully connected to Kubernetes cluster");
            Some(client)
        }
        Err(e) => {
            eprintln!("⊘ Skipping integration test: not running in Kubernetes cluster: {e}");
            None
        }
    }
}

/// Create a test namespace
pub async fn create_test_namespace(
    client: &Client,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let namespaces: Api<Namespace> = Api::all(client.clone());

    let mut labels = BTreeMap::new();
    labels.insert("test".to_string(), "integration".to_string());
    labels.insert("managed-by".to_string(), "corezone-test".to_string());

    let test_ns = Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(labels),
            ..Default::default()
        },
        ..Default::default()
    };

    match namespaces.create(&PostParams::default(), &test_ns).await {
        Ok(_) => {
            println!("✓ Created test namespace: {name}");
            Ok(())
        }
        Err(kube::Error::Api(ae)) if ae.code == 409 => {
            println!("  Test namespace already exists: {name}");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

/// Delete a test namespace
pub async fn delete_test_namespace(client: &Client, name: &str) {
    let namespaces: Api<Namespace> = Api::all(client.clone());
    match namespaces.delete(name, &DeleteParams::default()).await {
        Ok(_) => println!("✓ Deleted test namespace: {name}"),
        Err(kube::Error::Api(ae)) if ae.code == 404 => {
            println!("  Test namespace already deleted: {name}");
        }
        Err(e) => eprintln!("⚠ Failed to delete test namespace {name}: {e}"),
    }
}

/// A `DNSZone` for `domain` served by `connector`
pub fn zone(namespace: &str, name: &str, domain: &str, connector: &str) -> DNSZone {
    let mut zone = DNSZone::new(
        name,
        DNSZoneSpec {
            cm_prefix: "coredns-zone-".to_string(),
            domain: domain.to_string(),
            primary_ns: PrimaryNameserver {
                hostname: "ns1".to_string(),
                ip_address: "10.0.0.53".to_string(),
                record_type: NameserverRecordType::A,
            },
            resp_person_email: format!("admin.{domain}"),
            ttl: 3600,
            refresh_rate: 7200,
            retry_interval: 3600,
            expire_time: 1_209_600,
            minimum_ttl: 300,
            connector_name: connector.to_string(),
        },
    );
    zone.metadata.namespace = Some(namespace.to_string());
    zone
}

/// A `DNSRecord` in zone `zone`
pub fn record(
    namespace: &str,
    name: &str,
    zone: &str,
    record_type: RecordType,
    value: &str,
) -> DNSRecord {
    let mut record = DNSRecord::new(
        name,
        DNSRecordSpec {
            record: RecordSpec {
                name: name.to_string(),
                value: value.to_string(),
                r#type: record_type,
                ttl: None,
                set_ptr: None,
            },
            dns_zone_ref: ZoneReference {
                name: zone.to_string(),
            },
        },
    );
    record.metadata.namespace = Some(namespace.to_string());
    record
}

/// Poll `check` every second until it yields a value or `timeout` passes
pub async fn wait_for<T, F, Fut>(timeout: Duration, mut check: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Some(value) = check().await {
            return Some(value);
        }
        sleep(Duration::from_secs(1)).await;
    }
    None
}
