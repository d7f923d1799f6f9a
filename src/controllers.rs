// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Controller wiring.
//!
//! One `kube::runtime::Controller` per custom resource kind. Children name their
//! parents, so each controller also watches the kind below it and maps its
//! events to the parent:
//!
//! - `DNSZone` reconciles on its records and on its own zone `ConfigMaps`
//! - `DNSConnector` reconciles on the zones that name it
//! - `DNSRecord` reconciles when its zone's origin no longer matches what the
//!   record was rendered against
//!
//! Watch-triggered requests are debounced so a burst of record changes builds the
//! zone once.

use crate::config::OperatorConfig;
use crate::constants::{KIND_DNS_CONNECTOR, KIND_DNS_RECORD, KIND_DNS_ZONE};
use crate::context::Context;
use crate::crd::{DNSConnector, DNSRecord, DNSZone};
use crate::errors::{classify, ReconcileError, ERROR_TYPE_CONFLICT};
use crate::labels::{K8S_MANAGED_BY, MANAGED_BY_COREZONE};
use crate::metrics::{record_error, record_reconciliation_error, record_reconciliation_success};
use crate::reconcilers::propagation::{record_to_zones, zone_to_connector, zone_to_records};
use crate::reconcilers::{
    reconcile_dnsconnector, reconcile_dnsrecord, reconcile_dnszone, Outcome,
};
use anyhow::Result;
use futures::StreamExt;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::core::NamespaceResourceScope;
use kube::runtime::controller::{self, Action};
use kube::runtime::{watcher, Controller};
use kube::{Api, Client, Resource, ResourceExt};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// `Api` for `K` in the watched namespace, or in all namespaces.
fn watched_api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Watch config for zone `ConfigMaps`: only the ones corezone manages.
#[must_use]
pub fn zone_artifact_watch_config() -> watcher::Config {
    watcher::Config::default().labels(&format!("{K8S_MANAGED_BY}={MANAGED_BY_COREZONE}"))
}

fn controller_config(config: &OperatorConfig) -> controller::Config {
    controller::Config::default().debounce(config.watch_debounce())
}

/// Run the `DNSConnector` controller
///
/// Returns once the controller stream ends, which happens on SIGTERM or Ctrl-C.
pub async fn run_dnsconnector_controller(ctx: Arc<Context>) -> Result<()> {
    info!("Starting DNSConnector controller");

    let namespace = ctx.config.watch_namespace.as_deref();
    let connectors = watched_api::<DNSConnector>(&ctx.client, namespace);
    let zones = watched_api::<DNSZone>(&ctx.client, namespace);

    Controller::new(connectors, watcher::Config::default())
        .with_config(controller_config(&ctx.config))
        .watches(zones, watcher::Config::default(), |zone| {
            zone_to_connector(&zone)
        })
        .shutdown_on_signal()
        .run(reconcile_dnsconnector_wrapper, error_policy, ctx)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Run the `DNSZone` controller
///
/// Returns once the controller stream ends, which happens on SIGTERM or Ctrl-C.
pub async fn run_dnszone_controller(ctx: Arc<Context>) -> Result<()> {
    info!("Starting DNSZone controller");

    let namespace = ctx.config.watch_namespace.as_deref();
    let zones = watched_api::<DNSZone>(&ctx.client, namespace);
    let records = watched_api::<DNSRecord>(&ctx.client, namespace);
    let configmaps = watched_api::<ConfigMap>(&ctx.client, namespace);

    Controller::new(zones, watcher::Config::default())
        .with_config(controller_config(&ctx.config))
        .owns(configmaps, zone_artifact_watch_config())
        .watches(records, watcher::Config::default(), |record| {
            record_to_zones(&record)
        })
        .shutdown_on_signal()
        .run(reconcile_dnszone_wrapper, error_policy, ctx)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Run the `DNSRecord` controller
///
/// Returns once the controller stream ends, which happens on SIGTERM or Ctrl-C.
pub async fn run_dnsrecord_controller(ctx: Arc<Context>) -> Result<()> {
    info!("Starting DNSRecord controller");

    let namespace = ctx.config.watch_namespace.as_deref();
    let records = watched_api::<DNSRecord>(&ctx.client, namespace);
    let zones = watched_api::<DNSZone>(&ctx.client, namespace);

    let controller = Controller::new(records, watcher::Config::default())
        .with_config(controller_config(&ctx.config));
    let store = controller.store();

    controller
        .watches(zones, watcher::Config::default(), move |zone| {
            zone_to_records(&zone, &store.state())
        })
        .shutdown_on_signal()
        .run(reconcile_dnsrecord_wrapper, error_policy, ctx)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Reconcile wrapper for `DNSConnector`
async fn reconcile_dnsconnector_wrapper(
    connector: Arc<DNSConnector>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let started = Instant::now();
    let result = reconcile_dnsconnector(ctx.clone(), (*connector).clone()).await;
    conclude(KIND_DNS_CONNECTOR, &*connector, started, result, &ctx.config)
}

/// Reconcile wrapper for `DNSZone`
async fn reconcile_dnszone_wrapper(
    dnszone: Arc<DNSZone>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let started = Instant::now();
    let result = reconcile_dnszone(ctx.clone(), (*dnszone).clone()).await;
    conclude(KIND_DNS_ZONE, &*dnszone, started, result, &ctx.config)
}

/// Reconcile wrapper for `DNSRecord`
async fn reconcile_dnsrecord_wrapper(
    record: Arc<DNSRecord>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let started = Instant::now();
    let result = reconcile_dnsrecord(ctx.clone(), (*record).clone()).await;
    conclude(KIND_DNS_RECORD, &*record, started, result, &ctx.config)
}

/// Record metrics for one reconciliation and turn its outcome into an `Action`.
fn conclude<K: ResourceExt>(
    kind: &str,
    resource: &K,
    started: Instant,
    result: Result<Outcome>,
    config: &OperatorConfig,
) -> Result<Action, ReconcileError> {
    match result {
        Ok(outcome) => {
            record_reconciliation_success(kind, started.elapsed());
            debug!(
                kind = %kind,
                namespace = ?resource.namespace(),
                name = %resource.name_any(),
                outcome = ?outcome,
                "Reconciliation finished"
            );
            Ok(requeue_action(outcome, config))
        }
        Err(e) => {
            record_reconciliation_error(kind, started.elapsed());
            record_error(kind, classify(&e));
            Err(e.into())
        }
    }
}

/// Requeue interval for a successful reconciliation.
#[must_use]
pub fn requeue_action(outcome: Outcome, config: &OperatorConfig) -> Action {
    match outcome {
        Outcome::Ready => Action::requeue(config.requeue_ready()),
        Outcome::Pending => Action::requeue(config.requeue_pending()),
        Outcome::Removed => Action::await_change(),
    }
}

/// Requeue interval after a failed reconciliation.
#[must_use]
pub fn error_requeue(error: &anyhow::Error, config: &OperatorConfig) -> Duration {
    if classify(error) == ERROR_TYPE_CONFLICT {
        config.conflict_requeue()
    } else {
        config.error_requeue()
    }
}

/// Error policy shared by all controllers
fn error_policy<K: ResourceExt + Debug>(
    resource: Arc<K>,
    err: &ReconcileError,
    ctx: Arc<Context>,
) -> Action {
    let delay = error_requeue(err.inner(), &ctx.config);
    if classify(err.inner()) == ERROR_TYPE_CONFLICT {
        warn!(
            namespace = ?resource.namespace(),
            name = %resource.name_any(),
            "Conflict while reconciling, retrying: {:#}",
            err.inner()
        );
    } else {
        error!(
            namespace = ?resource.namespace(),
            name = %resource.name_any(),
            retry_secs = delay.as_secs(),
            "Reconciliation failed: {:#}",
            err.inner()
        );
    }
    Action::requeue(delay)
}

#[cfg(test)]
#[path = "controllers_tests.rs"]
mod controllers_tests;
