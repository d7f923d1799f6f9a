// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `DNSRecord` reconciliation logic.
//!
//! A record is rendered against the origin of the zone it references and the
//! result is stored in its status. The status is the only thing the zone reads:
//! `validationPassed` decides whether the record is eligible and
//! `generatedRecord` is the text that goes into the zone file.
//!
//! A record stays `Pending` after it was built, until its zone reports it joined.

use crate::context::Context;
use crate::crd::{DNSRecord, DNSRecordStatus, DNSZone};
use crate::errors::{ReconcileFailure, ValidationError};
use crate::labels::FINALIZER_DNS_RECORD;
use crate::reconcilers::finalizers::{ensure_finalizer, has_finalizer, remove_finalizer};
use crate::reconcilers::lifecycle::{run_teardown, Teardown, TeardownPhase, RECORD_STEPS};
use crate::reconcilers::status::{patch_status, ready_condition, set_ready, write_ready};
use crate::reconcilers::{refetch, should_reconcile, Outcome};
use crate::status_reasons::{
    MESSAGE_RECORD_CONSTRUCTED, REASON_RECORD_DEGRADED, REASON_RECORD_PENDING, STATUS_FALSE,
    STATUS_TRUE,
};
use crate::zonefile::{build_record, zone_origin, RenderedRecord};
use anyhow::{Context as _, Result};
use async_trait::async_trait;
use kube::{Api, Client, ResourceExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Reconciles a `DNSRecord`.
///
/// # Errors
///
/// Returns an error if an API call fails, or after recording a validation
/// failure in the record status.
pub async fn reconcile_dnsrecord(ctx: Arc<Context>, record: DNSRecord) -> Result<Outcome> {
    let client = &ctx.client;
    let namespace = record.namespace().unwrap_or_default();
    let name = record.name_any();

    debug!(
        namespace = %namespace,
        name = %name,
        generation = ?record.metadata.generation,
        "Starting DNSRecord reconciliation"
    );

    match TeardownPhase::of(&record, FINALIZER_DNS_RECORD) {
        TeardownPhase::Active => {}
        TeardownPhase::Removed => return Ok(Outcome::Removed),
        _ => {
            let teardown = RecordTeardown {
                client: client.clone(),
                record,
            };
            run_teardown(&teardown).await?;
            return Ok(Outcome::Removed);
        }
    }

    ensure_finalizer(client, &record, FINALIZER_DNS_RECORD).await?;
    let Some(record) = refetch(client, &record).await? else {
        return Ok(Outcome::Removed);
    };

    let zone_name = &record.spec.dns_zone_ref.name;
    let zones: Api<DNSZone> = Api::namespaced(client.clone(), &namespace);
    let Some(zone) = zones
        .get_opt(zone_name)
        .await
        .with_context(|| format!("failed to read DNSZone {namespace}/{zone_name}"))?
    else {
        info!(namespace = %namespace, name = %name, zone = %zone_name, "DNSZone not found, record is pending");
        write_ready(
            client,
            &record,
            STATUS_FALSE,
            REASON_RECORD_PENDING,
            &zone_not_found_message(zone_name),
        )
        .await?;
        return Ok(Outcome::Pending);
    };

    let origin = zone_origin(&zone.spec.domain);
    if !needs_rebuild(&record, &origin) {
        debug!(namespace = %namespace, name = %name, "Record unchanged, skipping rebuild");
        let ready = record
            .status
            .as_ref()
            .and_then(|s| ready_condition(&s.conditions))
            .is_some_and(|c| c.status == STATUS_TRUE);
        return Ok(Outcome::from_ready(ready));
    }

    let result = build_record(&record.spec.record, &zone.spec.domain);
    let next = built_status(
        record.status.as_ref(),
        &result,
        zone_name,
        &origin,
        record.metadata.generation,
    );
    if record.status.as_ref() != Some(&next) {
        patch_status(client, &record, &next).await?;
    }

    match result {
        Ok(rendered) => {
            info!(
                namespace = %namespace,
                name = %name,
                zone = %zone_name,
                ptr = rendered.auto_ptr,
                "Record constructed"
            );
            Ok(Outcome::Pending)
        }
        Err(e) => {
            warn!(namespace = %namespace, name = %name, "Record failed validation: {e}");
            Err(ReconcileFailure::Validation(format!("DNSRecord {namespace}/{name}: {e}")).into())
        }
    }
}

/// Message of a record whose zone does not exist.
#[must_use]
pub fn zone_not_found_message(zone_name: &str) -> String {
    format!("DNSZone not found: {zone_name}")
}

/// A record is rebuilt when its spec changed or its zone origin moved.
#[must_use]
pub fn needs_rebuild(record: &DNSRecord, origin: &str) -> bool {
    let status = record.status.as_ref();
    should_reconcile(
        record.metadata.generation,
        status.and_then(|s| s.observed_generation),
    ) || status.and_then(|s| s.origin.as_deref()) != Some(origin)
}

/// Status after a build. A failed build keeps no generated text.
#[must_use]
pub fn built_status(
    current: Option<&DNSRecordStatus>,
    result: &Result<RenderedRecord, ValidationError>,
    zone_name: &str,
    origin: &str,
    generation: Option<i64>,
) -> DNSRecordStatus {
    let mut next = DNSRecordStatus {
        conditions: current.map(|s| s.conditions.clone()).unwrap_or_default(),
        observed_generation: generation,
        origin: Some(origin.to_string()),
        zone_ref: Some(zone_name.to_string()),
        ..Default::default()
    };

    match result {
        Ok(rendered) => {
            next.validation_passed = true;
            next.generated_record = Some(rendered.text.clone());
            next.auto_ipv4_ptr = rendered.auto_ptr;
            set_ready(
                &mut next.conditions,
                STATUS_FALSE,
                REASON_RECORD_PENDING,
                MESSAGE_RECORD_CONSTRUCTED,
                generation,
            );
        }
        Err(e) => {
            set_ready(
                &mut next.conditions,
                STATUS_FALSE,
                REASON_RECORD_DEGRADED,
                &e.to_string(),
                generation,
            );
        }
    }
    next
}

/// Record cleanup: only its own finalizer.
struct RecordTeardown {
    client: Client,
    record: DNSRecord,
}

#[async_trait]
impl Teardown for RecordTeardown {
    fn describe(&self) -> String {
        format!(
            "DNSRecord {}/{}",
            self.record.namespace().unwrap_or_default(),
            self.record.name_any()
        )
    }

    fn steps(&self) -> &'static [TeardownPhase] {
        RECORD_STEPS
    }

    async fn is_done(&self, step: TeardownPhase) -> Result<bool> {
        Ok(match step {
            TeardownPhase::RemoveFinalizer => !has_finalizer(&self.record, FINALIZER_DNS_RECORD),
            _ => true,
        })
    }

    async fn run(&self, step: TeardownPhase) -> Result<()> {
        if step == TeardownPhase::RemoveFinalizer {
            remove_finalizer(&self.client, &self.record, FINALIZER_DNS_RECORD).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "dnsrecord_tests.rs"]
mod dnsrecord_tests;
