// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for corezone.
//!
//! This module provides the structured errors raised by the reconciliation engine:
//! - [`ValidationError`] - a zone-file grammar violation, with its line number
//! - [`MergeError`] - a Corefile merge that had to be aborted
//! - [`GateError`] - a CoreDNS rollout that did not become ready
//! - [`ReconcileFailure`] - the failure taxonomy every reconciler reports through
//!
//! Reconcilers return `anyhow::Result`; these types travel inside the `anyhow`
//! chain and are recovered with [`classify`] for metrics and requeue decisions.

use crate::constants::{HTTP_CONFLICT, HTTP_NOT_FOUND};
use std::time::Duration;
use thiserror::Error;

/// A zone-file grammar violation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct ValidationError {
    /// 1-based line number inside the validated text
    pub line: usize,
    /// Human readable diagnostic
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Errors that abort a Corefile merge before anything is written.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MergeError {
    /// A begin marker without its end marker
    #[error("managed block for '{domain}' starting at line {line} is not terminated")]
    UnterminatedBlock { domain: String, line: usize },

    /// A begin marker found while another block is still open
    #[error("managed block for '{domain}' at line {line} is nested inside the block for '{open}'")]
    NestedBlock {
        domain: String,
        open: String,
        line: usize,
    },

    /// An end marker that does not close the open block
    #[error("unexpected end marker for '{domain}' at line {line}")]
    UnexpectedEnd { domain: String, line: usize },

    /// Two zone artifacts serve the same domain
    #[error("domain '{domain}' is served by more than one zone ConfigMap")]
    DuplicateDomain { domain: String },

    /// A zone artifact without its domain annotation
    #[error("zone ConfigMap '{configmap}' has no domain annotation")]
    MissingDomainAnnotation { configmap: String },

    /// A zone artifact without its zone file key
    #[error("zone ConfigMap '{configmap}' has no '{key}' key")]
    MissingZoneData { configmap: String, key: String },

    /// The Corefile key is absent from the CoreDNS `ConfigMap`
    #[error("could not detect corefile: key '{key}' not found in ConfigMap '{configmap}'")]
    MissingCorefile { configmap: String, key: String },
}

/// Errors returned by the Deployment Gate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    /// CoreDNS did not become ready before the deadline
    #[error("CoreDNS did not become ready within {}s", timeout.as_secs())]
    Timeout { timeout: Duration },

    /// Reading the workload state failed
    #[error("failed to read CoreDNS readiness: {0}")]
    Probe(String),
}

/// Failure taxonomy of a reconciliation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileFailure {
    /// A referenced object does not exist
    #[error("{kind} '{name}' not found")]
    NotFound { kind: String, name: String },

    /// Generated text failed the zone-file grammar check
    #[error("validation failure: {0}")]
    Validation(String),

    /// An optimistic-concurrency conflict; the whole reconciliation is retried
    #[error("conflict while updating {0}")]
    Conflict(String),

    /// Readiness was not reached before the deadline
    #[error("timed out: {0}")]
    Timeout(String),

    /// A generated artifact or referenced object is malformed
    #[error("structural error: {0}")]
    Structural(String),
}

impl ReconcileFailure {
    /// Label used for the `error_type` metric dimension.
    #[must_use]
    pub fn metric_label(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => ERROR_TYPE_NOT_FOUND,
            Self::Validation(_) => ERROR_TYPE_VALIDATION,
            Self::Conflict(_) => ERROR_TYPE_CONFLICT,
            Self::Timeout(_) => ERROR_TYPE_TIMEOUT,
            Self::Structural(_) => ERROR_TYPE_STRUCTURAL,
        }
    }

    /// Convenience constructor for [`ReconcileFailure::NotFound`].
    #[must_use]
    pub fn not_found(kind: &str, name: &str) -> Self {
        Self::NotFound {
            kind: kind.to_string(),
            name: name.to_string(),
        }
    }
}

impl From<MergeError> for ReconcileFailure {
    fn from(err: MergeError) -> Self {
        Self::Structural(err.to_string())
    }
}

impl From<GateError> for ReconcileFailure {
    fn from(err: GateError) -> Self {
        Self::Timeout(err.to_string())
    }
}

impl From<ValidationError> for ReconcileFailure {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Reconciliation error wrapper handed to `kube::runtime::Controller`.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ReconcileError(#[from] anyhow::Error);

impl ReconcileError {
    /// The wrapped error.
    #[must_use]
    pub fn inner(&self) -> &anyhow::Error {
        &self.0
    }
}

pub const ERROR_TYPE_NOT_FOUND: &str = "not_found";
pub const ERROR_TYPE_VALIDATION: &str = "validation";
pub const ERROR_TYPE_CONFLICT: &str = "conflict";
pub const ERROR_TYPE_TIMEOUT: &str = "timeout";
pub const ERROR_TYPE_STRUCTURAL: &str = "structural";
pub const ERROR_TYPE_API: &str = "api";

/// Classify any error in an `anyhow` chain into a failure class label.
///
/// HTTP 404 answers from the API server count as not-found and HTTP 409 answers
/// as conflicts, wherever they sit in the chain.
#[must_use]
pub fn classify(err: &anyhow::Error) -> &'static str {
    for cause in err.chain() {
        if let Some(failure) = cause.downcast_ref::<ReconcileFailure>() {
            return failure.metric_label();
        }
        if let Some(kube::Error::Api(response)) = cause.downcast_ref::<kube::Error>() {
            return match response.code {
                HTTP_NOT_FOUND => ERROR_TYPE_NOT_FOUND,
                HTTP_CONFLICT => ERROR_TYPE_CONFLICT,
                _ => ERROR_TYPE_API,
            };
        }
        if cause.downcast_ref::<ValidationError>().is_some() {
            return ERROR_TYPE_VALIDATION;
        }
        if cause.downcast_ref::<MergeError>().is_some() {
            return ERROR_TYPE_STRUCTURAL;
        }
        if cause.downcast_ref::<GateError>().is_some() {
            return ERROR_TYPE_TIMEOUT;
        }
    }
    ERROR_TYPE_API
}

/// Whether the error is an optimistic-concurrency conflict.
#[must_use]
pub fn is_conflict(err: &anyhow::Error) -> bool {
    classify(err) == ERROR_TYPE_CONFLICT
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
