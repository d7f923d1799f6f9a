// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for all controllers.
//!
//! Every controller receives an `Arc<Context>` holding the Kubernetes client and
//! the operator configuration. Reconcilers read the objects they write through
//! the API rather than from a cache, so the context carries no stores.

use crate::config::OperatorConfig;
use kube::Client;

/// Shared context passed to all controllers.
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client for API operations
    pub client: Client,

    /// Timings and tunables
    pub config: OperatorConfig,
}

impl Context {
    #[must_use]
    pub fn new(client: Client, config: OperatorConfig) -> Self {
        Self { client, config }
    }
}
