// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Operator configuration.
//!
//! Every setting can be given as a command-line flag or through its
//! `COREZONE_*` environment variable.

use crate::constants::{
    DEFAULT_CONFLICT_REQUEUE_SECS, DEFAULT_ERROR_REQUEUE_SECS, DEFAULT_METRICS_ADDR,
    DEFAULT_POLL_INTERVAL_SECS, DEFAULT_REQUEUE_PENDING_SECS, DEFAULT_REQUEUE_READY_SECS,
    DEFAULT_SETTLE_DELAY_SECS, DEFAULT_WATCH_DEBOUNCE_SECS, DEFAULT_WORKER_THREADS,
};
use clap::builder::RangedU64ValueParser;
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

/// corezone controller
#[derive(Parser, Clone, Debug, PartialEq, Eq)]
#[command(name = "corezone")]
#[command(about = "CoreDNS zone operator for Kubernetes", long_about = None)]
#[command(version)]
pub struct OperatorConfig {
    /// Delay before the first CoreDNS readiness poll after a change
    #[arg(long, env = "COREZONE_SETTLE_DELAY_SECS", default_value_t = DEFAULT_SETTLE_DELAY_SECS)]
    pub settle_delay_secs: u64,

    /// Interval between CoreDNS readiness polls
    #[arg(long, env = "COREZONE_POLL_INTERVAL_SECS", default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
    pub poll_interval_secs: u64,

    /// Debounce applied to watch-triggered reconciliations
    #[arg(long, env = "COREZONE_WATCH_DEBOUNCE_SECS", default_value_t = DEFAULT_WATCH_DEBOUNCE_SECS)]
    pub watch_debounce_secs: u64,

    /// Requeue interval for resources that are ready
    #[arg(long, env = "COREZONE_REQUEUE_READY_SECS", default_value_t = DEFAULT_REQUEUE_READY_SECS)]
    pub requeue_ready_secs: u64,

    /// Requeue interval for resources that are still converging
    #[arg(long, env = "COREZONE_REQUEUE_PENDING_SECS", default_value_t = DEFAULT_REQUEUE_PENDING_SECS)]
    pub requeue_pending_secs: u64,

    /// Requeue interval after a reconciliation error
    #[arg(long, env = "COREZONE_ERROR_REQUEUE_SECS", default_value_t = DEFAULT_ERROR_REQUEUE_SECS)]
    pub error_requeue_secs: u64,

    /// Requeue interval after an optimistic-concurrency conflict
    #[arg(long, env = "COREZONE_CONFLICT_REQUEUE_SECS", default_value_t = DEFAULT_CONFLICT_REQUEUE_SECS)]
    pub conflict_requeue_secs: u64,

    /// Bind address of the `/metrics` endpoint
    #[arg(long, env = "COREZONE_METRICS_ADDR", default_value = DEFAULT_METRICS_ADDR)]
    pub metrics_addr: SocketAddr,

    /// Number of tokio worker threads (at least one)
    #[arg(
        long,
        env = "COREZONE_WORKER_THREADS",
        default_value_t = DEFAULT_WORKER_THREADS,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub worker_threads: usize,

    /// Restrict all watches to one namespace (all namespaces when unset)
    #[arg(long, env = "COREZONE_WATCH_NAMESPACE")]
    pub watch_namespace: Option<String>,
}

impl OperatorConfig {
    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    #[must_use]
    pub fn watch_debounce(&self) -> Duration {
        Duration::from_secs(self.watch_debounce_secs)
    }

    #[must_use]
    pub fn requeue_ready(&self) -> Duration {
        Duration::from_secs(self.requeue_ready_secs)
    }

    #[must_use]
    pub fn requeue_pending(&self) -> Duration {
        Duration::from_secs(self.requeue_pending_secs)
    }

    #[must_use]
    pub fn error_requeue(&self) -> Duration {
        Duration::from_secs(self.error_requeue_secs)
    }

    #[must_use]
    pub fn conflict_requeue(&self) -> Duration {
        Duration::from_secs(self.conflict_requeue_secs)
    }
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            settle_delay_secs: DEFAULT_SETTLE_DELAY_SECS,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            watch_debounce_secs: DEFAULT_WATCH_DEBOUNCE_SECS,
            requeue_ready_secs: DEFAULT_REQUEUE_READY_SECS,
            requeue_pending_secs: DEFAULT_REQUEUE_PENDING_SECS,
            error_requeue_secs: DEFAULT_ERROR_REQUEUE_SECS,
            conflict_requeue_secs: DEFAULT_CONFLICT_REQUEUE_SECS,
            metrics_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            worker_threads: DEFAULT_WORKER_THREADS,
            watch_namespace: None,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
