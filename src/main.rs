// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use clap::Parser;
use corezone::{
    config::OperatorConfig,
    context::Context,
    controllers::{run_dnsconnector_controller, run_dnsrecord_controller, run_dnszone_controller},
    metrics::serve_metrics,
};
use kube::Client;
use std::sync::Arc;
use tracing::{debug, error, info};

fn main() -> Result<()> {
    let config = OperatorConfig::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads)
        .thread_name("corezone-controller")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

async fn async_main(config: OperatorConfig) -> Result<()> {
    // Format: timestamp file:line LEVEL message
    // Respects RUST_LOG (default info) and RUST_LOG_FORMAT=json
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    info!("Starting corezone controller");
    debug!(?config, "Configuration loaded");

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    let metrics_addr = config.metrics_addr;
    match config.watch_namespace.as_deref() {
        Some(ns) => info!(namespace = %ns, "Watching a single namespace"),
        None => info!("Watching all namespaces"),
    }
    let ctx = Arc::new(Context::new(client, config));

    info!("Starting all controllers");

    // Controllers only stop on a shutdown signal; anything else is fatal
    tokio::select! {
        result = run_dnsconnector_controller(ctx.clone()) => {
            result?;
            info!("DNSConnector controller stopped");
        }
        result = run_dnszone_controller(ctx.clone()) => {
            result?;
            info!("DNSZone controller stopped");
        }
        result = run_dnsrecord_controller(ctx.clone()) => {
            result?;
            info!("DNSRecord controller stopped");
        }
        result = serve_metrics(metrics_addr) => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("metrics server exited unexpectedly without error")
        }
    }

    info!("corezone controller shut down");
    Ok(())
}
