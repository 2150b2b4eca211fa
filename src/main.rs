// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use kube::Client;
use tracing::{info, warn};

use backup_operator::config::Config;
use backup_operator::kubernetes::wait_for_backup_crd;
use backup_operator::reconcilers::BackupReconciler;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting backup operator");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: watch_namespace={}, api_timeout={:?}, requeue_interval={:?}",
        config.watch_namespace.as_deref().unwrap_or("<all>"),
        config.api_timeout,
        config.requeue_interval
    );

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    // Wait for the Backup CRD before starting the reconciler
    info!("Waiting for Backup CRD to become available...");
    wait_for_backup_crd(&client).await?;

    let reconciler = BackupReconciler::new(client, config);

    info!("Starting Backup reconciler...");
    reconciler.run().await?;

    warn!("Backup reconciler stopped");
    Ok(())
}
