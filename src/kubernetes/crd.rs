// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! CRD availability checking utilities

use crate::constants::crd::{
    GROUP, KIND, POLL_INTERVAL_SECS, POLL_MAX_ATTEMPTS, POLL_MAX_INTERVAL_SECS, VERSION,
};
use crate::error::{BackupError, Result};
use kube::{discovery::Discovery, Client};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Wait for the Backup CRD to become available in the cluster.
/// This uses exponential backoff starting at POLL_INTERVAL_SECS seconds and gives up
/// after POLL_MAX_ATTEMPTS discovery rounds.
pub async fn wait_for_backup_crd(client: &Client) -> Result<()> {
    let mut interval = POLL_INTERVAL_SECS;

    for attempt in 1..=POLL_MAX_ATTEMPTS {
        match check_backup_crd_exists(client).await {
            Ok(true) => {
                info!("{} CRD ({}/{}) is available", KIND, GROUP, VERSION);
                return Ok(());
            }
            Ok(false) => {
                info!(
                    "{} CRD ({}/{}) not yet available (attempt {}/{}), waiting {} seconds...",
                    KIND, GROUP, VERSION, attempt, POLL_MAX_ATTEMPTS, interval
                );
            }
            Err(e) => {
                warn!(
                    "Error checking for {} CRD: {}, retrying in {} seconds...",
                    KIND, e, interval
                );
            }
        }

        sleep(Duration::from_secs(interval)).await;

        // Exponential backoff with max cap
        interval = (interval * 2).min(POLL_MAX_INTERVAL_SECS);
    }

    Err(BackupError::CrdUnavailable(format!(
        "{}.{}/{} not served after {} attempts",
        KIND, GROUP, VERSION, POLL_MAX_ATTEMPTS
    )))
}

/// Check if the Backup CRD exists by attempting to discover it.
async fn check_backup_crd_exists(client: &Client) -> Result<bool> {
    let discovery = Discovery::new(client.clone())
        .filter(&[GROUP])
        .run()
        .await?;

    for group in discovery.groups() {
        if group.name() == GROUP {
            for (ar, _) in group.recommended_resources() {
                if ar.kind == KIND && ar.version == VERSION {
                    return Ok(true);
                }
            }
        }
    }

    Ok(false)
}
