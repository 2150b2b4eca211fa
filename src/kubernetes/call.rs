// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Time-bounded cluster API calls

use crate::error::{ApiCall, BackupError, Result};
use std::future::Future;
use std::time::Duration;

/// Run a single API request, failing with `Timeout` once `timeout` elapses.
///
/// The request is issued exactly once; redelivery is left to the controller's
/// error policy.
pub async fn bounded<T, F>(call: ApiCall, timeout: Duration, request: F) -> Result<T>
where
    F: Future<Output = kube::Result<T>>,
{
    match tokio::time::timeout(timeout, request).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(BackupError::from_api(call, e)),
        Err(_) => Err(BackupError::Timeout { call, timeout }),
    }
}
