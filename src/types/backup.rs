// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::cronjob::NAME_SUFFIX;
use kube::{CustomResource, ResourceExt};
use serde::{Deserialize, Serialize};

/// A scheduled bucket backup, turned into a CronJob by the operator.
///
/// All spec fields are optional here so that a missing field is reported by the
/// normalizer with its name instead of failing deserialization in the watcher.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[kube(group = "inspirehep.net", version = "v1", kind = "Backup")]
#[kube(namespaced)]
#[kube(status = "BackupStatus")]
#[kube(shortname = "bkp")]
#[kube(
    printcolumn = r#"{"name":"Schedule", "type":"string", "jsonPath":".spec.schedule"}"#,
    printcolumn = r#"{"name":"CronJob", "type":"string", "jsonPath":".status.cronJobName"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct BackupSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suspend: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency_policy: Option<ConcurrencyPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_resources: Option<JobResources>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Remote>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<Remote>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buckets: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<u32>,
    #[serde(alias = "dry-run", skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
    /// Older schema generation carried the namespace in the spec
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, schemars::JsonSchema)]
pub enum ConcurrencyPolicy {
    Forbid,
    Allow,
    Replace,
}

impl ConcurrencyPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConcurrencyPolicy::Forbid => "Forbid",
            ConcurrencyPolicy::Allow => "Allow",
            ConcurrencyPolicy::Replace => "Replace",
        }
    }
}

/// Either a flat `cpu`/`memory` pair used for limits and requests alike,
/// or separate `limit` and `request` objects.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobResources {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<ResourcePair>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<ResourcePair>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourcePair {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
}

/// An rclone remote plus the secret holding its credentials
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Remote {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BackupStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cron_job_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Which lifecycle handler a reconciliation of this Backup should run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Created,
    Updated,
    Unchanged,
    Deleting,
}

impl Backup {
    /// Derive the lifecycle event from what the operator recorded in status
    pub fn lifecycle(&self) -> Lifecycle {
        if self.metadata.deletion_timestamp.is_some() {
            return Lifecycle::Deleting;
        }

        let Some(status) = self.status.as_ref().filter(|s| s.cron_job_name.is_some()) else {
            return Lifecycle::Created;
        };

        match (self.metadata.generation, status.observed_generation) {
            (Some(current), Some(observed)) if current <= observed => Lifecycle::Unchanged,
            (None, _) => Lifecycle::Unchanged,
            _ => Lifecycle::Updated,
        }
    }

    /// Name of the CronJob created for this Backup, as recorded or as derived
    pub fn cron_job_name(&self) -> String {
        self.status
            .as_ref()
            .and_then(|s| s.cron_job_name.clone())
            .unwrap_or_else(|| format!("{}{}", self.name_any(), NAME_SUFFIX))
    }
}
