// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Backup reconciler - turns Backup resources into owned CronJobs.

use crate::config::Config;
use crate::constants::OPERATOR_NAME;
use crate::cronjob::builder;
use crate::error::{ApiCall, BackupError, Result, Verb};
use crate::kubernetes::{bounded, AccessEnsurer};
use crate::types::{normalize, Backup, BackupStatus, Lifecycle};
use futures::StreamExt;
use k8s_openapi::api::batch::v1::CronJob;
use kube::{
    api::{Patch, PatchParams, PostParams},
    runtime::{controller::Action, Controller},
    Api, Client, Resource, ResourceExt,
};
use kube_runtime::watcher::Config as WatcherConfig;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Result of handling one lifecycle event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created { name: String },
    /// A create event was redelivered and the CronJob was already there
    AlreadyPresent { name: String },
    Updated { name: String },
    /// Update for a CronJob that no longer exists; nothing was recreated
    TargetMissing { name: String },
}

impl Outcome {
    pub fn cron_job_name(&self) -> &str {
        match self {
            Outcome::Created { name }
            | Outcome::AlreadyPresent { name }
            | Outcome::Updated { name }
            | Outcome::TargetMissing { name } => name,
        }
    }

    /// Confirmation message recorded in the Backup's status
    pub fn message(&self) -> String {
        match self {
            Outcome::Created { name } => format!("CronJob {} created", name),
            Outcome::AlreadyPresent { name } => format!("CronJob {} already exists", name),
            Outcome::Updated { name } => format!("CronJob {} updated", name),
            Outcome::TargetMissing { name } => {
                format!("CronJob {} not found, update skipped", name)
            }
        }
    }
}

pub struct BackupReconciler {
    client: Client,
    config: Config,
    access: AccessEnsurer,
}

impl BackupReconciler {
    pub fn new(client: Client, config: Config) -> Self {
        let access = AccessEnsurer::new(client.clone(), config.api_timeout);
        Self {
            client,
            config,
            access,
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let backups: Api<Backup> = match &self.config.watch_namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        };
        let context = Arc::new(self);

        Controller::new(backups, WatcherConfig::default())
            .shutdown_on_signal()
            .run(reconcile, error_policy, context)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled backup: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        Ok(())
    }

    fn cron_jobs(&self, namespace: &str) -> Api<CronJob> {
        Api::namespaced(self.client.clone(), namespace)
    }

    /// First sight of a Backup: provision access, then create the owned CronJob
    #[instrument(skip(self, backup), fields(backup = %backup.name_any()))]
    pub async fn handle_created(&self, backup: &Backup) -> Result<Outcome> {
        let resource_name = backup.name_any();
        let spec = normalize(&backup.spec, backup.namespace().as_deref())?;
        let owner = backup
            .controller_owner_ref(&())
            .ok_or(BackupError::MissingObjectKey(".metadata.uid"))?;

        self.access.ensure(&spec.namespace).await?;

        let mut desired = builder::build(&spec, &resource_name, &spec.namespace);
        desired.metadata.owner_references = Some(vec![owner]);
        let name = builder::cron_job_name(&resource_name);

        let params = PostParams {
            field_manager: Some(OPERATOR_NAME.to_string()),
            ..Default::default()
        };
        let call = ApiCall::new(Verb::Create, "CronJob", &spec.namespace, &name);
        match bounded(
            call,
            self.config.api_timeout,
            self.cron_jobs(&spec.namespace).create(&params, &desired),
        )
        .await
        {
            Ok(_) => Ok(Outcome::Created { name }),
            Err(BackupError::AlreadyExists(_)) => {
                debug!("CronJob {}/{} already exists, converging it", spec.namespace, name);
                self.converge_existing(backup, &spec.namespace, &name, &desired)
                    .await?;
                Ok(Outcome::AlreadyPresent { name })
            }
            Err(e) => Err(e),
        }
    }

    /// A create found the CronJob already there; it may predate the current spec
    async fn converge_existing(
        &self,
        backup: &Backup,
        namespace: &str,
        name: &str,
        desired: &CronJob,
    ) -> Result<()> {
        let api = self.cron_jobs(namespace);
        let get = ApiCall::new(Verb::Get, "CronJob", namespace, name);
        let existing = bounded(get, self.config.api_timeout, api.get(name)).await?;

        let uid = backup.metadata.uid.as_deref();
        let owned = existing
            .owner_references()
            .iter()
            .any(|o| Some(o.uid.as_str()) == uid);
        if !owned {
            warn!(
                "CronJob {}/{} is not owned by Backup {}, adopting its name",
                namespace,
                name,
                backup.name_any()
            );
        }

        self.patch_cron_job(&api, namespace, name, &existing, desired)
            .await
    }

    async fn patch_cron_job(
        &self,
        api: &Api<CronJob>,
        namespace: &str,
        name: &str,
        existing: &CronJob,
        desired: &CronJob,
    ) -> Result<()> {
        let patch = update_patch(existing, desired)?;
        let call = ApiCall::new(Verb::Patch, "CronJob", namespace, name);
        bounded(
            call,
            self.config.api_timeout,
            api.patch(name, &PatchParams::apply(OPERATOR_NAME), &Patch::Merge(&patch)),
        )
        .await?;
        Ok(())
    }

    /// Spec change: patch the existing CronJob, never create one
    #[instrument(skip(self, backup), fields(backup = %backup.name_any()))]
    pub async fn handle_updated(&self, backup: &Backup) -> Result<Outcome> {
        let spec = normalize(&backup.spec, backup.namespace().as_deref())?;
        let name = backup.cron_job_name();
        let desired = builder::build(&spec, &backup.name_any(), &spec.namespace);
        let api = self.cron_jobs(&spec.namespace);

        let get = ApiCall::new(Verb::Get, "CronJob", &spec.namespace, &name);
        let existing = match bounded(get, self.config.api_timeout, api.get(&name)).await {
            Ok(job) => job,
            Err(BackupError::NotFound(call)) => {
                warn!("Not found: {}, not recreating it on update", call);
                return Ok(Outcome::TargetMissing { name });
            }
            Err(e) => return Err(e),
        };

        self.patch_cron_job(&api, &spec.namespace, &name, &existing, &desired)
            .await?;

        Ok(Outcome::Updated { name })
    }

    /// Remember what was done so redeliveries of the same generation are no-ops
    async fn record_status(&self, backup: &Backup, outcome: &Outcome) -> Result<()> {
        let name = backup.name_any();
        let namespace = backup
            .namespace()
            .ok_or(BackupError::MissingObjectKey(".metadata.namespace"))?;
        let status = BackupStatus {
            cron_job_name: Some(outcome.cron_job_name().to_string()),
            observed_generation: backup.metadata.generation,
            message: Some(outcome.message()),
        };
        let patch = serde_json::json!({ "status": status });

        let backups: Api<Backup> = Api::namespaced(self.client.clone(), &namespace);
        let call = ApiCall::new(Verb::PatchStatus, "Backup", &namespace, &name);
        bounded(
            call,
            self.config.api_timeout,
            backups.patch_status(&name, &PatchParams::apply(OPERATOR_NAME), &Patch::Merge(&patch)),
        )
        .await?;
        Ok(())
    }
}

/// Splice the desired pod template and scheduling fields into the existing CronJob spec
fn update_patch(existing: &CronJob, desired: &CronJob) -> Result<serde_json::Value> {
    let desired_spec = desired
        .spec
        .as_ref()
        .ok_or(BackupError::MissingObjectKey(".spec"))?;
    let desired_template = desired_spec
        .job_template
        .spec
        .as_ref()
        .map(|s| s.template.clone())
        .ok_or(BackupError::MissingObjectKey(".spec.jobTemplate.spec"))?;

    let mut spec = existing
        .spec
        .clone()
        .ok_or(BackupError::MissingObjectKey(".spec"))?;
    spec.schedule = desired_spec.schedule.clone();
    spec.suspend = desired_spec.suspend;
    spec.concurrency_policy = desired_spec.concurrency_policy.clone();
    spec.job_template
        .spec
        .get_or_insert_with(Default::default)
        .template = desired_template;

    Ok(serde_json::json!({ "spec": spec }))
}

async fn reconcile(backup: Arc<Backup>, ctx: Arc<BackupReconciler>) -> Result<Action> {
    let name = backup.name_any();
    let namespace = backup.namespace().unwrap_or_default();

    let outcome = match backup.lifecycle() {
        Lifecycle::Deleting => {
            debug!(
                "Backup {}/{} is being deleted, its CronJob is garbage collected",
                namespace, name
            );
            return Ok(Action::await_change());
        }
        Lifecycle::Unchanged => {
            debug!("Backup {}/{} is up to date", namespace, name);
            return Ok(Action::await_change());
        }
        Lifecycle::Created => ctx.handle_created(&backup).await?,
        Lifecycle::Updated => ctx.handle_updated(&backup).await?,
    };

    info!("Backup {}/{}: {}", namespace, name, outcome.message());
    ctx.record_status(&backup, &outcome).await?;

    // Wait for the next change - deletion is handled by the garbage collector
    Ok(Action::await_change())
}

fn error_policy(backup: Arc<Backup>, error: &BackupError, ctx: Arc<BackupReconciler>) -> Action {
    let key = format!("{}/{}", backup.namespace().unwrap_or_default(), backup.name_any());
    if error.is_permanent() {
        error!("Reconciliation of {} failed, not retrying: {}", key, error);
        Action::await_change()
    } else {
        error!("Reconciliation of {} failed: {}", key, error);
        Action::requeue(ctx.config.requeue_interval)
    }
}
