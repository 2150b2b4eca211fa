// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Per-namespace service account and role binding the backup CronJobs run as.

use crate::constants::access::{
    CLUSTER_ROLE_NAME, RBAC_API_GROUP, ROLE_BINDING_NAME, SERVICE_ACCOUNT_NAME,
};
use crate::error::{ApiCall, BackupError, Result, Verb};
use crate::kubernetes::call::bounded;
use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::api::rbac::v1::{RoleBinding, RoleRef, Subject};
use kube::{
    api::{ObjectMeta, PostParams},
    Api, Client, Resource,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// What `ensure` found for one object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureResult {
    /// The object was already there, possibly created concurrently
    Existed,
    Created,
}

/// Outcome of ensuring the access objects of a namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessReport {
    pub service_account: EnsureResult,
    pub role_binding: EnsureResult,
}

/// Makes sure the shared service account and role binding exist in a namespace.
///
/// Only ever reads or creates; existing objects are left exactly as they are.
#[derive(Clone)]
pub struct AccessEnsurer {
    client: Client,
    timeout: Duration,
}

impl AccessEnsurer {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    #[instrument(skip(self))]
    pub async fn ensure(&self, namespace: &str) -> Result<AccessReport> {
        let service_accounts: Api<ServiceAccount> =
            Api::namespaced(self.client.clone(), namespace);
        let service_account = ensure_exists(
            &service_accounts,
            "ServiceAccount",
            namespace,
            service_account(),
            self.timeout,
        )
        .await?;

        let role_bindings: Api<RoleBinding> = Api::namespaced(self.client.clone(), namespace);
        let role_binding = ensure_exists(
            &role_bindings,
            "RoleBinding",
            namespace,
            role_binding(namespace),
            self.timeout,
        )
        .await?;

        Ok(AccessReport {
            service_account,
            role_binding,
        })
    }
}

/// Read `object` by name and create it on 404.
/// A create that loses a race with another writer counts as `Existed`.
async fn ensure_exists<K>(
    api: &Api<K>,
    kind: &'static str,
    namespace: &str,
    object: K,
    timeout: Duration,
) -> Result<EnsureResult>
where
    K: Resource + Clone + Debug + Serialize + DeserializeOwned,
{
    let name = object
        .meta()
        .name
        .clone()
        .ok_or(BackupError::MissingObjectKey(".metadata.name"))?;

    let get = ApiCall::new(Verb::Get, kind, namespace, &name);
    match bounded(get, timeout, api.get(&name)).await {
        Ok(_) => {
            debug!("{} {}/{} already exists", kind, namespace, name);
            return Ok(EnsureResult::Existed);
        }
        Err(BackupError::NotFound(_)) => {}
        Err(e) => return Err(e),
    }

    info!("Creating {} {}/{}", kind, namespace, name);
    let create = ApiCall::new(Verb::Create, kind, namespace, &name);
    match bounded(create, timeout, api.create(&PostParams::default(), &object)).await {
        Ok(_) => {
            info!("{} {}/{} created successfully", kind, namespace, name);
            Ok(EnsureResult::Created)
        }
        Err(BackupError::AlreadyExists(_)) => {
            debug!("{} {}/{} was created concurrently", kind, namespace, name);
            Ok(EnsureResult::Existed)
        }
        Err(e) => Err(e),
    }
}

fn service_account() -> ServiceAccount {
    ServiceAccount {
        metadata: ObjectMeta {
            name: Some(SERVICE_ACCOUNT_NAME.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn role_binding(namespace: &str) -> RoleBinding {
    RoleBinding {
        metadata: ObjectMeta {
            name: Some(ROLE_BINDING_NAME.to_string()),
            ..Default::default()
        },
        subjects: Some(vec![Subject {
            kind: "ServiceAccount".to_string(),
            name: SERVICE_ACCOUNT_NAME.to_string(),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        }]),
        role_ref: RoleRef {
            api_group: RBAC_API_GROUP.to_string(),
            kind: "ClusterRole".to_string(),
            name: CLUSTER_ROLE_NAME.to_string(),
        },
    }
}
