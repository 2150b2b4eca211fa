// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Pure construction of the CronJob that runs a Backup.

use crate::constants::{access, cronjob, env, labels, OPERATOR_NAME};
use crate::types::normalize::{NormalizedSpec, Quantities, RemoteSettings};
use k8s_openapi::api::batch::v1::{CronJob, CronJobSpec, JobSpec, JobTemplateSpec};
use k8s_openapi::api::core::v1::{
    Container, EnvVar, EnvVarSource, ObjectFieldSelector, PodSpec, PodTemplateSpec,
    ResourceRequirements, SecretKeySelector,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;

/// Name of the CronJob derived from a Backup named `resource_name`
pub fn cron_job_name(resource_name: &str) -> String {
    format!("{}{}", resource_name, cronjob::NAME_SUFFIX)
}

/// Build the complete CronJob for a Backup.
///
/// Deterministic: the same arguments always serialize to the same bytes, which the
/// update path relies on. Ownership is attached by the caller.
pub fn build(spec: &NormalizedSpec, resource_name: &str, resource_namespace: &str) -> CronJob {
    let labels = object_labels(resource_name);

    CronJob {
        metadata: ObjectMeta {
            name: Some(cron_job_name(resource_name)),
            namespace: Some(resource_namespace.to_string()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(CronJobSpec {
            schedule: spec.schedule.clone(),
            suspend: Some(spec.suspend),
            concurrency_policy: Some(spec.concurrency_policy.as_str().to_string()),
            job_template: JobTemplateSpec {
                metadata: None,
                spec: Some(JobSpec {
                    template: pod_template(spec, labels),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        status: None,
    }
}

/// The pod template portion of the CronJob, replaced wholesale on update
pub fn pod_template(spec: &NormalizedSpec, labels: BTreeMap<String, String>) -> PodTemplateSpec {
    PodTemplateSpec {
        metadata: Some(ObjectMeta {
            labels: Some(labels),
            ..Default::default()
        }),
        spec: Some(PodSpec {
            service_account_name: Some(access::SERVICE_ACCOUNT_NAME.to_string()),
            restart_policy: Some(cronjob::RESTART_POLICY.to_string()),
            containers: vec![backup_container(spec)],
            ..Default::default()
        }),
    }
}

pub fn object_labels(resource_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (labels::MANAGED_BY.to_string(), OPERATOR_NAME.to_string()),
        (labels::BACKUP_NAME.to_string(), resource_name.to_string()),
    ])
}

fn backup_container(spec: &NormalizedSpec) -> Container {
    Container {
        name: cronjob::CONTAINER_NAME.to_string(),
        image: Some(cronjob::IMAGE.to_string()),
        resources: Some(ResourceRequirements {
            limits: Some(quantity_map(&spec.resources.limits)),
            requests: Some(quantity_map(&spec.resources.requests)),
            ..Default::default()
        }),
        env: Some(environment(spec)),
        ..Default::default()
    }
}

fn quantity_map(q: &Quantities) -> BTreeMap<String, Quantity> {
    BTreeMap::from([
        ("cpu".to_string(), Quantity(q.cpu.clone())),
        ("memory".to_string(), Quantity(q.memory.clone())),
    ])
}

/// The container environment, in the order listed in [`env::ALL`].
///
/// Credentials are passed as secret references and resolved by the kubelet;
/// `NAMESPACE` comes from the pod's own metadata.
pub fn environment(spec: &NormalizedSpec) -> Vec<EnvVar> {
    let RemoteSettings {
        remote_type: source_type,
        provider: source_provider,
        endpoint: source_endpoint,
        secret_name: source_secret,
    } = &spec.source;
    let RemoteSettings {
        remote_type: destination_type,
        provider: destination_provider,
        endpoint: destination_endpoint,
        secret_name: destination_secret,
    } = &spec.destination;

    vec![
        literal(env::SOURCE_TYPE, source_type),
        literal(env::SOURCE_PROVIDER, source_provider),
        literal(env::SOURCE_ENDPOINT, source_endpoint),
        literal(env::DESTINATION_TYPE, destination_type),
        literal(env::DESTINATION_PROVIDER, destination_provider),
        literal(env::DESTINATION_ENDPOINT, destination_endpoint),
        from_secret(env::SOURCE_ACCESS_KEY, source_secret),
        from_secret(env::SOURCE_SECRET_KEY, source_secret),
        from_secret(env::DESTINATION_ACCESS_KEY, destination_secret),
        from_secret(env::DESTINATION_SECRET_KEY, destination_secret),
        literal(env::BUCKET_LIST, &spec.buckets.join(",")),
        literal(env::DRY_RUN, &spec.dry_run.to_string()),
        from_field(env::NAMESPACE, "metadata.namespace"),
        literal(env::TOTAL_JOBS, &spec.jobs.to_string()),
    ]
}

fn literal(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.to_string()),
        value_from: None,
    }
}

/// The secret key has the same name as the variable
fn from_secret(name: &str, secret_name: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: None,
        value_from: Some(EnvVarSource {
            secret_key_ref: Some(SecretKeySelector {
                name: secret_name.to_string(),
                key: name.to_string(),
                optional: None,
            }),
            ..Default::default()
        }),
    }
}

fn from_field(name: &str, field_path: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: None,
        value_from: Some(EnvVarSource {
            field_ref: Some(ObjectFieldSelector {
                api_version: None,
                field_path: field_path.to_string(),
            }),
            ..Default::default()
        }),
    }
}
