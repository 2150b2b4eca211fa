// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Validation and defaulting of Backup specs.
//!
//! All schema-generation differences (flat or split `jobResources`, namespace in the
//! spec or in metadata) are resolved here so the CronJob builder only ever sees
//! [`NormalizedSpec`].

use crate::error::{BackupError, Result};
use crate::types::backup::{BackupSpec, ConcurrencyPolicy, JobResources, Remote, ResourcePair};
use std::collections::HashSet;

const CRON_MACROS: [&str; 7] = [
    "@yearly",
    "@annually",
    "@monthly",
    "@weekly",
    "@daily",
    "@midnight",
    "@hourly",
];

const EVERY_MACRO: &str = "@every";

const DURATION_UNITS: [&str; 7] = ["ns", "us", "µs", "ms", "s", "m", "h"];

/// A fully validated, defaulted Backup spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedSpec {
    pub namespace: String,
    pub schedule: String,
    pub suspend: bool,
    pub concurrency_policy: ConcurrencyPolicy,
    pub resources: Resources,
    pub source: RemoteSettings,
    pub destination: RemoteSettings,
    pub buckets: Vec<String>,
    pub jobs: u32,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resources {
    pub limits: Quantities,
    pub requests: Quantities,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quantities {
    pub cpu: String,
    pub memory: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSettings {
    pub remote_type: String,
    pub provider: String,
    pub endpoint: String,
    pub secret_name: String,
}

/// Validate `spec` and fill in defaults.
///
/// `metadata_namespace` is the namespace of the Backup object itself and wins over the
/// legacy `spec.namespace`; the two must agree when both are set.
pub fn normalize(spec: &BackupSpec, metadata_namespace: Option<&str>) -> Result<NormalizedSpec> {
    let namespace = resolve_namespace(spec.namespace.as_deref(), metadata_namespace)?;

    let schedule = required(spec.schedule.as_deref(), "schedule")?;
    validate_schedule(&schedule)?;

    let concurrency_policy = match spec.concurrency_policy {
        None | Some(ConcurrencyPolicy::Forbid) => ConcurrencyPolicy::Forbid,
        Some(other) => {
            return Err(BackupError::validation(
                "concurrencyPolicy",
                format!("must be Forbid, got {}", other.as_str()),
            ))
        }
    };

    let resources = normalize_resources(spec.job_resources.as_ref())?;
    let source = normalize_remote(spec.source.as_ref(), "source")?;
    let destination = normalize_remote(spec.destination.as_ref(), "destination")?;
    let buckets = normalize_buckets(spec.buckets.as_deref())?;

    let jobs = spec.jobs.unwrap_or(1);
    if jobs == 0 {
        return Err(BackupError::validation("jobs", "must be at least 1"));
    }

    Ok(NormalizedSpec {
        namespace,
        schedule,
        suspend: spec.suspend.unwrap_or(false),
        concurrency_policy,
        resources,
        source,
        destination,
        buckets,
        jobs,
        dry_run: spec.dry_run.unwrap_or(false),
    })
}

fn required(value: Option<&str>, field: &str) -> Result<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        Some(_) => Err(BackupError::validation(field, "must not be empty")),
        None => Err(BackupError::validation(field, "is required")),
    }
}

fn resolve_namespace(in_spec: Option<&str>, in_metadata: Option<&str>) -> Result<String> {
    match (in_metadata, in_spec) {
        (Some(meta), Some(spec)) if meta != spec => Err(BackupError::validation(
            "namespace",
            format!("'{}' differs from the Backup's own namespace '{}'", spec, meta),
        )),
        (Some(meta), _) => Ok(meta.to_string()),
        (None, Some(spec)) => required(Some(spec), "namespace"),
        (None, None) => Err(BackupError::validation("metadata.namespace", "is required")),
    }
}

fn validate_schedule(schedule: &str) -> Result<()> {
    if schedule.starts_with('@') {
        let tokens: Vec<&str> = schedule.split_whitespace().collect();
        return match tokens.as_slice() {
            [keyword] if CRON_MACROS.contains(keyword) => Ok(()),
            [EVERY_MACRO, duration] if is_duration(duration) => Ok(()),
            [EVERY_MACRO, duration] => Err(BackupError::validation(
                "schedule",
                format!("'{}' is not a valid @every duration", duration),
            )),
            [EVERY_MACRO] => Err(BackupError::validation(
                "schedule",
                "@every needs a duration such as 1h30m",
            )),
            [keyword, ..] if CRON_MACROS.contains(keyword) || *keyword == EVERY_MACRO => {
                Err(BackupError::validation(
                    "schedule",
                    format!("unexpected arguments after {} in '{}'", keyword, schedule),
                ))
            }
            [keyword, ..] => Err(BackupError::validation(
                "schedule",
                format!("unknown macro '{}'", keyword),
            )),
            [] => Err(BackupError::validation("schedule", "must not be empty")),
        };
    }

    // An optional leading TZ=/CRON_TZ= is accepted by the CronJob controller
    let fields = schedule
        .split_whitespace()
        .filter(|f| !f.starts_with("TZ=") && !f.starts_with("CRON_TZ="))
        .count();
    if fields != 5 {
        return Err(BackupError::validation(
            "schedule",
            format!("must have 5 fields, got {} in '{}'", fields, schedule),
        ));
    }
    Ok(())
}

/// Go-style duration: one or more `<digits><unit>` groups, e.g. `90s` or `1h30m`
fn is_duration(value: &str) -> bool {
    let mut rest = value;
    while !rest.is_empty() {
        let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        if digits == 0 {
            return false;
        }
        rest = &rest[digits..];
        // Longest unit first so "ms" is not read as "m" followed by "s"
        let Some(unit) = DURATION_UNITS
            .iter()
            .filter(|u| rest.starts_with(*u))
            .max_by_key(|u| u.len())
        else {
            return false;
        };
        rest = &rest[unit.len()..];
    }
    !value.is_empty()
}

fn normalize_resources(resources: Option<&JobResources>) -> Result<Resources> {
    let Some(resources) = resources else {
        return Err(BackupError::validation("jobResources", "is required"));
    };

    let flat = resources.cpu.is_some() || resources.memory.is_some();
    let split = resources.limit.is_some() || resources.request.is_some();

    match (flat, split) {
        (true, true) => Err(BackupError::validation(
            "jobResources",
            "must use either cpu/memory or limit/request, not both",
        )),
        (false, true) => {
            let limits = resources
                .limit
                .as_ref()
                .map(|p| quantities(p, "jobResources.limit"))
                .transpose()?;
            let requests = resources
                .request
                .as_ref()
                .map(|p| quantities(p, "jobResources.request"))
                .transpose()?;
            // One half alone stands in for both
            match (limits, requests) {
                (Some(limits), Some(requests)) => Ok(Resources { limits, requests }),
                (Some(both), None) | (None, Some(both)) => Ok(Resources {
                    limits: both.clone(),
                    requests: both,
                }),
                (None, None) => Err(BackupError::validation("jobResources", "is required")),
            }
        }
        _ => {
            let both = Quantities {
                cpu: required(resources.cpu.as_deref(), "jobResources.cpu")?,
                memory: required(resources.memory.as_deref(), "jobResources.memory")?,
            };
            Ok(Resources {
                limits: both.clone(),
                requests: both,
            })
        }
    }
}

fn quantities(pair: &ResourcePair, prefix: &str) -> Result<Quantities> {
    Ok(Quantities {
        cpu: required(pair.cpu.as_deref(), &format!("{}.cpu", prefix))?,
        memory: required(pair.memory.as_deref(), &format!("{}.memory", prefix))?,
    })
}

fn normalize_remote(remote: Option<&Remote>, prefix: &str) -> Result<RemoteSettings> {
    let Some(remote) = remote else {
        return Err(BackupError::validation(prefix, "is required"));
    };

    Ok(RemoteSettings {
        remote_type: required(remote.remote_type.as_deref(), &format!("{}.remoteType", prefix))?,
        provider: required(remote.provider.as_deref(), &format!("{}.provider", prefix))?,
        endpoint: required(remote.endpoint.as_deref(), &format!("{}.endpoint", prefix))?,
        secret_name: required(remote.secret_name.as_deref(), &format!("{}.secretName", prefix))?,
    })
}

fn normalize_buckets(buckets: Option<&[String]>) -> Result<Vec<String>> {
    let buckets = match buckets {
        Some(b) if !b.is_empty() => b,
        Some(_) => return Err(BackupError::validation("buckets", "must not be empty")),
        None => return Err(BackupError::validation("buckets", "is required")),
    };

    let mut seen = HashSet::new();
    let mut normalized = Vec::with_capacity(buckets.len());
    for bucket in buckets {
        let name = bucket.trim();
        if name.is_empty() {
            return Err(BackupError::validation("buckets", "contains an empty bucket name"));
        }
        if name.contains(',') {
            return Err(BackupError::validation(
                "buckets",
                format!("bucket name '{}' must not contain a comma", name),
            ));
        }
        if !seen.insert(name) {
            return Err(BackupError::validation(
                "buckets",
                format!("bucket '{}' is listed more than once", name),
            ));
        }
        normalized.push(name.to_string());
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_spec() -> BackupSpec {
        serde_json::from_value(json!({
            "schedule": "0 2 * * *",
            "suspend": false,
            "buckets": ["a", "b"],
            "jobResources": {"cpu": "500m", "memory": "512Mi"},
            "source": {"remoteType": "s3", "provider": "aws", "endpoint": "https://src", "secretName": "src-sec"},
            "destination": {"remoteType": "s3", "provider": "aws", "endpoint": "https://dst", "secretName": "dst-sec"},
            "jobs": 2,
            "dryRun": false
        }))
        .unwrap()
    }

    fn field_of(err: BackupError) -> String {
        match err {
            BackupError::Validation { field, .. } => field,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_normalizes_valid_spec() {
        let spec = normalize(&valid_spec(), Some("backups")).unwrap();
        assert_eq!(spec.namespace, "backups");
        assert_eq!(spec.schedule, "0 2 * * *");
        assert_eq!(spec.buckets, vec!["a", "b"]);
        assert_eq!(spec.jobs, 2);
        assert_eq!(spec.concurrency_policy, ConcurrencyPolicy::Forbid);
        assert_eq!(spec.resources.limits, spec.resources.requests);
        assert_eq!(spec.resources.limits.cpu, "500m");
        assert_eq!(spec.source.secret_name, "src-sec");
        assert_eq!(spec.destination.endpoint, "https://dst");
    }

    #[test]
    fn test_applies_defaults() {
        let mut raw = valid_spec();
        raw.suspend = None;
        raw.dry_run = None;
        raw.jobs = None;
        let spec = normalize(&raw, Some("backups")).unwrap();
        assert!(!spec.suspend);
        assert!(!spec.dry_run);
        assert_eq!(spec.jobs, 1);
    }

    #[test]
    fn test_missing_schedule() {
        let mut raw = valid_spec();
        raw.schedule = None;
        assert_eq!(field_of(normalize(&raw, Some("backups")).unwrap_err()), "schedule");
    }

    #[test]
    fn test_malformed_schedule() {
        let mut raw = valid_spec();
        raw.schedule = Some("every night".to_string());
        assert_eq!(field_of(normalize(&raw, Some("backups")).unwrap_err()), "schedule");
    }

    #[test]
    fn test_schedule_macro_and_timezone() {
        let mut raw = valid_spec();
        raw.schedule = Some("@daily".to_string());
        assert!(normalize(&raw, Some("backups")).is_ok());

        raw.schedule = Some("CRON_TZ=Europe/Zurich 0 2 * * *".to_string());
        assert!(normalize(&raw, Some("backups")).is_ok());

        raw.schedule = Some("@sometimes".to_string());
        assert!(normalize(&raw, Some("backups")).is_err());
    }

    #[test]
    fn test_schedule_macro_arguments() {
        let mut raw = valid_spec();
        for ok in ["@every 1h30m", "@every 90s", "@every 500ms"] {
            raw.schedule = Some(ok.to_string());
            assert!(normalize(&raw, Some("backups")).is_ok(), "{}", ok);
        }

        for bad in ["@every", "@every soon", "@every 10", "@every 5m now", "@daily extra junk"] {
            raw.schedule = Some(bad.to_string());
            assert_eq!(
                field_of(normalize(&raw, Some("backups")).unwrap_err()),
                "schedule",
                "{}",
                bad
            );
        }
    }

    #[test]
    fn test_missing_remote_fields_are_named() {
        let mut raw = valid_spec();
        raw.source.as_mut().unwrap().endpoint = None;
        assert_eq!(field_of(normalize(&raw, Some("backups")).unwrap_err()), "source.endpoint");

        let mut raw = valid_spec();
        raw.destination.as_mut().unwrap().secret_name = Some(" ".to_string());
        assert_eq!(
            field_of(normalize(&raw, Some("backups")).unwrap_err()),
            "destination.secretName"
        );

        let mut raw = valid_spec();
        raw.destination = None;
        assert_eq!(field_of(normalize(&raw, Some("backups")).unwrap_err()), "destination");
    }

    #[test]
    fn test_empty_buckets_rejected() {
        let mut raw = valid_spec();
        raw.buckets = Some(vec![]);
        assert_eq!(field_of(normalize(&raw, Some("backups")).unwrap_err()), "buckets");

        raw.buckets = None;
        assert_eq!(field_of(normalize(&raw, Some("backups")).unwrap_err()), "buckets");
    }

    #[test]
    fn test_duplicate_bucket_rejected() {
        let mut raw = valid_spec();
        raw.buckets = Some(vec!["a".to_string(), "b".to_string(), "a".to_string()]);
        assert_eq!(field_of(normalize(&raw, Some("backups")).unwrap_err()), "buckets");
    }

    #[test]
    fn test_bucket_order_preserved() {
        let mut raw = valid_spec();
        raw.buckets = Some(vec!["zeta".to_string(), "alpha".to_string(), "mid".to_string()]);
        let spec = normalize(&raw, Some("backups")).unwrap();
        assert_eq!(spec.buckets, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_missing_memory() {
        let mut raw = valid_spec();
        raw.job_resources.as_mut().unwrap().memory = None;
        assert_eq!(
            field_of(normalize(&raw, Some("backups")).unwrap_err()),
            "jobResources.memory"
        );
    }

    #[test]
    fn test_split_resources() {
        let mut raw = valid_spec();
        raw.job_resources = Some(JobResources {
            limit: Some(ResourcePair {
                cpu: Some("1".to_string()),
                memory: Some("1Gi".to_string()),
            }),
            request: Some(ResourcePair {
                cpu: Some("250m".to_string()),
                memory: Some("256Mi".to_string()),
            }),
            ..Default::default()
        });
        let spec = normalize(&raw, Some("backups")).unwrap();
        assert_eq!(spec.resources.limits.cpu, "1");
        assert_eq!(spec.resources.requests.cpu, "250m");
        assert_eq!(spec.resources.requests.memory, "256Mi");
    }

    #[test]
    fn test_split_resources_single_half() {
        let mut raw = valid_spec();
        raw.job_resources = Some(JobResources {
            request: Some(ResourcePair {
                cpu: Some("250m".to_string()),
                memory: Some("256Mi".to_string()),
            }),
            ..Default::default()
        });
        let spec = normalize(&raw, Some("backups")).unwrap();
        assert_eq!(spec.resources.limits, spec.resources.requests);
        assert_eq!(spec.resources.limits.memory, "256Mi");
    }

    #[test]
    fn test_mixed_resource_shapes_rejected() {
        let mut raw = valid_spec();
        raw.job_resources.as_mut().unwrap().limit = Some(ResourcePair {
            cpu: Some("1".to_string()),
            memory: Some("1Gi".to_string()),
        });
        assert_eq!(field_of(normalize(&raw, Some("backups")).unwrap_err()), "jobResources");
    }

    #[test]
    fn test_incomplete_split_half_is_named() {
        let mut raw = valid_spec();
        raw.job_resources = Some(JobResources {
            limit: Some(ResourcePair {
                cpu: Some("1".to_string()),
                memory: None,
            }),
            ..Default::default()
        });
        assert_eq!(
            field_of(normalize(&raw, Some("backups")).unwrap_err()),
            "jobResources.limit.memory"
        );
    }

    #[test]
    fn test_non_forbid_concurrency_rejected() {
        let mut raw = valid_spec();
        raw.concurrency_policy = Some(ConcurrencyPolicy::Allow);
        assert_eq!(
            field_of(normalize(&raw, Some("backups")).unwrap_err()),
            "concurrencyPolicy"
        );
    }

    #[test]
    fn test_zero_jobs_rejected() {
        let mut raw = valid_spec();
        raw.jobs = Some(0);
        assert_eq!(field_of(normalize(&raw, Some("backups")).unwrap_err()), "jobs");
    }

    #[test]
    fn test_legacy_namespace_in_spec() {
        let mut raw = valid_spec();
        raw.namespace = Some("legacy".to_string());
        assert_eq!(normalize(&raw, None).unwrap().namespace, "legacy");
        assert_eq!(normalize(&raw, Some("legacy")).unwrap().namespace, "legacy");
        assert_eq!(field_of(normalize(&raw, Some("backups")).unwrap_err()), "namespace");
    }

    #[test]
    fn test_namespace_required_somewhere() {
        assert_eq!(
            field_of(normalize(&valid_spec(), None).unwrap_err()),
            "metadata.namespace"
        );
    }
}
