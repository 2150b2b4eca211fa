// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

const DEFAULT_API_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REQUEUE_SECS: u64 = 60;

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Only watch Backups in this namespace; all namespaces when unset
    pub watch_namespace: Option<String>,
    /// Upper bound for every single cluster API call
    pub api_timeout: Duration,
    /// Delay before a failed reconciliation is redelivered
    pub requeue_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            watch_namespace: None,
            api_timeout: Duration::from_secs(DEFAULT_API_TIMEOUT_SECS),
            requeue_interval: Duration::from_secs(DEFAULT_REQUEUE_SECS),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let watch_namespace = lookup("WATCH_NAMESPACE").filter(|ns| !ns.is_empty());
        let api_timeout = seconds(&lookup, "API_TIMEOUT_SECS", DEFAULT_API_TIMEOUT_SECS)?;
        let requeue_interval = seconds(&lookup, "REQUEUE_SECS", DEFAULT_REQUEUE_SECS)?;

        Ok(Config {
            watch_namespace,
            api_timeout,
            requeue_interval,
        })
    }
}

fn seconds(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<Duration> {
    match lookup(key) {
        Some(raw) => {
            let secs: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{} must be a whole number of seconds, got '{}'", key, raw))?;
            anyhow::ensure!(secs > 0, "{} must be greater than zero", key);
            Ok(Duration::from_secs(secs))
        }
        None => Ok(Duration::from_secs(default)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.watch_namespace, None);
        assert_eq!(config.api_timeout, Duration::from_secs(30));
        assert_eq!(config.requeue_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_reads_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("WATCH_NAMESPACE", "backups"),
            ("API_TIMEOUT_SECS", "5"),
            ("REQUEUE_SECS", "120"),
        ]))
        .unwrap();
        assert_eq!(config.watch_namespace.as_deref(), Some("backups"));
        assert_eq!(config.api_timeout, Duration::from_secs(5));
        assert_eq!(config.requeue_interval, Duration::from_secs(120));
    }

    #[test]
    fn test_empty_namespace_means_all() {
        let config = Config::from_lookup(lookup(&[("WATCH_NAMESPACE", "")])).unwrap();
        assert_eq!(config.watch_namespace, None);
    }

    #[test]
    fn test_rejects_invalid_timeout() {
        assert!(Config::from_lookup(lookup(&[("API_TIMEOUT_SECS", "soon")])).is_err());
        assert!(Config::from_lookup(lookup(&[("API_TIMEOUT_SECS", "0")])).is_err());
    }
}
