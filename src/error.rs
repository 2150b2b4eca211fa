// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// The kind of cluster API request that was issued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Create,
    Patch,
    PatchStatus,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verb::Get => "get",
            Verb::Create => "create",
            Verb::Patch => "patch",
            Verb::PatchStatus => "patch status of",
        };
        f.write_str(s)
    }
}

/// Identifies a single cluster API call, carried by every API error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCall {
    pub verb: Verb,
    pub kind: &'static str,
    pub namespace: String,
    pub name: String,
}

impl ApiCall {
    pub fn new(verb: Verb, kind: &'static str, namespace: &str, name: &str) -> Self {
        Self {
            verb,
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for ApiCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}/{}", self.verb, self.kind, self.namespace, self.name)
    }
}

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Invalid Backup spec: `{field}` {reason}")]
    Validation { field: String, reason: String },

    #[error("Not found: {0}")]
    NotFound(ApiCall),

    #[error("Already exists: {0}")]
    AlreadyExists(ApiCall),

    #[error("Failed to {call}: {source}")]
    Api {
        call: ApiCall,
        #[source]
        source: kube::Error,
    },

    #[error("Timed out after {timeout:?} trying to {call}")]
    Timeout { call: ApiCall, timeout: Duration },

    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Backup CRD not available: {0}")]
    CrdUnavailable(String),

    #[error("Missing object key: {0}")]
    MissingObjectKey(&'static str),
}

impl BackupError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        BackupError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Map a failed API call onto the error taxonomy.
    /// 404 is always `NotFound`; 409 is `AlreadyExists` only for creates.
    pub fn from_api(call: ApiCall, source: kube::Error) -> Self {
        match &source {
            kube::Error::Api(resp) if resp.code == 404 => BackupError::NotFound(call),
            kube::Error::Api(resp) if resp.code == 409 && call.verb == Verb::Create => {
                BackupError::AlreadyExists(call)
            }
            _ => BackupError::Api { call, source },
        }
    }

    /// Errors that will not go away by redelivering the same event
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            BackupError::Validation { .. } | BackupError::MissingObjectKey(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BackupError>;
