// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities for CRD discovery, bounded API calls and access provisioning.

pub mod access;
pub mod call;
pub mod crd;

pub use access::{AccessEnsurer, AccessReport, EnsureResult};
pub use call::bounded;
pub use crd::wait_for_backup_crd;
