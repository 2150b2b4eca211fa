// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The Backup custom resource and its normalized form.

pub mod backup;
pub mod normalize;

pub use backup::{Backup, BackupSpec, BackupStatus, Lifecycle};
pub use normalize::{normalize, NormalizedSpec};
