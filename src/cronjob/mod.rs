// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Desired state of the CronJob derived from a Backup.

pub mod builder;

pub use builder::{build, cron_job_name};
