// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Capability contracts for the four backends.
//!
//! Each adapter wraps exactly one external system and knows nothing of the
//! others; only the orchestrator has cross-backend knowledge. Adapters
//! surface every failure immediately as a [`BackendError`] and never retry
//! internally. Timeouts are expected to arrive as ordinary backend errors,
//! not hangs.

use std::collections::HashMap;

use async_trait::async_trait;
use enroll_config::SecretString;

use crate::error::BackendError;
use crate::types::{AccountSummary, QuotaUsage};

/// Attributes of a new directory account entry.
///
/// Carries no credential field: secrets go to the credential authority
/// only, and the directory entry is built without any secret-bearing
/// attribute.
#[derive(Debug, Clone, Copy)]
pub struct NewAccount<'a> {
	pub login: &'a str,
	/// Used for both uidNumber and gidNumber.
	pub numeric_id: u32,
	pub surname: &'a str,
	pub given_name: &'a str,
}

/// Account and group records in the directory store.
#[async_trait]
pub trait DirectoryAdapter: Send + Sync {
	/// True when `login` or `numeric_id` is already taken. Runs before any
	/// side effect of a provisioning request.
	async fn exists(&self, login: &str, numeric_id: u32) -> Result<bool, BackendError>;

	async fn group_exists(&self, group: &str) -> Result<bool, BackendError>;

	/// Create the per-account primary group: named after the login, with
	/// the request's numeric id as gidNumber.
	async fn create_personal_group(&self, login: &str, numeric_id: u32)
		-> Result<(), BackendError>;

	/// Create a supplementary group, allocating a free gidNumber.
	async fn create_group(&self, group: &str) -> Result<(), BackendError>;

	async fn delete_group(&self, group: &str) -> Result<(), BackendError>;

	async fn add_member(&self, group: &str, login: &str) -> Result<(), BackendError>;

	async fn remove_member(&self, group: &str, login: &str) -> Result<(), BackendError>;

	async fn create_account(&self, account: NewAccount<'_>) -> Result<(), BackendError>;

	async fn delete_account(&self, login: &str) -> Result<(), BackendError>;

	async fn account_exists(&self, login: &str) -> Result<bool, BackendError>;

	async fn list_accounts(&self) -> Result<Vec<AccountSummary>, BackendError>;
}

/// Principal records in the credential authority.
#[async_trait]
pub trait CredentialAdapter: Send + Sync {
	/// Create a principal bound to `login` with `secret` as its initial
	/// credential.
	async fn create_principal(&self, login: &str, secret: &SecretString)
		-> Result<(), BackendError>;

	async fn delete_principal(&self, login: &str) -> Result<(), BackendError>;

	async fn principal_exists(&self, login: &str) -> Result<bool, BackendError>;
}

/// Home directory materialization.
#[async_trait]
pub trait FilesystemAdapter: Send + Sync {
	/// Create the home directory, copy the skeleton into it, and hand
	/// ownership to `uid:gid`.
	async fn create_home(&self, login: &str, uid: u32, gid: u32) -> Result<(), BackendError>;

	/// Remove the home directory recursively.
	async fn remove_home(&self, login: &str) -> Result<(), BackendError>;

	async fn home_exists(&self, login: &str) -> Result<bool, BackendError>;
}

/// Storage limits, parameterized at construction by filesystem kind.
#[async_trait]
pub trait QuotaAdapter: Send + Sync {
	/// Apply the configured soft/hard block and inode limits for `login`.
	async fn set_quota(&self, login: &str) -> Result<(), BackendError>;

	/// Reset all limits for `login` to zero.
	async fn remove_quota(&self, login: &str) -> Result<(), BackendError>;

	/// Per-login usage as reported by the quota tooling.
	async fn usage_report(&self) -> Result<HashMap<String, QuotaUsage>, BackendError>;
}
