// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The provisioning data model.

use std::collections::BTreeSet;

use enroll_config::SecretString;
use serde::Serialize;

use crate::error::{CompensationFailure, Failure};

/// One unit of provisioning work.
///
/// Constructed by the record parser (or the CLI), consumed exactly once by
/// the orchestrator, never persisted.
#[derive(Debug, Clone)]
pub struct ProvisionRequest {
	/// Becomes both the uidNumber and the gidNumber of the personal group.
	pub numeric_id: u32,
	/// Groups the account joins beyond its personal group. Created on
	/// demand by the orchestrator when absent.
	pub supplementary_groups: BTreeSet<String>,
	pub login: String,
	pub surname: String,
	pub given_name: String,
	/// Travels only to the credential authority. The directory adapter API
	/// has no parameter through which it could pass.
	pub initial_secret: SecretString,
}

/// A backend operation that committed during a single request.
///
/// The orchestrator appends these as steps succeed; on failure the list is
/// replayed in reverse to drive rollback, and it is echoed into the result
/// for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum CompletedStep {
	/// The per-account primary group, named after the login.
	PersonalGroup,
	/// A supplementary group this request created because it was absent.
	SupplementaryGroup { group: String },
	/// Membership of the login in a supplementary group.
	Membership { group: String },
	/// The directory account entry.
	Account,
	/// The credential authority principal.
	Principal,
	/// The materialized home directory.
	HomeDirectory,
	/// The assigned disk quota.
	Quota,
}

impl std::fmt::Display for CompletedStep {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::PersonalGroup => f.write_str("personal group"),
			Self::SupplementaryGroup { group } => write!(f, "supplementary group '{group}'"),
			Self::Membership { group } => write!(f, "membership in '{group}'"),
			Self::Account => f.write_str("account entry"),
			Self::Principal => f.write_str("credential principal"),
			Self::HomeDirectory => f.write_str("home directory"),
			Self::Quota => f.write_str("quota assignment"),
		}
	}
}

/// Terminal status of one provisioning request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionStatus {
	Succeeded,
	Failed,
	RolledBack,
}

/// Outcome of one [`ProvisionRequest`].
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionResult {
	/// Echoes the request login.
	pub login: String,
	pub status: ProvisionStatus,
	/// Backend operations that committed, in commit order.
	pub completed_steps: Vec<CompletedStep>,
	/// Present iff status is not `Succeeded`.
	pub failure: Option<Failure>,
	/// Non-fatal note: the quota step failed but the account is usable.
	pub warning: Option<Failure>,
	/// Compensating actions that failed during rollback. Non-empty means
	/// the backends may be in a residual state requiring manual cleanup.
	pub compensation_failures: Vec<CompensationFailure>,
}

impl ProvisionResult {
	pub fn succeeded(
		login: String,
		completed_steps: Vec<CompletedStep>,
		warning: Option<Failure>,
	) -> Self {
		Self {
			login,
			status: ProvisionStatus::Succeeded,
			completed_steps,
			failure: None,
			warning,
			compensation_failures: Vec::new(),
		}
	}

	pub fn failed(login: String, failure: Failure) -> Self {
		Self {
			login,
			status: ProvisionStatus::Failed,
			completed_steps: Vec::new(),
			failure: Some(failure),
			warning: None,
			compensation_failures: Vec::new(),
		}
	}

	pub fn rolled_back(
		login: String,
		completed_steps: Vec<CompletedStep>,
		failure: Failure,
		compensation_failures: Vec<CompensationFailure>,
	) -> Self {
		Self {
			login,
			status: ProvisionStatus::RolledBack,
			completed_steps,
			failure: Some(failure),
			warning: None,
			compensation_failures,
		}
	}

	pub fn is_success(&self) -> bool {
		self.status == ProvisionStatus::Succeeded
	}

	/// True when rollback left residue behind.
	pub fn compensation_incomplete(&self) -> bool {
		!self.compensation_failures.is_empty()
	}
}

/// Aggregated outcome of a batch run, one entry per input record in input
/// order. No record's outcome affects another's.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
	pub results: Vec<ProvisionResult>,
}

impl BatchReport {
	pub fn push(&mut self, result: ProvisionResult) {
		self.results.push(result);
	}

	pub fn succeeded(&self) -> usize {
		self.results.iter().filter(|r| r.is_success()).count()
	}

	pub fn failed(&self) -> usize {
		self.results.len() - self.succeeded()
	}

	pub fn all_succeeded(&self) -> bool {
		self.results.iter().all(|r| r.is_success())
	}
}

/// The removal actions attempted by deprovisioning, in attempt order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeprovisionAction {
	Principal,
	Account,
	PersonalGroup,
	Quota,
	HomeDirectory,
}

impl std::fmt::Display for DeprovisionAction {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let name = match self {
			Self::Principal => "credential principal",
			Self::Account => "account entry",
			Self::PersonalGroup => "personal group",
			Self::Quota => "quota",
			Self::HomeDirectory => "home directory",
		};
		f.write_str(name)
	}
}

/// Outcome of a single deprovisioning step.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
	Removed,
	AlreadyAbsent,
	Failed { error: Failure },
}

#[derive(Debug, Clone, Serialize)]
pub struct DeprovisionStep {
	pub action: DeprovisionAction,
	pub outcome: StepOutcome,
}

/// Aggregate result of best-effort deprovisioning. Every step is always
/// attempted; failures never abort later steps.
#[derive(Debug, Clone, Serialize)]
pub struct DeprovisionResult {
	pub login: String,
	pub steps: Vec<DeprovisionStep>,
}

impl DeprovisionResult {
	/// True when no step failed (removed or already absent throughout).
	pub fn fully_clean(&self) -> bool {
		self
			.steps
			.iter()
			.all(|s| !matches!(s.outcome, StepOutcome::Failed { .. }))
	}
}

/// A directory account row, as returned by `list_accounts`.
#[derive(Debug, Clone, Serialize)]
pub struct AccountSummary {
	pub login: String,
	pub uid_number: u32,
	pub display_name: String,
	pub home_directory: String,
}

/// Block and inode usage for one login, as reported by the quota tools.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QuotaUsage {
	/// `used/soft/hard` blocks, when reported.
	pub blocks: Option<String>,
	/// `used/soft/hard` inodes, when reported.
	pub inodes: Option<String>,
}
