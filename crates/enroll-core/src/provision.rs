// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The provisioning orchestrator.
//!
//! Drives the backend adapters in a fixed order, tracks committed steps,
//! and compensates them in strict reverse order when a hard step fails.
//! Steps 1-6 are hard-fail-and-rollback; quota assignment is soft-fail and
//! only attaches a warning to an otherwise successful result.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::adapter::{
	CredentialAdapter, DirectoryAdapter, FilesystemAdapter, NewAccount, QuotaAdapter,
};
use crate::error::{CompensationFailure, Failure};
use crate::types::{CompletedStep, ProvisionRequest, ProvisionResult};

/// Sequences backend operations for one request at a time.
///
/// Holds no per-request state: each `provision` call is independent, which
/// is what lets the batch runner isolate records from one another.
pub struct Provisioner {
	pub(crate) directory: Arc<dyn DirectoryAdapter>,
	pub(crate) credential: Arc<dyn CredentialAdapter>,
	pub(crate) filesystem: Arc<dyn FilesystemAdapter>,
	pub(crate) quota: Arc<dyn QuotaAdapter>,
}

impl Provisioner {
	pub fn new(
		directory: Arc<dyn DirectoryAdapter>,
		credential: Arc<dyn CredentialAdapter>,
		filesystem: Arc<dyn FilesystemAdapter>,
		quota: Arc<dyn QuotaAdapter>,
	) -> Self {
		Self {
			directory,
			credential,
			filesystem,
			quota,
		}
	}

	/// Provision one identity end to end.
	///
	/// Returns exactly one terminal outcome; a failure after the first
	/// committed step rolls the committed steps back and reports
	/// `RolledBack`, never a silent partial state.
	#[instrument(skip(self, request), fields(login = %request.login, uid = request.numeric_id))]
	pub async fn provision(&self, request: ProvisionRequest) -> ProvisionResult {
		let login = request.login.clone();
		let mut completed: Vec<CompletedStep> = Vec::new();

		match self.run_steps(&request, &mut completed).await {
			Ok(warning) => {
				if let Some(ref w) = warning {
					warn!(warning = %w, "provisioned with non-fatal quota failure");
				} else {
					info!(steps = completed.len(), "provisioned");
				}
				ProvisionResult::succeeded(login, completed, warning)
			}
			Err(failure) if completed.is_empty() => {
				warn!(error = %failure, "provisioning failed before any mutation");
				ProvisionResult::failed(login, failure)
			}
			Err(failure) => {
				warn!(
					error = %failure,
					committed = completed.len(),
					"provisioning failed, rolling back"
				);
				let compensation_failures = self.roll_back(&request, &completed).await;
				if !compensation_failures.is_empty() {
					warn!(
						incomplete = compensation_failures.len(),
						"rollback incomplete, manual cleanup may be required"
					);
				}
				ProvisionResult::rolled_back(login, completed, failure, compensation_failures)
			}
		}
	}

	/// The fixed step sequence. Pushes onto `completed` after each commit
	/// so the caller can roll back exactly what happened.
	async fn run_steps(
		&self,
		request: &ProvisionRequest,
		completed: &mut Vec<CompletedStep>,
	) -> Result<Option<Failure>, Failure> {
		let login = request.login.as_str();
		let uid = request.numeric_id;

		// 1. Existence check: fail fast before any side effect.
		if self.directory.exists(login, uid).await? {
			return Err(Failure::duplicate_identity(login, uid));
		}

		// 2. Personal group.
		self.directory.create_personal_group(login, uid).await?;
		completed.push(CompletedStep::PersonalGroup);

		// 3. Supplementary groups: create absent ones, then add membership.
		for group in &request.supplementary_groups {
			if group == login {
				continue;
			}
			if !self.directory.group_exists(group).await? {
				self.directory.create_group(group).await?;
				completed.push(CompletedStep::SupplementaryGroup {
					group: group.clone(),
				});
			}
			self.directory.add_member(group, login).await?;
			completed.push(CompletedStep::Membership {
				group: group.clone(),
			});
		}

		// 4. Account entry. The adapter contract carries no secret.
		self
			.directory
			.create_account(NewAccount {
				login,
				numeric_id: uid,
				surname: &request.surname,
				given_name: &request.given_name,
			})
			.await?;
		completed.push(CompletedStep::Account);

		// 5. Credential issuance: the only place the secret goes.
		self
			.credential
			.create_principal(login, &request.initial_secret)
			.await?;
		completed.push(CompletedStep::Principal);

		// 6. Home directory, owned uid:uid.
		self.filesystem.create_home(login, uid, uid).await?;
		completed.push(CompletedStep::HomeDirectory);

		// 7. Quota: soft-fail. The account is usable without it.
		match self.quota.set_quota(login).await {
			Ok(()) => {
				completed.push(CompletedStep::Quota);
				Ok(None)
			}
			Err(e) => Ok(Some(e.into())),
		}
	}

	/// Compensate committed steps in strict reverse order.
	///
	/// Compensation errors are collected, not propagated; every remaining
	/// compensation still runs.
	async fn roll_back(
		&self,
		request: &ProvisionRequest,
		completed: &[CompletedStep],
	) -> Vec<CompensationFailure> {
		let login = request.login.as_str();
		let mut failures = Vec::new();

		for step in completed.iter().rev() {
			let result = match step {
				CompletedStep::PersonalGroup => self.directory.delete_group(login).await,
				CompletedStep::SupplementaryGroup { group } => self.directory.delete_group(group).await,
				CompletedStep::Membership { group } => self.directory.remove_member(group, login).await,
				CompletedStep::Account => self.directory.delete_account(login).await,
				CompletedStep::Principal => self.credential.delete_principal(login).await,
				CompletedStep::HomeDirectory => self.filesystem.remove_home(login).await,
				CompletedStep::Quota => self.quota.remove_quota(login).await,
			};

			match result {
				Ok(()) => info!(%step, "compensated"),
				Err(e) => {
					warn!(%step, error = %e, "compensation failed");
					failures.push(CompensationFailure {
						step: step.clone(),
						error: e.into(),
					});
				}
			}
		}

		failures
	}
}
