// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Best-effort deprovisioning.
//!
//! Mirror of provisioning for deletion, with its own ordering: credential,
//! account entry, personal group, quota, home directory. A step failure is
//! recorded but never aborts later steps, since partial removal is strictly
//! better than none once the operator has asked to undo everything.

use tracing::{info, instrument, warn};

use crate::error::BackendError;
use crate::provision::Provisioner;
use crate::types::{DeprovisionAction, DeprovisionResult, DeprovisionStep, StepOutcome};

impl Provisioner {
	/// Remove every trace of `login` from the four backends.
	///
	/// Idempotent: a second run reports already-absent steps instead of
	/// errors. The quota step is the exception: the quota tools offer no
	/// cheap existence probe, so limits are always reset and the step
	/// reports `Removed` even when none were assigned.
	#[instrument(skip(self))]
	pub async fn deprovision(&self, login: &str) -> DeprovisionResult {
		let mut steps = Vec::new();

		let outcome = remove_if_present(
			self.credential.principal_exists(login).await,
			self.credential.delete_principal(login),
		)
		.await;
		steps.push(DeprovisionStep {
			action: DeprovisionAction::Principal,
			outcome,
		});

		let outcome = remove_if_present(
			self.directory.account_exists(login).await,
			self.directory.delete_account(login),
		)
		.await;
		steps.push(DeprovisionStep {
			action: DeprovisionAction::Account,
			outcome,
		});

		let outcome = remove_if_present(
			self.directory.group_exists(login).await,
			self.directory.delete_group(login),
		)
		.await;
		steps.push(DeprovisionStep {
			action: DeprovisionAction::PersonalGroup,
			outcome,
		});

		// Quota tools are idempotent; resetting absent limits is a no-op.
		let outcome = match self.quota.remove_quota(login).await {
			Ok(()) => StepOutcome::Removed,
			Err(e) => StepOutcome::Failed { error: e.into() },
		};
		steps.push(DeprovisionStep {
			action: DeprovisionAction::Quota,
			outcome,
		});

		let outcome = remove_if_present(
			self.filesystem.home_exists(login).await,
			self.filesystem.remove_home(login),
		)
		.await;
		steps.push(DeprovisionStep {
			action: DeprovisionAction::HomeDirectory,
			outcome,
		});

		let result = DeprovisionResult {
			login: login.to_string(),
			steps,
		};

		if result.fully_clean() {
			info!("deprovisioned");
		} else {
			warn!("deprovisioning left residue behind");
		}

		result
	}
}

async fn remove_if_present(
	exists: Result<bool, BackendError>,
	delete: impl std::future::Future<Output = Result<(), BackendError>>,
) -> StepOutcome {
	match exists {
		Ok(false) => StepOutcome::AlreadyAbsent,
		Ok(true) => match delete.await {
			Ok(()) => StepOutcome::Removed,
			Err(e) => StepOutcome::Failed { error: e.into() },
		},
		Err(e) => StepOutcome::Failed { error: e.into() },
	}
}
