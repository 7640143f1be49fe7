// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Orchestrator behavior against call-recording mock backends.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use enroll_config::SecretString;
use enroll_core::{
	AccountSummary, Backend, BackendError, CompletedStep, CredentialAdapter, DirectoryAdapter,
	FailureKind, FilesystemAdapter, NewAccount, ProvisionRequest, ProvisionStatus, Provisioner,
	QuotaAdapter, QuotaUsage, StepOutcome,
};

/// Shared backend state: records every adapter call in order and fails the
/// operations it has been told to fail.
#[derive(Default)]
struct MockState {
	calls: Mutex<Vec<String>>,
	fail_ops: Mutex<HashSet<&'static str>>,
	groups: Mutex<HashMap<String, u32>>,
	memberships: Mutex<HashSet<(String, String)>>,
	accounts: Mutex<HashMap<String, u32>>,
	principals: Mutex<HashSet<String>>,
	last_secret: Mutex<Option<String>>,
	homes: Mutex<HashMap<String, (u32, u32)>>,
	quotas: Mutex<HashSet<String>>,
}

impl MockState {
	fn enter(&self, backend: Backend, op: &'static str) -> Result<(), BackendError> {
		self.calls.lock().unwrap().push(op.to_string());
		if self.fail_ops.lock().unwrap().contains(op) {
			Err(BackendError::operation(backend, op, "injected failure"))
		} else {
			Ok(())
		}
	}

	fn fail(&self, op: &'static str) {
		self.fail_ops.lock().unwrap().insert(op);
	}

	fn calls(&self) -> Vec<String> {
		self.calls.lock().unwrap().clone()
	}

	fn seed_account(&self, login: &str, uid: u32) {
		self.accounts.lock().unwrap().insert(login.to_string(), uid);
	}

	fn seed_group(&self, group: &str, gid: u32) {
		self.groups.lock().unwrap().insert(group.to_string(), gid);
	}
}

struct MockDirectory(Arc<MockState>);

#[async_trait]
impl DirectoryAdapter for MockDirectory {
	async fn exists(&self, login: &str, numeric_id: u32) -> Result<bool, BackendError> {
		self.0.enter(Backend::Directory, "directory.exists")?;
		let accounts = self.0.accounts.lock().unwrap();
		Ok(accounts.contains_key(login) || accounts.values().any(|&uid| uid == numeric_id))
	}

	async fn group_exists(&self, group: &str) -> Result<bool, BackendError> {
		self.0.enter(Backend::Directory, "directory.group_exists")?;
		Ok(self.0.groups.lock().unwrap().contains_key(group))
	}

	async fn create_personal_group(
		&self,
		login: &str,
		numeric_id: u32,
	) -> Result<(), BackendError> {
		self
			.0
			.enter(Backend::Directory, "directory.create_personal_group")?;
		self
			.0
			.groups
			.lock()
			.unwrap()
			.insert(login.to_string(), numeric_id);
		Ok(())
	}

	async fn create_group(&self, group: &str) -> Result<(), BackendError> {
		self.0.enter(Backend::Directory, "directory.create_group")?;
		let mut groups = self.0.groups.lock().unwrap();
		let gid = 10000 + groups.len() as u32;
		groups.insert(group.to_string(), gid);
		Ok(())
	}

	async fn delete_group(&self, group: &str) -> Result<(), BackendError> {
		self.0.enter(Backend::Directory, "directory.delete_group")?;
		self.0.groups.lock().unwrap().remove(group);
		Ok(())
	}

	async fn add_member(&self, group: &str, login: &str) -> Result<(), BackendError> {
		self.0.enter(Backend::Directory, "directory.add_member")?;
		self
			.0
			.memberships
			.lock()
			.unwrap()
			.insert((group.to_string(), login.to_string()));
		Ok(())
	}

	async fn remove_member(&self, group: &str, login: &str) -> Result<(), BackendError> {
		self.0.enter(Backend::Directory, "directory.remove_member")?;
		self
			.0
			.memberships
			.lock()
			.unwrap()
			.remove(&(group.to_string(), login.to_string()));
		Ok(())
	}

	async fn create_account(&self, account: NewAccount<'_>) -> Result<(), BackendError> {
		self.0.enter(Backend::Directory, "directory.create_account")?;
		self
			.0
			.accounts
			.lock()
			.unwrap()
			.insert(account.login.to_string(), account.numeric_id);
		Ok(())
	}

	async fn delete_account(&self, login: &str) -> Result<(), BackendError> {
		self.0.enter(Backend::Directory, "directory.delete_account")?;
		self.0.accounts.lock().unwrap().remove(login);
		Ok(())
	}

	async fn account_exists(&self, login: &str) -> Result<bool, BackendError> {
		self.0.enter(Backend::Directory, "directory.account_exists")?;
		Ok(self.0.accounts.lock().unwrap().contains_key(login))
	}

	async fn list_accounts(&self) -> Result<Vec<AccountSummary>, BackendError> {
		self.0.enter(Backend::Directory, "directory.list_accounts")?;
		Ok(
			self
				.0
				.accounts
				.lock()
				.unwrap()
				.iter()
				.map(|(login, &uid)| AccountSummary {
					login: login.clone(),
					uid_number: uid,
					display_name: login.clone(),
					home_directory: format!("/home/{login}"),
				})
				.collect(),
		)
	}
}

struct MockCredential(Arc<MockState>);

#[async_trait]
impl CredentialAdapter for MockCredential {
	async fn create_principal(
		&self,
		login: &str,
		secret: &SecretString,
	) -> Result<(), BackendError> {
		self
			.0
			.enter(Backend::Credential, "credential.create_principal")?;
		self.0.principals.lock().unwrap().insert(login.to_string());
		*self.0.last_secret.lock().unwrap() = Some(secret.expose().to_string());
		Ok(())
	}

	async fn delete_principal(&self, login: &str) -> Result<(), BackendError> {
		self
			.0
			.enter(Backend::Credential, "credential.delete_principal")?;
		self.0.principals.lock().unwrap().remove(login);
		Ok(())
	}

	async fn principal_exists(&self, login: &str) -> Result<bool, BackendError> {
		self
			.0
			.enter(Backend::Credential, "credential.principal_exists")?;
		Ok(self.0.principals.lock().unwrap().contains(login))
	}
}

struct MockFilesystem(Arc<MockState>);

#[async_trait]
impl FilesystemAdapter for MockFilesystem {
	async fn create_home(&self, login: &str, uid: u32, gid: u32) -> Result<(), BackendError> {
		self.0.enter(Backend::Filesystem, "filesystem.create_home")?;
		self
			.0
			.homes
			.lock()
			.unwrap()
			.insert(login.to_string(), (uid, gid));
		Ok(())
	}

	async fn remove_home(&self, login: &str) -> Result<(), BackendError> {
		self.0.enter(Backend::Filesystem, "filesystem.remove_home")?;
		self.0.homes.lock().unwrap().remove(login);
		Ok(())
	}

	async fn home_exists(&self, login: &str) -> Result<bool, BackendError> {
		self.0.enter(Backend::Filesystem, "filesystem.home_exists")?;
		Ok(self.0.homes.lock().unwrap().contains_key(login))
	}
}

struct MockQuota(Arc<MockState>);

#[async_trait]
impl QuotaAdapter for MockQuota {
	async fn set_quota(&self, login: &str) -> Result<(), BackendError> {
		self.0.enter(Backend::Quota, "quota.set_quota")?;
		self.0.quotas.lock().unwrap().insert(login.to_string());
		Ok(())
	}

	async fn remove_quota(&self, login: &str) -> Result<(), BackendError> {
		self.0.enter(Backend::Quota, "quota.remove_quota")?;
		self.0.quotas.lock().unwrap().remove(login);
		Ok(())
	}

	async fn usage_report(&self) -> Result<HashMap<String, QuotaUsage>, BackendError> {
		self.0.enter(Backend::Quota, "quota.usage_report")?;
		Ok(HashMap::new())
	}
}

fn provisioner() -> (Arc<MockState>, Provisioner) {
	let state = Arc::new(MockState::default());
	let provisioner = Provisioner::new(
		Arc::new(MockDirectory(Arc::clone(&state))),
		Arc::new(MockCredential(Arc::clone(&state))),
		Arc::new(MockFilesystem(Arc::clone(&state))),
		Arc::new(MockQuota(Arc::clone(&state))),
	);
	(state, provisioner)
}

fn request(login: &str, uid: u32) -> ProvisionRequest {
	ProvisionRequest {
		numeric_id: uid,
		supplementary_groups: ["students".to_string()].into(),
		login: login.to_string(),
		surname: "Авдеев".to_string(),
		given_name: "Дмитрий".to_string(),
		initial_secret: SecretString::new("PassWord1"),
	}
}

#[tokio::test]
async fn full_success_touches_all_backends() {
	let (state, provisioner) = provisioner();
	state.seed_group("students", 5000);

	let result = provisioner.provision(request("s24v_avdeev", 24201)).await;

	assert_eq!(result.status, ProvisionStatus::Succeeded);
	assert!(result.failure.is_none());
	assert!(result.warning.is_none());
	assert_eq!(
		result.completed_steps,
		vec![
			CompletedStep::PersonalGroup,
			CompletedStep::Membership {
				group: "students".to_string()
			},
			CompletedStep::Account,
			CompletedStep::Principal,
			CompletedStep::HomeDirectory,
			CompletedStep::Quota,
		]
	);

	assert_eq!(
		state.groups.lock().unwrap().get("s24v_avdeev"),
		Some(&24201)
	);
	assert!(state
		.memberships
		.lock()
		.unwrap()
		.contains(&("students".to_string(), "s24v_avdeev".to_string())));
	assert_eq!(
		state.accounts.lock().unwrap().get("s24v_avdeev"),
		Some(&24201)
	);
	assert!(state.principals.lock().unwrap().contains("s24v_avdeev"));
	assert_eq!(
		state.homes.lock().unwrap().get("s24v_avdeev"),
		Some(&(24201, 24201))
	);
	assert!(state.quotas.lock().unwrap().contains("s24v_avdeev"));

	// The secret reached the credential backend and nothing else: the
	// directory contract has no parameter that could carry it.
	assert_eq!(
		state.last_secret.lock().unwrap().as_deref(),
		Some("PassWord1")
	);
}

#[tokio::test]
async fn creates_absent_supplementary_group_on_demand() {
	let (state, provisioner) = provisioner();

	let result = provisioner.provision(request("u1", 1001)).await;

	assert_eq!(result.status, ProvisionStatus::Succeeded);
	assert_eq!(
		result.completed_steps[..3],
		[
			CompletedStep::PersonalGroup,
			CompletedStep::SupplementaryGroup {
				group: "students".to_string()
			},
			CompletedStep::Membership {
				group: "students".to_string()
			},
		]
	);
	assert!(state.groups.lock().unwrap().contains_key("students"));
}

#[tokio::test]
async fn duplicate_login_fails_before_any_mutation() {
	let (state, provisioner) = provisioner();
	state.seed_account("u1", 1001);

	let result = provisioner.provision(request("u1", 2002)).await;

	assert_eq!(result.status, ProvisionStatus::Failed);
	let failure = result.failure.unwrap();
	assert_eq!(failure.kind, FailureKind::DuplicateIdentity);
	assert!(result.completed_steps.is_empty());
	assert_eq!(state.calls(), vec!["directory.exists"]);
}

#[tokio::test]
async fn duplicate_numeric_id_fails_before_any_mutation() {
	let (state, provisioner) = provisioner();
	state.seed_account("someone_else", 1001);

	let result = provisioner.provision(request("u1", 1001)).await;

	assert_eq!(result.status, ProvisionStatus::Failed);
	assert_eq!(
		result.failure.unwrap().kind,
		FailureKind::DuplicateIdentity
	);
	assert_eq!(state.calls(), vec!["directory.exists"]);
}

#[tokio::test]
async fn credential_failure_rolls_back_in_reverse_order() {
	let (state, provisioner) = provisioner();
	state.seed_group("students", 5000);
	state.fail("credential.create_principal");

	let result = provisioner.provision(request("u1", 1001)).await;

	assert_eq!(result.status, ProvisionStatus::RolledBack);
	assert_eq!(
		result.failure.as_ref().unwrap().kind,
		FailureKind::BackendOperationFailed
	);
	assert!(!result.compensation_incomplete());

	assert_eq!(
		state.calls(),
		vec![
			"directory.exists",
			"directory.create_personal_group",
			"directory.group_exists",
			"directory.add_member",
			"directory.create_account",
			"credential.create_principal",
			"directory.delete_account",
			"directory.remove_member",
			"directory.delete_group",
		]
	);

	// No residue for any reversed step.
	assert!(!state.accounts.lock().unwrap().contains_key("u1"));
	assert!(!state.groups.lock().unwrap().contains_key("u1"));
	assert!(state.memberships.lock().unwrap().is_empty());
	// The pre-existing group itself is left in place.
	assert!(state.groups.lock().unwrap().contains_key("students"));
}

#[tokio::test]
async fn home_failure_also_undoes_principal() {
	let (state, provisioner) = provisioner();
	state.seed_group("students", 5000);
	state.fail("filesystem.create_home");

	let result = provisioner.provision(request("u1", 1001)).await;

	assert_eq!(result.status, ProvisionStatus::RolledBack);
	assert!(!state.principals.lock().unwrap().contains("u1"));
	assert!(!state.accounts.lock().unwrap().contains_key("u1"));
	assert!(!state.homes.lock().unwrap().contains_key("u1"));
}

#[tokio::test]
async fn membership_failure_undoes_on_demand_group_creation() {
	let (state, provisioner) = provisioner();
	state.fail("directory.add_member");

	let result = provisioner.provision(request("u1", 1001)).await;

	assert_eq!(result.status, ProvisionStatus::RolledBack);
	assert_eq!(
		result.failure.as_ref().unwrap().kind,
		FailureKind::BackendOperationFailed
	);
	assert!(!result.compensation_incomplete());

	// "students" was created by this request and the membership never
	// committed, so rollback deletes the group without a member removal.
	assert_eq!(
		state.calls(),
		vec![
			"directory.exists",
			"directory.create_personal_group",
			"directory.group_exists",
			"directory.create_group",
			"directory.add_member",
			"directory.delete_group",
			"directory.delete_group",
		]
	);
	assert!(state.groups.lock().unwrap().is_empty());
	assert!(state.memberships.lock().unwrap().is_empty());
}

#[tokio::test]
async fn rollback_deletes_groups_created_on_demand() {
	let (state, provisioner) = provisioner();
	state.fail("credential.create_principal");

	let result = provisioner.provision(request("u1", 1001)).await;

	assert_eq!(result.status, ProvisionStatus::RolledBack);
	// "students" was created by this request, so rollback removed it.
	assert!(!state.groups.lock().unwrap().contains_key("students"));
}

#[tokio::test]
async fn quota_failure_is_soft() {
	let (state, provisioner) = provisioner();
	state.seed_group("students", 5000);
	state.fail("quota.set_quota");

	let result = provisioner.provision(request("u1", 1001)).await;

	assert_eq!(result.status, ProvisionStatus::Succeeded);
	let warning = result.warning.unwrap();
	assert_eq!(warning.kind, FailureKind::BackendOperationFailed);
	assert_eq!(warning.backend, Some(Backend::Quota));
	assert!(!result
		.completed_steps
		.contains(&CompletedStep::Quota));

	// Everything else exists and stays.
	assert!(state.accounts.lock().unwrap().contains_key("u1"));
	assert!(state.principals.lock().unwrap().contains("u1"));
	assert!(state.homes.lock().unwrap().contains_key("u1"));
}

#[tokio::test]
async fn compensation_failure_is_surfaced_and_remaining_compensations_run() {
	let (state, provisioner) = provisioner();
	state.seed_group("students", 5000);
	state.fail("credential.create_principal");
	state.fail("directory.delete_account");

	let result = provisioner.provision(request("u1", 1001)).await;

	assert_eq!(result.status, ProvisionStatus::RolledBack);
	assert!(result.compensation_incomplete());
	assert_eq!(result.compensation_failures.len(), 1);
	assert_eq!(
		result.compensation_failures[0].step,
		CompletedStep::Account
	);

	// Later compensations still ran despite the earlier one failing.
	let calls = state.calls();
	assert!(calls.contains(&"directory.remove_member".to_string()));
	assert!(calls.contains(&"directory.delete_group".to_string()));
}

#[tokio::test]
async fn batch_isolates_malformed_records() {
	let (_state, provisioner) = provisioner();

	let lines = [
		"1001 students u1 Doe Jane pw1",
		"not-a-number students u2 Roe John pw2",
		"",
		"# a comment",
		"1003 students u3 Poe Ada pw3",
	];
	let report = provisioner.run_batch(lines).await;

	assert_eq!(report.results.len(), 3);
	assert_eq!(report.succeeded(), 2);
	assert_eq!(report.failed(), 1);

	assert_eq!(report.results[0].login, "u1");
	assert_eq!(report.results[0].status, ProvisionStatus::Succeeded);

	assert_eq!(report.results[1].login, "u2");
	assert_eq!(report.results[1].status, ProvisionStatus::Failed);
	assert_eq!(
		report.results[1].failure.as_ref().unwrap().kind,
		FailureKind::MalformedRecord
	);

	assert_eq!(report.results[2].login, "u3");
	assert_eq!(report.results[2].status, ProvisionStatus::Succeeded);
}

#[tokio::test]
async fn batch_record_failure_does_not_leak_into_next_record() {
	let (state, provisioner) = provisioner();
	state.seed_account("u1", 1001);

	let lines = ["1001 students u1 Doe Jane pw1", "1002 students u2 Roe John pw2"];
	let report = provisioner.run_batch(lines).await;

	assert_eq!(report.results.len(), 2);
	assert_eq!(report.results[0].status, ProvisionStatus::Failed);
	assert_eq!(report.results[1].status, ProvisionStatus::Succeeded);
	assert!(state.accounts.lock().unwrap().contains_key("u2"));
}

#[tokio::test]
async fn deprovision_is_idempotent() {
	let (state, provisioner) = provisioner();
	state.seed_group("students", 5000);
	provisioner.provision(request("u1", 1001)).await;

	let first = provisioner.deprovision("u1").await;
	assert!(first.fully_clean());
	assert!(first
		.steps
		.iter()
		.all(|s| matches!(s.outcome, StepOutcome::Removed)));

	let second = provisioner.deprovision("u1").await;
	assert!(second.fully_clean());
	for step in &second.steps {
		match step.action {
			// Resetting absent limits is a no-op for the quota tools.
			enroll_core::DeprovisionAction::Quota => {
				assert!(matches!(step.outcome, StepOutcome::Removed))
			}
			_ => assert!(matches!(step.outcome, StepOutcome::AlreadyAbsent)),
		}
	}
}

#[tokio::test]
async fn deprovision_continues_past_failures() {
	let (state, provisioner) = provisioner();
	state.seed_group("students", 5000);
	provisioner.provision(request("u1", 1001)).await;
	state.fail("directory.delete_account");

	let result = provisioner.deprovision("u1").await;

	assert!(!result.fully_clean());
	let account_step = result
		.steps
		.iter()
		.find(|s| s.action == enroll_core::DeprovisionAction::Account)
		.unwrap();
	assert!(matches!(account_step.outcome, StepOutcome::Failed { .. }));

	// Later steps still ran.
	assert!(!state.homes.lock().unwrap().contains_key("u1"));
	assert!(!state.principals.lock().unwrap().contains("u1"));
}

#[test]
fn result_serializes_with_snake_case_status() {
	let result = enroll_core::ProvisionResult::failed(
		"u1".to_string(),
		enroll_core::Failure::duplicate_identity("u1", 1001),
	);
	let json = serde_json::to_value(&result).unwrap();
	assert_eq!(json["status"], "failed");
	assert_eq!(json["failure"]["kind"], "duplicate_identity");
}
