// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Credential adapter driving the MIT Kerberos `kadmin` tool.
//!
//! Principal management happens through one `kadmin -q <query>` invocation
//! per operation, authenticated as the configured admin principal. The
//! query strings are the only place the initial secret is interpolated, and
//! they are never logged.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use enroll_config::{KerberosConfig, SecretString};
use enroll_core::{Backend, BackendError, CredentialAdapter};

/// Credential adapter bound to one realm and admin principal.
pub struct KadminCredential {
	config: KerberosConfig,
}

impl KadminCredential {
	pub fn new(config: KerberosConfig) -> Self {
		Self { config }
	}

	/// Fully qualified principal for a login.
	fn principal(&self, login: &str) -> String {
		format!("{}@{}", login, self.config.realm)
	}

	/// Run one kadmin query and capture its output.
	async fn run_kadmin(
		&self,
		operation: &'static str,
		query: &str,
	) -> Result<std::process::Output, BackendError> {
		let mut cmd = Command::new("kadmin");
		cmd
			.arg("-p")
			.arg(&self.config.admin_principal)
			.arg("-w")
			.arg(self.config.admin_password.expose())
			.arg("-q")
			.arg(query);

		// The query can carry the secret; log only the operation name.
		debug!(operation, "running kadmin");

		cmd.output().await.map_err(|e| {
			if e.kind() == std::io::ErrorKind::NotFound {
				BackendError::unavailable(Backend::Credential, "kadmin not found in PATH")
			} else {
				BackendError::operation(Backend::Credential, operation, e.to_string())
			}
		})
	}
}

fn add_principal_query(principal: &str, secret: &SecretString) -> String {
	format!("addprinc -pw \"{}\" {}", secret.expose(), principal)
}

fn delete_principal_query(principal: &str) -> String {
	format!("delprinc -force {principal}")
}

fn get_principal_query(principal: &str) -> String {
	format!("getprinc {principal}")
}

#[async_trait]
impl CredentialAdapter for KadminCredential {
	async fn create_principal(
		&self,
		login: &str,
		secret: &SecretString,
	) -> Result<(), BackendError> {
		let principal = self.principal(login);
		let output = self
			.run_kadmin("create_principal", &add_principal_query(&principal, secret))
			.await?;

		if !output.status.success() {
			let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
			return Err(BackendError::operation(
				Backend::Credential,
				"create_principal",
				stderr,
			));
		}

		info!(%principal, "created principal");
		Ok(())
	}

	async fn delete_principal(&self, login: &str) -> Result<(), BackendError> {
		let principal = self.principal(login);
		let output = self
			.run_kadmin("delete_principal", &delete_principal_query(&principal))
			.await?;

		if !output.status.success() {
			let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
			return Err(BackendError::operation(
				Backend::Credential,
				"delete_principal",
				stderr,
			));
		}

		info!(%principal, "deleted principal");
		Ok(())
	}

	async fn principal_exists(&self, login: &str) -> Result<bool, BackendError> {
		let principal = self.principal(login);
		let output = self
			.run_kadmin("principal_exists", &get_principal_query(&principal))
			.await?;

		let stdout = String::from_utf8_lossy(&output.stdout);
		let stderr = String::from_utf8_lossy(&output.stderr);

		if output.status.success() && stdout.contains(&format!("Principal: {principal}")) {
			return Ok(true);
		}
		if stdout.contains("does not exist") || stderr.contains("does not exist") {
			return Ok(false);
		}
		Err(BackendError::operation(
			Backend::Credential,
			"principal_exists",
			stderr.trim().to_string(),
		))
	}
}
