// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Disk quota adapter over the external quota tools.
//!
//! The command shape is selected once, at construction, by filesystem
//! kind: `xfs_quota -x` for XFS, `setquota`/`quota` for the ext family.
//! The orchestrator only ever sees the [`QuotaAdapter`] contract.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, info};

use enroll_config::{FilesystemKind, QuotaConfig};
use enroll_core::{Backend, BackendError, QuotaAdapter, QuotaUsage};

use crate::run_tool;

/// Quota adapter for the filesystem mounted at the home base directory.
pub struct QuotaCommand {
	kind: FilesystemKind,
	limits: QuotaConfig,
	mount: PathBuf,
}

impl QuotaCommand {
	pub fn new(kind: FilesystemKind, limits: QuotaConfig, mount: PathBuf) -> Self {
		Self {
			kind,
			limits,
			mount,
		}
	}

	/// Command line applying the configured limits for `login`.
	fn set_command(&self, login: &str) -> (&'static str, Vec<String>) {
		self.limit_command(
			login,
			&self.limits.block_soft,
			&self.limits.block_hard,
			&self.limits.inode_soft,
			&self.limits.inode_hard,
		)
	}

	/// Command line resetting all limits for `login` to zero.
	fn clear_command(&self, login: &str) -> (&'static str, Vec<String>) {
		self.limit_command(login, "0", "0", "0", "0")
	}

	fn limit_command(
		&self,
		login: &str,
		bsoft: &str,
		bhard: &str,
		isoft: &str,
		ihard: &str,
	) -> (&'static str, Vec<String>) {
		let mount = self.mount.display().to_string();
		match self.kind {
			FilesystemKind::Xfs => (
				"xfs_quota",
				vec![
					"-x".to_string(),
					"-c".to_string(),
					format!("limit bsoft={bsoft} bhard={bhard} isoft={isoft} ihard={ihard} {login}"),
					mount,
				],
			),
			FilesystemKind::Ext4 => (
				"setquota",
				vec![
					"-u".to_string(),
					login.to_string(),
					bsoft.to_string(),
					bhard.to_string(),
					isoft.to_string(),
					ihard.to_string(),
					mount,
				],
			),
		}
	}

	async fn run(&self, operation: &'static str, login: &str, clear: bool) -> Result<(), BackendError> {
		let (program, args) = if clear {
			self.clear_command(login)
		} else {
			self.set_command(login)
		};

		let output = run_tool(Backend::Quota, operation, program, &args).await?;
		if !output.status.success() {
			let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
			return Err(BackendError::operation(Backend::Quota, operation, stderr));
		}
		Ok(())
	}
}

#[async_trait]
impl QuotaAdapter for QuotaCommand {
	async fn set_quota(&self, login: &str) -> Result<(), BackendError> {
		self.run("set_quota", login, false).await?;
		info!(login, kind = ?self.kind, "applied quota limits");
		Ok(())
	}

	async fn remove_quota(&self, login: &str) -> Result<(), BackendError> {
		self.run("remove_quota", login, true).await?;
		info!(login, "cleared quota limits");
		Ok(())
	}

	async fn usage_report(&self) -> Result<HashMap<String, QuotaUsage>, BackendError> {
		let mount = self.mount.display().to_string();
		match self.kind {
			FilesystemKind::Xfs => {
				let blocks = run_tool(
					Backend::Quota,
					"usage_report",
					"xfs_quota",
					&[
						"-x".to_string(),
						"-c".to_string(),
						"report -h".to_string(),
						mount.clone(),
					],
				)
				.await?;
				let inodes = run_tool(
					Backend::Quota,
					"usage_report",
					"xfs_quota",
					&[
						"-x".to_string(),
						"-c".to_string(),
						"report -h -i".to_string(),
						mount,
					],
				)
				.await?;

				let report = parse_xfs_report(
					&String::from_utf8_lossy(&blocks.stdout),
					&String::from_utf8_lossy(&inodes.stdout),
				);
				debug!(entries = report.len(), "parsed xfs quota report");
				Ok(report)
			}
			FilesystemKind::Ext4 => {
				let output = run_tool(
					Backend::Quota,
					"usage_report",
					"repquota",
					&["-a".to_string()],
				)
				.await?;
				let report = parse_ext_report(&String::from_utf8_lossy(&output.stdout));
				debug!(entries = report.len(), "parsed ext quota report");
				Ok(report)
			}
		}
	}
}

/// Rows in xfs_quota reports that are headers or separators, not users.
fn is_xfs_noise(first: &str) -> bool {
	matches!(first, "User" | "Project" | "root") || first.starts_with('-')
}

/// Parse a pair of `xfs_quota -x -c 'report -h'` outputs (blocks, then
/// inodes) into per-login usage.
fn parse_xfs_report(blocks: &str, inodes: &str) -> HashMap<String, QuotaUsage> {
	let mut report: HashMap<String, QuotaUsage> = HashMap::new();

	for line in blocks.lines() {
		let parts: Vec<&str> = line.split_whitespace().collect();
		if parts.len() >= 5 && !is_xfs_noise(parts[0]) {
			report.entry(parts[0].to_string()).or_default().blocks =
				Some(format!("{}/{}/{}", parts[1], parts[2], parts[3]));
		}
	}
	for line in inodes.lines() {
		let parts: Vec<&str> = line.split_whitespace().collect();
		if parts.len() >= 5 && !is_xfs_noise(parts[0]) {
			report.entry(parts[0].to_string()).or_default().inodes =
				Some(format!("{}/{}/{}", parts[1], parts[2], parts[3]));
		}
	}

	report
}

/// Parse `repquota -a` output into per-login usage.
///
/// Data rows look like `u1 -- 1024 102400 204800 12 1000 2000`, with a
/// `--`/`+-` grace column after the login.
fn parse_ext_report(output: &str) -> HashMap<String, QuotaUsage> {
	let mut report = HashMap::new();

	for line in output.lines() {
		let parts: Vec<&str> = line.split_whitespace().collect();
		if parts.len() >= 8
			&& parts[0] != "root"
			&& (parts[1].starts_with('-') || parts[1].starts_with('+'))
		{
			report.insert(
				parts[0].to_string(),
				QuotaUsage {
					blocks: Some(format!("{}/{}/{}", parts[2], parts[3], parts[4])),
					inodes: Some(format!("{}/{}/{}", parts[5], parts[6], parts[7])),
				},
			);
		}
	}

	report
}
