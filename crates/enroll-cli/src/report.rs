// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Text rendering of provisioning reports.
//!
//! The orchestrator hands back plain values; everything printable lives
//! here so the core stays free of I/O concerns.

use std::fmt::Write;

use serde::Serialize;

use enroll_core::{
	AccountSummary, BatchReport, DeprovisionResult, ProvisionResult, ProvisionStatus, QuotaUsage,
	StepOutcome,
};

pub fn render_provision_result(result: &ProvisionResult) -> String {
	let mut out = String::new();

	let status = match result.status {
		ProvisionStatus::Succeeded if result.warning.is_some() => "OK (with warning)",
		ProvisionStatus::Succeeded => "OK",
		ProvisionStatus::Failed => "FAILED",
		ProvisionStatus::RolledBack => "ROLLED BACK",
	};
	let _ = writeln!(out, "{}: {}", result.login, status);

	if let Some(ref failure) = result.failure {
		let _ = writeln!(out, "  error: {failure}");
	}
	if let Some(ref warning) = result.warning {
		let _ = writeln!(out, "  warning: {warning}");
	}
	for failure in &result.compensation_failures {
		let _ = writeln!(
			out,
			"  cleanup needed: {} was not reverted: {}",
			failure.step, failure.error
		);
	}

	out
}

pub fn render_batch_report(report: &BatchReport) -> String {
	let mut out = String::new();
	for result in &report.results {
		out.push_str(&render_provision_result(result));
	}
	let _ = writeln!(
		out,
		"{} succeeded, {} failed",
		report.succeeded(),
		report.failed()
	);
	out
}

pub fn render_deprovision_result(result: &DeprovisionResult) -> String {
	let mut out = String::new();
	let _ = writeln!(out, "{}:", result.login);
	for step in &result.steps {
		let outcome = match &step.outcome {
			StepOutcome::Removed => "removed".to_string(),
			StepOutcome::AlreadyAbsent => "already absent".to_string(),
			StepOutcome::Failed { error } => format!("FAILED: {error}"),
		};
		let _ = writeln!(out, "  {}: {}", step.action, outcome);
	}
	out
}

pub fn render_users(accounts: &[AccountSummary]) -> String {
	let mut out = String::new();
	let _ = writeln!(
		out,
		"{:<16} {:<8} {:<28} {}",
		"LOGIN", "UID", "NAME", "HOME"
	);
	for account in accounts {
		let _ = writeln!(
			out,
			"{:<16} {:<8} {:<28} {}",
			account.login, account.uid_number, account.display_name, account.home_directory
		);
	}
	out
}

/// One `list-users --detailed` row.
#[derive(Debug, Serialize)]
pub struct DetailedRow {
	#[serde(flatten)]
	pub account: AccountSummary,
	pub principal: bool,
	pub home: bool,
	pub quota: Option<QuotaUsage>,
}

pub fn render_users_detailed(rows: &[DetailedRow]) -> String {
	let mut out = String::new();
	let _ = writeln!(
		out,
		"{:<16} {:<8} {:<28} {:<9} {:<6} {}",
		"LOGIN", "UID", "NAME", "KERBEROS", "HOME", "QUOTA"
	);
	for row in rows {
		let quota = match &row.quota {
			Some(usage) => {
				let blocks = usage.blocks.as_deref().unwrap_or("-");
				let inodes = usage.inodes.as_deref().unwrap_or("-");
				format!("blocks: {blocks}; inodes: {inodes}")
			}
			None => "not set".to_string(),
		};
		let _ = writeln!(
			out,
			"{:<16} {:<8} {:<28} {:<9} {:<6} {}",
			row.account.login,
			row.account.uid_number,
			row.account.display_name,
			if row.principal { "yes" } else { "no" },
			if row.home { "yes" } else { "no" },
			quota
		);
	}
	out
}
