// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Filesystem kind detection from the mount table.

use std::path::Path;

use tracing::{debug, warn};

use enroll_config::FilesystemKind;
use enroll_core::Backend;

use crate::run_tool;

/// Determine the filesystem kind hosting `path` via `df -T`.
///
/// Falls back to ext4 when the tool is missing or the output names a
/// filesystem the quota tooling does not cover.
pub async fn detect_filesystem(path: &Path) -> FilesystemKind {
	let args = ["-T".to_string(), path.display().to_string()];
	let output = match run_tool(Backend::Quota, "detect_filesystem", "df", &args).await {
		Ok(output) if output.status.success() => output,
		Ok(_) | Err(_) => {
			warn!(path = %path.display(), "df -T failed, assuming ext4");
			return FilesystemKind::Ext4;
		}
	};

	let stdout = String::from_utf8_lossy(&output.stdout);
	match parse_df_fstype(&stdout).and_then(|t| t.parse::<FilesystemKind>().ok()) {
		Some(kind) => {
			debug!(path = %path.display(), ?kind, "detected filesystem kind");
			kind
		}
		None => {
			warn!(path = %path.display(), "unrecognized filesystem type, assuming ext4");
			FilesystemKind::Ext4
		}
	}
}

/// Pull the type column out of `df -T` output.
fn parse_df_fstype(output: &str) -> Option<String> {
	let data_line = output.lines().nth(1)?;
	let parts: Vec<&str> = data_line.split_whitespace().collect();
	parts.get(1).map(|t| t.to_string())
}
