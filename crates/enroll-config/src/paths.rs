// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! XDG Base Directory compliant path resolution.

use std::path::PathBuf;

use crate::ConfigError;

/// Resolve the user config file path.
///
/// Uses `XDG_CONFIG_HOME` if set, otherwise `~/.config`, giving
/// `~/.config/enroll/config.toml`.
pub fn resolve_config_path() -> Result<PathBuf, ConfigError> {
	let home = dirs::home_dir().ok_or(ConfigError::HomeDirNotFound)?;

	let config_home = std::env::var_os("XDG_CONFIG_HOME")
		.map(PathBuf::from)
		.unwrap_or_else(|| home.join(".config"));

	let path = config_home.join("enroll/config.toml");
	tracing::debug!(path = %path.display(), "resolved user config path");
	Ok(path)
}
