// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration management for the enroll provisioning tool.
//!
//! This crate provides:
//! - XDG compliant config path resolution
//! - TOML configuration file parsing with a commented default template
//! - Environment variable overrides for the administrative secrets
//!   (including `*_FILE` indirection)
//! - Configuration validation
//! - [`SecretString`]: a wrapper that keeps passwords out of logs and
//!   serialized output

pub mod error;
pub mod paths;
pub mod secret;
pub mod settings;

use std::path::{Path, PathBuf};

pub use error::ConfigError;
pub use paths::resolve_config_path;
pub use secret::{SecretString, REDACTED};
pub use settings::{
	DirectoryConfig, EnrollConfig, FilesystemKind, HomeConfig, KerberosConfig, LoggingConfig,
	QuotaConfig,
};

/// Template written on first run so the operator has something to edit.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# enroll configuration.
# Edit the values below before provisioning any users.

[directory]
url = "ldap://localhost:389"
bind_dn = "cn=admin,dc=example,dc=org"
# Leave empty and set ENROLL_DIRECTORY_PASSWORD (or _FILE) to avoid
# keeping the password on disk.
bind_password = ""
base_dn = "dc=example,dc=org"
people_ou = "ou=people"
group_ou = "ou=groups"
login_shell = "/bin/bash"

[kerberos]
realm = "EXAMPLE.ORG"
admin_principal = "admin/admin@EXAMPLE.ORG"
# Leave empty and set ENROLL_KADMIN_PASSWORD (or _FILE).
admin_password = ""

[home]
base_dir = "/home"
skeleton_dir = "/etc/skel"
permissions = "750"

[quota]
block_soft = "100M"
block_hard = "200M"
inode_soft = "1000"
inode_hard = "2000"
# Omit to auto-detect from the mount hosting base_dir. One of: xfs, ext4.
# filesystem = "xfs"

[logging]
level = "info"
"#;

/// Load configuration from the given path, or from the default XDG
/// location when none is supplied.
///
/// When no user config file exists at the default location, the template is
/// written there first. Environment overrides are applied after parsing:
///
/// - `ENROLL_DIRECTORY_PASSWORD` / `ENROLL_DIRECTORY_PASSWORD_FILE`
/// - `ENROLL_KADMIN_PASSWORD` / `ENROLL_KADMIN_PASSWORD_FILE`
pub fn load_config(explicit: Option<&Path>) -> Result<EnrollConfig, ConfigError> {
	let path = match explicit {
		Some(p) => p.to_path_buf(),
		None => {
			let p = resolve_config_path()?;
			ensure_default_config(&p)?;
			p
		}
	};

	let raw = std::fs::read_to_string(&path)?;
	let mut config: EnrollConfig =
		toml::from_str(&raw).map_err(|source| ConfigError::TomlParse {
			path: path.clone(),
			source,
		})?;

	apply_env_overrides(&mut config)?;
	config.validate()?;

	tracing::debug!(path = %path.display(), "loaded configuration");
	Ok(config)
}

/// Write the default template if no config file exists yet.
///
/// Returns `true` when the template was created.
pub fn ensure_default_config(path: &PathBuf) -> Result<bool, ConfigError> {
	if path.exists() {
		return Ok(false);
	}

	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent)?;
	}
	std::fs::write(path, DEFAULT_CONFIG_TEMPLATE)?;
	tracing::info!(path = %path.display(), "created default config; edit it before use");
	Ok(true)
}

fn apply_env_overrides(config: &mut EnrollConfig) -> Result<(), ConfigError> {
	if let Some(secret) = load_secret_env("ENROLL_DIRECTORY_PASSWORD")? {
		config.directory.bind_password = secret;
	}
	if let Some(secret) = load_secret_env("ENROLL_KADMIN_PASSWORD")? {
		config.kerberos.admin_password = secret;
	}
	Ok(())
}

/// Load a secret from `NAME` or, preferentially, from the file named by
/// `NAME_FILE` (trailing newline stripped).
pub fn load_secret_env(name: &str) -> Result<Option<SecretString>, ConfigError> {
	let file_var = format!("{name}_FILE");
	if let Ok(path) = std::env::var(&file_var) {
		let contents = std::fs::read_to_string(&path)
			.map_err(|e| ConfigError::Env(format!("{file_var} points at unreadable {path}: {e}")))?;
		return Ok(Some(SecretString::new(contents.trim_end().to_string())));
	}

	match std::env::var(name) {
		Ok(value) => Ok(Some(SecretString::new(value))),
		Err(std::env::VarError::NotPresent) => Ok(None),
		Err(e) => Err(ConfigError::Env(format!("{name}: {e}"))),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_template_parses_and_validates() {
		let config: EnrollConfig = toml::from_str(DEFAULT_CONFIG_TEMPLATE).unwrap();
		config.validate().unwrap();
		assert_eq!(config.kerberos.realm, "EXAMPLE.ORG");
	}

	#[test]
	fn ensure_default_config_writes_template_once() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("enroll/config.toml");

		assert!(ensure_default_config(&path).unwrap());
		assert!(!ensure_default_config(&path).unwrap());
		let raw = std::fs::read_to_string(&path).unwrap();
		assert!(raw.contains("[directory]"));
	}

	#[test]
	fn load_config_reads_explicit_path() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config.toml");
		std::fs::write(&path, DEFAULT_CONFIG_TEMPLATE).unwrap();

		let config = load_config(Some(&path)).unwrap();
		assert_eq!(config.directory.people_ou, "ou=people");
	}
}
