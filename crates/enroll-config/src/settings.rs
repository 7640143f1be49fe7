// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Typed configuration for the provisioning backends.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, SecretString};

/// Top-level configuration, one section per backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollConfig {
	pub directory: DirectoryConfig,
	pub kerberos: KerberosConfig,
	#[serde(default)]
	pub home: HomeConfig,
	pub quota: QuotaConfig,
	#[serde(default)]
	pub logging: LoggingConfig,
}

/// LDAP directory settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
	/// Server URL, e.g. `ldap://localhost:389`.
	pub url: String,
	/// DN to bind as for administrative operations.
	pub bind_dn: String,
	/// Bind password; may instead come from `ENROLL_DIRECTORY_PASSWORD`.
	#[serde(default)]
	pub bind_password: SecretString,
	/// Suffix under which people and groups live, e.g. `dc=example,dc=org`.
	pub base_dn: String,
	#[serde(default = "default_people_ou")]
	pub people_ou: String,
	#[serde(default = "default_group_ou")]
	pub group_ou: String,
	/// Shell written into new account entries.
	#[serde(default = "default_login_shell")]
	pub login_shell: String,
}

/// Kerberos credential authority settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KerberosConfig {
	/// Realm new principals are created in, e.g. `EXAMPLE.ORG`.
	pub realm: String,
	/// Administrative principal used for kadmin operations.
	pub admin_principal: String,
	/// kadmin password; may instead come from `ENROLL_KADMIN_PASSWORD`.
	#[serde(default)]
	pub admin_password: SecretString,
}

/// Home directory materialization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeConfig {
	#[serde(default = "default_home_base")]
	pub base_dir: PathBuf,
	#[serde(default = "default_skeleton_dir")]
	pub skeleton_dir: PathBuf,
	/// Octal permission string applied to the home directory itself.
	#[serde(default = "default_home_permissions")]
	pub permissions: String,
}

impl HomeConfig {
	/// Parse the configured permission string as an octal mode.
	pub fn mode(&self) -> Result<u32, ConfigError> {
		u32::from_str_radix(&self.permissions, 8).map_err(|_| {
			ConfigError::invalid_value(
				"home.permissions",
				format!("'{}' is not a valid octal mode", self.permissions),
			)
		})
	}

	/// Absolute path of a login's home directory.
	pub fn home_path(&self, login: &str) -> PathBuf {
		self.base_dir.join(login)
	}
}

impl Default for HomeConfig {
	fn default() -> Self {
		Self {
			base_dir: default_home_base(),
			skeleton_dir: default_skeleton_dir(),
			permissions: default_home_permissions(),
		}
	}
}

/// Disk quota settings.
///
/// Limits are passed through to the quota tools verbatim, so size suffixes
/// (`100M`) are allowed where the tool accepts them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
	pub block_soft: String,
	pub block_hard: String,
	pub inode_soft: String,
	pub inode_hard: String,
	/// Filesystem kind hosting the home directories. When omitted it is
	/// detected at startup from the mount table.
	#[serde(default)]
	pub filesystem: Option<FilesystemKind>,
}

/// The quota backends the tooling knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilesystemKind {
	Xfs,
	Ext4,
}

impl FromStr for FilesystemKind {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"xfs" => Ok(FilesystemKind::Xfs),
			// Older ext revisions share the ext4 quota tooling.
			"ext4" | "ext3" | "ext2" => Ok(FilesystemKind::Ext4),
			other => Err(ConfigError::invalid_value(
				"quota.filesystem",
				format!("unsupported filesystem type '{other}'"),
			)),
		}
	}
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
	#[serde(default = "default_log_level")]
	pub level: String,
}

impl Default for LoggingConfig {
	fn default() -> Self {
		Self {
			level: default_log_level(),
		}
	}
}

fn default_people_ou() -> String {
	"ou=people".to_string()
}

fn default_group_ou() -> String {
	"ou=groups".to_string()
}

fn default_login_shell() -> String {
	"/bin/bash".to_string()
}

fn default_home_base() -> PathBuf {
	PathBuf::from("/home")
}

fn default_skeleton_dir() -> PathBuf {
	PathBuf::from("/etc/skel")
}

fn default_home_permissions() -> String {
	"750".to_string()
}

fn default_log_level() -> String {
	"info".to_string()
}

impl EnrollConfig {
	/// Check invariants that TOML typing alone cannot express.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.directory.url.is_empty() {
			return Err(ConfigError::validation("directory.url must not be empty"));
		}
		if self.directory.base_dn.is_empty() {
			return Err(ConfigError::validation(
				"directory.base_dn must not be empty",
			));
		}
		if self.kerberos.realm.is_empty() {
			return Err(ConfigError::validation("kerberos.realm must not be empty"));
		}
		self.home.mode()?;
		for (field, value) in [
			("quota.block_soft", &self.quota.block_soft),
			("quota.block_hard", &self.quota.block_hard),
			("quota.inode_soft", &self.quota.inode_soft),
			("quota.inode_hard", &self.quota.inode_hard),
		] {
			if value.is_empty() {
				return Err(ConfigError::validation(format!("{field} must not be empty")));
			}
		}
		Ok(())
	}
}
