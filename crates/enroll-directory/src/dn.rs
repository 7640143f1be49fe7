// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Distinguished name construction from the configured suffixes.

use enroll_config::DirectoryConfig;
use ldap3::dn_escape;

/// Builds user and group DNs under the configured base.
#[derive(Debug, Clone)]
pub struct DnBuilder {
	base_dn: String,
	people_ou: String,
	group_ou: String,
}

impl DnBuilder {
	pub fn new(config: &DirectoryConfig) -> Self {
		Self {
			base_dn: config.base_dn.clone(),
			people_ou: config.people_ou.clone(),
			group_ou: config.group_ou.clone(),
		}
	}

	/// Container all account entries live under.
	pub fn people_base(&self) -> String {
		format!("{},{}", self.people_ou, self.base_dn)
	}

	/// Container all group entries live under.
	pub fn group_base(&self) -> String {
		format!("{},{}", self.group_ou, self.base_dn)
	}

	pub fn user(&self, login: &str) -> String {
		format!("uid={},{}", dn_escape(login), self.people_base())
	}

	pub fn group(&self, name: &str) -> String {
		format!("cn={},{}", dn_escape(name), self.group_base())
	}
}
