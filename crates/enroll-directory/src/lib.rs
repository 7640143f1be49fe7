// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! LDAP implementation of the directory adapter.
//!
//! Accounts are posixAccount entries under the people OU, groups are
//! posixGroup entries under the group OU. The wire protocol is the `ldap3`
//! client's business; this crate only builds DNs, filters, and attribute
//! sets, and maps results onto [`BackendError`].

mod dn;

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use ldap3::{ldap_escape, Ldap, LdapConnAsync, Mod, Scope, SearchEntry};
use tracing::{debug, info};

use enroll_config::{DirectoryConfig, HomeConfig};
use enroll_core::{AccountSummary, Backend, BackendError, DirectoryAdapter, NewAccount};

pub use dn::DnBuilder;

/// Lowest gidNumber handed out when creating supplementary groups.
const GID_FLOOR: u32 = 10000;

/// Directory adapter over a bound LDAP session.
pub struct LdapDirectory {
	ldap: Ldap,
	dn: DnBuilder,
	login_shell: String,
	home: HomeConfig,
}

impl LdapDirectory {
	/// Connect and bind with the configured administrative DN.
	///
	/// A connection or bind failure is `BackendUnavailable`; nothing has
	/// been mutated at that point.
	pub async fn connect(
		config: &DirectoryConfig,
		home: HomeConfig,
	) -> Result<Self, BackendError> {
		let (conn, mut ldap) = LdapConnAsync::new(&config.url)
			.await
			.map_err(|e| BackendError::unavailable(Backend::Directory, e.to_string()))?;
		ldap3::drive!(conn);

		ldap
			.simple_bind(&config.bind_dn, config.bind_password.expose())
			.await
			.and_then(|r| r.success())
			.map_err(|e| {
				BackendError::unavailable(Backend::Directory, format!("bind failed: {e}"))
			})?;

		info!(url = %config.url, bind_dn = %config.bind_dn, "bound to directory");

		Ok(Self {
			ldap,
			dn: DnBuilder::new(config),
			login_shell: config.login_shell.clone(),
			home,
		})
	}

	fn ldap(&self) -> Ldap {
		self.ldap.clone()
	}

	/// Count entries matching `filter` under `base`.
	async fn search_count(
		&self,
		base: &str,
		filter: &str,
		operation: &'static str,
	) -> Result<usize, BackendError> {
		let (entries, _res) = self
			.ldap()
			.search(base, Scope::Subtree, filter, vec!["dn"])
			.await
			.and_then(|r| r.success())
			.map_err(|e| op_err(operation, e))?;
		Ok(entries.len())
	}

	/// Highest gidNumber currently assigned under the group OU.
	async fn max_gid(&self) -> Result<u32, BackendError> {
		let (entries, _res) = self
			.ldap()
			.search(
				&self.dn.group_base(),
				Scope::Subtree,
				"(objectClass=posixGroup)",
				vec!["gidNumber"],
			)
			.await
			.and_then(|r| r.success())
			.map_err(|e| op_err("create_group", e))?;

		let max = entries
			.into_iter()
			.filter_map(|e| {
				SearchEntry::construct(e)
					.attrs
					.get("gidNumber")
					.and_then(|vals| vals.first())
					.and_then(|v| v.parse::<u32>().ok())
			})
			.max()
			.unwrap_or(0);
		Ok(max)
	}
}

fn op_err(operation: &'static str, e: ldap3::LdapError) -> BackendError {
	BackendError::operation(Backend::Directory, operation, e.to_string())
}

fn attr(name: &str, values: &[&str]) -> (String, HashSet<String>) {
	(
		name.to_string(),
		values.iter().map(|v| v.to_string()).collect(),
	)
}

#[async_trait]
impl DirectoryAdapter for LdapDirectory {
	async fn exists(&self, login: &str, numeric_id: u32) -> Result<bool, BackendError> {
		let filter = format!(
			"(|(uid={login})(uidNumber={numeric_id}))",
			login = ldap_escape(login)
		);
		let hits = self
			.search_count(&self.dn.people_base(), &filter, "exists")
			.await?;
		debug!(login, numeric_id, hits, "existence check");
		Ok(hits > 0)
	}

	async fn group_exists(&self, group: &str) -> Result<bool, BackendError> {
		let filter = format!("(cn={})", ldap_escape(group));
		let hits = self
			.search_count(&self.dn.group_base(), &filter, "group_exists")
			.await?;
		Ok(hits > 0)
	}

	async fn create_personal_group(
		&self,
		login: &str,
		numeric_id: u32,
	) -> Result<(), BackendError> {
		let gid = numeric_id.to_string();
		let attrs = vec![
			attr("objectClass", &["top", "posixGroup"]),
			attr("cn", &[login]),
			attr("gidNumber", &[&gid]),
			attr("memberUid", &[login]),
		];

		self
			.ldap()
			.add(&self.dn.group(login), attrs)
			.await
			.and_then(|r| r.success())
			.map_err(|e| op_err("create_personal_group", e))?;
		info!(group = login, gid = numeric_id, "created personal group");
		Ok(())
	}

	async fn create_group(&self, group: &str) -> Result<(), BackendError> {
		let gid = (self.max_gid().await?.max(GID_FLOOR - 1) + 1).to_string();
		let attrs = vec![
			attr("objectClass", &["top", "posixGroup"]),
			attr("cn", &[group]),
			attr("gidNumber", &[&gid]),
		];

		self
			.ldap()
			.add(&self.dn.group(group), attrs)
			.await
			.and_then(|r| r.success())
			.map_err(|e| op_err("create_group", e))?;
		info!(group, gid, "created supplementary group");
		Ok(())
	}

	async fn delete_group(&self, group: &str) -> Result<(), BackendError> {
		self
			.ldap()
			.delete(&self.dn.group(group))
			.await
			.and_then(|r| r.success())
			.map_err(|e| op_err("delete_group", e))?;
		info!(group, "deleted group");
		Ok(())
	}

	async fn add_member(&self, group: &str, login: &str) -> Result<(), BackendError> {
		let mods = vec![Mod::Add(
			"memberUid".to_string(),
			HashSet::from([login.to_string()]),
		)];
		self
			.ldap()
			.modify(&self.dn.group(group), mods)
			.await
			.and_then(|r| r.success())
			.map_err(|e| op_err("add_member", e))?;
		debug!(group, login, "added member");
		Ok(())
	}

	async fn remove_member(&self, group: &str, login: &str) -> Result<(), BackendError> {
		let mods = vec![Mod::Delete(
			"memberUid".to_string(),
			HashSet::from([login.to_string()]),
		)];
		self
			.ldap()
			.modify(&self.dn.group(group), mods)
			.await
			.and_then(|r| r.success())
			.map_err(|e| op_err("remove_member", e))?;
		debug!(group, login, "removed member");
		Ok(())
	}

	async fn create_account(&self, account: NewAccount<'_>) -> Result<(), BackendError> {
		let uid = account.numeric_id.to_string();
		let full_name = format!("{} {}", account.given_name, account.surname);
		let home_dir = self.home.home_path(account.login).display().to_string();

		let attrs = vec![
			attr(
				"objectClass",
				&[
					"top",
					"person",
					"organizationalPerson",
					"inetOrgPerson",
					"posixAccount",
					"shadowAccount",
				],
			),
			attr("uid", &[account.login]),
			attr("uidNumber", &[&uid]),
			attr("gidNumber", &[&uid]),
			attr("cn", &[&full_name]),
			attr("sn", &[account.surname]),
			attr("givenName", &[account.given_name]),
			attr("homeDirectory", &[&home_dir]),
			attr("loginShell", &[&self.login_shell]),
		];

		self
			.ldap()
			.add(&self.dn.user(account.login), attrs)
			.await
			.and_then(|r| r.success())
			.map_err(|e| op_err("create_account", e))?;
		info!(login = account.login, uid = account.numeric_id, "created account entry");
		Ok(())
	}

	async fn delete_account(&self, login: &str) -> Result<(), BackendError> {
		self
			.ldap()
			.delete(&self.dn.user(login))
			.await
			.and_then(|r| r.success())
			.map_err(|e| op_err("delete_account", e))?;
		info!(login, "deleted account entry");
		Ok(())
	}

	async fn account_exists(&self, login: &str) -> Result<bool, BackendError> {
		let filter = format!("(uid={})", ldap_escape(login));
		let hits = self
			.search_count(&self.dn.people_base(), &filter, "account_exists")
			.await?;
		Ok(hits > 0)
	}

	async fn list_accounts(&self) -> Result<Vec<AccountSummary>, BackendError> {
		let (entries, _res) = self
			.ldap()
			.search(
				&self.dn.people_base(),
				Scope::Subtree,
				"(objectClass=posixAccount)",
				vec!["uid", "uidNumber", "cn", "homeDirectory"],
			)
			.await
			.and_then(|r| r.success())
			.map_err(|e| op_err("list_accounts", e))?;

		let mut accounts: Vec<AccountSummary> = entries
			.into_iter()
			.filter_map(|e| summary_from_attrs(SearchEntry::construct(e).attrs))
			.collect();
		accounts.sort_by(|a, b| a.login.cmp(&b.login));
		Ok(accounts)
	}
}

fn summary_from_attrs(attrs: HashMap<String, Vec<String>>) -> Option<AccountSummary> {
	let first = |name: &str| attrs.get(name).and_then(|v| v.first()).cloned();
	Some(AccountSummary {
		login: first("uid")?,
		uid_number: first("uidNumber")?.parse().ok()?,
		display_name: first("cn").unwrap_or_default(),
		home_directory: first("homeDirectory").unwrap_or_default(),
	})
}
