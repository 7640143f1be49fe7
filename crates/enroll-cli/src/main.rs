// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The `enroll` command-line tool.
//!
//! Provisions and deprovisions user identities across the directory,
//! credential authority, home filesystem, and quota backends. Every
//! invocation yields exactly one report on stdout (text or `--json`) and a
//! process exit code of 0 only when everything succeeded.

mod report;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use enroll_config::{EnrollConfig, SecretString};
use enroll_core::{
	parse_groups, CredentialAdapter, DirectoryAdapter, FilesystemAdapter, ProvisionRequest,
	Provisioner, QuotaAdapter,
};
use enroll_directory::LdapDirectory;
use enroll_kadmin::KadminCredential;
use enroll_storage::{detect_filesystem, HomeDirectory, QuotaCommand};

#[derive(Parser)]
#[command(
	name = "enroll",
	about = "Provision user identities across LDAP, Kerberos, home storage, and quotas"
)]
struct Cli {
	/// Path to the config file (default: ~/.config/enroll/config.toml)
	#[arg(long, global = true)]
	config: Option<PathBuf>,

	/// Emit the report as JSON instead of text
	#[arg(long, global = true)]
	json: bool,

	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand)]
enum Commands {
	/// Provision a single user
	AddUser {
		/// Numeric id, used as both uid and personal-group gid
		numeric_id: u32,
		/// Supplementary groups, comma separated
		groups: String,
		login: String,
		surname: String,
		given_name: String,
		/// Initial password, handed to the credential authority only
		password: String,
	},
	/// Provision users from a batch file, one record per line
	AddFile {
		/// File with records: <id> <groups> <login> <surname> <given_name> <password>
		path: PathBuf,
	},
	/// List directory accounts
	ListUsers {
		/// Also check Kerberos, home directories, and quotas
		#[arg(long)]
		detailed: bool,
	},
	/// Remove a user from every backend, best effort
	DeleteUser { login: String },
}

impl Commands {
	fn name(&self) -> &'static str {
		match self {
			Commands::AddUser { .. } => "add-user",
			Commands::AddFile { .. } => "add-file",
			Commands::ListUsers { .. } => "list-users",
			Commands::DeleteUser { .. } => "delete-user",
		}
	}
}

/// The wired-up backend adapters, kept separately from the orchestrator so
/// read-only commands can reach them directly.
struct Backends {
	directory: Arc<dyn DirectoryAdapter>,
	credential: Arc<dyn CredentialAdapter>,
	filesystem: Arc<dyn FilesystemAdapter>,
	quota: Arc<dyn QuotaAdapter>,
}

impl Backends {
	async fn connect(config: &EnrollConfig) -> anyhow::Result<Self> {
		let directory = LdapDirectory::connect(&config.directory, config.home.clone())
			.await
			.context("connecting to the directory")?;

		let filesystem = HomeDirectory::new(config.home.clone())?;

		let kind = match config.quota.filesystem {
			Some(kind) => kind,
			None => detect_filesystem(&config.home.base_dir).await,
		};
		let quota = QuotaCommand::new(kind, config.quota.clone(), config.home.base_dir.clone());

		Ok(Self {
			directory: Arc::new(directory),
			credential: Arc::new(KadminCredential::new(config.kerberos.clone())),
			filesystem: Arc::new(filesystem),
			quota: Arc::new(quota),
		})
	}

	fn provisioner(&self) -> Provisioner {
		Provisioner::new(
			Arc::clone(&self.directory),
			Arc::clone(&self.credential),
			Arc::clone(&self.filesystem),
			Arc::clone(&self.quota),
		)
	}
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();

	let config =
		enroll_config::load_config(cli.config.as_deref()).context("loading configuration")?;
	init_tracing(&config.logging.level);

	let ok = run(&cli, &config).await?;
	if !ok {
		std::process::exit(1);
	}
	Ok(())
}

fn init_tracing(level: &str) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
}

async fn run(cli: &Cli, config: &EnrollConfig) -> anyhow::Result<bool> {
	debug!(command = cli.command.name(), json = cli.json, "dispatching");
	let backends = Backends::connect(config).await?;

	match &cli.command {
		Commands::AddUser {
			numeric_id,
			groups,
			login,
			surname,
			given_name,
			password,
		} => {
			for (name, value) in [("login", login), ("surname", surname), ("given name", given_name)]
			{
				anyhow::ensure!(!value.trim().is_empty(), "{name} must not be empty");
			}
			anyhow::ensure!(*numeric_id > 0, "numeric id must be positive");

			let request = ProvisionRequest {
				numeric_id: *numeric_id,
				supplementary_groups: parse_groups(groups),
				login: login.clone(),
				surname: surname.clone(),
				given_name: given_name.clone(),
				initial_secret: SecretString::new(password.clone()),
			};

			let result = backends.provisioner().provision(request).await;
			if cli.json {
				println!("{}", serde_json::to_string_pretty(&result)?);
			} else {
				print!("{}", report::render_provision_result(&result));
			}
			Ok(result.is_success())
		}

		Commands::AddFile { path } => {
			let contents = tokio::fs::read_to_string(path)
				.await
				.with_context(|| format!("reading {}", path.display()))?;

			let batch = backends.provisioner().run_batch(contents.lines()).await;
			if cli.json {
				println!("{}", serde_json::to_string_pretty(&batch)?);
			} else {
				print!("{}", report::render_batch_report(&batch));
			}
			Ok(batch.all_succeeded())
		}

		Commands::ListUsers { detailed } => {
			let accounts = backends.directory.list_accounts().await?;
			if *detailed {
				let quotas = backends.quota.usage_report().await.unwrap_or_default();
				let mut rows = Vec::with_capacity(accounts.len());
				for account in accounts {
					let principal = backends
						.credential
						.principal_exists(&account.login)
						.await
						.unwrap_or(false);
					let home = backends
						.filesystem
						.home_exists(&account.login)
						.await
						.unwrap_or(false);
					let quota = quotas.get(&account.login).cloned();
					rows.push(report::DetailedRow {
						account,
						principal,
						home,
						quota,
					});
				}
				if cli.json {
					println!("{}", serde_json::to_string_pretty(&rows)?);
				} else {
					print!("{}", report::render_users_detailed(&rows));
				}
			} else if cli.json {
				println!("{}", serde_json::to_string_pretty(&accounts)?);
			} else {
				print!("{}", report::render_users(&accounts));
			}
			Ok(true)
		}

		Commands::DeleteUser { login } => {
			let result = backends.provisioner().deprovision(login).await;
			if cli.json {
				println!("{}", serde_json::to_string_pretty(&result)?);
			} else {
				print!("{}", report::render_deprovision_result(&result));
			}
			Ok(result.fully_clean())
		}
	}
}
