// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Home directory materialization.
//!
//! Creating a home means: make the directory, apply the configured mode,
//! copy the skeleton tree into it, and hand the whole tree to `uid:gid`.
//! The blocking filesystem walk runs on the blocking thread pool.

use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info};

use enroll_config::HomeConfig;
use enroll_core::{Backend, BackendError, FilesystemAdapter};

/// Filesystem adapter rooted at the configured home base directory.
pub struct HomeDirectory {
	config: HomeConfig,
	mode: u32,
}

impl HomeDirectory {
	pub fn new(config: HomeConfig) -> Result<Self, BackendError> {
		let mode = config
			.mode()
			.map_err(|e| BackendError::unavailable(Backend::Filesystem, e.to_string()))?;
		Ok(Self { config, mode })
	}
}

fn fs_err(operation: &'static str, e: impl std::fmt::Display) -> BackendError {
	BackendError::operation(Backend::Filesystem, operation, e.to_string())
}

#[async_trait]
impl FilesystemAdapter for HomeDirectory {
	async fn create_home(&self, login: &str, uid: u32, gid: u32) -> Result<(), BackendError> {
		let home = self.config.home_path(login);
		let skeleton = self.config.skeleton_dir.clone();
		let mode = self.mode;

		let result = tokio::task::spawn_blocking(move || -> io::Result<()> {
			std::fs::create_dir_all(&home)?;
			std::fs::set_permissions(&home, std::fs::Permissions::from_mode(mode))?;
			if skeleton.is_dir() {
				copy_tree(&skeleton, &home)?;
			}
			chown_tree(&home, uid, gid)?;
			Ok(())
		})
		.await
		.map_err(|e| fs_err("create_home", e))?;

		result.map_err(|e| fs_err("create_home", e))?;
		info!(login, uid, gid, "materialized home directory");
		Ok(())
	}

	async fn remove_home(&self, login: &str) -> Result<(), BackendError> {
		let home = self.config.home_path(login);
		tokio::fs::remove_dir_all(&home)
			.await
			.map_err(|e| fs_err("remove_home", e))?;
		info!(login, "removed home directory");
		Ok(())
	}

	async fn home_exists(&self, login: &str) -> Result<bool, BackendError> {
		let home = self.config.home_path(login);
		match tokio::fs::metadata(&home).await {
			Ok(meta) => Ok(meta.is_dir()),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
			Err(e) => Err(fs_err("home_exists", e)),
		}
	}
}

/// Recursively copy `src` into `dst`, preserving file modes.
fn copy_tree(src: &Path, dst: &Path) -> io::Result<()> {
	for entry in std::fs::read_dir(src)? {
		let entry = entry?;
		let target = dst.join(entry.file_name());
		let file_type = entry.file_type()?;

		if file_type.is_dir() {
			std::fs::create_dir_all(&target)?;
			let source_mode = entry.metadata()?.permissions();
			std::fs::set_permissions(&target, source_mode)?;
			copy_tree(&entry.path(), &target)?;
		} else if file_type.is_symlink() {
			let link = std::fs::read_link(entry.path())?;
			// Recreate rather than follow; skeleton links point at shared
			// profile files.
			let _ = std::fs::remove_file(&target);
			std::os::unix::fs::symlink(link, &target)?;
		} else {
			std::fs::copy(entry.path(), &target)?;
		}
	}
	debug!(src = %src.display(), dst = %dst.display(), "copied skeleton");
	Ok(())
}

/// Recursively hand ownership of `root` to `uid:gid`.
fn chown_tree(root: &Path, uid: u32, gid: u32) -> io::Result<()> {
	std::os::unix::fs::lchown(root, Some(uid), Some(gid))?;
	if root.is_dir() {
		for entry in std::fs::read_dir(root)? {
			let entry = entry?;
			if entry.file_type()?.is_dir() {
				chown_tree(&entry.path(), uid, gid)?;
			} else {
				std::os::unix::fs::lchown(&entry.path(), Some(uid), Some(gid))?;
			}
		}
	}
	Ok(())
}
