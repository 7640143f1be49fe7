// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Filesystem and quota adapters.
//!
//! Home directories are materialized directly with filesystem primitives;
//! quota administration goes through the platform's quota tools as
//! subprocesses. Both surface failures as structured backend errors and
//! never retry.

pub mod detect;
pub mod home;
pub mod quota;

pub use detect::detect_filesystem;
pub use home::HomeDirectory;
pub use quota::QuotaCommand;

use tokio::process::Command;
use tracing::trace;

use enroll_core::{Backend, BackendError};

/// Run an external tool and capture its output.
///
/// A missing binary is `BackendUnavailable`; a spawn failure is an
/// operation failure. Exit status interpretation is the caller's.
pub(crate) async fn run_tool(
	backend: Backend,
	operation: &'static str,
	program: &str,
	args: &[String],
) -> Result<std::process::Output, BackendError> {
	trace!(program, ?args, "running external tool");

	Command::new(program).args(args).output().await.map_err(|e| {
		if e.kind() == std::io::ErrorKind::NotFound {
			BackendError::unavailable(backend, format!("{program} not found in PATH"))
		} else {
			BackendError::operation(backend, operation, e.to_string())
		}
	})
}
