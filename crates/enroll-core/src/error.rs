// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error taxonomy shared by the orchestrator and the backend adapters.

use serde::Serialize;

use crate::types::CompletedStep;

/// The four external systems a request touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
	Directory,
	Credential,
	Filesystem,
	Quota,
}

impl std::fmt::Display for Backend {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let name = match self {
			Backend::Directory => "directory",
			Backend::Credential => "credential",
			Backend::Filesystem => "filesystem",
			Backend::Quota => "quota",
		};
		f.write_str(name)
	}
}

/// A failed adapter call. Adapters never retry; whatever the external
/// system reported is surfaced here verbatim.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
	/// The backend session could not be established at all.
	#[error("{backend} backend unavailable: {message}")]
	Unavailable { backend: Backend, message: String },

	/// A specific operation failed after the session was live.
	#[error("{backend} operation '{operation}' failed: {message}")]
	OperationFailed {
		backend: Backend,
		operation: &'static str,
		message: String,
	},
}

impl BackendError {
	pub fn unavailable(backend: Backend, message: impl Into<String>) -> Self {
		Self::Unavailable {
			backend,
			message: message.into(),
		}
	}

	pub fn operation(backend: Backend, operation: &'static str, message: impl Into<String>) -> Self {
		Self::OperationFailed {
			backend,
			operation,
			message: message.into(),
		}
	}

	pub fn backend(&self) -> Backend {
		match self {
			Self::Unavailable { backend, .. } | Self::OperationFailed { backend, .. } => *backend,
		}
	}
}

/// A batch input line that fails structural validation.
///
/// This is the only parse-level error; backend-specific syntax rules (for
/// example identifier character restrictions) are enforced by the directory
/// server and surface as provisioning failures instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[error("malformed record at line {line}, field {field}: {message}")]
pub struct ParseError {
	/// 1-based input line number.
	pub line: usize,
	/// 1-based index of the offending field.
	pub field: usize,
	pub message: String,
}

/// Classification of a terminal request failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
	DuplicateIdentity,
	MalformedRecord,
	BackendUnavailable,
	BackendOperationFailed,
}

/// Structured failure attached to a request outcome.
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
	pub kind: FailureKind,
	pub backend: Option<Backend>,
	pub message: String,
}

impl Failure {
	pub fn duplicate_identity(login: &str, numeric_id: u32) -> Self {
		Self {
			kind: FailureKind::DuplicateIdentity,
			backend: Some(Backend::Directory),
			message: format!("login '{login}' or numeric id {numeric_id} already present"),
		}
	}
}

impl std::fmt::Display for Failure {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.message)
	}
}

impl From<BackendError> for Failure {
	fn from(e: BackendError) -> Self {
		let kind = match &e {
			BackendError::Unavailable { .. } => FailureKind::BackendUnavailable,
			BackendError::OperationFailed { .. } => FailureKind::BackendOperationFailed,
		};
		Self {
			kind,
			backend: Some(e.backend()),
			message: e.to_string(),
		}
	}
}

impl From<ParseError> for Failure {
	fn from(e: ParseError) -> Self {
		Self {
			kind: FailureKind::MalformedRecord,
			backend: None,
			message: e.to_string(),
		}
	}
}

/// A compensating action that itself failed during rollback.
///
/// Surfaced separately from the triggering failure so the operator knows
/// the backends may hold residue needing manual cleanup.
#[derive(Debug, Clone, Serialize)]
pub struct CompensationFailure {
	pub step: CompletedStep,
	pub error: Failure,
}
