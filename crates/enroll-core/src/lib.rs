// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core of the enroll provisioning system.
//!
//! Coordinates four independently-administered backends (directory,
//! credential authority, filesystem, quota) into operations that appear
//! atomic to the operator: a user either ends up fully usable, or the
//! system is left in a known, reportable state.
//!
//! This crate contains:
//!
//! - The data model ([`ProvisionRequest`], [`ProvisionResult`],
//!   [`BatchReport`], [`DeprovisionResult`])
//! - The backend adapter contracts ([`DirectoryAdapter`],
//!   [`CredentialAdapter`], [`FilesystemAdapter`], [`QuotaAdapter`])
//! - The record parser ([`parse_record`])
//! - The [`Provisioner`]: provisioning with reverse-order rollback,
//!   best-effort deprovisioning, and per-record-isolated batch runs
//!
//! It performs no I/O of its own beyond adapter calls; results are values
//! handed to a reporting layer.

pub mod adapter;
pub mod batch;
pub mod deprovision;
pub mod error;
pub mod parser;
pub mod provision;
pub mod types;

pub use adapter::{
	CredentialAdapter, DirectoryAdapter, FilesystemAdapter, NewAccount, QuotaAdapter,
};
pub use error::{Backend, BackendError, CompensationFailure, Failure, FailureKind, ParseError};
pub use parser::{parse_groups, parse_record};
pub use provision::Provisioner;
pub use types::{
	AccountSummary, BatchReport, CompletedStep, DeprovisionAction, DeprovisionResult,
	DeprovisionStep, ProvisionRequest, ProvisionResult, ProvisionStatus, QuotaUsage, StepOutcome,
};
