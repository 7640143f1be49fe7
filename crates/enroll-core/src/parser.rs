// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Batch record parsing.
//!
//! One record per line, six whitespace-separated fields:
//!
//! ```text
//! <numeric_id> <groups> <login> <surname> <given_name> <initial_secret>
//! ```
//!
//! `groups` is a comma-delimited list. Display names are stored as-is, so
//! non-ASCII values pass through untouched.

use std::collections::BTreeSet;

use enroll_config::SecretString;

use crate::error::ParseError;
use crate::types::ProvisionRequest;

const FIELD_COUNT: usize = 6;

/// Parse one input line into a validated [`ProvisionRequest`].
///
/// `line_number` is 1-based and only used for error reporting. Structural
/// validation happens here; backend identifier syntax is the directory
/// server's business and surfaces as a provisioning failure instead.
pub fn parse_record(line: &str, line_number: usize) -> Result<ProvisionRequest, ParseError> {
	let fields: Vec<&str> = line.split_whitespace().collect();

	if fields.len() != FIELD_COUNT {
		return Err(ParseError {
			line: line_number,
			field: fields.len().min(FIELD_COUNT),
			message: format!("expected {FIELD_COUNT} fields, found {}", fields.len()),
		});
	}

	let numeric_id: i64 = fields[0].parse().map_err(|_| ParseError {
		line: line_number,
		field: 1,
		message: format!("numeric id '{}' is not an integer", fields[0]),
	})?;
	if numeric_id <= 0 || numeric_id > u32::MAX as i64 {
		return Err(ParseError {
			line: line_number,
			field: 1,
			message: format!("numeric id {numeric_id} is out of range"),
		});
	}

	// Tokenizing on whitespace cannot yield empty fields; a blank login or
	// name shows up as a short field count instead.
	let supplementary_groups = parse_groups(fields[1]);

	Ok(ProvisionRequest {
		numeric_id: numeric_id as u32,
		supplementary_groups,
		login: fields[2].to_string(),
		surname: fields[3].to_string(),
		given_name: fields[4].to_string(),
		initial_secret: SecretString::new(fields[5]),
	})
}

/// Split a comma- or space-delimited group list into a set.
pub fn parse_groups(raw: &str) -> BTreeSet<String> {
	raw
		.split(|c: char| c == ',' || c.is_whitespace())
		.filter(|g| !g.is_empty())
		.map(str::to_string)
		.collect()
}
