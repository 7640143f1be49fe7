// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Batch intake: one provisioning request per input line.

use tracing::{debug, instrument, warn};

use crate::parser::parse_record;
use crate::provision::Provisioner;
use crate::types::{BatchReport, ProvisionResult};

impl Provisioner {
	/// Run every record of a batch, in input order, isolating failures.
	///
	/// Blank lines and `#` comments are skipped. A line that fails to
	/// parse yields a `Failed` entry without touching any backend; the
	/// remaining records are unaffected either way.
	#[instrument(skip_all)]
	pub async fn run_batch<I, S>(&self, lines: I) -> BatchReport
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut report = BatchReport::default();

		for (index, line) in lines.into_iter().enumerate() {
			let line_number = index + 1;
			let line = line.as_ref().trim();
			if line.is_empty() || line.starts_with('#') {
				continue;
			}

			match parse_record(line, line_number) {
				Ok(request) => {
					debug!(line_number, login = %request.login, "processing record");
					report.push(self.provision(request).await);
				}
				Err(e) => {
					warn!(line_number, error = %e, "skipping malformed record");
					// Best-effort identifier: the login field, when the
					// line got that far.
					let identifier = line
						.split_whitespace()
						.nth(2)
						.unwrap_or("<unknown>")
						.to_string();
					report.push(ProvisionResult::failed(identifier, e.into()));
				}
			}
		}

		report
	}
}
