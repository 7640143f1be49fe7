// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Redaction wrapper for passwords and other sensitive strings.
//!
//! A [`SecretString`] never reaches logs or serialized output: Debug,
//! Display, and Serialize all produce `[REDACTED]`, and the backing memory
//! is zeroized on drop. Call sites must opt in to the real value with
//! [`SecretString::expose`], which keeps secret access visible in review.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

/// The redaction placeholder used in all output.
pub const REDACTED: &str = "[REDACTED]";

/// A password or key material string that refuses to print itself.
#[derive(Clone, Default)]
pub struct SecretString {
	inner: String,
}

impl SecretString {
	pub fn new(inner: impl Into<String>) -> Self {
		Self {
			inner: inner.into(),
		}
	}

	/// Explicitly access the inner value.
	pub fn expose(&self) -> &str {
		&self.inner
	}

	/// True when no secret has been configured.
	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}
}

impl From<String> for SecretString {
	fn from(inner: String) -> Self {
		Self { inner }
	}
}

impl Drop for SecretString {
	fn drop(&mut self) {
		self.inner.zeroize();
	}
}

impl fmt::Debug for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("SecretString").field(&REDACTED).finish()
	}
}

impl fmt::Display for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl Serialize for SecretString {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(REDACTED)
	}
}

impl<'de> Deserialize<'de> for SecretString {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		String::deserialize(deserializer).map(SecretString::from)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn debug_and_display_are_redacted() {
		let secret = SecretString::new("hunter2");
		assert_eq!(format!("{:?}", secret), "SecretString(\"[REDACTED]\")");
		assert_eq!(format!("{}", secret), REDACTED);
	}

	#[test]
	fn expose_returns_inner_value() {
		let secret = SecretString::new("hunter2");
		assert_eq!(secret.expose(), "hunter2");
		assert!(!secret.is_empty());
	}

	#[test]
	fn serializes_as_redacted() {
		let secret = SecretString::new("hunter2");
		let json = serde_json::to_string(&secret).unwrap();
		assert_eq!(json, "\"[REDACTED]\"");
		assert!(!json.contains("hunter2"));
	}

	#[test]
	fn deserializes_from_plain_string() {
		let secret: SecretString = serde_json::from_str("\"hunter2\"").unwrap();
		assert_eq!(secret.expose(), "hunter2");
	}
}
