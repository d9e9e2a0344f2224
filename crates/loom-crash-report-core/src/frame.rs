// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Stack frame type shared by causal errors and report nodes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single call-site entry in a stack trace.
///
/// Every field is optional: symbolication may recover a module path without a
/// file, and caller locations taken from logging metadata have no method name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StackFrame {
	/// Declaring type or module path, e.g. `my_app::db::pool`.
	#[serde(rename = "className", skip_serializing_if = "Option::is_none")]
	pub declaring_type: Option<String>,
	#[serde(rename = "methodName", skip_serializing_if = "Option::is_none")]
	pub method: Option<String>,
	#[serde(rename = "fileName", skip_serializing_if = "Option::is_none")]
	pub file: Option<String>,
	#[serde(rename = "lineNumber", skip_serializing_if = "Option::is_none")]
	pub line: Option<u32>,
}

impl StackFrame {
	/// Creates a frame with a declaring type and method name.
	pub fn new(declaring_type: impl Into<String>, method: impl Into<String>) -> Self {
		Self {
			declaring_type: Some(declaring_type.into()),
			method: Some(method.into()),
			file: None,
			line: None,
		}
	}

	/// Sets the source location of the frame.
	pub fn at(mut self, file: impl Into<String>, line: u32) -> Self {
		self.file = Some(file.into());
		self.line = Some(line);
		self
	}
}

impl fmt::Display for StackFrame {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match (&self.declaring_type, &self.method) {
			(Some(ty), Some(method)) => write!(f, "{ty}::{method}")?,
			(Some(ty), None) => write!(f, "{ty}")?,
			(None, Some(method)) => write!(f, "{method}")?,
			(None, None) => write!(f, "<unknown>")?,
		}

		if let Some(file) = &self.file {
			write!(f, " ({file}")?;
			if let Some(line) = self.line {
				write!(f, ":{line}")?;
			}
			write!(f, ")")?;
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn display_full_frame() {
		let frame = StackFrame::new("my_app::db", "connect").at("src/db.rs", 42);
		assert_eq!(frame.to_string(), "my_app::db::connect (src/db.rs:42)");
	}

	#[test]
	fn display_unknown_frame() {
		assert_eq!(StackFrame::default().to_string(), "<unknown>");
	}

	#[test]
	fn serializes_with_wire_names() {
		let frame = StackFrame::new("my_app::db", "connect").at("src/db.rs", 42);
		let json = serde_json::to_value(&frame).unwrap();

		assert_eq!(json["className"], "my_app::db");
		assert_eq!(json["methodName"], "connect");
		assert_eq!(json["fileName"], "src/db.rs");
		assert_eq!(json["lineNumber"], 42);
	}

	#[test]
	fn absent_fields_are_omitted() {
		let frame = StackFrame {
			declaring_type: Some("my_app".to_string()),
			..Default::default()
		};
		let json = serde_json::to_value(&frame).unwrap();

		assert!(json.get("methodName").is_none());
		assert!(json.get("lineNumber").is_none());
	}
}
