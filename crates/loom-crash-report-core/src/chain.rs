// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Causal error chains.
//!
//! A chain is a singly linked list of error descriptions, head first, each
//! naming the error that caused it. The report builder only ever reads a
//! chain through [`CausalLink`], so callers can hand it structures they own
//! without converting them first.

use serde::{Deserialize, Serialize};

use crate::frame::StackFrame;

/// Read-only view of one level of a causal error chain.
pub trait CausalLink {
	/// Type name of the error at this level.
	fn class_name(&self) -> &str;

	/// Human-readable message, if the error carries one.
	fn message(&self) -> Option<&str>;

	/// Stack frames recorded for this level, innermost first.
	fn frames(&self) -> &[StackFrame];

	/// The next error in the chain.
	fn cause(&self) -> Option<&dyn CausalLink>;
}

/// An owned causal error chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CausalError {
	pub class_name: String,
	pub message: Option<String>,
	#[serde(default)]
	pub frames: Vec<StackFrame>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub cause: Option<Box<CausalError>>,
}

impl CausalError {
	pub fn new(class_name: impl Into<String>) -> Self {
		Self {
			class_name: class_name.into(),
			message: None,
			frames: Vec::new(),
			cause: None,
		}
	}

	pub fn with_message(mut self, message: impl Into<String>) -> Self {
		self.message = Some(message.into());
		self
	}

	pub fn with_frames(mut self, frames: Vec<StackFrame>) -> Self {
		self.frames = frames;
		self
	}

	pub fn caused_by(mut self, cause: CausalError) -> Self {
		self.cause = Some(Box::new(cause));
		self
	}

	/// Number of levels in the chain, including this one.
	pub fn depth(&self) -> usize {
		let mut depth = 1;
		let mut current = self.cause.as_deref();
		while let Some(next) = current {
			depth += 1;
			current = next.cause.as_deref();
		}
		depth
	}

	/// Iterates over every level of the chain, head first.
	pub fn iter(&self) -> impl Iterator<Item = &CausalError> {
		std::iter::successors(Some(self), |e| e.cause.as_deref())
	}

	/// The last error in the chain.
	pub fn root_cause(&self) -> &CausalError {
		self.iter().last().unwrap_or(self)
	}
}

impl CausalLink for CausalError {
	fn class_name(&self) -> &str {
		&self.class_name
	}

	fn message(&self) -> Option<&str> {
		self.message.as_deref()
	}

	fn frames(&self) -> &[StackFrame] {
		&self.frames
	}

	fn cause(&self) -> Option<&dyn CausalLink> {
		self.cause.as_deref().map(|c| c as &dyn CausalLink)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn three_level_chain() -> CausalError {
		CausalError::new("RequestError")
			.with_message("request failed")
			.caused_by(
				CausalError::new("PoolError")
					.caused_by(CausalError::new("IoError").with_message("connection refused")),
			)
	}

	#[test]
	fn depth_counts_every_level() {
		assert_eq!(CausalError::new("X").depth(), 1);
		assert_eq!(three_level_chain().depth(), 3);
	}

	#[test]
	fn iter_walks_head_first() {
		let chain = three_level_chain();
		let names: Vec<_> = chain.iter().map(|e| e.class_name.as_str()).collect();
		assert_eq!(names, vec!["RequestError", "PoolError", "IoError"]);
	}

	#[test]
	fn root_cause_is_last_level() {
		let chain = three_level_chain();
		assert_eq!(chain.root_cause().class_name, "IoError");
		assert_eq!(chain.root_cause().message.as_deref(), Some("connection refused"));
	}

	#[test]
	fn link_view_matches_owned_fields() {
		let chain = three_level_chain();
		let link: &dyn CausalLink = &chain;

		assert_eq!(link.class_name(), "RequestError");
		assert_eq!(link.message(), Some("request failed"));
		assert_eq!(link.cause().map(|c| c.class_name()), Some("PoolError"));
		assert!(link.cause().and_then(|c| c.message()).is_none());
	}
}
