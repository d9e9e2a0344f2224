// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Stack frame filtering by declaring-type prefix.

use serde::{Deserialize, Serialize};

use crate::frame::StackFrame;

/// Module prefixes of the Rust runtime and the async/tracing plumbing that
/// sits between user code and a log call.
const RUST_RUNTIME_PREFIXES: &[&str] = &[
	"std::",
	"core::",
	"alloc::",
	"<std::",
	"<core::",
	"<alloc::",
	"tokio::",
	"<tokio::",
	"futures::",
	"<futures::",
	"tracing::",
	"<tracing::",
	"tracing_core::",
	"tracing_subscriber::",
	"<tracing_subscriber::",
	"backtrace::",
	"panic_unwind::",
	"rust_begin_unwind",
	"__rust_",
];

/// Set of declaring-type prefixes whose frames are dropped from reports.
///
/// The empty set filters nothing. Empty strings are never stored, since an
/// empty prefix would match every frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExcludedPrefixes(Vec<String>);

impl ExcludedPrefixes {
	pub fn new<I, S>(prefixes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self(
			prefixes
				.into_iter()
				.map(Into::into)
				.filter(|p| !p.is_empty())
				.collect(),
		)
	}

	/// Parses a comma-separated prefix list, e.g. `"com.internal.,std::"`.
	///
	/// Entries are trimmed and blank entries are discarded.
	pub fn parse(list: &str) -> Self {
		Self::new(list.split(',').map(str::trim))
	}

	/// Prefixes for Rust standard library and runtime frames.
	pub fn rust_runtime() -> Self {
		Self::new(RUST_RUNTIME_PREFIXES.iter().copied())
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.0.iter().map(String::as_str)
	}

	/// Adds the prefixes of `other` that are not already present.
	pub fn extend(&mut self, other: &ExcludedPrefixes) {
		for prefix in other.iter() {
			if !self.0.iter().any(|p| p == prefix) {
				self.0.push(prefix.to_string());
			}
		}
	}

	/// Whether a declaring type starts with any excluded prefix.
	pub fn excludes(&self, declaring_type: &str) -> bool {
		self.0.iter().any(|p| declaring_type.starts_with(p.as_str()))
	}

	/// Whether a frame would be dropped. Frames without a declaring type are
	/// always kept.
	pub fn excludes_frame(&self, frame: &StackFrame) -> bool {
		frame
			.declaring_type
			.as_deref()
			.is_some_and(|ty| self.excludes(ty))
	}
}

impl<S: Into<String>> FromIterator<S> for ExcludedPrefixes {
	fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
		Self::new(iter)
	}
}

/// Returns the frames not excluded by `excluded`, in their original order.
pub fn filter_frames(frames: &[StackFrame], excluded: &ExcludedPrefixes) -> Vec<StackFrame> {
	if excluded.is_empty() {
		return frames.to_vec();
	}

	frames
		.iter()
		.filter(|frame| !excluded.excludes_frame(frame))
		.cloned()
		.collect()
}
