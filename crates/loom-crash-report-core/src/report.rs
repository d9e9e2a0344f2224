// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Report builder: turns a log message and its causal chain into a nested
//! report tree.
//!
//! One [`ReportNode`] is produced per level of the chain. The root node's
//! message carries the log message followed by a flattened summary of the
//! whole chain, so the first line of a report is readable on its own; each
//! nested node then repeats its own level as `"Caused by"` with the class
//! name and filtered frames of that level.

use serde::{Deserialize, Serialize};

use crate::chain::CausalLink;
use crate::event::LogEvent;
use crate::filter::{filter_frames, ExcludedPrefixes};
use crate::frame::StackFrame;

/// Default limit on the number of chain levels turned into report nodes.
pub const DEFAULT_MAX_CAUSE_DEPTH: usize = 32;

/// Message used for every nested node.
pub const CAUSED_BY_MESSAGE: &str = "Caused by";

/// Appended to a causal summary when the depth limit cut the chain short.
pub const TRUNCATED_MARKER: &str = "[truncated]";

const CAUSE_SEPARATOR: &str = "; caused by: ";

/// One level of a crash report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportNode {
	pub message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub class_name: Option<String>,
	#[serde(rename = "stackTrace", default)]
	pub frames: Vec<StackFrame>,
	#[serde(rename = "innerError", default, skip_serializing_if = "Option::is_none")]
	pub inner: Option<Box<ReportNode>>,
}

impl ReportNode {
	/// Number of nested nodes below this one.
	pub fn inner_depth(&self) -> usize {
		self.iter().count() - 1
	}

	/// Iterates over this node and every nested node, outermost first.
	pub fn iter(&self) -> impl Iterator<Item = &ReportNode> {
		std::iter::successors(Some(self), |node| node.inner.as_deref())
	}
}

/// Settings applied to every report a [`ReportBuilder`] produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
	pub excluded_prefixes: ExcludedPrefixes,
	/// Prefixed to the root message as `"<app_id>: "`.
	pub app_id: Option<String>,
	/// Maximum chain levels represented; values below 1 are treated as 1.
	pub max_cause_depth: usize,
}

impl Default for ReportOptions {
	fn default() -> Self {
		Self {
			excluded_prefixes: ExcludedPrefixes::default(),
			app_id: None,
			max_cause_depth: DEFAULT_MAX_CAUSE_DEPTH,
		}
	}
}

/// Builds report trees with a fixed set of [`ReportOptions`].
#[derive(Debug, Clone, Default)]
pub struct ReportBuilder {
	options: ReportOptions,
}

impl ReportBuilder {
	pub fn new(options: ReportOptions) -> Self {
		Self { options }
	}

	pub fn options(&self) -> &ReportOptions {
		&self.options
	}

	/// Builds a report for `message` and an optional causal chain.
	///
	/// `fallback_frames` are used only when `chain` is `None`.
	pub fn build(
		&self,
		message: &str,
		chain: Option<&dyn CausalLink>,
		fallback_frames: &[StackFrame],
	) -> ReportNode {
		build_level(
			message,
			chain,
			fallback_frames,
			self.options.app_id.as_deref(),
			&self.options.excluded_prefixes,
			self.options.max_cause_depth.max(1),
		)
	}

	/// Builds a report from a logging event's message, error and caller frames.
	pub fn build_event(&self, event: &LogEvent) -> ReportNode {
		self.build(
			&event.message,
			event.error.as_ref().map(|e| e as &dyn CausalLink),
			&event.caller_frames,
		)
	}
}

/// Builds a report with the default depth limit.
pub fn build_report(
	message: &str,
	chain: Option<&dyn CausalLink>,
	fallback_frames: &[StackFrame],
	excluded: &ExcludedPrefixes,
	app_id: Option<&str>,
) -> ReportNode {
	build_level(
		message,
		chain,
		fallback_frames,
		app_id,
		excluded,
		DEFAULT_MAX_CAUSE_DEPTH,
	)
}

/// Flattened description of a whole chain:
/// `Class[: message][; caused by: <summary of cause>]`.
pub fn causal_summary(error: &dyn CausalLink) -> String {
	let mut out = String::new();
	write_causal_summary(&mut out, error, DEFAULT_MAX_CAUSE_DEPTH);
	out
}

/// `remaining` counts the levels, this one included, that may still become
/// nodes.
fn build_level(
	message: &str,
	chain: Option<&dyn CausalLink>,
	fallback_frames: &[StackFrame],
	app_id: Option<&str>,
	excluded: &ExcludedPrefixes,
	remaining: usize,
) -> ReportNode {
	let mut composed = String::new();
	if let Some(app_id) = app_id {
		composed.push_str(app_id);
		composed.push_str(": ");
	}
	composed.push_str(message);

	let Some(error) = chain else {
		return ReportNode {
			message: composed,
			class_name: None,
			frames: filter_frames(fallback_frames, excluded),
			inner: None,
		};
	};

	composed.push_str("; ");
	write_causal_summary(&mut composed, error, remaining);

	let inner = match error.cause() {
		Some(cause) if remaining > 1 => Some(Box::new(build_level(
			CAUSED_BY_MESSAGE,
			Some(cause),
			&[],
			None,
			excluded,
			remaining - 1,
		))),
		_ => None,
	};

	ReportNode {
		message: composed,
		class_name: Some(error.class_name().to_string()),
		frames: filter_frames(error.frames(), excluded),
		inner,
	}
}

fn write_causal_summary(out: &mut String, error: &dyn CausalLink, limit: usize) {
	let mut current = Some(error);
	let mut written = 0;

	while let Some(link) = current {
		if written == limit {
			out.push_str(CAUSE_SEPARATOR);
			out.push_str(TRUNCATED_MARKER);
			return;
		}
		if written > 0 {
			out.push_str(CAUSE_SEPARATOR);
		}

		out.push_str(link.class_name());
		if let Some(message) = link.message() {
			out.push_str(": ");
			out.push_str(message);
		}

		written += 1;
		current = link.cause();
	}
}
