// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Conversion of `std::error::Error` chains into causal error chains.

use std::error::Error;

use loom_crash_report_core::{CausalError, StackFrame};

/// Class name used when an error's `Debug` output does not start with a
/// type name.
const FALLBACK_CLASS_NAME: &str = "Error";

/// Converts an error and its `source()` chain into a [`CausalError`] chain.
///
/// At most `max_depth` levels are converted (at least one). Frames are
/// attached to the head only, since `std` errors do not carry their own.
pub fn causal_chain(
	error: &(dyn Error + 'static),
	head_frames: Vec<StackFrame>,
	max_depth: usize,
) -> CausalError {
	let mut levels: Vec<&(dyn Error + 'static)> = vec![error];
	while levels.len() < max_depth.max(1) {
		match levels.last().copied().and_then(|e| e.source()) {
			Some(source) => levels.push(source),
			None => break,
		}
	}

	let mut chain: Option<CausalError> = None;
	for level in levels.into_iter().rev() {
		let mut node = describe(level);
		node.cause = chain.map(Box::new);
		chain = Some(node);
	}

	let mut head = chain.unwrap_or_else(|| describe(error));
	head.frames = head_frames;
	head
}

fn describe(error: &(dyn Error + 'static)) -> CausalError {
	let message = error.to_string();
	CausalError {
		class_name: class_name_from_debug(error),
		message: (!message.is_empty()).then_some(message),
		frames: Vec::new(),
		cause: None,
	}
}

/// Best-effort type name for a type-erased error.
///
/// Derived `Debug` output starts with the type name (`ParseIntError { .. }`,
/// `Custom { .. }`), which is the closest thing to a class name a trait
/// object offers.
fn class_name_from_debug(error: &dyn Error) -> String {
	let debug = format!("{error:?}");
	let name: String = debug
		.chars()
		.take_while(|c| c.is_alphanumeric() || *c == '_' || *c == ':')
		.collect();
	let name = name.trim_end_matches(':');

	if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
		FALLBACK_CLASS_NAME.to_string()
	} else {
		name.to_string()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fmt;

	#[derive(Debug)]
	struct Outer {
		source: Inner,
	}

	#[derive(Debug)]
	struct Inner;

	impl fmt::Display for Outer {
		fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
			write!(f, "outer failed")
		}
	}

	impl fmt::Display for Inner {
		fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
			write!(f, "inner failed")
		}
	}

	impl Error for Outer {
		fn source(&self) -> Option<&(dyn Error + 'static)> {
			Some(&self.source)
		}
	}

	impl Error for Inner {}

	#[test]
	fn converts_source_chain() {
		let error = Outer { source: Inner };
		let chain = causal_chain(&error, Vec::new(), 32);

		assert_eq!(chain.class_name, "Outer");
		assert_eq!(chain.message.as_deref(), Some("outer failed"));
		let cause = chain.cause.as_deref().unwrap();
		assert_eq!(cause.class_name, "Inner");
		assert_eq!(cause.message.as_deref(), Some("inner failed"));
		assert!(cause.cause.is_none());
	}

	#[test]
	fn frames_attach_to_head_only() {
		let error = Outer { source: Inner };
		let frames = vec![StackFrame::new("my_app::db", "connect")];
		let chain = causal_chain(&error, frames.clone(), 32);

		assert_eq!(chain.frames, frames);
		assert!(chain.cause.unwrap().frames.is_empty());
	}

	#[test]
	fn depth_limit_stops_conversion() {
		let error = Outer { source: Inner };
		let chain = causal_chain(&error, Vec::new(), 1);
		assert_eq!(chain.depth(), 1);
	}

	#[test]
	fn parse_error_class_name() {
		let error = "x".parse::<u32>().unwrap_err();
		let chain = causal_chain(&error, Vec::new(), 32);
		assert_eq!(chain.class_name, "ParseIntError");
		assert_eq!(chain.message.as_deref(), Some("invalid digit found in string"));
	}

	#[test]
	fn string_errors_fall_back_to_generic_name() {
		let error: Box<dyn Error> = "plain message".into();
		let chain = causal_chain(error.as_ref(), Vec::new(), 32);
		assert_eq!(chain.class_name, FALLBACK_CLASS_NAME);
		assert_eq!(chain.message.as_deref(), Some("plain message"));
	}
}
