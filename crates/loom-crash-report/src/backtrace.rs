// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Backtrace capture and parsing into report stack frames.

use loom_crash_report_core::StackFrame;
use rustc_demangle::demangle;
use std::backtrace::Backtrace;

/// Parse a Rust backtrace into stack frames, innermost first.
pub fn parse_backtrace(backtrace: &Backtrace) -> Vec<StackFrame> {
	let bt_string = format!("{:#}", backtrace);
	parse_backtrace_string(&bt_string)
}

/// Capture a fresh backtrace and parse it.
pub fn capture_frames() -> Vec<StackFrame> {
	let backtrace = Backtrace::force_capture();
	parse_backtrace(&backtrace)
}

/// Parse backtrace string output into frames.
///
/// `std` renders each frame as `N: path::to::function` optionally followed by
/// an `at file:line:col` line describing the frame above it.
fn parse_backtrace_string(bt_string: &str) -> Vec<StackFrame> {
	let mut frames: Vec<StackFrame> = Vec::new();

	for line in bt_string.lines() {
		let line = line.trim();
		if line.is_empty() {
			continue;
		}

		if let Some(location) = line.strip_prefix("at ") {
			if let Some(previous) = frames.last_mut() {
				apply_location(previous, location);
			}
			continue;
		}

		if let Some(frame) = parse_frame_line(line) {
			frames.push(frame);
		}
	}

	frames
}

/// Parse a single `N: function` line into a frame.
fn parse_frame_line(line: &str) -> Option<StackFrame> {
	let function_part = match line.split_once(':') {
		Some((prefix, rest)) if prefix.trim().parse::<u32>().is_ok() => rest.trim(),
		_ => line,
	};

	if function_part.is_empty() {
		return None;
	}

	let demangled = demangle(function_part).to_string();
	let demangled = strip_hash_suffix(&demangled);

	// "loom_server::handlers::crash::capture" -> ("loom_server::handlers::crash", "capture")
	let frame = match demangled.rfind("::") {
		Some(idx) => StackFrame {
			declaring_type: Some(demangled[..idx].to_string()),
			method: Some(demangled[idx + 2..].to_string()),
			file: None,
			line: None,
		},
		None => StackFrame {
			declaring_type: None,
			method: Some(demangled.to_string()),
			file: None,
			line: None,
		},
	};

	Some(frame)
}

/// Drops the `::h0123456789abcdef` hash legacy mangling leaves behind.
fn strip_hash_suffix(symbol: &str) -> &str {
	match symbol.rfind("::h") {
		Some(idx)
			if symbol.len() - idx == 19
				&& symbol[idx + 3..].chars().all(|c| c.is_ascii_hexdigit()) =>
		{
			&symbol[..idx]
		}
		_ => symbol,
	}
}

/// Applies `file:line:col` to a frame. Column is discarded.
fn apply_location(frame: &mut StackFrame, location: &str) {
	let mut parts = location.rsplitn(3, ':');
	let col = parts.next();
	let line = parts.next();
	let file = parts.next();

	match (file, line, col) {
		(Some(file), Some(line), Some(_)) => {
			frame.file = Some(file.to_string());
			frame.line = line.parse().ok();
		}
		_ => frame.file = Some(location.to_string()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const SAMPLE: &str = "   0: my_app::handlers::process
             at ./src/handlers.rs:42:9
   1: core::ops::function::FnOnce::call_once
             at /rustc/abc/library/core/src/ops/function.rs:250:5
   2: main
";

	#[test]
	fn parses_frames_with_locations() {
		let frames = parse_backtrace_string(SAMPLE);
		assert_eq!(frames.len(), 3);

		assert_eq!(frames[0].declaring_type.as_deref(), Some("my_app::handlers"));
		assert_eq!(frames[0].method.as_deref(), Some("process"));
		assert_eq!(frames[0].file.as_deref(), Some("./src/handlers.rs"));
		assert_eq!(frames[0].line, Some(42));

		assert_eq!(
			frames[1].declaring_type.as_deref(),
			Some("core::ops::function::FnOnce")
		);
		assert_eq!(frames[1].line, Some(250));
	}

	#[test]
	fn bare_symbol_has_no_declaring_type() {
		let frames = parse_backtrace_string(SAMPLE);
		assert!(frames[2].declaring_type.is_none());
		assert_eq!(frames[2].method.as_deref(), Some("main"));
		assert!(frames[2].file.is_none());
	}

	#[test]
	fn test_parse_frame_line_with_number() {
		let frame = parse_frame_line("  5: my_app::main").unwrap();
		assert_eq!(frame.declaring_type.as_deref(), Some("my_app"));
		assert_eq!(frame.method.as_deref(), Some("main"));
	}

	#[test]
	fn strips_legacy_hash() {
		assert_eq!(
			strip_hash_suffix("my_app::main::h0123456789abcdef"),
			"my_app::main"
		);
		assert_eq!(strip_hash_suffix("my_app::handler"), "my_app::handler");
	}

	#[test]
	fn location_without_line_keeps_file() {
		let mut frame = StackFrame::new("a", "b");
		apply_location(&mut frame, "unknown");
		assert_eq!(frame.file.as_deref(), Some("unknown"));
		assert!(frame.line.is_none());
	}

	#[test]
	fn test_capture_frames() {
		// Frames captured depend on debug info; only check it does not panic.
		let _frames = capture_frames();
	}
}
