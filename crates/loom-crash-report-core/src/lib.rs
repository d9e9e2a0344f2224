// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the Loom crash report translator.
//!
//! This crate turns structured logging events into nested error reports for
//! a crash-aggregation service. It is pure: no I/O, no global state, and every
//! report is a freshly allocated tree owned by the caller. Transport,
//! configuration loading and the logging-framework hook live in
//! `loom-crash-report`.
//!
//! # Overview
//!
//! - [`filter_frames`] drops stack frames whose declaring type starts with a
//!   configured prefix.
//! - [`ReportBuilder`] / [`build_report`] walk a causal error chain and
//!   produce one [`ReportNode`] per level.
//!
//! ```
//! use loom_crash_report_core::{build_report, CausalError, ExcludedPrefixes};
//!
//! let error = CausalError::new("X.Y").with_message("bad");
//! let report = build_report("boom", Some(&error), &[], &ExcludedPrefixes::default(), Some("svc"));
//!
//! assert_eq!(report.message, "svc: boom; X.Y: bad");
//! assert_eq!(report.class_name.as_deref(), Some("X.Y"));
//! ```

pub mod chain;
pub mod error;
pub mod event;
pub mod filter;
pub mod frame;
pub mod report;

pub use chain::{CausalError, CausalLink};
pub use error::{ReportCoreError, Result};
pub use event::{LogEvent, LogLevel};
pub use filter::{filter_frames, ExcludedPrefixes};
pub use frame::StackFrame;
pub use report::{
	build_report, causal_summary, ReportBuilder, ReportNode, ReportOptions, CAUSED_BY_MESSAGE,
	DEFAULT_MAX_CAUSE_DEPTH, TRUNCATED_MARKER,
};
