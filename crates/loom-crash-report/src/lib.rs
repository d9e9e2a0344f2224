// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Crash reporting for `tracing`-based applications.
//!
//! [`CrashReportLayer`] captures log events (message, level, thread, target,
//! span and event fields, and any error field with its `source()` chain).
//! [`ReportWorker`] turns each captured event into a nested report with
//! [`loom_crash_report_core::ReportBuilder`], wraps it in a
//! [`CrashEnvelope`] and submits it through a [`ReportTransport`].
//!
//! # Example
//!
//! ```ignore
//! use loom_crash_report::{load_config, CrashReporterBuilder};
//! use tracing_subscriber::{filter::LevelFilter, prelude::*};
//!
//! let reporter = CrashReporterBuilder::from_config(load_config()?).build()?;
//! let (layer, worker) = reporter.layer();
//! worker.spawn();
//!
//! tracing_subscriber::registry()
//!     .with(tracing_subscriber::fmt::layer())
//!     .with(layer.with_filter(LevelFilter::ERROR))
//!     .init();
//! ```

mod backtrace;
mod causal;
pub mod config;
pub mod envelope;
pub mod error;
mod layer;
mod reporter;
pub mod sources;
pub mod transport;
mod worker;

pub use backtrace::{capture_frames, parse_backtrace};
pub use causal::causal_chain;
pub use config::{
	load_config, load_config_from_env, load_config_with_file, split_list, ApiKey, ReporterConfig,
	ReporterConfigLayer,
};
pub use envelope::{CrashEnvelope, EnvelopeDetails};
pub use error::{ConfigError, CrashReportError, Result};
pub use layer::CrashReportLayer;
pub use reporter::{CrashReporter, CrashReporterBuilder};
pub use transport::{HttpTransport, ReportTransport, API_KEY_HEADER};
pub use worker::ReportWorker;

pub use loom_crash_report_core::{
	build_report, causal_summary, filter_frames, CausalError, CausalLink, ExcludedPrefixes,
	LogEvent, LogLevel, ReportBuilder, ReportNode, ReportOptions, StackFrame,
};
