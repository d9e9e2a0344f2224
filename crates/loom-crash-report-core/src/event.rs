// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Logging event types consumed by the report builder.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chain::CausalError;
use crate::error::ReportCoreError;
use crate::frame::StackFrame;

/// Severity of a logging event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
	Trace,
	Debug,
	Info,
	Warn,
	Error,
}

impl fmt::Display for LogLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Trace => write!(f, "trace"),
			Self::Debug => write!(f, "debug"),
			Self::Info => write!(f, "info"),
			Self::Warn => write!(f, "warn"),
			Self::Error => write!(f, "error"),
		}
	}
}

impl FromStr for LogLevel {
	type Err = ReportCoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"trace" => Ok(Self::Trace),
			"debug" => Ok(Self::Debug),
			"info" => Ok(Self::Info),
			"warn" | "warning" => Ok(Self::Warn),
			"error" => Ok(Self::Error),
			_ => Err(ReportCoreError::InvalidLevel(s.to_string())),
		}
	}
}

/// A structured logging event.
///
/// `caller_frames` describe where the log call was made and are only used
/// when the event carries no causal error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
	pub message: String,
	pub level: LogLevel,
	pub thread_name: String,
	pub logger_name: String,
	#[serde(default)]
	pub context: BTreeMap<String, String>,
	pub timestamp: DateTime<Utc>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<CausalError>,
	#[serde(default)]
	pub caller_frames: Vec<StackFrame>,
}

impl LogEvent {
	/// Creates an event stamped with the current time on an unnamed thread.
	pub fn new(
		level: LogLevel,
		logger_name: impl Into<String>,
		message: impl Into<String>,
	) -> Self {
		Self {
			message: message.into(),
			level,
			thread_name: String::new(),
			logger_name: logger_name.into(),
			context: BTreeMap::new(),
			timestamp: Utc::now(),
			error: None,
			caller_frames: Vec::new(),
		}
	}

	pub fn with_thread(mut self, thread_name: impl Into<String>) -> Self {
		self.thread_name = thread_name.into();
		self
	}

	pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.context.insert(key.into(), value.into());
		self
	}

	pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
		self.timestamp = timestamp;
		self
	}

	pub fn with_error(mut self, error: CausalError) -> Self {
		self.error = Some(error);
		self
	}

	pub fn with_caller_frame(mut self, frame: StackFrame) -> Self {
		self.caller_frames.push(frame);
		self
	}
}
