// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Reporter configuration.
//!
//! Configuration is resolved from layers in the usual Loom order: built-in
//! defaults, then an optional TOML file, then `LOOM_CRASH_REPORT_*`
//! environment variables. Each source produces a [`ReporterConfigLayer`];
//! layers are merged and finalized into a [`ReporterConfig`].

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use loom_crash_report_core::{ExcludedPrefixes, ReportOptions, DEFAULT_MAX_CAUSE_DEPTH};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::sources::{ConfigSource, DefaultsSource, EnvSource, TomlSource};

/// Default HTTP request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of captured events waiting for submission before new ones
/// are dropped.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Application id reported in custom data when none is configured.
pub const UNNAMED_APPLICATION: &str = "unnamed";

/// API key for the crash service. Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
	pub fn new(key: impl Into<String>) -> Self {
		Self(key.into())
	}

	pub fn expose(&self) -> &str {
		&self.0
	}
}

impl fmt::Debug for ApiKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("ApiKey([REDACTED])")
	}
}

/// Reporter configuration (runtime, fully resolved).
#[derive(Debug, Clone)]
pub struct ReporterConfig {
	pub api_key: Option<ApiKey>,
	/// Full URL reports are posted to.
	pub endpoint: Option<String>,
	/// Prefixed to report messages and sent as `applicationId` custom data.
	pub application_id: Option<String>,
	/// Includes the Rust runtime preset when `exclude_rust_runtime` is set.
	pub exclude_from_stacktraces: ExcludedPrefixes,
	pub tags: Vec<String>,
	pub max_cause_depth: usize,
	/// Capture a backtrace for the head error of each reported chain.
	pub attach_backtrace: bool,
	pub request_timeout: Duration,
	/// Events captured while this many are already waiting are dropped.
	pub queue_capacity: usize,
}

impl Default for ReporterConfig {
	fn default() -> Self {
		ReporterConfigLayer::default().finalize()
	}
}

impl ReporterConfig {
	/// Options handed to the report builder.
	pub fn report_options(&self) -> ReportOptions {
		ReportOptions {
			excluded_prefixes: self.exclude_from_stacktraces.clone(),
			app_id: self.application_id.clone(),
			max_cause_depth: self.max_cause_depth,
		}
	}
}

/// Reporter configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReporterConfigLayer {
	#[serde(default)]
	pub api_key: Option<ApiKey>,
	#[serde(default)]
	pub endpoint: Option<String>,
	#[serde(default)]
	pub application_id: Option<String>,
	#[serde(default)]
	pub exclude_from_stacktraces: Option<Vec<String>>,
	#[serde(default)]
	pub exclude_rust_runtime: Option<bool>,
	#[serde(default)]
	pub tags: Option<Vec<String>>,
	#[serde(default)]
	pub max_cause_depth: Option<usize>,
	#[serde(default)]
	pub attach_backtrace: Option<bool>,
	#[serde(default)]
	pub request_timeout_secs: Option<u64>,
	#[serde(default)]
	pub queue_capacity: Option<usize>,
}

impl ReporterConfigLayer {
	pub fn merge(&mut self, other: ReporterConfigLayer) {
		if other.api_key.is_some() {
			self.api_key = other.api_key;
		}
		if other.endpoint.is_some() {
			self.endpoint = other.endpoint;
		}
		if other.application_id.is_some() {
			self.application_id = other.application_id;
		}
		if other.exclude_from_stacktraces.is_some() {
			self.exclude_from_stacktraces = other.exclude_from_stacktraces;
		}
		if other.exclude_rust_runtime.is_some() {
			self.exclude_rust_runtime = other.exclude_rust_runtime;
		}
		if other.tags.is_some() {
			self.tags = other.tags;
		}
		if other.max_cause_depth.is_some() {
			self.max_cause_depth = other.max_cause_depth;
		}
		if other.attach_backtrace.is_some() {
			self.attach_backtrace = other.attach_backtrace;
		}
		if other.request_timeout_secs.is_some() {
			self.request_timeout_secs = other.request_timeout_secs;
		}
		if other.queue_capacity.is_some() {
			self.queue_capacity = other.queue_capacity;
		}
	}

	pub fn finalize(self) -> ReporterConfig {
		let mut exclude_from_stacktraces = self
			.exclude_from_stacktraces
			.map(ExcludedPrefixes::new)
			.unwrap_or_default();
		if self.exclude_rust_runtime.unwrap_or(false) {
			exclude_from_stacktraces.extend(&ExcludedPrefixes::rust_runtime());
		}

		ReporterConfig {
			api_key: self.api_key,
			endpoint: self
				.endpoint
				.map(|url| url.trim_end_matches('/').to_string())
				.filter(|url| !url.is_empty()),
			application_id: self.application_id.filter(|id| !id.is_empty()),
			exclude_from_stacktraces,
			tags: self
				.tags
				.unwrap_or_default()
				.into_iter()
				.map(|t| t.trim().to_string())
				.filter(|t| !t.is_empty())
				.collect(),
			max_cause_depth: self.max_cause_depth.unwrap_or(DEFAULT_MAX_CAUSE_DEPTH),
			attach_backtrace: self.attach_backtrace.unwrap_or(false),
			request_timeout: self
				.request_timeout_secs
				.map(Duration::from_secs)
				.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
			queue_capacity: self
				.queue_capacity
				.unwrap_or(DEFAULT_QUEUE_CAPACITY)
				.max(1),
		}
	}
}

/// Splits a comma-separated list, trimming entries and dropping blanks.
pub fn split_list(list: &str) -> Vec<String> {
	list
		.split(',')
		.map(str::trim)
		.filter(|s| !s.is_empty())
		.map(String::from)
		.collect()
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`LOOM_CRASH_REPORT_*`)
/// 2. Config file (`/etc/loom/crash-report.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ReporterConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<PathBuf>,
) -> Result<ReporterConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

/// Load configuration from environment only.
pub fn load_config_from_env() -> Result<ReporterConfig, ConfigError> {
	load_from_sources(vec![Box::new(EnvSource)])
}

pub(crate) fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<ReporterConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ReporterConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	let config = merged.finalize();
	info!(
		endpoint_configured = config.endpoint.is_some(),
		api_key_configured = config.api_key.is_some(),
		application_id = config.application_id.as_deref().unwrap_or(UNNAMED_APPLICATION),
		excluded_prefixes = config.exclude_from_stacktraces.len(),
		attach_backtrace = config.attach_backtrace,
		"Crash report configuration loaded"
	);
	Ok(config)
}
