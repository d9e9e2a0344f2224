// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: defaults, TOML files and environment variables.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::config::{split_list, ApiKey, ReporterConfigLayer};
use crate::error::ConfigError;

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ReporterConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ReporterConfigLayer, ConfigError> {
		Ok(ReporterConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file yields an empty layer.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/loom/crash-report.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ReporterConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ReporterConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ReporterConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: `LOOM_CRASH_REPORT_<FIELD>`. List values are comma separated.
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ReporterConfigLayer, ConfigError> {
		debug!("loading environment variables");
		layer_from_lookup(|name| std::env::var(name).ok())
	}
}

fn layer_from_lookup<F>(lookup: F) -> Result<ReporterConfigLayer, ConfigError>
where
	F: Fn(&str) -> Option<String>,
{
	let var = |name: &str| lookup(name).filter(|s| !s.is_empty());

	let bool_var = |name: &str| var(name).map(|v| v.eq_ignore_ascii_case("true") || v == "1");

	let number_var = |name: &str| -> Result<Option<u64>, ConfigError> {
		match var(name) {
			Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
				key: name.to_string(),
				message: format!("invalid number '{v}'"),
			}),
			None => Ok(None),
		}
	};

	let size_var = |name: &str| -> Result<Option<usize>, ConfigError> {
		number_var(name)?
			.map(|n| {
				usize::try_from(n).map_err(|_| ConfigError::InvalidValue {
					key: name.to_string(),
					message: format!("{n} out of range"),
				})
			})
			.transpose()
	};

	let max_cause_depth = size_var("LOOM_CRASH_REPORT_MAX_CAUSE_DEPTH")?;

	Ok(ReporterConfigLayer {
		api_key: var("LOOM_CRASH_REPORT_API_KEY").map(ApiKey::new),
		endpoint: var("LOOM_CRASH_REPORT_ENDPOINT"),
		application_id: var("LOOM_CRASH_REPORT_APPLICATION_ID"),
		exclude_from_stacktraces: var("LOOM_CRASH_REPORT_EXCLUDE_FROM_STACKTRACES")
			.map(|v| split_list(&v)),
		exclude_rust_runtime: bool_var("LOOM_CRASH_REPORT_EXCLUDE_RUST_RUNTIME"),
		tags: var("LOOM_CRASH_REPORT_TAGS").map(|v| split_list(&v)),
		max_cause_depth,
		attach_backtrace: bool_var("LOOM_CRASH_REPORT_ATTACH_BACKTRACE"),
		request_timeout_secs: number_var("LOOM_CRASH_REPORT_REQUEST_TIMEOUT_SECS")?,
		queue_capacity: size_var("LOOM_CRASH_REPORT_QUEUE_CAPACITY")?,
	})
}
