// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the crash report SDK.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for crash report operations.
pub type Result<T> = std::result::Result<T, CrashReportError>;

/// Errors that can occur while building or submitting crash reports.
#[derive(Debug, Error)]
pub enum CrashReportError {
	/// The reporter has been shut down.
	#[error("crash reporter has been shut down")]
	ReporterShutdown,

	/// No API key was configured.
	#[error("API key is required")]
	MissingApiKey,

	/// No submission endpoint was configured.
	#[error("submission endpoint is required")]
	MissingEndpoint,

	/// HTTP request failed.
	#[error("HTTP request failed: {0}")]
	RequestFailed(#[from] reqwest::Error),

	/// The crash service rejected the report.
	#[error("server error (status {status}): {message}")]
	ServerError {
		/// HTTP status code.
		status: u16,
		/// Response body returned by the server.
		message: String,
	},

	/// Failed to serialize the report.
	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	/// Configuration could not be loaded.
	#[error("configuration error: {0}")]
	Config(#[from] ConfigError),
}

/// Errors that can occur while loading reporter configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to read config file {path}: {source}")]
	FileRead {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("TOML parse error in {path}: {source}")]
	TomlParse {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("invalid value for {key}: {message}")]
	InvalidValue { key: String, message: String },
}
