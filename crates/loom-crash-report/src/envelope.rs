// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The submission document sent to the crash service.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use loom_crash_report_core::{LogEvent, ReportNode};
use serde::{Deserialize, Serialize};

/// SDK version for identification.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");
/// SDK name for identification.
pub const SDK_NAME: &str = "loom-crash-report";
/// SDK home page reported with every envelope.
pub const SDK_URL: &str = env!("CARGO_PKG_REPOSITORY");

/// Machine name reported when the host name cannot be determined.
pub const UNKNOWN_HOST: &str = "UnknownHost";

/// Complete submission document: the report tree plus machine, client, tag
/// and custom-data details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrashEnvelope {
	pub occurred_on: DateTime<Utc>,
	pub details: EnvelopeDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeDetails {
	pub machine_name: String,
	pub client: ClientDetails,
	pub environment: EnvironmentDetails,
	pub error: ReportNode,
	#[serde(default)]
	pub tags: Vec<String>,
	#[serde(default)]
	pub user_custom_data: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDetails {
	pub name: String,
	pub version: String,
	pub client_url: String,
}

impl Default for ClientDetails {
	fn default() -> Self {
		Self {
			name: SDK_NAME.to_string(),
			version: SDK_VERSION.to_string(),
			client_url: SDK_URL.to_string(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentDetails {
	pub os: String,
	pub architecture: String,
	pub processor_count: usize,
}

impl EnvironmentDetails {
	/// Details of the running process's host.
	pub fn current() -> Self {
		Self {
			os: std::env::consts::OS.to_string(),
			architecture: std::env::consts::ARCH.to_string(),
			processor_count: std::thread::available_parallelism()
				.map(|n| n.get())
				.unwrap_or(1),
		}
	}
}

/// The host name, or [`UNKNOWN_HOST`] if it cannot be determined.
pub fn machine_name() -> String {
	hostname::get()
		.ok()
		.map(|h| h.to_string_lossy().to_string())
		.filter(|h| !h.is_empty())
		.unwrap_or_else(|| UNKNOWN_HOST.to_string())
}

/// Custom data attached to every report: thread, logger, application id,
/// timestamp and one `mdc:<key>` entry per context tag.
pub fn user_custom_data(event: &LogEvent, application_id: &str) -> BTreeMap<String, String> {
	let mut data = BTreeMap::new();
	data.insert("thread".to_string(), event.thread_name.clone());
	data.insert("logger".to_string(), event.logger_name.clone());
	data.insert("applicationId".to_string(), application_id.to_string());
	data.insert("datetime".to_string(), event.timestamp.to_rfc3339());
	for (key, value) in &event.context {
		data.insert(format!("mdc:{key}"), value.clone());
	}
	data
}
