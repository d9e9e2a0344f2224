// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Delivery of crash envelopes to the crash service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error};

use crate::config::ApiKey;
use crate::envelope::CrashEnvelope;
use crate::error::{CrashReportError, Result};

/// Header carrying the API key on every submission.
pub const API_KEY_HEADER: &str = "X-ApiKey";

/// Sends finished envelopes somewhere.
#[async_trait]
pub trait ReportTransport: Send + Sync {
	async fn send(&self, envelope: &CrashEnvelope) -> Result<()>;
}

/// Posts envelopes as JSON to a fixed endpoint.
pub struct HttpTransport {
	http_client: Client,
	endpoint: String,
	api_key: ApiKey,
}

impl HttpTransport {
	pub fn new(endpoint: impl Into<String>, api_key: ApiKey, timeout: Duration) -> Result<Self> {
		let http_client = Client::builder()
			.timeout(timeout)
			.build()
			.map_err(CrashReportError::RequestFailed)?;

		Ok(Self {
			http_client,
			endpoint: endpoint.into(),
			api_key,
		})
	}

	pub fn endpoint(&self) -> &str {
		&self.endpoint
	}
}

#[async_trait]
impl ReportTransport for HttpTransport {
	async fn send(&self, envelope: &CrashEnvelope) -> Result<()> {
		debug!(endpoint = %self.endpoint, "Sending crash report");

		let response = self
			.http_client
			.post(&self.endpoint)
			.header(API_KEY_HEADER, self.api_key.expose())
			.json(envelope)
			.send()
			.await?;

		if response.status().is_success() {
			debug!("Crash report delivered");
			Ok(())
		} else {
			let status = response.status().as_u16();
			let message = response.text().await.unwrap_or_default();
			error!(status, message = %message, "Crash service rejected report");
			Err(CrashReportError::ServerError { status, message })
		}
	}
}
