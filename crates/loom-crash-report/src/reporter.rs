// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Crash reporter: builds envelopes from log events and submits them.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use loom_crash_report_core::{ExcludedPrefixes, LogEvent, LogLevel, ReportBuilder};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::backtrace::capture_frames;
use crate::causal::causal_chain;
use crate::config::{ApiKey, ReporterConfig, UNNAMED_APPLICATION};
use crate::envelope::{
	machine_name, user_custom_data, ClientDetails, CrashEnvelope, EnvelopeDetails,
	EnvironmentDetails,
};
use crate::error::{CrashReportError, Result};
use crate::layer::{current_thread_name, CrashReportLayer};
use crate::transport::{HttpTransport, ReportTransport};
use crate::worker::ReportWorker;

/// Logger name used for errors captured directly through the reporter.
const DIRECT_CAPTURE_LOGGER: &str = "loom_crash_report";

/// Builder for constructing a CrashReporter.
pub struct CrashReporterBuilder {
	config: ReporterConfig,
	transport: Option<Arc<dyn ReportTransport>>,
}

impl CrashReporterBuilder {
	/// Creates a new builder with default settings.
	pub fn new() -> Self {
		Self::from_config(ReporterConfig::default())
	}

	/// Starts from a loaded configuration.
	pub fn from_config(config: ReporterConfig) -> Self {
		Self {
			config,
			transport: None,
		}
	}

	/// Sets the API key sent with every report.
	pub fn api_key(mut self, key: impl Into<String>) -> Self {
		self.config.api_key = Some(ApiKey::new(key));
		self
	}

	/// Sets the URL reports are posted to.
	pub fn endpoint(mut self, url: impl Into<String>) -> Self {
		self.config.endpoint = Some(url.into());
		self
	}

	pub fn application_id(mut self, id: impl Into<String>) -> Self {
		self.config.application_id = Some(id.into());
		self
	}

	/// Adds declaring-type prefixes whose frames are left out of reports.
	pub fn exclude_from_stacktraces(mut self, prefixes: ExcludedPrefixes) -> Self {
		self.config.exclude_from_stacktraces.extend(&prefixes);
		self
	}

	pub fn tag(mut self, tag: impl Into<String>) -> Self {
		self.config.tags.push(tag.into());
		self
	}

	pub fn max_cause_depth(mut self, depth: usize) -> Self {
		self.config.max_cause_depth = depth;
		self
	}

	/// Also excludes `std`, `tokio`, `tracing` and other runtime frames.
	pub fn exclude_rust_runtime(mut self) -> Self {
		self.config
			.exclude_from_stacktraces
			.extend(&ExcludedPrefixes::rust_runtime());
		self
	}

	pub fn attach_backtrace(mut self, enabled: bool) -> Self {
		self.config.attach_backtrace = enabled;
		self
	}

	/// Sets how many captured events may wait for submission.
	pub fn queue_capacity(mut self, capacity: usize) -> Self {
		self.config.queue_capacity = capacity.max(1);
		self
	}

	/// Sets the HTTP request timeout.
	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.config.request_timeout = timeout;
		self
	}

	/// Replaces the HTTP transport. API key and endpoint are then optional.
	pub fn transport(mut self, transport: Arc<dyn ReportTransport>) -> Self {
		self.transport = Some(transport);
		self
	}

	/// Builds the CrashReporter.
	pub fn build(self) -> Result<CrashReporter> {
		let mut config = self.config;
		if let Some(endpoint) = config.endpoint.as_mut() {
			let trimmed = endpoint.trim_end_matches('/').len();
			endpoint.truncate(trimmed);
		}

		let transport = match self.transport {
			Some(transport) => transport,
			None => {
				let api_key = config
					.api_key
					.clone()
					.ok_or(CrashReportError::MissingApiKey)?;
				let endpoint = config
					.endpoint
					.clone()
					.ok_or(CrashReportError::MissingEndpoint)?;
				Arc::new(HttpTransport::new(endpoint, api_key, config.request_timeout)?)
			}
		};

		let (shutdown, _) = watch::channel(false);
		let inner = Arc::new(CrashReporterInner {
			builder: ReportBuilder::new(config.report_options()),
			machine_name: machine_name(),
			environment: EnvironmentDetails::current(),
			transport,
			config,
			closed: AtomicBool::new(false),
			shutdown,
			dropped: Arc::new(AtomicU64::new(0)),
		});

		info!(
			endpoint = inner.config.endpoint.as_deref().unwrap_or("<custom transport>"),
			machine_name = %inner.machine_name,
			"Crash reporter initialized"
		);

		Ok(CrashReporter { inner })
	}
}

impl Default for CrashReporterBuilder {
	fn default() -> Self {
		Self::new()
	}
}

struct CrashReporterInner {
	config: ReporterConfig,
	builder: ReportBuilder,
	machine_name: String,
	environment: EnvironmentDetails,
	transport: Arc<dyn ReportTransport>,
	closed: AtomicBool,
	shutdown: watch::Sender<bool>,
	dropped: Arc<AtomicU64>,
}

/// Turns log events into crash reports and submits them.
///
/// # Example
///
/// ```ignore
/// use loom_crash_report::CrashReporter;
/// use tracing_subscriber::{filter::LevelFilter, prelude::*};
///
/// let reporter = CrashReporter::builder()
///     .api_key("key")
///     .endpoint("https://crash.example.com/entries")
///     .application_id("billing")
///     .build()?;
///
/// let (layer, worker) = reporter.layer();
/// worker.spawn();
///
/// tracing_subscriber::registry()
///     .with(layer.with_filter(LevelFilter::ERROR))
///     .init();
///
/// // ... application code ...
///
/// reporter.shutdown();
/// ```
#[derive(Clone)]
pub struct CrashReporter {
	inner: Arc<CrashReporterInner>,
}

impl CrashReporter {
	/// Creates a new builder for constructing a CrashReporter.
	pub fn builder() -> CrashReporterBuilder {
		CrashReporterBuilder::new()
	}

	pub fn config(&self) -> &ReporterConfig {
		&self.inner.config
	}

	/// Creates a tracing layer and the worker that submits what it captures.
	///
	/// The worker must be spawned (or otherwise polled) for reports to be sent.
	pub fn layer(&self) -> (CrashReportLayer, ReportWorker) {
		let (sender, receiver) = mpsc::channel(self.inner.config.queue_capacity.max(1));
		let layer = CrashReportLayer::new(
			sender,
			Arc::clone(&self.inner.dropped),
			self.inner.config.max_cause_depth,
			self.inner.config.attach_backtrace,
		);
		let worker = ReportWorker::new(self.clone(), receiver, self.inner.shutdown.subscribe());
		(layer, worker)
	}

	/// Events dropped by this reporter's layers because their queue was full.
	pub fn dropped_events(&self) -> u64 {
		self.inner.dropped.load(Ordering::Relaxed)
	}

	/// Builds the submission document for an event without sending it.
	pub fn build_envelope(&self, event: &LogEvent) -> CrashEnvelope {
		let application_id = self
			.inner
			.config
			.application_id
			.as_deref()
			.unwrap_or(UNNAMED_APPLICATION);

		CrashEnvelope {
			occurred_on: event.timestamp,
			details: EnvelopeDetails {
				machine_name: self.inner.machine_name.clone(),
				client: ClientDetails::default(),
				environment: self.inner.environment.clone(),
				error: self.inner.builder.build_event(event),
				tags: self.inner.config.tags.clone(),
				user_custom_data: user_custom_data(event, application_id),
			},
		}
	}

	/// Builds and submits the report for one event.
	pub async fn capture_event(&self, event: &LogEvent) -> Result<()> {
		self.check_closed()?;

		let envelope = self.build_envelope(event);
		debug!(
			logger = %event.logger_name,
			levels = envelope.details.error.inner_depth() + 1,
			root_cause = event.error.as_ref().map(|e| e.root_cause().class_name.as_str()),
			"Submitting crash report"
		);
		self.inner.transport.send(&envelope).await
	}

	/// Reports an error directly, outside of any logging call.
	pub async fn capture_error(
		&self,
		message: &str,
		error: &(dyn std::error::Error + 'static),
	) -> Result<()> {
		let head_frames = if self.inner.config.attach_backtrace {
			capture_frames()
		} else {
			Vec::new()
		};
		let chain = causal_chain(error, head_frames, self.inner.config.max_cause_depth);

		let event = LogEvent::new(LogLevel::Error, DIRECT_CAPTURE_LOGGER, message)
			.with_thread(current_thread_name())
			.with_timestamp(Utc::now())
			.with_error(chain);

		self.capture_event(&event).await
	}

	/// Shuts down the reporter and stops its workers. Events captured
	/// afterwards, or still queued, are dropped.
	pub fn shutdown(&self) {
		if self.inner.closed.swap(true, Ordering::SeqCst) {
			return;
		}
		self.inner.shutdown.send_replace(true);
		info!(dropped_events = self.dropped_events(), "Crash reporter shutdown");
	}

	/// Returns true if the reporter has been shut down.
	pub fn is_closed(&self) -> bool {
		self.inner.closed.load(Ordering::SeqCst)
	}

	fn check_closed(&self) -> Result<()> {
		if self.inner.closed.load(Ordering::SeqCst) {
			return Err(CrashReportError::ReporterShutdown);
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use loom_crash_report_core::{CausalError, StackFrame};
	use std::sync::Mutex;

	#[derive(Default)]
	struct RecordingTransport {
		sent: Mutex<Vec<CrashEnvelope>>,
	}

	#[async_trait]
	impl ReportTransport for RecordingTransport {
		async fn send(&self, envelope: &CrashEnvelope) -> Result<()> {
			self.sent.lock().unwrap().push(envelope.clone());
			Ok(())
		}
	}

	fn reporter_with(transport: Arc<RecordingTransport>) -> CrashReporter {
		CrashReporter::builder()
			.application_id("svc")
			.exclude_from_stacktraces(ExcludedPrefixes::new(["com.internal."]))
			.tag("prod")
			.transport(transport)
			.build()
			.unwrap()
	}

	#[test]
	fn test_builder_requires_api_key() {
		let result = CrashReporter::builder()
			.endpoint("https://crash.example.com/entries")
			.build();
		assert!(matches!(result, Err(CrashReportError::MissingApiKey)));
	}

	#[test]
	fn test_builder_requires_endpoint() {
		let result = CrashReporter::builder().api_key("key").build();
		assert!(matches!(result, Err(CrashReportError::MissingEndpoint)));
	}

	#[test]
	fn test_builder_trims_endpoint() {
		let reporter = CrashReporter::builder()
			.api_key("key")
			.endpoint("https://crash.example.com/entries/")
			.build()
			.unwrap();
		assert_eq!(
			reporter.config().endpoint.as_deref(),
			Some("https://crash.example.com/entries")
		);
	}

	#[test]
	fn test_envelope_carries_report_and_details() {
		let reporter = reporter_with(Arc::new(RecordingTransport::default()));
		let error = CausalError::new("X.Y").with_message("bad").with_frames(vec![
			StackFrame::new("com.internal.Pool", "get"),
			StackFrame::new("app.Handler", "run"),
		]);
		let event = LogEvent::new(LogLevel::Error, "app.Handler", "boom")
			.with_thread("main")
			.with_context("request_id", "r-1")
			.with_error(error);

		let envelope = reporter.build_envelope(&event);
		let details = &envelope.details;

		assert_eq!(details.error.message, "svc: boom; X.Y: bad");
		assert_eq!(details.error.class_name.as_deref(), Some("X.Y"));
		assert_eq!(details.error.frames, vec![StackFrame::new("app.Handler", "run")]);
		assert_eq!(details.tags, vec!["prod"]);
		assert_eq!(details.user_custom_data["applicationId"], "svc");
		assert_eq!(details.user_custom_data["mdc:request_id"], "r-1");
		assert_eq!(details.client.name, "loom-crash-report");
		assert_eq!(envelope.occurred_on, event.timestamp);
	}

	#[test]
	fn test_unnamed_application_by_default() {
		let reporter = CrashReporter::builder()
			.transport(Arc::new(RecordingTransport::default()))
			.build()
			.unwrap();
		let event = LogEvent::new(LogLevel::Error, "app", "boom");

		let envelope = reporter.build_envelope(&event);
		assert_eq!(envelope.details.user_custom_data["applicationId"], "unnamed");
		assert_eq!(envelope.details.error.message, "boom");
	}

	#[tokio::test]
	async fn test_capture_event_sends_envelope() {
		let transport = Arc::new(RecordingTransport::default());
		let reporter = reporter_with(transport.clone());

		reporter
			.capture_event(&LogEvent::new(LogLevel::Error, "app", "boom"))
			.await
			.unwrap();

		let sent = transport.sent.lock().unwrap();
		assert_eq!(sent.len(), 1);
		assert_eq!(sent[0].details.error.message, "svc: boom");
	}

	#[tokio::test]
	async fn test_capture_error_converts_source_chain() {
		let transport = Arc::new(RecordingTransport::default());
		let reporter = reporter_with(transport.clone());
		let error = "x".parse::<u32>().unwrap_err();

		reporter.capture_error("parse failed", &error).await.unwrap();

		let sent = transport.sent.lock().unwrap();
		assert_eq!(
			sent[0].details.error.message,
			"svc: parse failed; ParseIntError: invalid digit found in string"
		);
		assert_eq!(sent[0].details.user_custom_data["logger"], "loom_crash_report");
		assert_eq!(
			sent[0].details.user_custom_data["thread"],
			current_thread_name()
		);
	}

	#[tokio::test]
	async fn test_shutdown_rejects_captures() {
		let transport = Arc::new(RecordingTransport::default());
		let reporter = reporter_with(transport.clone());

		reporter.shutdown();
		assert!(reporter.is_closed());

		let result = reporter
			.capture_event(&LogEvent::new(LogLevel::Error, "app", "boom"))
			.await;
		assert!(matches!(result, Err(CrashReportError::ReporterShutdown)));
		assert!(transport.sent.lock().unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_shutdown_is_idempotent() {
		let reporter = reporter_with(Arc::new(RecordingTransport::default()));
		reporter.shutdown();
		reporter.shutdown();
		assert!(reporter.is_closed());
	}
}
