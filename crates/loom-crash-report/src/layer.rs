// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tracing layer that turns log events into [`LogEvent`]s for the report worker.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use loom_crash_report_core::{CausalError, LogEvent, LogLevel, StackFrame};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Sender;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Level, Metadata, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use crate::backtrace::capture_frames;
use crate::causal::causal_chain;

/// Events from this crate are never reported, so a failing submission cannot
/// feed back into itself.
const SELF_TARGET: &str = "loom_crash_report";

/// A tracing Layer that captures events for crash reporting.
///
/// Every event that reaches the layer becomes one [`LogEvent`]: the message,
/// level, thread, target (as the logger name), the fields of the enclosing
/// spans and of the event itself as context tags, and any field recorded as
/// an error as the causal chain. Apply a filter
/// (`layer.with_filter(LevelFilter::ERROR)`) to limit what gets reported.
///
/// The queue to the worker is bounded; events captured while it is full are
/// dropped and counted.
#[derive(Clone)]
pub struct CrashReportLayer {
	sender: Sender<LogEvent>,
	dropped: Arc<AtomicU64>,
	max_cause_depth: usize,
	attach_backtrace: bool,
}

impl CrashReportLayer {
	pub(crate) fn new(
		sender: Sender<LogEvent>,
		dropped: Arc<AtomicU64>,
		max_cause_depth: usize,
		attach_backtrace: bool,
	) -> Self {
		Self {
			sender,
			dropped,
			max_cause_depth,
			attach_backtrace,
		}
	}

	/// Number of events dropped because the queue was full.
	pub fn dropped_events(&self) -> u64 {
		self.dropped.load(Ordering::Relaxed)
	}

	fn capture(&self, event: &Event<'_>, context: BTreeMap<String, String>) -> LogEvent {
		let metadata = event.metadata();

		let mut visitor = EventVisitor::new(self.max_cause_depth);
		event.record(&mut visitor);

		let caller = caller_frame(metadata);
		let mut log_event = LogEvent::new(
			level_of(metadata.level()),
			metadata.target(),
			visitor.message.unwrap_or_default(),
		)
		.with_thread(current_thread_name())
		.with_timestamp(Utc::now());

		log_event.context = context;
		log_event.context.extend(visitor.fields);

		if let Some(mut error) = visitor.error {
			error.frames = if self.attach_backtrace {
				capture_frames()
			} else {
				caller.iter().cloned().collect()
			};
			log_event = log_event.with_error(error);
		}

		if let Some(frame) = caller {
			log_event = log_event.with_caller_frame(frame);
		}

		log_event
	}
}

impl<S> Layer<S> for CrashReportLayer
where
	S: Subscriber + for<'a> LookupSpan<'a>,
{
	fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
		let Some(span) = ctx.span(id) else {
			return;
		};

		let mut visitor = FieldVisitor::default();
		attrs.record(&mut visitor);
		span.extensions_mut().insert(SpanFields(visitor.fields));
	}

	fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
		let Some(span) = ctx.span(id) else {
			return;
		};

		let mut visitor = FieldVisitor::default();
		values.record(&mut visitor);

		let mut extensions = span.extensions_mut();
		match extensions.get_mut::<SpanFields>() {
			Some(existing) => existing.0.extend(visitor.fields),
			None => extensions.insert(SpanFields(visitor.fields)),
		}
	}

	fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
		if is_own_target(event.metadata().target()) {
			return;
		}

		// Outermost span first so inner spans override.
		let mut context = BTreeMap::new();
		if let Some(scope) = ctx.event_scope(event) {
			for span in scope.from_root() {
				if let Some(fields) = span.extensions().get::<SpanFields>() {
					context.extend(fields.0.iter().map(|(k, v)| (k.clone(), v.clone())));
				}
			}
		}

		let log_event = self.capture(event, context);

		match self.sender.try_send(log_event) {
			Ok(()) => {}
			Err(TrySendError::Full(_)) => {
				self.dropped.fetch_add(1, Ordering::Relaxed);
			}
			// Worker is gone after shutdown.
			Err(TrySendError::Closed(_)) => {}
		}
	}
}

/// Fields recorded on a span, stored in its extensions.
struct SpanFields(BTreeMap<String, String>);

#[derive(Default)]
struct FieldVisitor {
	fields: BTreeMap<String, String>,
}

impl Visit for FieldVisitor {
	fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
		self.fields
			.insert(field.name().to_string(), format!("{value:?}"));
	}

	fn record_str(&mut self, field: &Field, value: &str) {
		self.fields.insert(field.name().to_string(), value.to_string());
	}
}

struct EventVisitor {
	message: Option<String>,
	fields: BTreeMap<String, String>,
	error: Option<CausalError>,
	max_cause_depth: usize,
}

impl EventVisitor {
	fn new(max_cause_depth: usize) -> Self {
		Self {
			message: None,
			fields: BTreeMap::new(),
			error: None,
			max_cause_depth,
		}
	}

	fn record_value(&mut self, field: &Field, value: String) {
		if field.name() == "message" {
			self.message = Some(value);
		} else {
			self.fields.insert(field.name().to_string(), value);
		}
	}
}

impl Visit for EventVisitor {
	fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
		self.record_value(field, format!("{value:?}"));
	}

	fn record_str(&mut self, field: &Field, value: &str) {
		self.record_value(field, value.to_string());
	}

	fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
		// The first error field wins; later ones are kept as plain text.
		if self.error.is_none() {
			self.error = Some(causal_chain(value, Vec::new(), self.max_cause_depth));
		} else {
			self.record_value(field, value.to_string());
		}
	}
}

fn is_own_target(target: &str) -> bool {
	target
		.strip_prefix(SELF_TARGET)
		.is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

fn level_of(level: &Level) -> LogLevel {
	match *level {
		Level::TRACE => LogLevel::Trace,
		Level::DEBUG => LogLevel::Debug,
		Level::INFO => LogLevel::Info,
		Level::WARN => LogLevel::Warn,
		Level::ERROR => LogLevel::Error,
	}
}

fn caller_frame(metadata: &Metadata<'_>) -> Option<StackFrame> {
	let module = metadata.module_path()?;
	Some(StackFrame {
		declaring_type: Some(module.to_string()),
		method: None,
		file: metadata.file().map(String::from),
		line: metadata.line(),
	})
}

pub(crate) fn current_thread_name() -> String {
	let thread = std::thread::current();
	thread
		.name()
		.map(String::from)
		.unwrap_or_else(|| format!("{:?}", thread.id()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use tokio::sync::mpsc;
	use tracing_subscriber::layer::SubscriberExt;

	fn capture_into<F: FnOnce()>(layer: CrashReportLayer, f: F) {
		let subscriber = tracing_subscriber::registry().with(layer);
		tracing::subscriber::with_default(subscriber, f);
	}

	fn capture_with_options<F: FnOnce()>(attach_backtrace: bool, f: F) -> Vec<LogEvent> {
		let (sender, mut receiver) = mpsc::channel(64);
		let dropped = Arc::new(AtomicU64::new(0));
		capture_into(CrashReportLayer::new(sender, dropped, 32, attach_backtrace), f);

		let mut events = Vec::new();
		while let Ok(event) = receiver.try_recv() {
			events.push(event);
		}
		events
	}

	fn capture_with<F: FnOnce()>(f: F) -> Vec<LogEvent> {
		capture_with_options(false, f)
	}

	#[test]
	fn test_captures_message_level_and_logger() {
		let events = capture_with(|| {
			tracing::error!(target: "billing::invoice", "payment failed");
		});

		assert_eq!(events.len(), 1);
		assert_eq!(events[0].message, "payment failed");
		assert_eq!(events[0].level, LogLevel::Error);
		assert_eq!(events[0].logger_name, "billing::invoice");
		assert!(events[0].error.is_none());
	}

	#[test]
	fn test_event_fields_override_span_fields() {
		let events = capture_with(|| {
			let span = tracing::info_span!("request", request_id = "r-1", tenant = "acme");
			let _guard = span.enter();
			tracing::warn!(target: "app", tenant = "globex", attempt = 3, "retrying");
		});

		let context = &events[0].context;
		assert_eq!(context["request_id"], "r-1");
		assert_eq!(context["tenant"], "globex");
		assert_eq!(context["attempt"], "3");
		assert!(!context.contains_key("message"));
	}

	#[test]
	fn test_recorded_span_values_are_captured() {
		let events = capture_with(|| {
			let span = tracing::info_span!("job", job_id = tracing::field::Empty);
			span.record("job_id", "j-9");
			let _guard = span.enter();
			tracing::error!(target: "app", "job failed");
		});

		assert_eq!(events[0].context["job_id"], "j-9");
	}

	#[test]
	fn test_error_field_becomes_causal_chain() {
		let events = capture_with(|| {
			let err = "x".parse::<u32>().unwrap_err();
			let err: &(dyn std::error::Error + 'static) = &err;
			tracing::error!(target: "app", error = err, "parse failed");
		});

		let error = events[0].error.as_ref().unwrap();
		assert_eq!(error.class_name, "ParseIntError");
		assert_eq!(error.message.as_deref(), Some("invalid digit found in string"));
		assert_eq!(error.frames.len(), 1);
		assert!(!events[0].context.contains_key("error"));
	}

	#[test]
	fn test_caller_frame_from_metadata() {
		let events = capture_with(|| {
			tracing::error!(target: "app", "located");
		});

		let frame = &events[0].caller_frames[0];
		assert_eq!(frame.declaring_type.as_deref(), Some(module_path!()));
		assert_eq!(frame.file.as_deref(), Some(file!()));
		assert!(frame.line.is_some());
	}

	#[test]
	fn test_own_events_are_ignored() {
		let events = capture_with(|| {
			tracing::error!(target: "loom_crash_report::transport", "delivery failed");
			tracing::error!(target: "app", "kept");
		});

		assert_eq!(events.len(), 1);
		assert_eq!(events[0].message, "kept");
	}

	#[test]
	fn test_similarly_named_crates_are_reported() {
		let events = capture_with(|| {
			tracing::error!(target: "loom_crash_report", "own root target");
			tracing::error!(target: "loom_crash_reporter_demo", "user crate");
			tracing::error!(target: "loom_crash_report_core_ext::jobs", "user crate too");
		});

		let messages: Vec<_> = events.iter().map(|e| e.message.as_str()).collect();
		assert_eq!(messages, vec!["user crate", "user crate too"]);
	}

	#[test]
	fn test_backtrace_frames_attached_to_head_error() {
		let events = capture_with_options(true, || {
			let err = "x".parse::<u32>().unwrap_err();
			tracing::error!(
				target: "app",
				error = &err as &(dyn std::error::Error + 'static),
				"parse failed"
			);
		});

		let error = events[0].error.as_ref().unwrap();
		assert!(!error.frames.is_empty());
		assert!(
			error.frames.iter().any(|f| f
				.declaring_type
				.as_deref()
				.is_some_and(|ty| ty.contains("layer::tests"))),
			"expected a frame from this module in {:?}",
			error.frames
		);
		assert!(error.cause.is_none());
	}

	#[test]
	fn test_full_queue_drops_and_counts_events() {
		let (sender, mut receiver) = mpsc::channel(1);
		let dropped = Arc::new(AtomicU64::new(0));
		let layer = CrashReportLayer::new(sender, dropped, 32, false);
		let handle = layer.clone();

		capture_into(layer, || {
			tracing::error!(target: "app", "first");
			tracing::error!(target: "app", "second");
			tracing::error!(target: "app", "third");
		});

		assert_eq!(receiver.try_recv().unwrap().message, "first");
		assert!(receiver.try_recv().is_err());
		assert_eq!(handle.dropped_events(), 2);
	}

	#[test]
	fn test_level_mapping() {
		assert_eq!(level_of(&Level::TRACE), LogLevel::Trace);
		assert_eq!(level_of(&Level::WARN), LogLevel::Warn);
		assert_eq!(level_of(&Level::ERROR), LogLevel::Error);
	}
}
