// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Background task that drains captured events and submits them.

use loom_crash_report_core::LogEvent;
use tokio::sync::mpsc::Receiver;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::CrashReportError;
use crate::reporter::CrashReporter;

/// Consumes the events a [`CrashReportLayer`](crate::CrashReportLayer)
/// captures.
///
/// Runs until every layer handle is dropped or the reporter shuts down.
/// Submission failures are logged and the worker keeps going.
pub struct ReportWorker {
	reporter: CrashReporter,
	receiver: Receiver<LogEvent>,
	shutdown: watch::Receiver<bool>,
}

impl ReportWorker {
	pub(crate) fn new(
		reporter: CrashReporter,
		receiver: Receiver<LogEvent>,
		shutdown: watch::Receiver<bool>,
	) -> Self {
		Self {
			reporter,
			receiver,
			shutdown,
		}
	}

	/// Spawns the worker onto the current tokio runtime.
	pub fn spawn(self) -> JoinHandle<()> {
		tokio::spawn(self.run())
	}

	pub async fn run(mut self) {
		loop {
			if *self.shutdown.borrow_and_update() {
				break;
			}

			let event = tokio::select! {
				biased;
				_ = self.shutdown.changed() => continue,
				event = self.receiver.recv() => match event {
					Some(event) => event,
					None => break,
				},
			};

			match self.reporter.capture_event(&event).await {
				Ok(()) => {}
				Err(CrashReportError::ReporterShutdown) => break,
				Err(e) => {
					warn!(error = %e, logger = %event.logger_name, "Failed to submit crash report");
				}
			}
		}

		debug!(
			dropped_events = self.reporter.dropped_events(),
			"Crash report worker stopped"
		);
	}
}
