// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the crash report core.

use thiserror::Error;

/// Errors raised while parsing core types.
///
/// Report building itself is infallible; these only arise at the edges where
/// strings are turned into typed values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportCoreError {
	#[error("invalid log level: {0}")]
	InvalidLevel(String),
}

/// Result type for crash report core operations.
pub type Result<T> = std::result::Result<T, ReportCoreError>;
