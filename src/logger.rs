// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Structured logging capability consumed by the file and resource managers.
//!
//! Components take a [`Logger`] at construction instead of reaching for a
//! global, so tests can substitute a recording double. The default
//! implementation forwards to `tracing`.

use serde_json::Value;

/// A structured, side-effect-only log sink.
///
/// Implementations must not panic. `context` is a JSON object carrying the
/// event's fields.
pub trait Logger: Send + Sync {
    /// Logs a debug-level event.
    fn debug(&self, message: &str, context: Value);
    /// Logs an info-level event.
    fn info(&self, message: &str, context: Value);
    /// Logs a warning.
    fn warn(&self, message: &str, context: Value);
    /// Logs an error.
    fn error(&self, message: &str, context: Value);
}

/// [`Logger`] that emits `tracing` events under the `filepeek` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, message: &str, context: Value) {
        tracing::debug!(target: "filepeek", %context, "{message}");
    }

    fn info(&self, message: &str, context: Value) {
        tracing::info!(target: "filepeek", %context, "{message}");
    }

    fn warn(&self, message: &str, context: Value) {
        tracing::warn!(target: "filepeek", %context, "{message}");
    }

    fn error(&self, message: &str, context: Value) {
        tracing::error!(target: "filepeek", %context, "{message}");
    }
}

impl<L: Logger + ?Sized> Logger for std::sync::Arc<L> {
    fn debug(&self, message: &str, context: Value) {
        (**self).debug(message, context);
    }

    fn info(&self, message: &str, context: Value) {
        (**self).info(message, context);
    }

    fn warn(&self, message: &str, context: Value) {
        (**self).warn(message, context);
    }

    fn error(&self, message: &str, context: Value) {
        (**self).error(message, context);
    }
}
