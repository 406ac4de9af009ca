// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for agent lifecycle and sink delivery events.
//!
//! Each message implements `Display` for the human-readable line and
//! [`StructuredLog`] to emit the same event with machine-readable fields
//! at the level matching its meaning.

use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Trait for messages that emit themselves as structured log events.
pub trait StructuredLog {
    /// Emit the event: human-readable message plus structured fields.
    /// The log level is fixed by the message type's semantic meaning.
    fn log(&self);
}

/// A recipe run has started.
pub struct RunStarted<'a> {
    pub recipe: &'a str,
}

impl Display for RunStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Running recipe \"{}\"", self.recipe)
    }
}

impl StructuredLog for RunStarted<'_> {
    fn log(&self) {
        tracing::info!(recipe = self.recipe, "{}", self);
    }
}

/// A recipe run finished without error.
pub struct RunCompleted<'a> {
    pub recipe: &'a str,
    pub record_count: u64,
    pub duration_ms: u64,
}

impl Display for RunCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Done running recipe \"{}\": {} records in {}ms",
            self.recipe, self.record_count, self.duration_ms
        )
    }
}

impl StructuredLog for RunCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            recipe = self.recipe,
            record_count = self.record_count,
            duration_ms = self.duration_ms,
            "{}",
            self
        );
    }
}

/// A recipe run failed.
pub struct RunFailed<'a> {
    pub recipe: &'a str,
    pub record_count: u64,
    pub duration_ms: u64,
    pub error: &'a dyn std::error::Error,
}

impl Display for RunFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Error running recipe \"{}\" after {}ms: {}",
            self.recipe, self.duration_ms, self.error
        )
    }
}

impl StructuredLog for RunFailed<'_> {
    fn log(&self) {
        tracing::error!(
            recipe = self.recipe,
            record_count = self.record_count,
            duration_ms = self.duration_ms,
            error = %self.error,
            "{}",
            self
        );
    }
}

/// A sink write failed with a transient error and will be retried.
pub struct SinkRetrying<'a> {
    pub sink: &'a str,
    pub delay: Duration,
    pub error: &'a dyn std::error::Error,
}

impl Display for SinkRetrying<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Retrying sink \"{}\" in {:?}: {}",
            self.sink, self.delay, self.error
        )
    }
}

impl StructuredLog for SinkRetrying<'_> {
    fn log(&self) {
        tracing::info!(
            sink = self.sink,
            delay_ms = self.delay.as_millis() as u64,
            error = %self.error,
            "{}",
            self
        );
    }
}

/// A sink write failed permanently, after any retries.
pub struct SinkFailed<'a> {
    pub sink: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for SinkFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Error running sink \"{}\": {}", self.sink, self.error)
    }
}

impl StructuredLog for SinkFailed<'_> {
    fn log(&self) {
        tracing::error!(sink = self.sink, error = %self.error, "{}", self);
    }
}

/// A sink's close hook failed; the run outcome is unaffected.
pub struct SinkCloseFailed<'a> {
    pub sink: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for SinkCloseFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Error closing sink \"{}\": {}", self.sink, self.error)
    }
}

impl StructuredLog for SinkCloseFailed<'_> {
    fn log(&self) {
        tracing::warn!(sink = self.sink, error = %self.error, "{}", self);
    }
}

/// The monitor hook panicked while recording a run.
pub struct MonitorPanicked<'a> {
    pub recipe: &'a str,
}

impl Display for MonitorPanicked<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Monitor panicked while recording run for recipe \"{}\"",
            self.recipe
        )
    }
}

impl StructuredLog for MonitorPanicked<'_> {
    fn log(&self) {
        tracing::warn!(recipe = self.recipe, "{}", self);
    }
}
