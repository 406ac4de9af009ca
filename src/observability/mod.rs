// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability: run metrics hook and structured log messages.
//!
//! Message types follow a struct-based pattern with a `Display`
//! implementation plus a [`messages::StructuredLog`] impl, so the same
//! event renders as a human-readable line and as machine-readable
//! `tracing` fields. The [`Monitor`] trait is the single metrics hook the
//! agent calls with the outcome of every run.

pub mod messages;

use crate::engine::Run;

/// Observer invoked with the summary of every run.
///
/// Called exactly once per run — success, failure, or panic. The default
/// implementation is a no-op. Implementations must not panic; if one
/// does, the agent logs it and moves on, it is never re-raised.
pub trait Monitor: Send + Sync {
    fn record_run(&self, run: &Run);
}

/// Monitor that discards every run summary.
#[derive(Debug, Default)]
pub struct NoopMonitor;

impl Monitor for NoopMonitor {
    fn record_run(&self, _run: &Run) {}
}
