// In: src/telemetry.rs

//! Failure telemetry emitted by the cursor.
//!
//! When a cursor fails on bad data or a failed fetch it reports the failure once
//! through an injected [`TelemetrySink`]. Sinks are best-effort: a panicking sink
//! is contained and can never change what the cursor returns to its caller.

use std::panic::{self, AssertUnwindSafe};

use serde::Serialize;

use crate::error::ErrorKind;

/// A single failure report.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TelemetryEvent {
    pub kind: ErrorKind,
    /// Ordinal, in result order, of the batch being pulled when the failure occurred.
    pub batch_ordinal: usize,
    pub byte_offset: Option<u64>,
    pub message: String,
}

pub trait TelemetrySink: Send + Sync {
    fn emit(&self, event: &TelemetryEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

impl TelemetrySink for NoopTelemetry {
    fn emit(&self, _event: &TelemetryEvent) {}
}

/// Writes each event as a JSON line through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTelemetry;

impl TelemetrySink for LogTelemetry {
    fn emit(&self, event: &TelemetryEvent) {
        match serde_json::to_string(event) {
            Ok(json) => log::error!(target: "rowset::telemetry", "{}", json),
            Err(e) => log::warn!(target: "rowset::telemetry", "unserializable event: {}", e),
        }
    }
}

/// Delivers `event` to `sink`, swallowing any panic raised by the sink.
pub(crate) fn emit_guarded(sink: &dyn TelemetrySink, event: &TelemetryEvent) {
    if panic::catch_unwind(AssertUnwindSafe(|| sink.emit(event))).is_err() {
        log::warn!(
            target: "rowset::telemetry",
            "telemetry sink panicked while reporting a {:?} failure",
            event.kind
        );
    }
}
