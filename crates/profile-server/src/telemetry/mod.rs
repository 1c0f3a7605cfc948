//! Tracing setup: structured JSON logs plus optional OTLP span export.
//!
//! When `OTEL_EXPORTER_OTLP_ENDPOINT` is set, spans are exported over
//! OTLP/gRPC to a collector; otherwise they are only logged locally.
//!
//! # Telemetry invariants
//!
//! - **No PII or key material** must appear in any span attribute or log
//!   field: no passwords, tokens, keys, or Aadhaar numbers, in either form.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`); `RUST_LOG`
//!   takes precedence.

pub mod init;

pub use init::{init_telemetry, shutdown_telemetry};
