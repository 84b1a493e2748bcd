/*!
 * Structured Tracing
 * Log setup and interval boundary spans using the tracing crate
 *
 * Logs always go to stderr: stdout belongs to the interactive view and
 * the CSV file to the CSV sink.
 */

use std::time::Instant;
use tracing::{debug, info, span, trace, Level, Span};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable switching log output to JSON
pub const TRACE_JSON_ENV: &str = "INSNMIX_TRACE_JSON";

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: warn in interactive mode, info otherwise)
/// - INSNMIX_TRACE_JSON: Enable JSON output (default: false)
pub fn init_tracing(interactive: bool) {
    let default_level = if interactive { "warn" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let use_json = std::env::var(TRACE_JSON_ENV)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_thread_names(true)
                    .compact(),
            )
            .try_init()
    };

    if result.is_ok() {
        debug!(json = use_json, "structured tracing initialized");
    }
}

/// Span covering one interval boundary
pub struct BoundarySpan {
    span: Span,
    start: Instant,
}

impl BoundarySpan {
    pub fn new(interval: u64) -> Self {
        let span = span!(
            Level::DEBUG,
            "interval_boundary",
            interval,
            phase = tracing::field::Empty,
            samples = tracing::field::Empty,
            duration_us = tracing::field::Empty,
        );
        Self {
            span,
            start: Instant::now(),
        }
    }

    /// Mark the step the boundary has reached
    pub fn phase(&self, phase: &'static str) {
        self.span.record("phase", phase);
        self.span.in_scope(|| trace!(phase, "interval boundary step"));
    }

    /// Record the result and close the span
    pub fn finish(self, samples: u64) {
        let duration_us = self.start.elapsed().as_micros() as u64;
        self.span.record("samples", samples);
        self.span.record("duration_us", duration_us);
        let _entered = self.span.enter();
        if duration_us > 100_000 {
            info!(duration_us, "slow interval boundary");
        }
    }
}
