/*!
 * Monitoring
 * Structured logging for the profiler itself
 */

mod tracer;

pub use tracer::{init_tracing, BoundarySpan, TRACE_JSON_ENV};
