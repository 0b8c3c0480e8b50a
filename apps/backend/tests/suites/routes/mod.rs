pub mod healthcheck;
pub mod state_builder;
// trace_span is in its own test binary (trace_span_tests.rs)
