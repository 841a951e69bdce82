//! Estimation counters as trace events.
//!
//! The model crates never install a subscriber; the CLI does. Without the
//! `tracing` feature these hooks compile to nothing.

#[cfg(feature = "tracing")]
pub fn emit_span(event: &str, key_values: &[(&str, String)]) {
    let span = tracing::trace_span!("partcost_metric", event);
    let _guard = span.enter();
    for (name, value) in key_values {
        tracing::trace!(%name, %value, "counter");
    }
}

#[cfg(not(feature = "tracing"))]
#[inline]
pub fn emit_span(_event: &str, _key_values: &[(&str, String)]) {}
