//! Validation warning sink.
//!
//! Schema operations report the reason for a failure through a sink rather
//! than in their return value. The sink is optional: without one the engine
//! stays silent and only the returned statuses change behavior.

/// Receives schema validation diagnostics.
pub trait WarningSink: Send + Sync {
    /// Reports a warning for the node at the dotted `path`.
    fn warn(&self, path: &str, message: &str);
}

/// Sink forwarding warnings to the `tracing` ecosystem at `WARN` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl WarningSink for TracingSink {
    fn warn(&self, path: &str, message: &str) {
        tracing::warn!(target: "datawire::schema", path, "{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracing_sink_is_shareable() {
        fn assert_sink<S: WarningSink + 'static>(_: S) {}
        assert_sink(TracingSink);
    }
}
