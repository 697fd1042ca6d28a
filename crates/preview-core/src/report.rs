//! Progress reporting sink.
//!
//! The orchestrator narrates its steps through this trait so it can be
//! embedded in any surrounding CLI or automation. The default forwards to
//! `tracing`; `NullReporter` keeps the core silent.

/// Where orchestration progress messages go.
pub trait Reporter: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
}

/// Forwards to `tracing::info!` / `tracing::warn!`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn info(&self, _message: &str) {}

    fn warn(&self, _message: &str) {}
}
