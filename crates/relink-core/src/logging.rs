//! Logging facilities for relink.
//!
//! relink uses the `tracing` crate for instrumentation. Library code never
//! installs a subscriber; to see logs, install one in your application:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt()
//!         .with_env_filter("relink_net::supervisor=debug")
//!         .init();
//! }
//! ```

/// Span names used throughout relink for tracing.
pub mod span_names {
    /// Supervisor loop span.
    pub const SUPERVISOR: &str = "relink::supervisor";
    /// Link shutdown span.
    pub const CLOSE: &str = "relink::close";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "relink_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "relink_core::signal";
    /// Public link façade target.
    pub const LINK: &str = "relink_net::link";
    /// Supervisor loop target.
    pub const SUPERVISOR: &str = "relink_net::supervisor";
    /// Transport handle target.
    pub const TRANSPORT: &str = "relink_net::transport";
    /// Event dispatcher target.
    pub const EVENTS: &str = "relink_net::events";
    /// Performance spans target.
    pub const PERF: &str = "relink::perf";
}

/// A guard that times an operation and logs its duration when dropped.
///
/// The guard does not enter its span, so it can be held across `.await`
/// points; attach the span to a future with `tracing::Instrument`.
#[derive(Debug)]
pub struct PerfSpan {
    span: tracing::Span,
    started: std::time::Instant,
    name: &'static str,
}

impl PerfSpan {
    /// Create a new performance span.
    pub fn new(name: &'static str) -> Self {
        Self {
            span: tracing::info_span!(target: "relink::perf", "perf", operation = name),
            started: std::time::Instant::now(),
            name,
        }
    }

    /// The span to instrument the timed work with.
    pub fn span(&self) -> &tracing::Span {
        &self.span
    }

    /// Time elapsed since the span was created.
    pub fn elapsed(&self) -> std::time::Duration {
        self.started.elapsed()
    }
}

impl Drop for PerfSpan {
    fn drop(&mut self) {
        tracing::trace!(
            target: targets::PERF,
            operation = self.name,
            elapsed_us = self.started.elapsed().as_micros() as u64,
            "span finished"
        );
    }
}
