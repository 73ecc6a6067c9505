//! Observability for the schema engine
//!
//! Provides the [`LogSink`] seam the engine logs through, plus:
//! - [`NoopLog`], the default when no sink is configured
//! - [`JsonLogger`], structured one-line JSON events
//! - [`MemoryLog`], in-memory capture
//!
//! Observability is read-only: no sink can change engine behavior.

mod events;
mod logger;

pub use events::Event;
pub use logger::{format_line, JsonLogger, LogSink, MemoryLog, NoopLog, Severity};

use std::sync::Arc;

/// Returns the default sink used when a configuration supplies none.
pub fn noop() -> Arc<dyn LogSink> {
    Arc::new(NoopLog)
}
