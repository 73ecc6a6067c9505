//! Observable schema-engine events
//!
//! Events are explicit and typed.

use std::fmt;

/// Events emitted through a [`LogSink`](super::LogSink)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Compilation
    /// Schema configuration compiled into a descriptor
    SchemaCompiled,
    /// Schema configuration rejected
    SchemaRejected,
    /// An injected timestamp field replaced a declared attribute
    TimestampFieldReplaced,
    /// A primary key field has no attribute declaration
    KeyAttributeUndeclared,

    // Validation
    /// A deferred default generator failed
    DefaultGeneratorFailed,

    // Registry
    /// Model defined and registered
    ModelDefined,
    /// Registration replaced an existing model
    ModelReplaced,
    /// Registry cleared
    RegistryReset,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::SchemaCompiled => "SCHEMA_COMPILED",
            Event::SchemaRejected => "SCHEMA_REJECTED",
            Event::TimestampFieldReplaced => "TIMESTAMP_FIELD_REPLACED",
            Event::KeyAttributeUndeclared => "KEY_ATTRIBUTE_UNDECLARED",
            Event::DefaultGeneratorFailed => "DEFAULT_GENERATOR_FAILED",
            Event::ModelDefined => "MODEL_DEFINED",
            Event::ModelReplaced => "MODEL_REPLACED",
            Event::RegistryReset => "REGISTRY_RESET",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
