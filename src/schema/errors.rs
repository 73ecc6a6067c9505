//! Schema error types
//!
//! Two failure families:
//! - configuration errors, raised once at compile time (FATAL to the model)
//! - validation errors, produced per record (REJECT the record)

use std::fmt;

use thiserror::Error;

/// Severity levels for schema errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Record rejected, caller may recover
    Reject,
    /// Model definition unusable
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// A single structural violation found in a schema configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Locator of the offending entry, e.g. `indexes[0].rangeKey`
    pub path: String,
    /// Human-readable description
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn required(path: impl Into<String>) -> Self {
        Self::new(path, "is required")
    }

    pub fn forbidden(path: impl Into<String>) -> Self {
        Self::new(path, "is not allowed")
    }

    pub fn wrong_type(path: impl Into<String>, expected: &str) -> Self {
        Self::new(path, format!("must be {}", expected))
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "(root) {}", self.message)
        } else {
            write!(f, "\"{}\" {}", self.path, self.message)
        }
    }
}

/// Ordered collection of configuration violations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Violations {
    violations: Vec<Violation>,
}

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    pub fn extend(&mut self, other: Violations) {
        self.violations.extend(other.violations);
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter()
    }

    /// Returns true if any violation is located at or below `path`.
    pub fn mentions(&self, path: &str) -> bool {
        self.violations.iter().any(|v| v.path.contains(path))
    }

    /// Fails with a configuration error if anything was collected.
    pub fn into_result(self) -> SchemaResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(SchemaConfigurationError::new(self))
        }
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  {}", v)?;
        }
        Ok(())
    }
}

impl From<Vec<Violation>> for Violations {
    fn from(violations: Vec<Violation>) -> Self {
        Self { violations }
    }
}

/// Raised when a schema configuration violates its structural contract.
///
/// Always carries every violation found, so all of them can be fixed at once.
#[derive(Debug, Clone, Error)]
#[error("Invalid table schema, check your config\n{violations}")]
pub struct SchemaConfigurationError {
    violations: Violations,
}

impl SchemaConfigurationError {
    pub fn new(violations: Violations) -> Self {
        Self { violations }
    }

    pub fn single(violation: Violation) -> Self {
        Self::new(vec![violation].into())
    }

    pub fn violations(&self) -> &Violations {
        &self.violations
    }

    pub fn code(&self) -> &'static str {
        "DYNO_SCHEMA_CONFIGURATION"
    }

    pub fn severity(&self) -> Severity {
        Severity::Fatal
    }
}

/// Result type for schema compilation
pub type SchemaResult<T> = Result<T, SchemaConfigurationError>;

/// A record-time failure attributed to one field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("\"{path}\" is required")]
    Required { path: String },

    #[error("\"{path}\" is not allowed")]
    Forbidden { path: String },

    #[error("\"{path}\" is not a declared attribute")]
    Unknown { path: String },

    #[error("\"{path}\" must be {expected}, got {actual}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("\"{path}\" {reason}")]
    InvalidValue { path: String, reason: String },

    #[error("\"{path}\" default generator failed: {reason}")]
    DefaultFailed { path: String, reason: String },
}

impl ValidationError {
    /// Field path the error is attributed to
    pub fn path(&self) -> &str {
        match self {
            Self::Required { path }
            | Self::Forbidden { path }
            | Self::Unknown { path }
            | Self::TypeMismatch { path, .. }
            | Self::InvalidValue { path, .. }
            | Self::DefaultFailed { path, .. } => path,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Required { .. } => "DYNO_FIELD_REQUIRED",
            Self::Forbidden { .. } => "DYNO_FIELD_FORBIDDEN",
            Self::Unknown { .. } => "DYNO_FIELD_UNKNOWN",
            Self::TypeMismatch { .. } => "DYNO_FIELD_TYPE_MISMATCH",
            Self::InvalidValue { .. } => "DYNO_FIELD_INVALID",
            Self::DefaultFailed { .. } => "DYNO_DEFAULT_FAILED",
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::Reject
    }
}

/// Throw-on-invalid form of a failed validation.
#[derive(Debug, Clone, Error)]
#[error("record failed validation: {}", join_errors(.errors))]
pub struct InvalidRecord {
    pub errors: Vec<ValidationError>,
}

impl InvalidRecord {
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
