//! CLI-specific error types
//!
//! All CLI errors end the process with a non-zero exit code.

use std::fmt;
use std::io;

use crate::schema::SchemaConfigurationError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Model configuration could not be loaded or compiled
    ConfigError,
    /// Record input is not usable JSON
    InputError,
    /// I/O error (files, stdin, stdout)
    IoError,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "DYNO_CLI_CONFIG_ERROR",
            Self::InputError => "DYNO_CLI_INPUT_ERROR",
            Self::IoError => "DYNO_CLI_IO_ERROR",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn input_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InputError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<SchemaConfigurationError> for CliError {
    fn from(e: SchemaConfigurationError) -> Self {
        Self::config_error(e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Violation;

    #[test]
    fn test_error_display_carries_code() {
        let err = CliError::input_error("empty record");
        assert_eq!(err.to_string(), "DYNO_CLI_INPUT_ERROR: empty record");
        assert_eq!(err.code(), &CliErrorCode::InputError);
    }

    #[test]
    fn test_configuration_error_converts() {
        let err: CliError =
            SchemaConfigurationError::single(Violation::required("hashKey")).into();
        assert_eq!(err.code_str(), "DYNO_CLI_CONFIG_ERROR");
        assert!(err.message().contains("hashKey"));
    }
}
