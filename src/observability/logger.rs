//! Structured JSON logging
//!
//! - One log line = one event
//! - `event` first, then `severity`, then fields sorted by key
//! - Synchronous, no buffering
//!
//! The engine only ever talks to a [`LogSink`]; a missing sink means
//! [`NoopLog`], never a failure.

use std::fmt;
use std::io::{self, Write};
use std::sync::Mutex;

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Normal operations
    Info = 1,
    /// Recoverable issues
    Warn = 2,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Destination for engine log events.
pub trait LogSink: Send + Sync {
    fn info(&self, event: &str, fields: &[(&str, &str)]);

    fn warn(&self, event: &str, fields: &[(&str, &str)]);
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLog;

impl LogSink for NoopLog {
    fn info(&self, _event: &str, _fields: &[(&str, &str)]) {}

    fn warn(&self, _event: &str, _fields: &[(&str, &str)]) {}
}

/// Formats one event as a single JSON line (newline included).
pub fn format_line(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
    let mut output = String::with_capacity(256);

    output.push_str("{\"event\":");
    push_json_string(&mut output, event);
    output.push_str(",\"severity\":");
    push_json_string(&mut output, severity.as_str());

    // Sort fields alphabetically for deterministic output
    let mut sorted_fields: Vec<_> = fields
        .iter()
        .filter(|(k, _)| *k != "event" && *k != "severity")
        .collect();
    sorted_fields.sort_by_key(|(k, _)| *k);

    for (key, value) in sorted_fields {
        output.push(',');
        push_json_string(&mut output, key);
        output.push(':');
        push_json_string(&mut output, value);
    }

    output.push_str("}\n");
    output
}

fn push_json_string(output: &mut String, s: &str) {
    match serde_json::to_string(s) {
        Ok(quoted) => output.push_str(&quoted),
        Err(_) => output.push_str("\"\""),
    }
}

/// Structured logger writing every line to stderr, leaving stdout to the
/// caller's own output.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLogger;

impl JsonLogger {
    fn write_line<W: Write>(writer: &mut W, line: &str) {
        // One write per line; logging never fails the caller
        let _ = writer.write_all(line.as_bytes());
        let _ = writer.flush();
    }
}

impl LogSink for JsonLogger {
    fn info(&self, event: &str, fields: &[(&str, &str)]) {
        let line = format_line(Severity::Info, event, fields);
        Self::write_line(&mut io::stderr(), &line);
    }

    fn warn(&self, event: &str, fields: &[(&str, &str)]) {
        let line = format_line(Severity::Warn, event, fields);
        Self::write_line(&mut io::stderr(), &line);
    }
}

/// Sink that keeps formatted lines in memory.
#[derive(Debug, Default)]
pub struct MemoryLog {
    lines: Mutex<Vec<String>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every captured line
    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Returns true if any captured line carries `event`
    pub fn contains_event(&self, event: &str) -> bool {
        let needle = format!("{{\"event\":\"{}\"", event);
        self.lines().iter().any(|line| line.starts_with(&needle))
    }

    fn push(&self, line: String) {
        match self.lines.lock() {
            Ok(mut lines) => lines.push(line),
            Err(poisoned) => poisoned.into_inner().push(line),
        }
    }
}

impl LogSink for MemoryLog {
    fn info(&self, event: &str, fields: &[(&str, &str)]) {
        self.push(format_line(Severity::Info, event, fields));
    }

    fn warn(&self, event: &str, fields: &[(&str, &str)]) {
        self.push(format_line(Severity::Warn, event, fields));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Info < Severity::Warn);
        assert_eq!(Severity::Warn.as_str(), "WARN");
    }

    #[test]
    fn test_log_json_format() {
        let output = format_line(Severity::Info, "TEST_EVENT", &[("key1", "value1")]);

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["event"], "TEST_EVENT");
        assert_eq!(parsed["severity"], "INFO");
        assert_eq!(parsed["key1"], "value1");
    }

    #[test]
    fn test_log_deterministic_ordering() {
        let output1 = format_line(
            Severity::Info,
            "TEST",
            &[("zebra", "1"), ("apple", "2"), ("mango", "3")],
        );
        let output2 = format_line(
            Severity::Info,
            "TEST",
            &[("apple", "2"), ("mango", "3"), ("zebra", "1")],
        );

        assert_eq!(output1, output2);

        let apple_pos = output1.find("apple").unwrap();
        let zebra_pos = output1.find("zebra").unwrap();
        assert!(apple_pos < zebra_pos);
        assert!(output1.starts_with("{\"event\":\"TEST\",\"severity\""));
    }

    #[test]
    fn test_log_escapes_special_chars() {
        let output = format_line(
            Severity::Warn,
            "TEST",
            &[("message", "hello \"world\"\nline2")],
        );

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["message"], "hello \"world\"\nline2");
        assert_eq!(output.chars().filter(|c| *c == '\n').count(), 1);
    }

    #[test]
    fn test_memory_log_captures_events() {
        let log = MemoryLog::new();
        log.info("SCHEMA_COMPILED", &[("hash_key", "email")]);
        log.warn("KEY_ATTRIBUTE_UNDECLARED", &[]);

        assert_eq!(log.lines().len(), 2);
        assert!(log.contains_event("SCHEMA_COMPILED"));
        assert!(log.contains_event("KEY_ATTRIBUTE_UNDECLARED"));
        assert!(!log.contains_event("MODEL_DEFINED"));
    }
}
