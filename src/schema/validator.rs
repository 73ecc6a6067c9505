//! Record validator and defaulter
//!
//! Walks a record against the compiled root descriptor and produces a new
//! value plus every error found:
//! - missing fields are filled from their default provider, generators
//!   are invoked once per missing field per pass
//! - with `convert`, values are coerced to their declared kind
//! - undeclared fields are kept, dropped or reported per options
//! - with `abort_early`, the walk stops at the first error
//!
//! The validator never mutates its input or the descriptor.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde_json::{Map, Number, Value};
use uuid::Uuid;

use crate::observability::{Event, LogSink};

use super::config::ResolvedOptions;
use super::errors::{InvalidRecord, ValidationError};
use super::types::{AttributeDescriptor, AttributeKind, Presence, StringFormat};

/// Outcome of one validation pass
#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    /// Defaulted, coerced (and possibly stripped) record
    pub value: Value,
    /// Every error found, or only the first when aborting early
    pub errors: Vec<ValidationError>,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Throw-on-invalid form
    pub fn into_result(self) -> Result<Value, InvalidRecord> {
        if self.errors.is_empty() {
            Ok(self.value)
        } else {
            Err(InvalidRecord {
                errors: self.errors,
            })
        }
    }
}

/// Validates records against one root descriptor.
pub struct RecordValidator<'a> {
    root: &'a AttributeDescriptor,
    options: ResolvedOptions,
    log: &'a dyn LogSink,
}

impl<'a> RecordValidator<'a> {
    pub fn new(root: &'a AttributeDescriptor, options: ResolvedOptions, log: &'a dyn LogSink) -> Self {
        Self { root, options, log }
    }

    pub fn validate(&self, record: &Value) -> Validation {
        let mut pass = Pass::new(self.options, self.log);
        let value = match (self.root.kind(), record) {
            (AttributeKind::Object, Value::Object(map)) => {
                Value::Object(pass.check_object(map, self.root, ""))
            }
            (AttributeKind::Object, other) => {
                pass.report(ValidationError::TypeMismatch {
                    path: ROOT_PATH.to_string(),
                    expected: "object",
                    actual: json_type_name(other),
                });
                other.clone()
            }
            _ => pass.check_value(record, self.root, ROOT_PATH),
        };

        Validation {
            value,
            errors: pass.errors,
        }
    }
}

const ROOT_PATH: &str = "$root";

struct Pass<'a> {
    options: ResolvedOptions,
    log: &'a dyn LogSink,
    errors: Vec<ValidationError>,
}

impl<'a> Pass<'a> {
    fn new(options: ResolvedOptions, log: &'a dyn LogSink) -> Self {
        Self {
            options,
            log,
            errors: Vec::new(),
        }
    }

    fn halted(&self) -> bool {
        self.options.abort_early && !self.errors.is_empty()
    }

    fn report(&mut self, error: ValidationError) {
        if !self.halted() {
            self.errors.push(error);
        }
    }

    fn check_object(
        &mut self,
        map: &Map<String, Value>,
        descriptor: &AttributeDescriptor,
        path: &str,
    ) -> Map<String, Value> {
        let mut out = map.clone();

        // Open objects accept any keys
        let Some(children) = descriptor.children() else {
            return out;
        };

        for (name, child) in children {
            if self.halted() {
                return out;
            }

            let field_path = make_path(path, name);
            let presence = child.declared_presence().unwrap_or(self.options.presence);

            match map.get(name) {
                Some(_) if presence == Presence::Forbidden => {
                    self.report(ValidationError::Forbidden { path: field_path });
                }
                Some(value) => {
                    let checked = self.check_value(value, child, &field_path);
                    out.insert(name.clone(), checked);
                }
                None => {
                    let reported = self.errors.len();
                    if let Some(value) = self.resolve_default(child, &field_path) {
                        out.insert(name.clone(), value);
                    } else if presence == Presence::Required && self.errors.len() == reported {
                        self.report(ValidationError::Required { path: field_path });
                    }
                }
            }
        }

        for key in map.keys() {
            if children.contains_key(key) {
                continue;
            }
            if self.options.strip_unknown {
                out.remove(key);
            } else if !self.options.allow_unknown {
                if self.halted() {
                    break;
                }
                self.report(ValidationError::Unknown {
                    path: make_path(path, key),
                });
            }
        }

        out
    }

    fn resolve_default(&mut self, descriptor: &AttributeDescriptor, path: &str) -> Option<Value> {
        if self.options.no_defaults || descriptor.declared_presence() == Some(Presence::Forbidden) {
            return None;
        }

        let provider = descriptor.default_provider()?;
        match provider.resolve() {
            Ok(value) => Some(value),
            Err(reason) => {
                let generator = provider.description();
                self.log.warn(
                    Event::DefaultGeneratorFailed.as_str(),
                    &[
                        ("field", path),
                        ("generator", generator.as_str()),
                        ("reason", reason.as_str()),
                    ],
                );
                self.report(ValidationError::DefaultFailed {
                    path: path.to_string(),
                    reason,
                });
                None
            }
        }
    }

    fn check_value(&mut self, value: &Value, descriptor: &AttributeDescriptor, path: &str) -> Value {
        match descriptor.kind() {
            AttributeKind::Any | AttributeKind::Custom(_) => value.clone(),
            AttributeKind::String => self.check_string(value, descriptor, path),
            AttributeKind::Number => self.check_number(value, path),
            AttributeKind::Boolean => self.check_boolean(value, path),
            AttributeKind::Date => self.check_date(value, path),
            AttributeKind::Binary => self.check_binary(value, path),
            AttributeKind::Array => self.check_array(value, descriptor, path),
            AttributeKind::Object => match value {
                Value::Object(map) => Value::Object(self.check_object(map, descriptor, path)),
                other => self.mismatch(path, "object", other),
            },
        }
    }

    fn mismatch(&mut self, path: &str, expected: &'static str, actual: &Value) -> Value {
        self.report(ValidationError::TypeMismatch {
            path: path.to_string(),
            expected,
            actual: json_type_name(actual),
        });
        actual.clone()
    }

    fn invalid(&mut self, path: &str, reason: impl Into<String>, value: &Value) -> Value {
        self.report(ValidationError::InvalidValue {
            path: path.to_string(),
            reason: reason.into(),
        });
        value.clone()
    }

    fn check_string(&mut self, value: &Value, descriptor: &AttributeDescriptor, path: &str) -> Value {
        let Value::String(s) = value else {
            return self.mismatch(path, "string", value);
        };

        if descriptor.format() == Some(StringFormat::Guid) && Uuid::parse_str(s).is_err() {
            return self.invalid(path, "must be a valid GUID", value);
        }

        value.clone()
    }

    fn check_number(&mut self, value: &Value, path: &str) -> Value {
        match value {
            Value::Number(_) => value.clone(),
            Value::String(s) if self.options.convert => match parse_number(s) {
                Some(number) => Value::Number(number),
                None => self.mismatch(path, "number", value),
            },
            other => self.mismatch(path, "number", other),
        }
    }

    fn check_boolean(&mut self, value: &Value, path: &str) -> Value {
        match value {
            Value::Bool(_) => value.clone(),
            Value::String(s) if self.options.convert => {
                let s = s.trim();
                if s.eq_ignore_ascii_case("true") {
                    Value::Bool(true)
                } else if s.eq_ignore_ascii_case("false") {
                    Value::Bool(false)
                } else {
                    self.mismatch(path, "boolean", value)
                }
            }
            other => self.mismatch(path, "boolean", other),
        }
    }

    fn check_date(&mut self, value: &Value, path: &str) -> Value {
        let parsed = match value {
            Value::String(s) => match DateTime::parse_from_rfc3339(s) {
                Ok(_) if !self.options.convert => return value.clone(),
                Ok(instant) => Some(instant.with_timezone(&Utc)),
                Err(_) if self.options.convert => parse_loose_date(s),
                Err(_) => None,
            },
            Value::Number(n) if self.options.convert => n.as_i64().and_then(from_epoch_millis),
            other => return self.mismatch(path, "date", other),
        };

        match parsed {
            Some(instant) => Value::String(instant.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => self.invalid(path, "must be a valid date", value),
        }
    }

    fn check_binary(&mut self, value: &Value, path: &str) -> Value {
        match value {
            Value::String(s) => {
                if BASE64.decode(s).is_ok() {
                    value.clone()
                } else {
                    self.invalid(path, "must be base64-encoded binary", value)
                }
            }
            Value::Array(items) if self.options.convert => {
                let bytes: Option<Vec<u8>> = items
                    .iter()
                    .map(|item| item.as_u64().and_then(|b| u8::try_from(b).ok()))
                    .collect();
                match bytes {
                    Some(bytes) => Value::String(BASE64.encode(bytes)),
                    None => self.mismatch(path, "binary", value),
                }
            }
            other => self.mismatch(path, "binary", other),
        }
    }

    fn check_array(&mut self, value: &Value, descriptor: &AttributeDescriptor, path: &str) -> Value {
        let Value::Array(items) = value else {
            return self.mismatch(path, "array", value);
        };

        let alternatives = descriptor.item_alternatives();
        if alternatives.is_empty() {
            return value.clone();
        }

        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            if self.halted() {
                out.extend(items[i..].iter().cloned());
                break;
            }

            let item_path = format!("{}[{}]", path, i);
            match self.match_alternative(item, alternatives, &item_path) {
                Some(checked) => out.push(checked),
                None => {
                    let allowed = alternatives
                        .iter()
                        .map(|alt| alt.kind().type_name())
                        .collect::<Vec<_>>()
                        .join(", ");
                    out.push(self.invalid(&item_path, format!("must be one of [{}]", allowed), item));
                }
            }
        }

        Value::Array(out)
    }

    /// First alternative the item satisfies, with its coerced value.
    fn match_alternative(
        &self,
        item: &Value,
        alternatives: &[AttributeDescriptor],
        path: &str,
    ) -> Option<Value> {
        alternatives.iter().find_map(|alternative| {
            let mut scratch = Pass::new(self.options, self.log);
            let checked = scratch.check_value(item, alternative, path);
            scratch.errors.is_empty().then_some(checked)
        })
    }
}

/// Parses a numeric string, preferring integers.
fn parse_number(s: &str) -> Option<Number> {
    let s = s.trim();
    if let Ok(int) = s.parse::<i64>() {
        return Some(Number::from(int));
    }
    s.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .and_then(Number::from_f64)
}

/// Date formats accepted when converting, besides RFC 3339.
fn parse_loose_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(millis) = s.parse::<i64>() {
        return from_epoch_millis(millis);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn from_epoch_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

/// Returns the JSON type name for error messages.
fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Creates a field path from prefix and field name.
fn make_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", prefix, field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::{MemoryLog, NoopLog};
    use crate::schema::config::ValidationOptions;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn users() -> AttributeDescriptor {
        AttributeDescriptor::object([
            ("email", AttributeDescriptor::string().required()),
            ("name", AttributeDescriptor::string()),
            ("age", AttributeDescriptor::number()),
            ("active", AttributeDescriptor::boolean().default_value(true)),
        ])
    }

    fn run(root: &AttributeDescriptor, record: Value, options: ValidationOptions) -> Validation {
        RecordValidator::new(root, options.resolve(), &NoopLog).validate(&record)
    }

    #[test]
    fn test_valid_record_passes_with_defaults() {
        let outcome = run(&users(), json!({ "email": "a@b.c" }), ValidationOptions::new());
        assert!(outcome.is_valid());
        assert_eq!(outcome.value, json!({ "email": "a@b.c", "active": true }));
    }

    #[test]
    fn test_missing_required_field() {
        let outcome = run(&users(), json!({ "name": "Alice" }), ValidationOptions::new());
        assert_eq!(
            outcome.errors,
            vec![ValidationError::Required { path: "email".into() }]
        );
    }

    #[test]
    fn test_convert_coerces_numeric_strings() {
        let root = AttributeDescriptor::object([("age", AttributeDescriptor::number())]);
        let outcome = run(
            &root,
            json!({ "age": "42" }),
            ValidationOptions::new().with_convert(true),
        );
        assert!(outcome.is_valid());
        assert_eq!(outcome.value["age"], json!(42));

        let outcome = run(
            &root,
            json!({ "age": "4.5" }),
            ValidationOptions::new().with_convert(true),
        );
        assert_eq!(outcome.value["age"], json!(4.5));
    }

    #[test]
    fn test_without_convert_strings_are_not_numbers() {
        let root = AttributeDescriptor::object([("age", AttributeDescriptor::number())]);
        let outcome = run(
            &root,
            json!({ "age": "42" }),
            ValidationOptions::new().with_convert(false),
        );
        assert_eq!(
            outcome.errors,
            vec![ValidationError::TypeMismatch {
                path: "age".into(),
                expected: "number",
                actual: "string",
            }]
        );
        assert_eq!(outcome.value["age"], json!("42"));
    }

    #[test]
    fn test_boolean_conversion() {
        let root = AttributeDescriptor::object([("active", AttributeDescriptor::boolean())]);
        let outcome = run(&root, json!({ "active": "TRUE" }), ValidationOptions::new());
        assert_eq!(outcome.value["active"], json!(true));

        let outcome = run(&root, json!({ "active": "yes" }), ValidationOptions::new());
        assert!(!outcome.is_valid());
    }

    #[test]
    fn test_date_conversion_normalizes() {
        let root = AttributeDescriptor::object([("born", AttributeDescriptor::date())]);

        let outcome = run(&root, json!({ "born": "2024-03-01" }), ValidationOptions::new());
        assert_eq!(outcome.value["born"], json!("2024-03-01T00:00:00.000Z"));

        let outcome = run(&root, json!({ "born": 0 }), ValidationOptions::new());
        assert_eq!(outcome.value["born"], json!("1970-01-01T00:00:00.000Z"));

        let outcome = run(
            &root,
            json!({ "born": "2024-03-01T10:00:00+02:00" }),
            ValidationOptions::new(),
        );
        assert_eq!(outcome.value["born"], json!("2024-03-01T08:00:00.000Z"));
    }

    #[test]
    fn test_date_without_convert_keeps_rfc3339() {
        let root = AttributeDescriptor::object([("born", AttributeDescriptor::date())]);
        let options = ValidationOptions::new().with_convert(false);

        let outcome = run(&root, json!({ "born": "2024-03-01T10:00:00+02:00" }), options);
        assert!(outcome.is_valid());
        assert_eq!(outcome.value["born"], json!("2024-03-01T10:00:00+02:00"));

        let outcome = run(&root, json!({ "born": "2024-03-01" }), options);
        assert_eq!(outcome.errors[0].code(), "DYNO_FIELD_INVALID");
    }

    #[test]
    fn test_abort_early_reports_first_error_only() {
        let record = json!({ "age": "old", "name": 7, "extra": 1 });

        let outcome = run(&users(), record.clone(), ValidationOptions::new().with_abort_early(true));
        assert_eq!(outcome.errors.len(), 1);

        let outcome = run(&users(), record, ValidationOptions::new().with_abort_early(false));
        let paths: Vec<&str> = outcome.errors.iter().map(ValidationError::path).collect();
        assert_eq!(paths, vec!["age", "email", "name", "extra"]);
    }

    #[test]
    fn test_unknown_field_handling() {
        let record = json!({ "email": "a@b.c", "extra": 1 });

        let outcome = run(&users(), record.clone(), ValidationOptions::new());
        assert_eq!(
            outcome.errors,
            vec![ValidationError::Unknown { path: "extra".into() }]
        );

        let outcome = run(&users(), record.clone(), ValidationOptions::new().with_allow_unknown(true));
        assert!(outcome.is_valid());
        assert_eq!(outcome.value["extra"], json!(1));

        let outcome = run(&users(), record, ValidationOptions::new().with_strip_unknown(true));
        assert!(outcome.is_valid());
        assert!(outcome.value.get("extra").is_none());
    }

    #[test]
    fn test_presence_defaults() {
        let root = AttributeDescriptor::object([
            ("a", AttributeDescriptor::string()),
            ("b", AttributeDescriptor::string().optional()),
        ]);

        let outcome = run(
            &root,
            json!({}),
            ValidationOptions::new()
                .with_presence(Presence::Required)
                .with_abort_early(false),
        );
        assert_eq!(
            outcome.errors,
            vec![ValidationError::Required { path: "a".into() }]
        );

        let outcome = run(
            &root,
            json!({ "a": "x" }),
            ValidationOptions::new().with_presence(Presence::Forbidden),
        );
        assert_eq!(
            outcome.errors,
            vec![ValidationError::Forbidden { path: "a".into() }]
        );
    }

    #[test]
    fn test_nested_defaults_and_paths() {
        let root = AttributeDescriptor::object([(
            "settings",
            AttributeDescriptor::object([
                ("theme", AttributeDescriptor::string().default_value("dark")),
                ("zip", AttributeDescriptor::string().required()),
            ]),
        )]);

        let outcome = run(
            &root,
            json!({ "settings": {} }),
            ValidationOptions::new().with_abort_early(false),
        );
        assert_eq!(outcome.value, json!({ "settings": { "theme": "dark" } }));
        assert_eq!(
            outcome.errors,
            vec![ValidationError::Required { path: "settings.zip".into() }]
        );
    }

    #[test]
    fn test_generator_invoked_once_per_missing_field() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let root = AttributeDescriptor::object([(
            "seq",
            AttributeDescriptor::number().default_with("counter", move || {
                json!(counter.fetch_add(1, Ordering::SeqCst))
            }),
        )]);

        let first = run(&root, json!({}), ValidationOptions::new());
        let second = run(&root, json!({}), ValidationOptions::new());
        let present = run(&root, json!({ "seq": 99 }), ValidationOptions::new());

        assert_eq!(first.value["seq"], json!(0));
        assert_eq!(second.value["seq"], json!(1));
        assert_eq!(present.value["seq"], json!(99));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_no_defaults_skips_providers() {
        let outcome = run(
            &users(),
            json!({ "email": "a@b.c" }),
            ValidationOptions::new().with_no_defaults(true),
        );
        assert!(outcome.value.get("active").is_none());
    }

    #[test]
    fn test_failing_generator_is_attributed_and_logged() {
        let root = AttributeDescriptor::object([(
            "token",
            AttributeDescriptor::string()
                .required()
                .try_default_with("token", || Err("entropy unavailable".to_string())),
        )]);
        let log = MemoryLog::new();

        let outcome = RecordValidator::new(&root, ValidationOptions::new().resolve(), &log)
            .validate(&json!({}));

        assert_eq!(
            outcome.errors,
            vec![ValidationError::DefaultFailed {
                path: "token".into(),
                reason: "entropy unavailable".into(),
            }]
        );
        assert!(log.contains_event("DEFAULT_GENERATOR_FAILED"));
    }

    #[test]
    fn test_set_items_checked() {
        let root = AttributeDescriptor::object([
            ("tags", AttributeDescriptor::string_set()),
            ("scores", AttributeDescriptor::number_set()),
        ]);

        let outcome = run(
            &root,
            json!({ "tags": ["a", 1], "scores": ["1", 2] }),
            ValidationOptions::new().with_abort_early(false),
        );
        assert_eq!(outcome.value["scores"], json!([1, 2]));
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].path(), "tags[1]");
        assert!(outcome.errors[0].to_string().contains("must be one of [string]"));
    }

    #[test]
    fn test_binary_values() {
        let root = AttributeDescriptor::object([("blob", AttributeDescriptor::binary())]);

        let outcome = run(&root, json!({ "blob": "aGVsbG8=" }), ValidationOptions::new());
        assert!(outcome.is_valid());

        let outcome = run(&root, json!({ "blob": [104, 105] }), ValidationOptions::new());
        assert_eq!(outcome.value["blob"], json!("aGk="));

        let outcome = run(&root, json!({ "blob": "not base64!" }), ValidationOptions::new());
        assert!(!outcome.is_valid());
    }

    #[test]
    fn test_guid_format() {
        let root = AttributeDescriptor::object([("id", AttributeDescriptor::uuid())]);

        let outcome = run(&root, json!({ "id": "nope" }), ValidationOptions::new());
        assert_eq!(outcome.errors[0].path(), "id");

        let outcome = run(&root, json!({}), ValidationOptions::new());
        assert!(outcome.is_valid());
        assert!(Uuid::parse_str(outcome.value["id"].as_str().unwrap()).is_ok());
    }

    #[test]
    fn test_null_and_non_object_records() {
        let outcome = run(&users(), json!({ "email": null }), ValidationOptions::new());
        assert_eq!(
            outcome.errors,
            vec![ValidationError::TypeMismatch {
                path: "email".into(),
                expected: "string",
                actual: "null",
            }]
        );

        let outcome = run(&users(), json!([1, 2]), ValidationOptions::new());
        assert_eq!(outcome.errors[0].path(), "$root");
    }

    #[test]
    fn test_open_root_accepts_anything() {
        let root = AttributeDescriptor::open_object();
        let outcome = run(&root, json!({ "anything": [1, "two"] }), ValidationOptions::new());
        assert!(outcome.is_valid());
    }

    #[test]
    fn test_into_result() {
        let ok = run(&users(), json!({ "email": "a@b.c" }), ValidationOptions::new());
        assert!(ok.into_result().is_ok());

        let err = run(&users(), json!({}), ValidationOptions::new())
            .into_result()
            .unwrap_err();
        assert_eq!(err.errors().len(), 1);
    }
}
