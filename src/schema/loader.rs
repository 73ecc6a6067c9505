//! Declarative JSON configuration loader
//!
//! Reads a JSON model configuration and turns it into a [`SchemaConfig`].
//! Shape errors (wrong JSON types, unknown keys, unrecognized validation
//! options) are collected together with the compiler's own structural
//! checks, so one failed load reports everything wrong with the file.
//!
//! Attribute declarations are either a kind name (`"string"`) or an object:
//!
//! ```json
//! { "type": "object", "required": true, "children": { "zip": "string" } }
//! ```

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use super::compiler;
use super::config::{SchemaConfig, TableName, TimestampField, ValidationOptions};
use super::errors::{SchemaConfigurationError, SchemaResult, Violation, Violations};
use super::indexes::{IndexDeclaration, IndexKind, Projection};
use super::types::{AttributeDescriptor, Presence};
use super::wire::WireType;

const CONFIG_KEYS: &[&str] = &[
    "hashKey",
    "rangeKey",
    "tableName",
    "indexes",
    "schema",
    "timestamps",
    "createdAt",
    "updatedAt",
    "validation",
];

const INDEX_KEYS: &[&str] = &[
    "name",
    "type",
    "hashKey",
    "rangeKey",
    "projection",
    "readCapacity",
    "writeCapacity",
];

const ATTRIBUTE_KEYS: &[&str] = &[
    "type",
    "required",
    "forbidden",
    "default",
    "children",
    "items",
    "dynamoType",
    "format",
];

/// Loads schema configurations from JSON.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads a configuration file.
    pub fn load_file(path: &Path) -> SchemaResult<SchemaConfig> {
        let content = fs::read_to_string(path).map_err(|e| {
            SchemaConfigurationError::single(Violation::new(
                "",
                format!("failed to read '{}': {}", path.display(), e),
            ))
        })?;

        Self::load_str(&content)
    }

    /// Loads a configuration from JSON text.
    pub fn load_str(content: &str) -> SchemaResult<SchemaConfig> {
        let value: Value = serde_json::from_str(content).map_err(|e| {
            SchemaConfigurationError::single(Violation::new("", format!("invalid JSON: {}", e)))
        })?;

        Self::load_value(&value)
    }

    /// Loads a configuration from a parsed JSON document.
    pub fn load_value(value: &Value) -> SchemaResult<SchemaConfig> {
        let mut parser = Parser::default();
        let config = parser.config(value);

        if parser.violations.is_empty() {
            return Ok(config);
        }

        // Add what the compiler would report, minus anything already flagged
        let flagged: BTreeSet<String> = parser.violations.iter().map(|v| v.path.clone()).collect();
        let mut violations = parser.violations;
        for violation in compiler::structural_violations(&config).iter() {
            if !flagged.contains(&violation.path) {
                violations.push(violation.clone());
            }
        }

        Err(SchemaConfigurationError::new(violations))
    }
}

#[derive(Default)]
struct Parser {
    violations: Violations,
}

impl Parser {
    fn config(&mut self, value: &Value) -> SchemaConfig {
        let mut config = SchemaConfig::default();

        let Some(map) = self.object(value, "") else {
            return config;
        };
        self.reject_unknown_keys(map, CONFIG_KEYS, "");

        config.hash_key = map.get("hashKey").and_then(|v| self.string(v, "hashKey"));
        config.range_key = map.get("rangeKey").and_then(|v| self.string(v, "rangeKey"));
        config.table_name = map
            .get("tableName")
            .and_then(|v| self.string(v, "tableName"))
            .map(TableName::Literal);

        if let Some(indexes) = map.get("indexes") {
            config.indexes = self.indexes(indexes);
        }

        if let Some(schema) = map.get("schema") {
            if let Some(fields) = self.object(schema, "schema") {
                let children: Vec<_> = fields
                    .iter()
                    .filter_map(|(name, decl)| {
                        self.attribute(decl, &format!("schema.{}", name))
                            .map(|descriptor| (name.clone(), descriptor))
                    })
                    .collect();
                config.schema = Some(AttributeDescriptor::object(children));
            }
        }

        if let Some(timestamps) = map.get("timestamps") {
            config.timestamps = self.boolean(timestamps, "timestamps").unwrap_or(false);
        }
        if let Some(created_at) = map.get("createdAt") {
            config.created_at = self.timestamp_field(created_at, "createdAt");
        }
        if let Some(updated_at) = map.get("updatedAt") {
            config.updated_at = self.timestamp_field(updated_at, "updatedAt");
        }

        if let Some(validation) = map.get("validation") {
            config.validation = self.validation(validation);
        }

        config
    }

    fn indexes(&mut self, value: &Value) -> Vec<IndexDeclaration> {
        let Some(items) = self.array(value, "indexes") else {
            return Vec::new();
        };

        items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| self.index(item, &format!("indexes[{}]", i)))
            .collect()
    }

    fn index(&mut self, value: &Value, path: &str) -> Option<IndexDeclaration> {
        let map = self.object(value, path)?;
        self.reject_unknown_keys(map, INDEX_KEYS, path);

        let field = |key: &str| format!("{}.{}", path, key);
        let kind = match map.get("type") {
            None => None,
            Some(kind) => self.string(kind, &field("type")).and_then(|kind| {
                let parsed = IndexKind::parse(&kind);
                if parsed.is_none() {
                    self.violations.push(Violation::new(
                        field("type"),
                        "must be one of [local, global]",
                    ));
                }
                parsed
            }),
        };

        let projection = map.get("projection").and_then(|projection| {
            match serde_json::from_value::<Projection>(projection.clone()) {
                Ok(projection) => Some(projection),
                Err(e) => {
                    self.violations
                        .push(Violation::new(field("projection"), format!("is invalid: {}", e)));
                    None
                }
            }
        });

        Some(IndexDeclaration {
            name: map.get("name").and_then(|v| self.string(v, &field("name"))),
            kind,
            hash_key: map.get("hashKey").and_then(|v| self.string(v, &field("hashKey"))),
            range_key: map.get("rangeKey").and_then(|v| self.string(v, &field("rangeKey"))),
            projection,
            read_capacity: map
                .get("readCapacity")
                .and_then(|v| self.capacity(v, &field("readCapacity"))),
            write_capacity: map
                .get("writeCapacity")
                .and_then(|v| self.capacity(v, &field("writeCapacity"))),
        })
    }

    fn attribute(&mut self, value: &Value, path: &str) -> Option<AttributeDescriptor> {
        if let Value::String(kind) = value {
            return Some(kind_descriptor(kind));
        }

        let map = self.object(value, path)?;
        self.reject_unknown_keys(map, ATTRIBUTE_KEYS, path);

        let field = |key: &str| format!("{}.{}", path, key);
        let kind = match map.get("type") {
            Some(kind) => self.string(kind, &field("type"))?,
            None => {
                self.violations.push(Violation::required(field("type")));
                return None;
            }
        };

        let mut descriptor = if kind == "object" {
            match map.get("children") {
                Some(children) => {
                    let fields = self.object(children, &field("children"))?;
                    let children: Vec<_> = fields
                        .iter()
                        .filter_map(|(name, decl)| {
                            self.attribute(decl, &format!("{}.{}", path, name))
                                .map(|child| (name.clone(), child))
                        })
                        .collect();
                    AttributeDescriptor::object(children)
                }
                None => AttributeDescriptor::open_object(),
            }
        } else {
            if map.contains_key("children") {
                self.violations.push(Violation::new(
                    field("children"),
                    "is only allowed on object attributes",
                ));
            }
            kind_descriptor(&kind)
        };

        if let Some(items) = map.get("items") {
            let declarations = match items {
                Value::Array(items) => items.iter().collect::<Vec<_>>(),
                single => vec![single],
            };
            let alternatives: Vec<_> = declarations
                .into_iter()
                .enumerate()
                .filter_map(|(i, decl)| self.attribute(decl, &format!("{}[{}]", field("items"), i)))
                .collect();
            descriptor = descriptor.items(alternatives);
        }

        if map.get("required").and_then(|v| self.boolean(v, &field("required"))) == Some(true) {
            descriptor = descriptor.presence(Presence::Required);
        }
        if map.get("forbidden").and_then(|v| self.boolean(v, &field("forbidden"))) == Some(true) {
            descriptor = descriptor.presence(Presence::Forbidden);
        }

        if let Some(default) = map.get("default") {
            descriptor = descriptor.default_value(default.clone());
        }

        if let Some(tag) = map.get("dynamoType").and_then(|v| self.string(v, &field("dynamoType"))) {
            match WireType::from_tag(&tag) {
                Some(wire_type) => descriptor = descriptor.wire_type(wire_type),
                None => self.violations.push(Violation::new(
                    field("dynamoType"),
                    format!("\"{}\" is not a known wire type", tag),
                )),
            }
        }

        if let Some(format) = map.get("format").and_then(|v| self.string(v, &field("format"))) {
            if format == "guid" || format == "uuid" {
                descriptor = descriptor.guid();
            } else {
                self.violations
                    .push(Violation::new(field("format"), "must be one of [guid]"));
            }
        }

        Some(descriptor)
    }

    fn timestamp_field(&mut self, value: &Value, path: &str) -> TimestampField {
        match value {
            Value::String(name) => TimestampField::Named(name.clone()),
            Value::Bool(enabled) => TimestampField::from(*enabled),
            _ => {
                self.violations
                    .push(Violation::wrong_type(path, "a string or a boolean"));
                TimestampField::Default
            }
        }
    }

    fn validation(&mut self, value: &Value) -> Option<ValidationOptions> {
        let map = self.object(value, "validation")?;

        for key in map.keys() {
            if !ValidationOptions::RECOGNIZED.contains(&key.as_str()) {
                self.violations.push(Violation::new(
                    format!("validation.{}", key),
                    "is not a recognized validation option",
                ));
            }
        }

        let flag = |parser: &mut Self, key: &str| {
            map.get(key)
                .and_then(|v| parser.boolean(v, &format!("validation.{}", key)))
        };

        let presence = map.get("presence").and_then(|value| {
            match serde_json::from_value::<Presence>(value.clone()) {
                Ok(presence) => Some(presence),
                Err(_) => {
                    self.violations.push(Violation::new(
                        "validation.presence",
                        "must be one of [optional, required, forbidden]",
                    ));
                    None
                }
            }
        });

        Some(ValidationOptions {
            abort_early: flag(self, "abortEarly"),
            convert: flag(self, "convert"),
            allow_unknown: flag(self, "allowUnknown"),
            strip_unknown: flag(self, "stripUnknown"),
            presence,
            no_defaults: flag(self, "noDefaults"),
        })
    }

    fn reject_unknown_keys(&mut self, map: &Map<String, Value>, known: &[&str], path: &str) {
        for key in map.keys() {
            if !known.contains(&key.as_str()) {
                self.violations
                    .push(Violation::forbidden(join_path(path, key)));
            }
        }
    }

    fn object<'v>(&mut self, value: &'v Value, path: &str) -> Option<&'v Map<String, Value>> {
        let map = value.as_object();
        if map.is_none() {
            self.violations.push(Violation::wrong_type(path, "an object"));
        }
        map
    }

    fn array<'v>(&mut self, value: &'v Value, path: &str) -> Option<&'v Vec<Value>> {
        let items = value.as_array();
        if items.is_none() {
            self.violations.push(Violation::wrong_type(path, "an array"));
        }
        items
    }

    fn string(&mut self, value: &Value, path: &str) -> Option<String> {
        let s = value.as_str().map(str::to_string);
        if s.is_none() {
            self.violations.push(Violation::wrong_type(path, "a string"));
        }
        s
    }

    fn boolean(&mut self, value: &Value, path: &str) -> Option<bool> {
        let b = value.as_bool();
        if b.is_none() {
            self.violations.push(Violation::wrong_type(path, "a boolean"));
        }
        b
    }

    fn capacity(&mut self, value: &Value, path: &str) -> Option<u64> {
        let units = value.as_u64();
        if units.is_none() {
            self.violations
                .push(Violation::wrong_type(path, "a non-negative integer"));
        }
        units
    }
}

/// Descriptor for a kind name; unrecognized names become custom kinds.
fn kind_descriptor(kind: &str) -> AttributeDescriptor {
    match kind {
        "string" => AttributeDescriptor::string(),
        "number" => AttributeDescriptor::number(),
        "boolean" => AttributeDescriptor::boolean(),
        "date" => AttributeDescriptor::date(),
        "binary" => AttributeDescriptor::binary(),
        "array" => AttributeDescriptor::array(),
        "object" => AttributeDescriptor::open_object(),
        "any" => AttributeDescriptor::any(),
        "stringSet" => AttributeDescriptor::string_set(),
        "numberSet" => AttributeDescriptor::number_set(),
        "binarySet" => AttributeDescriptor::binary_set(),
        "uuid" => AttributeDescriptor::uuid(),
        "timeUUID" => AttributeDescriptor::time_uuid(),
        other => AttributeDescriptor::custom(other),
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}
