//! Schema configuration
//!
//! [`SchemaConfig`] is the declarative input to
//! [`compile`](super::compile). Every key is optional and index
//! declarations are kept raw; the compiler decides what is missing.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::observability::LogSink;

use super::indexes::IndexDeclaration;
use super::types::{AttributeDescriptor, Presence};

/// Table name: a literal, or a hook resolved on every lookup.
#[derive(Clone)]
pub enum TableName {
    Literal(String),
    Resolver(Arc<dyn Fn() -> String + Send + Sync>),
}

impl TableName {
    pub fn resolver<F>(resolve: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        TableName::Resolver(Arc::new(resolve))
    }

    pub fn resolve(&self) -> String {
        match self {
            TableName::Literal(name) => name.clone(),
            TableName::Resolver(resolve) => resolve(),
        }
    }

    pub fn is_resolver(&self) -> bool {
        matches!(self, TableName::Resolver(_))
    }
}

impl fmt::Debug for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableName::Literal(name) => f.debug_tuple("Literal").field(name).finish(),
            TableName::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

impl From<&str> for TableName {
    fn from(name: &str) -> Self {
        TableName::Literal(name.to_string())
    }
}

impl From<String> for TableName {
    fn from(name: String) -> Self {
        TableName::Literal(name)
    }
}

/// Control over one injected timestamp field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TimestampField {
    /// Inject under the default name
    #[default]
    Default,
    /// Inject under this name
    Named(String),
    /// Do not inject
    Disabled,
}

impl TimestampField {
    /// Field name to inject, if any
    pub fn resolve(&self, default_name: &str) -> Option<String> {
        match self {
            TimestampField::Default => Some(default_name.to_string()),
            TimestampField::Named(name) => Some(name.clone()),
            TimestampField::Disabled => None,
        }
    }
}

impl From<&str> for TimestampField {
    fn from(name: &str) -> Self {
        TimestampField::Named(name.to_string())
    }
}

impl From<bool> for TimestampField {
    fn from(enabled: bool) -> Self {
        if enabled {
            TimestampField::Default
        } else {
            TimestampField::Disabled
        }
    }
}

/// Record validation overrides. Unset options fall through to the next
/// layer: per-call options, then table-wide options, then engine defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOptions {
    /// Stop at the first error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abort_early: Option<bool>,
    /// Coerce values to their declared kind
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub convert: Option<bool>,
    /// Keep undeclared fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_unknown: Option<bool>,
    /// Drop undeclared fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strip_unknown: Option<bool>,
    /// Presence of fields that declare none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence: Option<Presence>,
    /// Skip default providers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_defaults: Option<bool>,
}

impl ValidationOptions {
    /// Option names accepted in declarative configuration
    pub const RECOGNIZED: &'static [&'static str] = &[
        "abortEarly",
        "convert",
        "allowUnknown",
        "stripUnknown",
        "presence",
        "noDefaults",
    ];

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_abort_early(mut self, abort_early: bool) -> Self {
        self.abort_early = Some(abort_early);
        self
    }

    pub fn with_convert(mut self, convert: bool) -> Self {
        self.convert = Some(convert);
        self
    }

    pub fn with_allow_unknown(mut self, allow_unknown: bool) -> Self {
        self.allow_unknown = Some(allow_unknown);
        self
    }

    pub fn with_strip_unknown(mut self, strip_unknown: bool) -> Self {
        self.strip_unknown = Some(strip_unknown);
        self
    }

    pub fn with_presence(mut self, presence: Presence) -> Self {
        self.presence = Some(presence);
        self
    }

    pub fn with_no_defaults(mut self, no_defaults: bool) -> Self {
        self.no_defaults = Some(no_defaults);
        self
    }

    /// Layers `self` over `base`; options set on `self` win.
    pub fn over(&self, base: &ValidationOptions) -> ValidationOptions {
        ValidationOptions {
            abort_early: self.abort_early.or(base.abort_early),
            convert: self.convert.or(base.convert),
            allow_unknown: self.allow_unknown.or(base.allow_unknown),
            strip_unknown: self.strip_unknown.or(base.strip_unknown),
            presence: self.presence.or(base.presence),
            no_defaults: self.no_defaults.or(base.no_defaults),
        }
    }

    /// Fills unset options with engine defaults.
    pub fn resolve(&self) -> ResolvedOptions {
        let defaults = ResolvedOptions::default();
        ResolvedOptions {
            abort_early: self.abort_early.unwrap_or(defaults.abort_early),
            convert: self.convert.unwrap_or(defaults.convert),
            allow_unknown: self.allow_unknown.unwrap_or(defaults.allow_unknown),
            strip_unknown: self.strip_unknown.unwrap_or(defaults.strip_unknown),
            presence: self.presence.unwrap_or(defaults.presence),
            no_defaults: self.no_defaults.unwrap_or(defaults.no_defaults),
        }
    }
}

/// Fully resolved options driving one validation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedOptions {
    pub abort_early: bool,
    pub convert: bool,
    pub allow_unknown: bool,
    pub strip_unknown: bool,
    pub presence: Presence,
    pub no_defaults: bool,
}

impl Default for ResolvedOptions {
    fn default() -> Self {
        Self {
            abort_early: true,
            convert: true,
            allow_unknown: false,
            strip_unknown: false,
            presence: Presence::Optional,
            no_defaults: false,
        }
    }
}

/// Declarative model configuration.
#[derive(Clone, Default)]
pub struct SchemaConfig {
    /// Primary hash key (required)
    pub hash_key: Option<String>,
    /// Primary range key
    pub range_key: Option<String>,
    pub table_name: Option<TableName>,
    /// Secondary index declarations, validated at compile time
    pub indexes: Vec<IndexDeclaration>,
    /// Root attribute descriptor; an open object when unset
    pub schema: Option<AttributeDescriptor>,
    /// Inject created/updated timestamp fields
    pub timestamps: bool,
    pub created_at: TimestampField,
    pub updated_at: TimestampField,
    /// Table-wide validation options
    pub validation: Option<ValidationOptions>,
    /// Log sink; no-op when unset
    pub log: Option<Arc<dyn LogSink>>,
}

impl SchemaConfig {
    pub fn new(hash_key: impl Into<String>) -> Self {
        Self {
            hash_key: Some(hash_key.into()),
            ..Self::default()
        }
    }

    pub fn range_key(mut self, range_key: impl Into<String>) -> Self {
        self.range_key = Some(range_key.into());
        self
    }

    pub fn table_name(mut self, table_name: impl Into<TableName>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    pub fn index(mut self, index: IndexDeclaration) -> Self {
        self.indexes.push(index);
        self
    }

    /// Replaces the whole root descriptor
    pub fn schema(mut self, root: AttributeDescriptor) -> Self {
        self.schema = Some(root);
        self
    }

    /// Declares one top-level attribute
    pub fn attribute(mut self, name: impl Into<String>, descriptor: AttributeDescriptor) -> Self {
        self.schema
            .get_or_insert_with(AttributeDescriptor::open_object)
            .insert_child(name, descriptor);
        self
    }

    pub fn timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }

    pub fn created_at(mut self, field: impl Into<TimestampField>) -> Self {
        self.created_at = field.into();
        self
    }

    pub fn updated_at(mut self, field: impl Into<TimestampField>) -> Self {
        self.updated_at = field.into();
        self
    }

    pub fn validation(mut self, options: ValidationOptions) -> Self {
        self.validation = Some(options);
        self
    }

    pub fn log(mut self, log: Arc<dyn LogSink>) -> Self {
        self.log = Some(log);
        self
    }

    /// Top-level attribute declarations, if structured
    pub fn attributes(&self) -> Option<&BTreeMap<String, AttributeDescriptor>> {
        self.schema.as_ref().and_then(AttributeDescriptor::children)
    }
}

impl fmt::Debug for SchemaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaConfig")
            .field("hash_key", &self.hash_key)
            .field("range_key", &self.range_key)
            .field("table_name", &self.table_name)
            .field("indexes", &self.indexes)
            .field("schema", &self.schema)
            .field("timestamps", &self.timestamps)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .field("validation", &self.validation)
            .field("log", &self.log.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_defaults() {
        let resolved = ValidationOptions::new().resolve();
        assert!(resolved.abort_early);
        assert!(resolved.convert);
        assert!(!resolved.allow_unknown);
        assert!(!resolved.strip_unknown);
        assert_eq!(resolved.presence, Presence::Optional);
        assert!(!resolved.no_defaults);
    }

    #[test]
    fn test_over_prefers_top_layer() {
        let table = ValidationOptions::new()
            .with_abort_early(true)
            .with_allow_unknown(true);
        let call = ValidationOptions::new().with_abort_early(false);

        let merged = call.over(&table);
        assert_eq!(merged.abort_early, Some(false));
        assert_eq!(merged.allow_unknown, Some(true));
        assert_eq!(merged.convert, None);
    }

    #[test]
    fn test_options_serialize_camel_case() {
        let options = ValidationOptions::new()
            .with_strip_unknown(true)
            .with_presence(Presence::Required);
        let json = serde_json::to_value(options).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "stripUnknown": true, "presence": "required" })
        );
    }

    #[test]
    fn test_timestamp_field_resolution() {
        assert_eq!(
            TimestampField::Default.resolve("createdAt"),
            Some("createdAt".to_string())
        );
        assert_eq!(
            TimestampField::from("created").resolve("createdAt"),
            Some("created".to_string())
        );
        assert_eq!(TimestampField::from(false).resolve("createdAt"), None);
        assert_eq!(TimestampField::from(true), TimestampField::Default);
    }

    #[test]
    fn test_table_name_resolver_runs_each_time() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let name = TableName::resolver(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            "accounts-prod".to_string()
        });

        assert_eq!(name.resolve(), "accounts-prod");
        assert_eq!(name.resolve(), "accounts-prod");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(name.is_resolver());
    }

    #[test]
    fn test_attribute_builder_structures_root() {
        let config = SchemaConfig::new("email")
            .attribute("email", AttributeDescriptor::string())
            .attribute("age", AttributeDescriptor::number());

        let attributes = config.attributes().unwrap();
        assert_eq!(attributes.len(), 2);
        assert!(attributes.contains_key("age"));
    }
}
