//! Compiled schema descriptor
//!
//! Created once per model by [`compile`](super::compile) and never mutated
//! afterwards. Every operation on it is a pure function of its inputs plus
//! the descriptor, so one descriptor can be shared freely across threads.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::observability::LogSink;

use super::config::{TableName, ValidationOptions};
use super::indexes::IndexDescriptor;
use super::timestamps::TimestampPolicy;
use super::types::AttributeDescriptor;
use super::validator::{RecordValidator, Validation};
use super::wire::AttributeTypeMap;

/// Immutable result of schema compilation
#[derive(Clone)]
pub struct SchemaDescriptor {
    pub(super) hash_key: String,
    pub(super) range_key: Option<String>,
    pub(super) table_name: Option<TableName>,
    pub(super) timestamps: TimestampPolicy,
    pub(super) local_indexes: BTreeMap<String, IndexDescriptor>,
    pub(super) global_indexes: BTreeMap<String, IndexDescriptor>,
    pub(super) logical_schema: AttributeDescriptor,
    pub(super) attribute_types: AttributeTypeMap,
    pub(super) validation_options: ValidationOptions,
    pub(super) log: Arc<dyn LogSink>,
}

impl SchemaDescriptor {
    pub fn hash_key(&self) -> &str {
        &self.hash_key
    }

    pub fn range_key(&self) -> Option<&str> {
        self.range_key.as_deref()
    }

    /// Configured table name, resolving a name hook on every call
    pub fn table_name(&self) -> Option<String> {
        self.table_name.as_ref().map(TableName::resolve)
    }

    pub fn table_name_source(&self) -> Option<&TableName> {
        self.table_name.as_ref()
    }

    pub fn timestamps(&self) -> &TimestampPolicy {
        &self.timestamps
    }

    pub fn local_indexes(&self) -> &BTreeMap<String, IndexDescriptor> {
        &self.local_indexes
    }

    pub fn global_indexes(&self) -> &BTreeMap<String, IndexDescriptor> {
        &self.global_indexes
    }

    /// Looks up an index of either kind by name
    pub fn index(&self, name: &str) -> Option<&IndexDescriptor> {
        self.local_indexes
            .get(name)
            .or_else(|| self.global_indexes.get(name))
    }

    /// Root descriptor, including injected timestamp fields
    pub fn logical_schema(&self) -> &AttributeDescriptor {
        &self.logical_schema
    }

    pub fn attribute_type_map(&self) -> &AttributeTypeMap {
        &self.attribute_types
    }

    pub fn validation_options(&self) -> &ValidationOptions {
        &self.validation_options
    }

    pub fn log(&self) -> &dyn LogSink {
        self.log.as_ref()
    }

    /// Validates a record with the table-wide options.
    pub fn validate(&self, record: &Value) -> Validation {
        self.validate_with(record, &ValidationOptions::default())
    }

    /// Validates a record; `options` override the table-wide options for
    /// this call only.
    pub fn validate_with(&self, record: &Value, options: &ValidationOptions) -> Validation {
        let resolved = options.over(&self.validation_options).resolve();
        RecordValidator::new(&self.logical_schema, resolved, self.log.as_ref()).validate(record)
    }

    /// Defaulted and coerced record, reporting every error but returning
    /// none of them.
    pub fn apply_defaults(&self, record: &Value) -> Value {
        self.validate_with(record, &ValidationOptions::new().with_abort_early(false))
            .value
    }

    /// JSON summary of the descriptor
    pub fn summary(&self) -> Value {
        json!({
            "hashKey": self.hash_key,
            "rangeKey": self.range_key,
            "tableName": self.table_name(),
            "timestamps": self.timestamps,
            "localIndexes": self.local_indexes,
            "globalIndexes": self.global_indexes,
            "attributeTypes": self.attribute_types,
            "validation": self.validation_options,
        })
    }
}

impl fmt::Debug for SchemaDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaDescriptor")
            .field("hash_key", &self.hash_key)
            .field("range_key", &self.range_key)
            .field("table_name", &self.table_name)
            .field("timestamps", &self.timestamps)
            .field("local_indexes", &self.local_indexes)
            .field("global_indexes", &self.global_indexes)
            .field("attribute_types", &self.attribute_types)
            .field("validation_options", &self.validation_options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{compile, IndexDeclaration, SchemaConfig, ValidationError};

    fn descriptor() -> SchemaDescriptor {
        let config = SchemaConfig::new("id")
            .range_key("when")
            .table_name(TableName::resolver(|| "events-2024".to_string()))
            .attribute("id", AttributeDescriptor::string())
            .attribute("when", AttributeDescriptor::date())
            .attribute("count", AttributeDescriptor::number().default_value(0))
            .index(IndexDeclaration::global("ByCount", "count").read_capacity(1))
            .validation(ValidationOptions::new().with_abort_early(false));
        compile(&config).unwrap()
    }

    #[test]
    fn test_accessors() {
        let descriptor = descriptor();

        assert_eq!(descriptor.hash_key(), "id");
        assert_eq!(descriptor.range_key(), Some("when"));
        assert_eq!(descriptor.table_name().as_deref(), Some("events-2024"));
        assert!(descriptor.table_name_source().unwrap().is_resolver());
        assert!(descriptor.index("ByCount").is_some());
        assert!(descriptor.index("Missing").is_none());
        assert!(!descriptor.timestamps().enabled);
    }

    #[test]
    fn test_table_options_apply() {
        let validation = descriptor().validate(&json!({ "id": 1, "when": "never" }));
        assert_eq!(validation.errors.len(), 2);
        assert!(matches!(validation.errors[0], ValidationError::TypeMismatch { .. }));
    }

    #[test]
    fn test_apply_defaults_fills_literals() {
        let value = descriptor().apply_defaults(&json!({ "id": "a" }));
        assert_eq!(value, json!({ "id": "a", "count": 0 }));
    }

    #[test]
    fn test_summary_shape() {
        let summary = descriptor().summary();

        assert_eq!(summary["hashKey"], "id");
        assert_eq!(summary["tableName"], "events-2024");
        assert_eq!(summary["attributeTypes"], json!({ "count": "N", "id": "S", "when": "DATE" }));
        assert_eq!(summary["globalIndexes"]["ByCount"]["readCapacity"], 1);
        assert_eq!(summary["validation"]["abortEarly"], false);
    }
}
