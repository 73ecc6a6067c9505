//! Schema compiler
//!
//! Order of operations:
//! 1. validate the top-level configuration shape
//! 2. build the index registry, using the hash key as context
//! 3. build the base logical schema
//! 4. inject timestamp fields, if enabled
//! 5. derive the attribute type map from the final logical schema
//!
//! Steps 1 and 2 accumulate violations; nothing after them runs unless
//! both are clean. Step 5 must follow step 4 or injected timestamps would
//! be missing from the type map.

use crate::observability::{self, Event, LogSink};

use super::config::{SchemaConfig, TableName, TimestampField};
use super::descriptor::SchemaDescriptor;
use super::errors::{SchemaConfigurationError, SchemaResult, Violation, Violations};
use super::indexes::{build_index_registry, IndexRegistry};
use super::timestamps::{self, TimestampPolicy, DEFAULT_CREATED_AT, DEFAULT_UPDATED_AT};
use super::types::{AttributeDescriptor, AttributeKind};
use super::wire::map_attribute_types;

/// Compiles a configuration into an immutable descriptor.
///
/// Deterministic and free of side effects other than logging.
///
/// # Errors
///
/// Returns `SchemaConfigurationError` carrying every structural violation
/// when the configuration is invalid.
pub fn compile(config: &SchemaConfig) -> SchemaResult<SchemaDescriptor> {
    let log = config.log.clone().unwrap_or_else(observability::noop);

    // 1 + 2
    let (indexes, violations) = check_structure(config);

    let (hash_key, indexes) = match (config.hash_key.clone(), indexes) {
        (Some(hash_key), Some(indexes)) if violations.is_empty() => (hash_key, indexes),
        _ => {
            let count = violations.len().to_string();
            log.warn(Event::SchemaRejected.as_str(), &[("violations", count.as_str())]);
            return Err(SchemaConfigurationError::new(violations));
        }
    };

    // 3
    let mut logical_schema = config
        .schema
        .clone()
        .unwrap_or_else(AttributeDescriptor::open_object);

    // 4
    let timestamps = TimestampPolicy::new(config.timestamps, &config.created_at, &config.updated_at);
    for field in timestamps::augment(&mut logical_schema, &timestamps) {
        log.warn(Event::TimestampFieldReplaced.as_str(), &[("field", field.as_str())]);
    }

    // 5
    let attribute_types = map_attribute_types(&logical_schema);

    warn_undeclared_keys(
        log.as_ref(),
        &logical_schema,
        [Some(hash_key.as_str()), config.range_key.as_deref()],
    );

    let descriptor = SchemaDescriptor {
        hash_key,
        range_key: config.range_key.clone(),
        table_name: config.table_name.clone(),
        timestamps,
        local_indexes: indexes.local,
        global_indexes: indexes.global,
        logical_schema,
        attribute_types,
        validation_options: config.validation.unwrap_or_default(),
        log,
    };

    let attributes = descriptor.attribute_types.len().to_string();
    let local_indexes = descriptor.local_indexes.len().to_string();
    let global_indexes = descriptor.global_indexes.len().to_string();
    descriptor.log.info(
        Event::SchemaCompiled.as_str(),
        &[
            ("hash_key", descriptor.hash_key()),
            ("range_key", descriptor.range_key().unwrap_or("")),
            ("attributes", attributes.as_str()),
            ("local_indexes", local_indexes.as_str()),
            ("global_indexes", global_indexes.as_str()),
        ],
    );

    Ok(descriptor)
}

/// Every violation steps 1 and 2 would report for `config`.
pub(crate) fn structural_violations(config: &SchemaConfig) -> Violations {
    check_structure(config).1
}

fn check_structure(config: &SchemaConfig) -> (Option<IndexRegistry>, Violations) {
    let mut violations = validate_shape(config);
    let indexes = match build_index_registry(&config.indexes, config.hash_key.as_deref()) {
        Ok(registry) => Some(registry),
        Err(index_violations) => {
            violations.extend(index_violations);
            None
        }
    };
    (indexes, violations)
}

/// Step 1: structural checks on everything but the indexes.
fn validate_shape(config: &SchemaConfig) -> Violations {
    let mut violations = Violations::new();

    match config.hash_key.as_deref() {
        None => violations.push(Violation::required("hashKey")),
        Some("") => violations.push(Violation::new("hashKey", "is not allowed to be empty")),
        Some(_) => {}
    }

    if config.range_key.as_deref() == Some("") {
        violations.push(Violation::new("rangeKey", "is not allowed to be empty"));
    }

    if let Some(TableName::Literal(name)) = &config.table_name {
        if name.is_empty() {
            violations.push(Violation::new("tableName", "is not allowed to be empty"));
        }
    }

    for (path, field) in [("createdAt", &config.created_at), ("updatedAt", &config.updated_at)] {
        if matches!(field, TimestampField::Named(name) if name.is_empty()) {
            violations.push(Violation::new(path, "is not allowed to be empty"));
        }
    }

    if config.timestamps {
        let created = config.created_at.resolve(DEFAULT_CREATED_AT);
        let updated = config.updated_at.resolve(DEFAULT_UPDATED_AT);
        if created.is_some() && created == updated {
            violations.push(Violation::new("updatedAt", "must differ from createdAt"));
        }
    }

    if let Some(root) = &config.schema {
        if root.kind() != &AttributeKind::Object {
            violations.push(Violation::wrong_type("schema", "an object"));
        }
    }

    violations
}

fn warn_undeclared_keys<'a>(
    log: &dyn LogSink,
    root: &AttributeDescriptor,
    keys: impl IntoIterator<Item = Option<&'a str>>,
) {
    if !root.is_structured_object() {
        return;
    }

    for key in keys.into_iter().flatten() {
        if root.child(key).is_none() {
            log.warn(Event::KeyAttributeUndeclared.as_str(), &[("key", key)]);
        }
    }
}
