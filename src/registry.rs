//! Model registry
//!
//! Binds model names to compiled schema descriptors. The registry is an
//! ordinary value owned by the caller; share it behind an `Arc` when several
//! threads define or look up models.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

use crate::observability::{self, Event, LogSink};
use crate::schema::{
    compile, SchemaConfig, SchemaDescriptor, SchemaResult, Validation, ValidationOptions,
};

/// A named model backed by a compiled schema.
///
/// Clones share the table-name override, so configuring any handle is seen
/// by later registry lookups.
#[derive(Debug, Clone)]
pub struct Model {
    name: String,
    schema: Arc<SchemaDescriptor>,
    table_name: Arc<RwLock<Option<String>>>,
}

impl Model {
    pub fn new(name: impl Into<String>, schema: Arc<SchemaDescriptor>) -> Self {
        Self {
            name: name.into(),
            schema,
            table_name: Arc::new(RwLock::new(None)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Arc<SchemaDescriptor> {
        &self.schema
    }

    /// Overrides the table name for this model and every clone of it.
    pub fn config(&self, table_name: impl Into<String>) -> &Self {
        let mut current = match self.table_name.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *current = Some(table_name.into());
        self
    }

    /// Table name: the override, else the schema's configured name, else
    /// the lower-cased model name.
    pub fn table_name(&self) -> String {
        let configured = match self.table_name.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        configured
            .or_else(|| self.schema.table_name())
            .unwrap_or_else(|| self.name.to_lowercase())
    }

    pub fn validate(&self, record: &Value) -> Validation {
        self.schema.validate(record)
    }

    pub fn validate_with(&self, record: &Value, options: &ValidationOptions) -> Validation {
        self.schema.validate_with(record, options)
    }

    pub fn apply_defaults(&self, record: &Value) -> Value {
        self.schema.apply_defaults(record)
    }
}

/// Name to model mapping
pub struct ModelRegistry {
    models: RwLock<BTreeMap<String, Model>>,
    log: Arc<dyn LogSink>,
}

impl ModelRegistry {
    /// Creates an empty registry that logs nowhere
    pub fn new() -> Self {
        Self::with_log(observability::noop())
    }

    /// Creates an empty registry; `log` is handed to every configuration
    /// that does not carry its own sink.
    pub fn with_log(log: Arc<dyn LogSink>) -> Self {
        Self {
            models: RwLock::new(BTreeMap::new()),
            log,
        }
    }

    /// Compiles `config` and registers the result under `name`.
    ///
    /// # Errors
    ///
    /// Returns the compilation error; the registry is left untouched.
    pub fn define(&self, name: &str, config: SchemaConfig) -> SchemaResult<Model> {
        let config = match config.log {
            Some(_) => config,
            None => config.log(Arc::clone(&self.log)),
        };

        let schema = compile(&config)?;
        let model = Model::new(name, Arc::new(schema));
        self.register(model.clone());

        self.log.info(
            Event::ModelDefined.as_str(),
            &[("model", name), ("table", model.table_name().as_str())],
        );
        Ok(model)
    }

    /// Registers `model` under its name, returning the model it replaced.
    pub fn register(&self, model: Model) -> Option<Model> {
        let name = model.name.clone();
        let replaced = self.write().insert(name.clone(), model);
        if replaced.is_some() {
            self.log
                .warn(Event::ModelReplaced.as_str(), &[("model", name.as_str())]);
        }
        replaced
    }

    pub fn lookup(&self, name: &str) -> Option<Model> {
        self.read().get(name).cloned()
    }

    /// Registered model names, sorted
    pub fn names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Removes every model
    pub fn reset(&self) {
        let count = {
            let mut models = self.write();
            let count = models.len();
            models.clear();
            count
        };
        let count = count.to_string();
        self.log
            .info(Event::RegistryReset.as_str(), &[("models", count.as_str())]);
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Model>> {
        match self.models.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Model>> {
        match self.models.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
