//! Schema compiler and type mapper
//!
//! A model configuration is compiled once into an immutable
//! [`SchemaDescriptor`], which then serves record validation, default
//! application and wire type lookups.
//!
//! # Design Principles
//!
//! - Configuration errors are fatal and reported all at once
//! - Compilation is deterministic
//! - Descriptors are never mutated after compilation
//! - Validation never fails the caller, it returns value and errors

mod compiler;
mod config;
mod descriptor;
mod errors;
mod indexes;
mod loader;
mod marshal;
mod timestamps;
mod types;
mod validator;
mod wire;

pub use compiler::compile;
pub use config::{ResolvedOptions, SchemaConfig, TableName, TimestampField, ValidationOptions};
pub use descriptor::SchemaDescriptor;
pub use errors::{
    InvalidRecord, SchemaConfigurationError, SchemaResult, Severity, ValidationError, Violation,
    Violations,
};
pub use indexes::{
    build_index_registry, IndexDeclaration, IndexDescriptor, IndexKind, IndexRegistry,
    Projection, ProjectionType,
};
pub use loader::ConfigLoader;
pub use marshal::{from_wire, to_wire, MarshalError, MarshalResult};
pub use timestamps::{TimestampPolicy, DEFAULT_CREATED_AT, DEFAULT_UPDATED_AT};
pub use types::{AttributeDescriptor, AttributeKind, DefaultProvider, Presence, StringFormat};
pub use validator::{RecordValidator, Validation};
pub use wire::{map_attribute_types, wire_type_for, AttributeTypeMap, WireType, WireTypeNode};
