//! dynoschema - schema compiler and type mapper for DynamoDB models
//!
//! Compiles a declarative model configuration into an immutable
//! [`SchemaDescriptor`](schema::SchemaDescriptor): validated keys and
//! indexes, a logical schema for record validation and defaults, and an
//! attribute type map for wire marshalling.

pub mod cli;
pub mod observability;
pub mod registry;
pub mod schema;

pub use registry::{Model, ModelRegistry};
pub use schema::{compile, SchemaConfig, SchemaDescriptor};
