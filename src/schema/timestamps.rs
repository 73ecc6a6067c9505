//! Timestamp augmenter
//!
//! When enabled, injects `createdAt` / `updatedAt` date attributes into the
//! root descriptor before the attribute type map is derived. Each field can
//! be renamed or suppressed independently.

use serde::Serialize;

use super::config::TimestampField;
use super::types::AttributeDescriptor;

pub const DEFAULT_CREATED_AT: &str = "createdAt";
pub const DEFAULT_UPDATED_AT: &str = "updatedAt";

/// Compiled timestamp policy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimestampPolicy {
    pub enabled: bool,
    /// Injected created field, `None` when disabled
    pub created_at: Option<String>,
    /// Injected updated field, `None` when disabled
    pub updated_at: Option<String>,
}

impl TimestampPolicy {
    pub fn new(enabled: bool, created_at: &TimestampField, updated_at: &TimestampField) -> Self {
        if !enabled {
            return Self::default();
        }

        Self {
            enabled,
            created_at: created_at.resolve(DEFAULT_CREATED_AT),
            updated_at: updated_at.resolve(DEFAULT_UPDATED_AT),
        }
    }

    /// Field names this policy injects, created first
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.created_at
            .as_deref()
            .into_iter()
            .chain(self.updated_at.as_deref())
    }
}

/// Injects the policy's fields as optional dates. Returns the names of
/// declared attributes that were replaced.
pub fn augment(root: &mut AttributeDescriptor, policy: &TimestampPolicy) -> Vec<String> {
    let mut replaced = Vec::new();

    for field in policy.fields() {
        if root.insert_child(field, AttributeDescriptor::date()).is_some() {
            replaced.push(field.to_string());
        }
    }

    replaced
}
