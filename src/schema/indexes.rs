//! Index registry
//!
//! Validates secondary-index declarations and partitions them into local
//! and global indexes. Each kind has its own validator:
//!
//! - local: `rangeKey` required, `hashKey` defaults to (and must equal) the
//!   table's hash key, capacities forbidden (inherited from the table)
//! - global: `hashKey` required and independent, `rangeKey` and
//!   capacities optional
//!
//! Names are unique across both kinds.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::errors::{Violation, Violations};

/// Secondary index kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    Local,
    Global,
}

impl IndexKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::Local => "local",
            IndexKind::Global => "global",
        }
    }

    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "local" => Some(IndexKind::Local),
            "global" => Some(IndexKind::Global),
            _ => None,
        }
    }
}

/// Which attributes an index copies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectionType {
    #[serde(rename = "ALL")]
    All,
    #[serde(rename = "KEYS_ONLY")]
    KeysOnly,
    #[serde(rename = "INCLUDE")]
    Include,
}

/// Index projection, in the store's own field naming
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Projection {
    pub projection_type: ProjectionType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub non_key_attributes: Vec<String>,
}

impl Projection {
    pub fn all() -> Self {
        Self {
            projection_type: ProjectionType::All,
            non_key_attributes: Vec::new(),
        }
    }

    pub fn keys_only() -> Self {
        Self {
            projection_type: ProjectionType::KeysOnly,
            non_key_attributes: Vec::new(),
        }
    }

    pub fn include<I, S>(attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            projection_type: ProjectionType::Include,
            non_key_attributes: attributes.into_iter().map(Into::into).collect(),
        }
    }
}

/// Raw, unvalidated index declaration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexDeclaration {
    pub name: Option<String>,
    pub kind: Option<IndexKind>,
    pub hash_key: Option<String>,
    pub range_key: Option<String>,
    pub projection: Option<Projection>,
    pub read_capacity: Option<u64>,
    pub write_capacity: Option<u64>,
}

impl IndexDeclaration {
    pub fn local(name: impl Into<String>, range_key: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            kind: Some(IndexKind::Local),
            range_key: Some(range_key.into()),
            ..Self::default()
        }
    }

    pub fn global(name: impl Into<String>, hash_key: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            kind: Some(IndexKind::Global),
            hash_key: Some(hash_key.into()),
            ..Self::default()
        }
    }

    pub fn hash_key(mut self, hash_key: impl Into<String>) -> Self {
        self.hash_key = Some(hash_key.into());
        self
    }

    pub fn range_key(mut self, range_key: impl Into<String>) -> Self {
        self.range_key = Some(range_key.into());
        self
    }

    pub fn projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn read_capacity(mut self, units: u64) -> Self {
        self.read_capacity = Some(units);
        self
    }

    pub fn write_capacity(mut self, units: u64) -> Self {
        self.write_capacity = Some(units);
        self
    }
}

/// Validated secondary index.
///
/// Serializes to the shape a table-DDL collaborator consumes: global
/// indexes carry their own keys and capacity, local indexes only their
/// range key and projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: IndexKind,
    pub hash_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection: Option<Projection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_capacity: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_capacity: Option<u64>,
}

/// Indexes partitioned by kind, keyed by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexRegistry {
    pub local: BTreeMap<String, IndexDescriptor>,
    pub global: BTreeMap<String, IndexDescriptor>,
}

/// Validates every declaration against `table_hash_key` and partitions
/// the survivors. Fails with every violation found.
pub fn build_index_registry(
    declarations: &[IndexDeclaration],
    table_hash_key: Option<&str>,
) -> Result<IndexRegistry, Violations> {
    let mut violations = Violations::new();
    let mut registry = IndexRegistry::default();
    let mut seen = BTreeSet::new();

    for (position, declaration) in declarations.iter().enumerate() {
        let path = format!("indexes[{}]", position);

        let name = non_empty(declaration.name.as_deref(), &format!("{}.name", path), &mut violations);
        if let Some(name) = name {
            if !seen.insert(name.to_string()) {
                violations.push(Violation::new(
                    format!("{}.name", path),
                    format!("duplicates index name \"{}\"", name),
                ));
            }
        }

        let descriptor = match declaration.kind {
            Some(IndexKind::Local) => {
                validate_local(declaration, &path, table_hash_key, &mut violations)
            }
            Some(IndexKind::Global) => validate_global(declaration, &path, &mut violations),
            None => {
                violations.push(Violation::required(format!("{}.type", path)));
                None
            }
        };

        if let (Some(name), Some(descriptor)) = (name, descriptor) {
            let target = match descriptor.kind {
                IndexKind::Local => &mut registry.local,
                IndexKind::Global => &mut registry.global,
            };
            target.entry(name.to_string()).or_insert(IndexDescriptor {
                name: name.to_string(),
                ..descriptor
            });
        }
    }

    if violations.is_empty() {
        Ok(registry)
    } else {
        Err(violations)
    }
}

fn validate_local(
    declaration: &IndexDeclaration,
    path: &str,
    table_hash_key: Option<&str>,
    violations: &mut Violations,
) -> Option<IndexDescriptor> {
    let before = violations.len();

    let hash_key = match declaration.hash_key.as_deref() {
        None => table_hash_key.map(str::to_string),
        Some(given) => match table_hash_key {
            Some(table) if given != table => {
                violations.push(Violation::new(
                    format!("{}.hashKey", path),
                    format!("must equal the table hash key \"{}\", got \"{}\"", table, given),
                ));
                None
            }
            _ => non_empty(Some(given), &format!("{}.hashKey", path), violations)
                .map(str::to_string),
        },
    };

    let range_key = non_empty(
        declaration.range_key.as_deref(),
        &format!("{}.rangeKey", path),
        violations,
    );

    if declaration.read_capacity.is_some() {
        violations.push(Violation::forbidden(format!("{}.readCapacity", path)));
    }
    if declaration.write_capacity.is_some() {
        violations.push(Violation::forbidden(format!("{}.writeCapacity", path)));
    }

    if violations.len() > before {
        return None;
    }

    Some(IndexDescriptor {
        name: String::new(),
        kind: IndexKind::Local,
        hash_key: hash_key?,
        range_key: range_key.map(str::to_string),
        projection: declaration.projection.clone(),
        read_capacity: None,
        write_capacity: None,
    })
}

fn validate_global(
    declaration: &IndexDeclaration,
    path: &str,
    violations: &mut Violations,
) -> Option<IndexDescriptor> {
    let before = violations.len();

    let hash_key = non_empty(
        declaration.hash_key.as_deref(),
        &format!("{}.hashKey", path),
        violations,
    );

    let range_key = match declaration.range_key.as_deref() {
        Some(range_key) => {
            non_empty(Some(range_key), &format!("{}.rangeKey", path), violations)
        }
        None => None,
    };

    if violations.len() > before {
        return None;
    }

    Some(IndexDescriptor {
        name: String::new(),
        kind: IndexKind::Global,
        hash_key: hash_key?.to_string(),
        range_key: range_key.map(str::to_string),
        projection: declaration.projection.clone(),
        read_capacity: declaration.read_capacity,
        write_capacity: declaration.write_capacity,
    })
}

/// Requires a present, non-empty string.
fn non_empty<'a>(value: Option<&'a str>, path: &str, violations: &mut Violations) -> Option<&'a str> {
    match value {
        None => {
            violations.push(Violation::required(path));
            None
        }
        Some("") => {
            violations.push(Violation::new(path, "is not allowed to be empty"));
            None
        }
        Some(value) => Some(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_index_inherits_table_hash_key() {
        let registry = build_index_registry(
            &[IndexDeclaration::local("ByAge", "age")],
            Some("email"),
        )
        .unwrap();

        let index = &registry.local["ByAge"];
        assert_eq!(index.hash_key, "email");
        assert_eq!(index.range_key.as_deref(), Some("age"));
        assert!(index.read_capacity.is_none());
        assert!(registry.global.is_empty());
    }

    #[test]
    fn test_local_index_requires_range_key() {
        let declaration = IndexDeclaration {
            name: Some("ix1".into()),
            kind: Some(IndexKind::Local),
            ..IndexDeclaration::default()
        };

        let violations = build_index_registry(&[declaration], Some("email")).unwrap_err();
        assert!(violations.mentions("indexes[0].rangeKey"));
    }

    #[test]
    fn test_local_index_rejects_foreign_hash_key_and_capacity() {
        let declaration = IndexDeclaration::local("ByAge", "age")
            .hash_key("name")
            .read_capacity(5)
            .write_capacity(5);

        let violations = build_index_registry(&[declaration], Some("email")).unwrap_err();
        assert_eq!(violations.len(), 3);
        assert!(violations.mentions("indexes[0].hashKey"));
        assert!(violations.mentions("indexes[0].readCapacity"));
        assert!(violations.mentions("indexes[0].writeCapacity"));
    }

    #[test]
    fn test_local_index_accepts_matching_hash_key() {
        let declaration = IndexDeclaration::local("ByAge", "age").hash_key("email");
        let registry = build_index_registry(&[declaration], Some("email")).unwrap();
        assert_eq!(registry.local["ByAge"].hash_key, "email");
    }

    #[test]
    fn test_global_index_requires_hash_key() {
        let declaration = IndexDeclaration {
            name: Some("GameTitleIndex".into()),
            kind: Some(IndexKind::Global),
            range_key: Some("topScore".into()),
            ..IndexDeclaration::default()
        };

        let violations = build_index_registry(&[declaration], Some("userId")).unwrap_err();
        assert!(violations.mentions("indexes[0].hashKey"));
    }

    #[test]
    fn test_global_index_is_independent() {
        let declaration = IndexDeclaration::global("GameTitleIndex", "gameTitle")
            .range_key("topScore")
            .projection(Projection::keys_only())
            .read_capacity(10)
            .write_capacity(5);

        let registry = build_index_registry(&[declaration], Some("userId")).unwrap();
        let index = &registry.global["GameTitleIndex"];
        assert_eq!(index.hash_key, "gameTitle");
        assert_eq!(index.read_capacity, Some(10));
        assert_eq!(index.write_capacity, Some(5));
        assert_eq!(index.projection, Some(Projection::keys_only()));
    }

    #[test]
    fn test_names_unique_across_kinds() {
        let violations = build_index_registry(
            &[
                IndexDeclaration::local("Shared", "age"),
                IndexDeclaration::global("Shared", "name"),
            ],
            Some("email"),
        )
        .unwrap_err();

        assert_eq!(violations.len(), 1);
        assert!(violations.mentions("indexes[1].name"));
    }

    #[test]
    fn test_missing_type_and_name_accumulate() {
        let violations =
            build_index_registry(&[IndexDeclaration::default()], Some("email")).unwrap_err();
        assert!(violations.mentions("indexes[0].name"));
        assert!(violations.mentions("indexes[0].type"));
    }

    #[test]
    fn test_ddl_shape() {
        let registry = build_index_registry(
            &[
                IndexDeclaration::local("ByAge", "age").projection(Projection::all()),
                IndexDeclaration::global("ByName", "name").read_capacity(2).write_capacity(1),
            ],
            Some("email"),
        )
        .unwrap();

        let local = serde_json::to_value(&registry.local["ByAge"]).unwrap();
        assert_eq!(local["type"], "local");
        assert_eq!(local["rangeKey"], "age");
        assert_eq!(local["projection"]["ProjectionType"], "ALL");
        assert!(local.get("readCapacity").is_none());

        let global = serde_json::to_value(&registry.global["ByName"]).unwrap();
        assert_eq!(global["hashKey"], "name");
        assert_eq!(global["readCapacity"], 2);
        assert!(global.get("rangeKey").is_none());
    }
}
