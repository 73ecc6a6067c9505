//! Type mapper: attribute descriptors to wire type tags
//!
//! The resulting tree mirrors the logical schema exactly: structured
//! objects become nested maps, every other field becomes one tag.
//! Kinds without a wire type map to an absent tag, which consumers treat
//! as "encode from the value's native shape".

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

use super::types::{AttributeDescriptor, AttributeKind};

/// Native attribute type codes of the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WireType {
    String,
    Number,
    Boolean,
    Binary,
    Date,
    List,
    StringSet,
    NumberSet,
    BinarySet,
}

impl WireType {
    /// Returns the tag as written on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            WireType::String => "S",
            WireType::Number => "N",
            WireType::Boolean => "BOOL",
            WireType::Binary => "B",
            WireType::Date => "DATE",
            WireType::List => "L",
            WireType::StringSet => "SS",
            WireType::NumberSet => "NS",
            WireType::BinarySet => "BS",
        }
    }

    /// Parses a tag string
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "S" => Some(WireType::String),
            "N" => Some(WireType::Number),
            "BOOL" => Some(WireType::Boolean),
            "B" => Some(WireType::Binary),
            "DATE" => Some(WireType::Date),
            "L" => Some(WireType::List),
            "SS" => Some(WireType::StringSet),
            "NS" => Some(WireType::NumberSet),
            "BS" => Some(WireType::BinarySet),
            _ => None,
        }
    }

    pub fn is_set(&self) -> bool {
        matches!(
            self,
            WireType::StringSet | WireType::NumberSet | WireType::BinarySet
        )
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for WireType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One node of the attribute type tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum WireTypeNode {
    /// Leaf tag; `None` means no wire-type opinion
    Tag(Option<WireType>),
    /// Nested object
    Nested(AttributeTypeMap),
}

impl WireTypeNode {
    pub fn tag(&self) -> Option<WireType> {
        match self {
            WireTypeNode::Tag(tag) => *tag,
            WireTypeNode::Nested(_) => None,
        }
    }

    pub fn nested(&self) -> Option<&AttributeTypeMap> {
        match self {
            WireTypeNode::Nested(map) => Some(map),
            WireTypeNode::Tag(_) => None,
        }
    }
}

/// Field name to wire type, recursively expanded for nested objects
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AttributeTypeMap {
    fields: BTreeMap<String, WireTypeNode>,
}

impl AttributeTypeMap {
    pub fn get(&self, field: &str) -> Option<&WireTypeNode> {
        self.fields.get(field)
    }

    /// Tag of a leaf field; `None` for absent, untyped or nested fields
    pub fn tag(&self, field: &str) -> Option<WireType> {
        self.get(field).and_then(WireTypeNode::tag)
    }

    /// Looks up a dotted path such as `address.tags`
    pub fn lookup(&self, path: &str) -> Option<&WireTypeNode> {
        let mut segments = path.split('.');
        let mut node = self.get(segments.next()?)?;
        for segment in segments {
            node = node.nested()?.get(segment)?;
        }
        Some(node)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &WireTypeNode)> {
        self.fields.iter()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl FromIterator<(String, WireTypeNode)> for AttributeTypeMap {
    fn from_iter<T: IntoIterator<Item = (String, WireTypeNode)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Fixed kind table; `None` for kinds without a wire type.
pub fn wire_type_for(kind: &AttributeKind) -> Option<WireType> {
    match kind {
        AttributeKind::String => Some(WireType::String),
        AttributeKind::Date => Some(WireType::Date),
        AttributeKind::Number => Some(WireType::Number),
        AttributeKind::Boolean => Some(WireType::Boolean),
        AttributeKind::Binary => Some(WireType::Binary),
        AttributeKind::Array => Some(WireType::List),
        AttributeKind::Object | AttributeKind::Any | AttributeKind::Custom(_) => None,
    }
}

/// Tag of a single leaf: override first, then the kind table.
fn leaf_tag(descriptor: &AttributeDescriptor) -> Option<WireType> {
    descriptor
        .wire_type_override()
        .or_else(|| wire_type_for(descriptor.kind()))
}

/// Maps a logical schema to its attribute type map.
///
/// A structured root object is unwrapped first, so the result is keyed by
/// the root's fields and never gains an extra wrapper level.
pub fn map_attribute_types(root: &AttributeDescriptor) -> AttributeTypeMap {
    match root.children() {
        Some(children) if root.kind() == &AttributeKind::Object => map_fields(children),
        _ => AttributeTypeMap::default(),
    }
}

/// Maps a set of named fields, recursing through structured objects.
pub fn map_fields(fields: &BTreeMap<String, AttributeDescriptor>) -> AttributeTypeMap {
    fields
        .iter()
        .map(|(name, descriptor)| (name.clone(), map_node(descriptor)))
        .collect()
}

fn map_node(descriptor: &AttributeDescriptor) -> WireTypeNode {
    match descriptor.children() {
        Some(children) if descriptor.is_structured_object() => {
            WireTypeNode::Nested(map_fields(children))
        }
        _ => WireTypeNode::Tag(leaf_tag(descriptor)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_leaf_kinds() {
        let root = AttributeDescriptor::object([
            ("name", AttributeDescriptor::string()),
            ("age", AttributeDescriptor::number()),
            ("born", AttributeDescriptor::date()),
            ("active", AttributeDescriptor::boolean()),
            ("avatar", AttributeDescriptor::binary()),
            ("things", AttributeDescriptor::array()),
        ]);

        let map = map_attribute_types(&root);
        assert_eq!(
            map.to_json(),
            json!({
                "name": "S",
                "age": "N",
                "born": "DATE",
                "active": "BOOL",
                "avatar": "B",
                "things": "L"
            })
        );
    }

    #[test]
    fn test_override_beats_structural_kind() {
        let root = AttributeDescriptor::object([
            ("tags", AttributeDescriptor::string_set()),
            ("scores", AttributeDescriptor::number_set()),
            ("blobs", AttributeDescriptor::binary_set()),
        ]);

        let map = map_attribute_types(&root);
        assert_eq!(map.tag("tags"), Some(WireType::StringSet));
        assert_eq!(map.tag("scores"), Some(WireType::NumberSet));
        assert_eq!(map.tag("blobs"), Some(WireType::BinarySet));
    }

    #[test]
    fn test_nested_objects_mirror_shape() {
        let root = AttributeDescriptor::object([
            ("email", AttributeDescriptor::string()),
            (
                "settings",
                AttributeDescriptor::object([
                    ("nickname", AttributeDescriptor::string()),
                    (
                        "profile",
                        AttributeDescriptor::object([("tags", AttributeDescriptor::string_set())]),
                    ),
                ]),
            ),
        ]);

        let map = map_attribute_types(&root);
        assert_eq!(
            map.to_json(),
            json!({
                "email": "S",
                "settings": {
                    "nickname": "S",
                    "profile": { "tags": "SS" }
                }
            })
        );
        assert_eq!(
            map.lookup("settings.profile.tags").and_then(WireTypeNode::tag),
            Some(WireType::StringSet)
        );
    }

    #[test]
    fn test_unknown_kinds_map_to_absent_tag() {
        let root = AttributeDescriptor::object([
            ("blob", AttributeDescriptor::any()),
            ("geo", AttributeDescriptor::custom("geopoint")),
            ("bag", AttributeDescriptor::open_object()),
        ]);

        let map = map_attribute_types(&root);
        assert_eq!(map.get("geo"), Some(&WireTypeNode::Tag(None)));
        assert_eq!(map.get("bag"), Some(&WireTypeNode::Tag(None)));
        assert_eq!(map.to_json()["blob"], json!(null));
    }

    #[test]
    fn test_non_object_root_maps_to_empty() {
        assert!(map_attribute_types(&AttributeDescriptor::string()).is_empty());
        assert!(map_attribute_types(&AttributeDescriptor::open_object()).is_empty());
    }

    #[test]
    fn test_tag_round_trip() {
        for tag in ["S", "N", "BOOL", "B", "DATE", "L", "SS", "NS", "BS"] {
            assert_eq!(WireType::from_tag(tag).unwrap().as_str(), tag);
        }
        assert!(WireType::from_tag("M").is_none());
    }
}
