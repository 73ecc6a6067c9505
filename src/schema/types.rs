//! Attribute descriptors
//!
//! Supported kinds:
//! - string, number, boolean, date, binary
//! - array (optionally constrained by item alternatives)
//! - object (nested attribute tree, or any keys when undeclared)
//! - any / custom (no type opinion)
//!
//! The three set kinds are structurally arrays carrying a wire-type
//! override, see [`AttributeDescriptor::string_set`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::wire::WireType;

/// Structural kind of an attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeKind {
    String,
    Number,
    Boolean,
    /// Instant in time, carried as an RFC 3339 string
    Date,
    /// Raw bytes, carried as a base64 string
    Binary,
    Array,
    Object,
    /// Accepts any value
    Any,
    /// Kind the engine does not recognize; passed through untouched
    Custom(String),
}

impl AttributeKind {
    /// Returns the kind name used in configuration and error messages
    pub fn type_name(&self) -> &str {
        match self {
            AttributeKind::String => "string",
            AttributeKind::Number => "number",
            AttributeKind::Boolean => "boolean",
            AttributeKind::Date => "date",
            AttributeKind::Binary => "binary",
            AttributeKind::Array => "array",
            AttributeKind::Object => "object",
            AttributeKind::Any => "any",
            AttributeKind::Custom(name) => name,
        }
    }
}

/// Presence rule for a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Optional,
    Required,
    Forbidden,
}

impl Presence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Presence::Optional => "optional",
            Presence::Required => "required",
            Presence::Forbidden => "forbidden",
        }
    }
}

/// Extra format constraint on string attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFormat {
    /// RFC 4122 textual UUID
    Guid,
}

type Generator = Arc<dyn Fn() -> Result<Value, String> + Send + Sync>;

/// Supplies a value for a missing field at validation time.
#[derive(Clone)]
pub enum DefaultProvider {
    /// Fixed value, cloned on every use
    Value(Value),
    /// Deferred callback, invoked once per missing field per validation
    Generator {
        description: String,
        generate: Generator,
    },
}

impl DefaultProvider {
    pub fn generator<F>(description: impl Into<String>, generate: F) -> Self
    where
        F: Fn() -> Result<Value, String> + Send + Sync + 'static,
    {
        DefaultProvider::Generator {
            description: description.into(),
            generate: Arc::new(generate),
        }
    }

    /// Produces the default value.
    pub fn resolve(&self) -> Result<Value, String> {
        match self {
            DefaultProvider::Value(value) => Ok(value.clone()),
            DefaultProvider::Generator { generate, .. } => generate(),
        }
    }

    pub fn description(&self) -> String {
        match self {
            DefaultProvider::Value(value) => value.to_string(),
            DefaultProvider::Generator { description, .. } => description.clone(),
        }
    }
}

impl fmt::Debug for DefaultProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultProvider::Value(value) => f.debug_tuple("Value").field(value).finish(),
            DefaultProvider::Generator { description, .. } => {
                f.debug_struct("Generator").field("description", description).finish()
            }
        }
    }
}

// Generators compare by description; two configs declaring the same
// generator are structurally identical.
impl PartialEq for DefaultProvider {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DefaultProvider::Value(a), DefaultProvider::Value(b)) => a == b,
            (
                DefaultProvider::Generator { description: a, .. },
                DefaultProvider::Generator { description: b, .. },
            ) => a == b,
            _ => false,
        }
    }
}

/// Logical type declaration for one field.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDescriptor {
    kind: AttributeKind,
    children: Option<BTreeMap<String, AttributeDescriptor>>,
    items: Vec<AttributeDescriptor>,
    wire_type: Option<WireType>,
    presence: Option<Presence>,
    default: Option<DefaultProvider>,
    format: Option<StringFormat>,
}

impl AttributeDescriptor {
    pub fn new(kind: AttributeKind) -> Self {
        Self {
            kind,
            children: None,
            items: Vec::new(),
            wire_type: None,
            presence: None,
            default: None,
            format: None,
        }
    }

    pub fn string() -> Self {
        Self::new(AttributeKind::String)
    }

    pub fn number() -> Self {
        Self::new(AttributeKind::Number)
    }

    pub fn boolean() -> Self {
        Self::new(AttributeKind::Boolean)
    }

    pub fn date() -> Self {
        Self::new(AttributeKind::Date)
    }

    pub fn binary() -> Self {
        Self::new(AttributeKind::Binary)
    }

    /// Array of anything; constrain elements with [`items`](Self::items)
    pub fn array() -> Self {
        Self::new(AttributeKind::Array)
    }

    pub fn any() -> Self {
        Self::new(AttributeKind::Any)
    }

    pub fn custom(name: impl Into<String>) -> Self {
        Self::new(AttributeKind::Custom(name.into()))
    }

    /// Nested object with declared children
    pub fn object<I, K>(children: I) -> Self
    where
        I: IntoIterator<Item = (K, AttributeDescriptor)>,
        K: Into<String>,
    {
        let mut descriptor = Self::new(AttributeKind::Object);
        descriptor.children = Some(
            children
                .into_iter()
                .map(|(name, child)| (name.into(), child))
                .collect(),
        );
        descriptor
    }

    /// Object accepting any keys
    pub fn open_object() -> Self {
        Self::new(AttributeKind::Object)
    }

    /// Array of strings stored as a native string set
    pub fn string_set() -> Self {
        Self::array()
            .items([Self::string()])
            .wire_type(WireType::StringSet)
    }

    /// Array of numbers stored as a native number set
    pub fn number_set() -> Self {
        Self::array()
            .items([Self::number()])
            .wire_type(WireType::NumberSet)
    }

    /// Array of binary (or string) values stored as a native binary set
    pub fn binary_set() -> Self {
        Self::array()
            .items([Self::binary(), Self::string()])
            .wire_type(WireType::BinarySet)
    }

    /// Guid string defaulting to a fresh random (v4) UUID
    pub fn uuid() -> Self {
        Self::string()
            .guid()
            .try_default_with("uuid v4", || Ok(Value::String(Uuid::new_v4().to_string())))
    }

    /// Guid string defaulting to a fresh time-based (v1) UUID
    pub fn time_uuid() -> Self {
        Self::string().guid().try_default_with("uuid v1", || {
            let random = Uuid::new_v4();
            let mut node = [0u8; 6];
            node.copy_from_slice(&random.as_bytes()[..6]);
            Ok(Value::String(Uuid::now_v1(&node).to_string()))
        })
    }

    pub fn required(mut self) -> Self {
        self.presence = Some(Presence::Required);
        self
    }

    pub fn optional(mut self) -> Self {
        self.presence = Some(Presence::Optional);
        self
    }

    pub fn forbidden(mut self) -> Self {
        self.presence = Some(Presence::Forbidden);
        self
    }

    pub fn presence(mut self, presence: Presence) -> Self {
        self.presence = Some(presence);
        self
    }

    pub fn guid(mut self) -> Self {
        self.format = Some(StringFormat::Guid);
        self
    }

    /// Allowed element alternatives for an array
    pub fn items<I>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = AttributeDescriptor>,
    {
        self.items = items.into_iter().collect();
        self
    }

    /// Overrides the wire type inferred from the kind
    pub fn wire_type(mut self, wire_type: WireType) -> Self {
        self.wire_type = Some(wire_type);
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultProvider::Value(value.into()));
        self
    }

    /// Default computed by `generate` each time the field is missing
    pub fn default_with<F>(self, description: impl Into<String>, generate: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.try_default_with(description, move || Ok(generate()))
    }

    /// Like [`default_with`](Self::default_with) for generators that can fail
    pub fn try_default_with<F>(mut self, description: impl Into<String>, generate: F) -> Self
    where
        F: Fn() -> Result<Value, String> + Send + Sync + 'static,
    {
        self.default = Some(DefaultProvider::generator(description, generate));
        self
    }

    pub fn with_default(mut self, provider: DefaultProvider) -> Self {
        self.default = Some(provider);
        self
    }

    pub fn kind(&self) -> &AttributeKind {
        &self.kind
    }

    pub fn children(&self) -> Option<&BTreeMap<String, AttributeDescriptor>> {
        self.children.as_ref()
    }

    pub fn child(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.children.as_ref().and_then(|children| children.get(name))
    }

    pub fn item_alternatives(&self) -> &[AttributeDescriptor] {
        &self.items
    }

    pub fn wire_type_override(&self) -> Option<WireType> {
        self.wire_type
    }

    pub fn declared_presence(&self) -> Option<Presence> {
        self.presence
    }

    pub fn default_provider(&self) -> Option<&DefaultProvider> {
        self.default.as_ref()
    }

    pub fn format(&self) -> Option<StringFormat> {
        self.format
    }

    /// True for objects whose children are declared
    pub fn is_structured_object(&self) -> bool {
        self.kind == AttributeKind::Object && self.children.is_some()
    }

    /// Adds or replaces a child, turning an open object into a structured one.
    /// Returns the replaced child.
    pub(crate) fn insert_child(
        &mut self,
        name: impl Into<String>,
        child: AttributeDescriptor,
    ) -> Option<AttributeDescriptor> {
        self.children
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(AttributeKind::String.type_name(), "string");
        assert_eq!(AttributeKind::Date.type_name(), "date");
        assert_eq!(AttributeKind::Custom("geo".into()).type_name(), "geo");
    }

    #[test]
    fn test_set_factories_are_arrays_with_override() {
        let set = AttributeDescriptor::string_set();
        assert_eq!(set.kind(), &AttributeKind::Array);
        assert_eq!(set.wire_type_override(), Some(WireType::StringSet));
        assert_eq!(set.item_alternatives().len(), 1);

        let set = AttributeDescriptor::binary_set();
        assert_eq!(set.wire_type_override(), Some(WireType::BinarySet));
        assert_eq!(set.item_alternatives().len(), 2);
    }

    #[test]
    fn test_uuid_generator_is_fresh() {
        let field = AttributeDescriptor::uuid();
        let provider = field.default_provider().unwrap();

        let a = provider.resolve().unwrap();
        let b = provider.resolve().unwrap();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(a.as_str().unwrap()).is_ok());
        assert_eq!(field.format(), Some(StringFormat::Guid));
    }

    #[test]
    fn test_time_uuid_is_version_one() {
        let value = AttributeDescriptor::time_uuid()
            .default_provider()
            .unwrap()
            .resolve()
            .unwrap();
        let parsed = Uuid::parse_str(value.as_str().unwrap()).unwrap();
        assert_eq!(parsed.get_version_num(), 1);
    }

    #[test]
    fn test_generators_compare_by_description() {
        let a = AttributeDescriptor::string().default_with("now", || Value::from(1));
        let b = AttributeDescriptor::string().default_with("now", || Value::from(2));
        let c = AttributeDescriptor::string().default_with("later", || Value::from(1));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_insert_child_reports_replacement() {
        let mut root = AttributeDescriptor::object([("a", AttributeDescriptor::string())]);
        assert!(root.insert_child("b", AttributeDescriptor::date()).is_none());
        let replaced = root.insert_child("a", AttributeDescriptor::date());
        assert_eq!(replaced.unwrap().kind(), &AttributeKind::String);

        let mut open = AttributeDescriptor::open_object();
        assert!(!open.is_structured_object());
        open.insert_child("x", AttributeDescriptor::number());
        assert!(open.is_structured_object());
    }
}
