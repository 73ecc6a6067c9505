//! Attribute-value marshalling
//!
//! Encodes records into the store's attribute-value JSON form
//! (`{"S": "x"}`, `{"N": "42"}`, `{"M": {..}}`) guided by an
//! [`AttributeTypeMap`], and decodes them back.

use serde_json::{Map, Number, Value};
use thiserror::Error;

use super::wire::{AttributeTypeMap, WireType, WireTypeNode};

/// A value that cannot be encoded or decoded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("\"{path}\" {reason}")]
pub struct MarshalError {
    pub path: String,
    pub reason: String,
}

impl MarshalError {
    fn new(path: &str, reason: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

pub type MarshalResult<T> = Result<T, MarshalError>;

/// Encodes a record into an item of attribute values.
///
/// Fields with an absent tag, and fields the map does not declare, are
/// encoded from the value's native JSON shape.
pub fn to_wire(record: &Value, types: &AttributeTypeMap) -> MarshalResult<Value> {
    match record {
        Value::Object(fields) => Ok(Value::Object(encode_fields(fields, types, "")?)),
        _ => Err(MarshalError::new("$root", "must be an object")),
    }
}

/// Decodes an item of attribute values into a plain record.
pub fn from_wire(item: &Value) -> MarshalResult<Value> {
    let fields = item
        .as_object()
        .ok_or_else(|| MarshalError::new("$root", "must be an object"))?;

    let mut record = Map::new();
    for (name, attribute) in fields {
        record.insert(name.clone(), decode(attribute, name)?);
    }
    Ok(Value::Object(record))
}

fn encode_fields(
    fields: &Map<String, Value>,
    types: &AttributeTypeMap,
    prefix: &str,
) -> MarshalResult<Map<String, Value>> {
    let mut item = Map::new();
    for (name, value) in fields {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}.{}", prefix, name)
        };

        let encoded = match types.get(name) {
            Some(WireTypeNode::Nested(nested)) => match value {
                Value::Object(children) => tagged("M", Value::Object(encode_fields(children, nested, &path)?)),
                Value::Null => null(),
                _ => return Err(MarshalError::new(&path, "must be an object")),
            },
            Some(WireTypeNode::Tag(Some(tag))) => encode_tagged(value, *tag, &path)?,
            Some(WireTypeNode::Tag(None)) | None => encode_native(value),
        };
        item.insert(name.clone(), encoded);
    }
    Ok(item)
}

fn encode_tagged(value: &Value, tag: WireType, path: &str) -> MarshalResult<Value> {
    if value.is_null() {
        return Ok(null());
    }

    match tag {
        WireType::String | WireType::Date => string(value, path).map(|s| tagged("S", s.into())),
        WireType::Binary => string(value, path).map(|s| tagged("B", s.into())),
        WireType::Number => number(value, path).map(|n| tagged("N", n.to_string().into())),
        WireType::Boolean => value
            .as_bool()
            .map(|b| tagged("BOOL", b.into()))
            .ok_or_else(|| MarshalError::new(path, "must be a boolean")),
        WireType::List => match value {
            Value::Array(items) => Ok(tagged("L", items.iter().map(encode_native).collect())),
            _ => Err(MarshalError::new(path, "must be an array")),
        },
        WireType::StringSet | WireType::BinarySet | WireType::NumberSet => {
            let items = value
                .as_array()
                .ok_or_else(|| MarshalError::new(path, "must be an array"))?;
            if items.is_empty() {
                return Err(MarshalError::new(path, "must not be an empty set"));
            }

            let members = items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    let item_path = format!("{}[{}]", path, i);
                    match tag {
                        WireType::NumberSet => number(item, &item_path).map(|n| n.to_string()),
                        _ => string(item, &item_path).map(str::to_string),
                    }
                })
                .collect::<MarshalResult<Vec<_>>>()?;

            Ok(tagged(tag.as_str(), members.into()))
        }
    }
}

fn encode_native(value: &Value) -> Value {
    match value {
        Value::Null => null(),
        Value::Bool(b) => tagged("BOOL", (*b).into()),
        Value::Number(n) => tagged("N", n.to_string().into()),
        Value::String(s) => tagged("S", s.clone().into()),
        Value::Array(items) => tagged("L", items.iter().map(encode_native).collect()),
        Value::Object(fields) => tagged(
            "M",
            Value::Object(
                fields
                    .iter()
                    .map(|(name, value)| (name.clone(), encode_native(value)))
                    .collect(),
            ),
        ),
    }
}

fn decode(attribute: &Value, path: &str) -> MarshalResult<Value> {
    let (tag, payload) = match attribute.as_object() {
        Some(map) if map.len() == 1 => map
            .iter()
            .next()
            .ok_or_else(|| MarshalError::new(path, "must carry exactly one type tag"))?,
        _ => return Err(MarshalError::new(path, "must carry exactly one type tag")),
    };

    match tag.as_str() {
        "S" | "B" => string(payload, path).map(|s| Value::String(s.to_string())),
        "N" => string(payload, path).and_then(|s| parse_number(s, path)),
        "BOOL" => payload
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| MarshalError::new(path, "BOOL payload must be a boolean")),
        "NULL" => Ok(Value::Null),
        "L" => list(payload, path)?
            .iter()
            .enumerate()
            .map(|(i, item)| decode(item, &format!("{}[{}]", path, i)))
            .collect::<MarshalResult<Vec<_>>>()
            .map(Value::Array),
        "M" => {
            let fields = payload
                .as_object()
                .ok_or_else(|| MarshalError::new(path, "M payload must be an object"))?;
            let mut decoded = Map::new();
            for (name, value) in fields {
                decoded.insert(name.clone(), decode(value, &format!("{}.{}", path, name))?);
            }
            Ok(Value::Object(decoded))
        }
        "SS" | "BS" => list(payload, path)?
            .iter()
            .enumerate()
            .map(|(i, item)| string(item, &format!("{}[{}]", path, i)).map(|s| Value::String(s.to_string())))
            .collect::<MarshalResult<Vec<_>>>()
            .map(Value::Array),
        "NS" => list(payload, path)?
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let item_path = format!("{}[{}]", path, i);
                string(item, &item_path).and_then(|s| parse_number(s, &item_path))
            })
            .collect::<MarshalResult<Vec<_>>>()
            .map(Value::Array),
        other => Err(MarshalError::new(path, format!("has unknown type tag \"{}\"", other))),
    }
}

fn tagged(tag: &str, payload: Value) -> Value {
    let mut map = Map::new();
    map.insert(tag.to_string(), payload);
    Value::Object(map)
}

fn null() -> Value {
    tagged("NULL", Value::Bool(true))
}

fn string<'v>(value: &'v Value, path: &str) -> MarshalResult<&'v str> {
    value
        .as_str()
        .ok_or_else(|| MarshalError::new(path, "must be a string"))
}

fn number<'v>(value: &'v Value, path: &str) -> MarshalResult<&'v Number> {
    match value {
        Value::Number(n) => Ok(n),
        _ => Err(MarshalError::new(path, "must be a number")),
    }
}

fn list<'v>(value: &'v Value, path: &str) -> MarshalResult<&'v Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| MarshalError::new(path, "payload must be an array"))
}

fn parse_number(s: &str, path: &str) -> MarshalResult<Value> {
    if let Ok(i) = s.parse::<i64>() {
        return Ok(Value::from(i));
    }
    s.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| MarshalError::new(path, format!("\"{}\" is not a number", s)))
}
