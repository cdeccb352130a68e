//! The settings tree.
//!
//! Settings are read from files whose shape is only known to the components
//! that own each section, so the tree is kept untyped: every node is a
//! [`Value`]. Mappings preserve the order their keys were read in, which keeps
//! a rewritten file close to the original when it is serialized again.
//!
//! # Example
//!
//! ```rust
//! use config_deprecation::value::Value;
//!
//! let settings: Value = serde_yaml::from_str("server:\n  cors: true\n")?;
//! let cors = settings.as_mapping().and_then(|m| m.get("server"));
//! assert!(cors.is_some());
//! # Ok::<(), serde_yaml::Error>(())
//! ```
use std::fmt;

use indexmap::IndexMap;
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{MapAccess, SeqAccess, Visitor},
    ser::{SerializeMap, SerializeSeq},
};

use crate::error::Error;

/// An insertion-ordered mapping from keys to settings values.
pub type Mapping = IndexMap<String, Value>;

/// A node of the settings tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Sequence(Vec<Value>),
    Mapping(Mapping),
}

/// A numeric settings value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{i}"),
            Number::Float(x) => write!(f, "{x}"),
        }
    }
}

impl Value {
    /// Creates an empty mapping node.
    pub fn mapping() -> Self {
        Value::Mapping(Mapping::new())
    }

    /// Converts any serializable value into a settings tree.
    ///
    /// The conversion goes through [`serde_value`], so mapping keys come out
    /// sorted rather than in declaration order.
    pub fn from_serialize<T: Serialize>(value: T) -> Result<Self, Error> {
        let raw = serde_value::to_value(value)?;
        Self::from_serde_value(raw)
    }

    fn from_serde_value(raw: serde_value::Value) -> Result<Self, Error> {
        use serde_value::Value as Raw;

        Ok(match raw {
            Raw::Unit | Raw::Option(None) => Value::Null,
            Raw::Option(Some(inner)) | Raw::Newtype(inner) => Self::from_serde_value(*inner)?,
            Raw::Bool(b) => Value::Bool(b),
            Raw::U8(n) => Value::from(i64::from(n)),
            Raw::U16(n) => Value::from(i64::from(n)),
            Raw::U32(n) => Value::from(i64::from(n)),
            Raw::U64(n) => Value::from(n),
            Raw::I8(n) => Value::from(i64::from(n)),
            Raw::I16(n) => Value::from(i64::from(n)),
            Raw::I32(n) => Value::from(i64::from(n)),
            Raw::I64(n) => Value::from(n),
            Raw::F32(x) => Value::from(f64::from(x)),
            Raw::F64(x) => Value::from(x),
            Raw::Char(c) => Value::String(c.to_string()),
            Raw::String(s) => Value::String(s),
            Raw::Bytes(bytes) => Value::Sequence(
                bytes.into_iter().map(|b| Value::from(i64::from(b))).collect(),
            ),
            Raw::Seq(items) => Value::Sequence(
                items
                    .into_iter()
                    .map(Self::from_serde_value)
                    .collect::<Result<_, _>>()?,
            ),
            Raw::Map(entries) => {
                let mut mapping = Mapping::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = Self::from_serde_value(key)?.into_key().ok_or_else(|| {
                        Error::UnexpectedType {
                            path: String::new(),
                            expected: "scalar mapping key",
                            found: "container",
                        }
                    })?;
                    mapping.insert(key, Self::from_serde_value(value)?);
                }
                Value::Mapping(mapping)
            }
        })
    }

    /// Renders a scalar as a mapping key. Containers have no key form.
    fn into_key(self) -> Option<String> {
        match self {
            Value::Null => Some("null".to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) => Some(s),
            Value::Sequence(_) | Value::Mapping(_) => None,
        }
    }

    /// Name of the node's variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(Number::Int(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Value::Number(Number::Int(i)) => Some(*i as f64),
            Value::Number(Number::Float(x)) => Some(*x),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_sequence_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Value::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Value::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// JavaScript-style truthiness: `null`, `false`, `0`, `NaN` and the
    /// empty string are falsy, everything else (including empty containers)
    /// is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(Number::Int(i)) => *i != 0,
            Value::Number(Number::Float(x)) => *x != 0.0 && !x.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Sequence(_) | Value::Mapping(_) => true,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Number(Number::Int(i))
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        match i64::try_from(n) {
            Ok(i) => Value::Number(Number::Int(i)),
            #[allow(clippy::cast_precision_loss)]
            Err(_) => Value::Number(Number::Float(n as f64)),
        }
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Number(Number::Float(x))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Sequence(items)
    }
}

impl From<Mapping> for Value {
    fn from(map: Mapping) -> Self {
        Value::Mapping(map)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(Number::Int(i)) => serializer.serialize_i64(*i),
            Value::Number(Number::Float(x)) => serializer.serialize_f64(*x),
            Value::String(s) => serializer.serialize_str(s),
            Value::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Mapping(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    out.serialize_entry(key, value)?;
                }
                out.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("any settings value")
    }

    fn visit_bool<E>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_str<E>(self, v: &str) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_string<E>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_unit<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Deserialize::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Sequence(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
        let mut map = Mapping::with_capacity(access.size_hint().unwrap_or(0));
        while let Some(key) = access.next_key::<Value>()? {
            let key = key
                .into_key()
                .ok_or_else(|| serde::de::Error::custom("mapping keys must be scalars"))?;
            let value = access.next_value()?;
            map.insert(key, value);
        }
        Ok(Value::Mapping(map))
    }
}
