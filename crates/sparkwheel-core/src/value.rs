//! Configuration tree values
//!
//! Represents parsed configuration nodes before resolution. Nodes can be
//! scalars (string, int, float, bool, null), sequences, or mappings.
//! Mappings preserve insertion order for human inspection.

use indexmap::IndexMap;
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};
use crate::id::{Id, Segment};

/// A configuration node that may contain unresolved markers
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Null value
    #[default]
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Integer(i64),
    /// Floating point value
    Float(f64),
    /// String value (may contain markers like `@id`, `%id`, `$expr`)
    String(String),
    /// Sequence of values
    Sequence(Vec<Value>),
    /// Mapping of string keys to values
    Mapping(IndexMap<String, Value>),
}

impl Value {
    /// Check if this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is a string
    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    /// Check if this value is a sequence
    pub fn is_sequence(&self) -> bool {
        matches!(self, Value::Sequence(_))
    }

    /// Check if this value is a mapping
    pub fn is_mapping(&self) -> bool {
        matches!(self, Value::Mapping(_))
    }

    /// Get as boolean if this is a Bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i64 if this is an Integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64 if this is a Float or Integer
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get as str if this is a String
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as slice if this is a Sequence
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(s) => Some(s),
            _ => None,
        }
    }

    /// Get as mapping if this is a Mapping
    pub fn as_mapping(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Returns the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
        }
    }

    /// Follow the identifier's segments down from this node.
    ///
    /// String segments require a mapping and integer segments a sequence,
    /// with one tie-break each way: a numeric segment against a mapping is
    /// looked up as a string key, and a digit-string segment against a
    /// sequence is used as an index.
    pub fn descend(&self, id: &Id) -> Result<&Value> {
        let mut current = self;
        for (depth, segment) in id.segments().iter().enumerate() {
            current = match current {
                Value::Mapping(map) => {
                    let key = segment.as_key();
                    match map.get(key.as_str()) {
                        Some(v) => v,
                        None => {
                            return Err(not_found_at(id, depth, map.keys()));
                        }
                    }
                }
                Value::Sequence(seq) => {
                    let idx = segment.as_index().ok_or_else(|| {
                        Error::key_not_found(id.to_string(), &[]).with_help(format!(
                            "Segment '{}' indexes a sequence and must be an integer",
                            segment
                        ))
                    })?;
                    seq.get(idx).ok_or_else(|| {
                        Error::key_not_found(id.to_string(), &[]).with_help(format!(
                            "Index {} is out of range for a sequence of length {}",
                            idx,
                            seq.len()
                        ))
                    })?
                }
                other => {
                    return Err(Error::key_not_found(id.to_string(), &[]).with_help(
                        format!("Cannot descend into a {} at segment '{}'", other.type_name(), segment),
                    ));
                }
            };
        }
        Ok(current)
    }

    /// Mutable variant of [`descend`](Self::descend)
    pub fn descend_mut(&mut self, id: &Id) -> Result<&mut Value> {
        let mut current = self;
        for segment in id.segments() {
            current = match current {
                Value::Mapping(map) => {
                    let key = segment.as_key();
                    map.get_mut(key.as_str())
                        .ok_or_else(|| Error::key_not_found(id.to_string(), &[]))?
                }
                Value::Sequence(seq) => {
                    let len = seq.len();
                    let idx = segment
                        .as_index()
                        .ok_or_else(|| Error::key_not_found(id.to_string(), &[]))?;
                    seq.get_mut(idx).ok_or_else(|| {
                        Error::key_not_found(id.to_string(), &[]).with_help(format!(
                            "Index {} is out of range for a sequence of length {}",
                            idx, len
                        ))
                    })?
                }
                _ => return Err(Error::key_not_found(id.to_string(), &[])),
            };
        }
        Ok(current)
    }

    /// Whether the identifier names a node under this tree
    pub fn contains(&self, id: &Id) -> bool {
        self.descend(id).is_ok()
    }

    /// Set a value at an identifier, creating intermediate mappings as needed
    pub fn set(&mut self, id: &Id, value: Value) -> Result<()> {
        if id.is_root() {
            *self = value;
            return Ok(());
        }

        let segments = id.segments();
        let mut current = self;
        for (i, segment) in segments.iter().enumerate() {
            let is_last = i == segments.len() - 1;
            if is_last {
                match (segment, &mut *current) {
                    (_, Value::Mapping(map)) => {
                        map.insert(segment.as_key(), value);
                        return Ok(());
                    }
                    (seg, Value::Sequence(seq)) => {
                        let len = seq.len();
                        let idx = seg
                            .as_index()
                            .ok_or_else(|| Error::key_not_found(id.to_string(), &[]))?;
                        if idx < len {
                            seq[idx] = value;
                            return Ok(());
                        }
                        return Err(Error::key_not_found(id.to_string(), &[]).with_help(
                            format!("Index {} is out of range for a sequence of length {}", idx, len),
                        ));
                    }
                    _ => return Err(Error::key_not_found(id.to_string(), &[])),
                }
            }

            current = match current {
                Value::Mapping(map) => {
                    let key = segment.as_key();
                    if !map.contains_key(key.as_str()) {
                        let next_is_index = matches!(segments[i + 1], Segment::Index(_));
                        let new_value = if next_is_index {
                            Value::Sequence(vec![])
                        } else {
                            Value::Mapping(IndexMap::new())
                        };
                        map.insert(key.clone(), new_value);
                    }
                    map.get_mut(key.as_str()).unwrap()
                }
                Value::Sequence(seq) => {
                    let idx = segment
                        .as_index()
                        .ok_or_else(|| Error::key_not_found(id.to_string(), &[]))?;
                    seq.get_mut(idx)
                        .ok_or_else(|| Error::key_not_found(id.to_string(), &[]))?
                }
                _ => return Err(Error::key_not_found(id.to_string(), &[])),
            };
        }
        Ok(())
    }

    /// Visit every interior and leaf node in depth-first order.
    ///
    /// The visitor receives the canonical identifier of each node, the root
    /// included (with the empty identifier).
    pub fn walk<'a, F>(&'a self, visitor: &mut F)
    where
        F: FnMut(&Id, &'a Value),
    {
        fn go<'a, F>(node: &'a Value, segments: &mut Vec<Segment>, visitor: &mut F)
        where
            F: FnMut(&Id, &'a Value),
        {
            let here = Id::from_segments(segments.clone());
            visitor(&here, node);
            match node {
                Value::Mapping(map) => {
                    for (key, child) in map {
                        segments.push(Segment::from(key.as_str()));
                        go(child, segments, visitor);
                        segments.pop();
                    }
                }
                Value::Sequence(seq) => {
                    for (i, child) in seq.iter().enumerate() {
                        segments.push(Segment::Index(i));
                        go(child, segments, visitor);
                        segments.pop();
                    }
                }
                _ => {}
            }
        }
        go(self, &mut Vec::new(), visitor);
    }
}

fn not_found_at<'k>(id: &Id, depth: usize, keys: impl Iterator<Item = &'k String>) -> Error {
    let prefix = Id::from_segments(id.segments()[..depth].to_vec());
    let candidates: Vec<String> = keys
        .map(|k| {
            if prefix.is_root() {
                k.clone()
            } else {
                format!("{}::{}", prefix, k)
            }
        })
        .collect();
    Error::key_not_found(id.to_string(), &candidates)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Sequence(seq) => {
                write!(f, "[")?;
                for (i, v) in seq.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Mapping(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

// Convenient From implementations
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Sequence(v.into_iter().map(Into::into).collect())
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(m: IndexMap<String, Value>) -> Self {
        Value::Mapping(m)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::Sequence(seq) => {
                let mut s = serializer.serialize_seq(Some(seq.len()))?;
                for v in seq {
                    s.serialize_element(v)?;
                }
                s.end()
            }
            Value::Mapping(map) => {
                let mut m = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    m.serialize_entry(k, v)?;
                }
                m.end()
            }
        }
    }
}

/// Deserialization visitor shared by the lenient and strict paths.
///
/// `STRICT` controls the duplicate-key policy: lenient keeps the last
/// writer, strict fails the parse.
struct ValueVisitor<const STRICT: bool>;

impl<'de, const STRICT: bool> Visitor<'de> for ValueVisitor<STRICT> {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a configuration value")
    }

    fn visit_bool<E: de::Error>(self, b: bool) -> std::result::Result<Value, E> {
        Ok(Value::Bool(b))
    }

    fn visit_i64<E: de::Error>(self, i: i64) -> std::result::Result<Value, E> {
        Ok(Value::Integer(i))
    }

    fn visit_u64<E: de::Error>(self, u: u64) -> std::result::Result<Value, E> {
        if u <= i64::MAX as u64 {
            Ok(Value::Integer(u as i64))
        } else {
            Ok(Value::Float(u as f64))
        }
    }

    fn visit_f64<E: de::Error>(self, f: f64) -> std::result::Result<Value, E> {
        Ok(Value::Float(f))
    }

    fn visit_str<E: de::Error>(self, s: &str) -> std::result::Result<Value, E> {
        Ok(Value::String(s.to_string()))
    }

    fn visit_string<E: de::Error>(self, s: String) -> std::result::Result<Value, E> {
        Ok(Value::String(s))
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(
        self,
        deserializer: D,
    ) -> std::result::Result<Value, D::Error> {
        deserializer.deserialize_any(self)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Value, A::Error> {
        let mut out = Vec::new();
        while let Some(element) = seq.next_element::<Keyed<STRICT>>()? {
            out.push(element.0);
        }
        Ok(Value::Sequence(out))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Value, A::Error> {
        let mut out = IndexMap::new();
        while let Some(raw_key) = map.next_key::<Keyed<STRICT>>()? {
            let key = match raw_key.0 {
                Value::String(s) => s,
                Value::Integer(i) => i.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Float(f) => f.to_string(),
                Value::Null => "null".to_string(),
                other => {
                    return Err(de::Error::custom(format!(
                        "mapping key must be a scalar, got {}",
                        other.type_name()
                    )))
                }
            };
            let value = map.next_value::<Keyed<STRICT>>()?.0;
            if out.insert(key.clone(), value).is_some() && STRICT {
                return Err(de::Error::custom(format!(
                    "duplicate mapping key '{}'",
                    key
                )));
            }
        }
        Ok(Value::Mapping(out))
    }
}

/// Newtype steering nested deserialization through the same strictness
struct Keyed<const STRICT: bool>(Value);

impl<'de, const STRICT: bool> Deserialize<'de> for Keyed<STRICT> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer
            .deserialize_any(ValueVisitor::<STRICT>)
            .map(Keyed)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor::<false>)
    }
}

/// Parse a YAML document into a [`Value`].
///
/// With `strict_keys`, duplicate mapping keys within the document fail the
/// parse; otherwise the last occurrence wins.
pub fn from_yaml_str(text: &str, strict_keys: bool) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Mapping(IndexMap::new()));
    }
    let parsed = if strict_keys {
        serde_yaml::from_str::<Keyed<true>>(text).map(|k| k.0)
    } else {
        serde_yaml::from_str::<Value>(text)
    };
    parsed.map_err(|e| Error::parse(e.to_string()))
}
