//! Command-line override strings
//!
//! Each override has the form `[~|=]<identifier>=<literal>`; a bare
//! `~<identifier>` deletes. The strings are translated into a single
//! override tree (operator prefixes preserved on the leaf key) which the
//! merger then applies like any other layer.

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::id::Id;
use crate::merge::{DELETE_PREFIX, REPLACE_PREFIX};
use crate::value::Value;

/// Translate a list of override strings into one override tree.
pub fn overrides_to_tree<S: AsRef<str>>(specs: &[S]) -> Result<Value> {
    let mut tree = Value::Mapping(IndexMap::new());
    for spec in specs {
        let layer = parse_override(spec.as_ref())?;
        combine(&mut tree, layer);
    }
    Ok(tree)
}

/// Parse a single override string into its nested-mapping form.
pub fn parse_override(spec: &str) -> Result<Value> {
    let (prefix, rest) = match spec.chars().next() {
        Some(REPLACE_PREFIX) => (Some(REPLACE_PREFIX), &spec[1..]),
        Some(DELETE_PREFIX) => (Some(DELETE_PREFIX), &spec[1..]),
        _ => (None, spec),
    };

    let (id_text, literal) = match rest.split_once('=') {
        Some((id_text, literal)) => (id_text, Some(literal)),
        None => (rest, None),
    };

    let id = Id::parse(id_text).map_err(|e| {
        Error::parse(format!("Invalid override '{}': {}", spec, e.cause.unwrap_or_default()))
    })?;
    if id.is_root() {
        return Err(Error::parse(format!(
            "Override '{}' is missing an identifier",
            spec
        )));
    }

    let value = match literal {
        Some(text) => decode_literal(text),
        None => {
            if prefix != Some(DELETE_PREFIX) {
                return Err(Error::parse(format!(
                    "Override '{}' is missing '=<value>'",
                    spec
                ))
                .with_help(format!("Only '{}key' deletes without a value", DELETE_PREFIX)));
            }
            Value::Null
        }
    };

    Ok(nest(prefix, &id, value))
}

/// Decode an override literal: structured YAML scalar/flow syntax when it
/// parses, plain string otherwise.
fn decode_literal(text: &str) -> Value {
    if text.is_empty() {
        return Value::String(String::new());
    }
    serde_yaml::from_str::<Value>(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Expand an identifier into nested mappings around the leaf value,
/// keeping the operator prefix on the leaf key.
fn nest(prefix: Option<char>, id: &Id, value: Value) -> Value {
    let segments = id.segments();
    let leaf_key = match prefix {
        Some(p) => format!("{}{}", p, segments[segments.len() - 1].as_key()),
        None => segments[segments.len() - 1].as_key(),
    };

    let mut node = Value::Mapping(IndexMap::from_iter([(leaf_key, value)]));
    for segment in segments[..segments.len() - 1].iter().rev() {
        node = Value::Mapping(IndexMap::from_iter([(segment.as_key(), node)]));
    }
    node
}

/// Structurally combine override layers: mappings unite key-by-key, any
/// other overlap takes the later value. Operator-prefixed keys are data
/// here; interpretation happens in the merger.
fn combine(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, oval) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(bval) => combine(bval, oval),
                    None => {
                        base_map.insert(key, oval);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
