//! Layered configuration merge
//!
//! Combines an ordered list of raw trees into one. The default policy is
//! compose: overlapping mappings merge recursively and overlapping
//! sequences concatenate with the override appended. Two key prefixes
//! alter this:
//!
//! - `=K` replaces the base value under `K` wholesale
//! - `~K` deletes `K` (null form), listed sequence indices, or listed
//!   child keys
//!
//! The merger is pure: it never resolves references, never evaluates
//! expressions, and treats directive keys as ordinary keys.

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::value::Value;

/// Prefix marking a replace key
pub const REPLACE_PREFIX: char = '=';
/// Prefix marking a delete key
pub const DELETE_PREFIX: char = '~';

/// Merge an ordered list of raw trees into one.
pub fn merge_layers(layers: impl IntoIterator<Item = Value>) -> Result<Value> {
    let mut layers = layers.into_iter();
    let mut base = match layers.next() {
        Some(first) => strip_operators(first, "")?,
        None => Value::Mapping(IndexMap::new()),
    };
    for layer in layers {
        merge(&mut base, layer)?;
    }
    Ok(base)
}

/// Merge one override tree into `base`.
pub fn merge(base: &mut Value, overlay: Value) -> Result<()> {
    merge_at(base, overlay, "")
}

fn merge_at(base: &mut Value, overlay: Value, path: &str) -> Result<()> {
    match (&mut *base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, oval) in overlay_map {
                if let Some(target) = key.strip_prefix(REPLACE_PREFIX) {
                    apply_replace(base_map, target, oval, path)?;
                } else if let Some(target) = key.strip_prefix(DELETE_PREFIX) {
                    apply_delete(base_map, target, oval, path)?;
                } else {
                    apply_compose(base_map, key, oval, path)?;
                }
            }
            Ok(())
        }
        (Value::Sequence(base_seq), Value::Sequence(overlay_seq)) => {
            for item in overlay_seq {
                base_seq.push(strip_operators(item, path)?);
            }
            Ok(())
        }
        // Indexed overrides (from `xs::0=v` override strings) compose into
        // existing sequence elements.
        (Value::Sequence(base_seq), Value::Mapping(overlay_map))
            if is_indexed_override(&overlay_map) =>
        {
            apply_indexed(base_seq, overlay_map, path)
        }
        (Value::Null, overlay) => {
            *base = strip_operators(overlay, path)?;
            Ok(())
        }
        (base_val, overlay @ (Value::Mapping(_) | Value::Sequence(_))) => Err(Error::merge(
            display_path(path),
            format!(
                "Cannot compose a {} onto a {}",
                overlay.type_name(),
                base_val.type_name()
            ),
        )
        .with_help(format!(
            "Use '{}{}' to replace the base value wholesale",
            REPLACE_PREFIX,
            display_path(path)
        ))),
        (base_val, overlay) => {
            // Scalar override replaces whatever was there
            *base_val = overlay;
            Ok(())
        }
    }
}

fn apply_replace(
    base_map: &mut IndexMap<String, Value>,
    target: &str,
    oval: Value,
    path: &str,
) -> Result<()> {
    let key_path = join_path(path, target);
    if !base_map.contains_key(target) {
        return Err(Error::merge(
            key_path.clone(),
            format!("'{}{}' replaces a key that does not exist", REPLACE_PREFIX, target),
        )
        .with_help(format!("Add it with plain '{}' instead", target)));
    }
    base_map.insert(target.to_string(), strip_operators(oval, &key_path)?);
    Ok(())
}

fn apply_delete(
    base_map: &mut IndexMap<String, Value>,
    target: &str,
    oval: Value,
    path: &str,
) -> Result<()> {
    let key_path = join_path(path, target);
    match oval {
        // Null form: remove the key outright, idempotently
        Value::Null => {
            base_map.shift_remove(target);
            Ok(())
        }
        Value::Sequence(items) if items.is_empty() => {
            base_map.shift_remove(target);
            Ok(())
        }
        Value::Sequence(items) => {
            let current = base_map.get_mut(target).ok_or_else(|| {
                Error::merge(
                    key_path.clone(),
                    format!("'{}{}' deletes children of a key that does not exist", DELETE_PREFIX, target),
                )
            })?;
            match current {
                Value::Sequence(seq) => delete_indices(seq, &items, &key_path),
                Value::Mapping(map) => delete_children(map, &items, &key_path),
                other => Err(Error::merge(
                    key_path,
                    format!("'{}' lists children to delete, but the value is a {}", DELETE_PREFIX, other.type_name()),
                )),
            }
        }
        other => Err(Error::merge(
            key_path.clone(),
            format!(
                "'{}{}' takes null or a list of children, not a {}",
                DELETE_PREFIX,
                target,
                other.type_name()
            ),
        )
        .with_help(format!(
            "Delete nested keys with '{}{}: [child]'",
            DELETE_PREFIX, target
        ))),
    }
}

fn delete_indices(seq: &mut Vec<Value>, items: &[Value], key_path: &str) -> Result<()> {
    let len = seq.len() as i64;
    let mut indices = Vec::with_capacity(items.len());
    for item in items {
        let raw = item.as_i64().ok_or_else(|| {
            Error::merge(
                key_path.to_string(),
                format!("Sequence deletion expects integer indices, got {}", item.type_name()),
            )
        })?;
        let idx = if raw < 0 { raw + len } else { raw };
        if idx < 0 || idx >= len {
            return Err(Error::merge(
                key_path.to_string(),
                format!("Index {} is out of range for a sequence of length {}", raw, len),
            ));
        }
        indices.push(idx as usize);
    }
    // High-to-low so earlier indices remain valid; duplicates collapse
    indices.sort_unstable();
    indices.dedup();
    for idx in indices.into_iter().rev() {
        seq.remove(idx);
    }
    Ok(())
}

fn delete_children(
    map: &mut IndexMap<String, Value>,
    items: &[Value],
    key_path: &str,
) -> Result<()> {
    for item in items {
        let name = match item {
            Value::String(s) => s.clone(),
            // Numeric names tie to numeric-string keys, as in descent
            Value::Integer(i) => i.to_string(),
            other => {
                return Err(Error::merge(
                    key_path.to_string(),
                    format!("Mapping deletion expects key names, got {}", other.type_name()),
                ))
            }
        };
        if map.shift_remove(&name).is_none() {
            return Err(Error::merge(
                join_path(key_path, &name),
                format!("'{}' deletes a child that does not exist", DELETE_PREFIX),
            ));
        }
    }
    Ok(())
}

fn apply_compose(
    base_map: &mut IndexMap<String, Value>,
    key: String,
    oval: Value,
    path: &str,
) -> Result<()> {
    let key_path = join_path(path, &key);
    match base_map.get_mut(&key) {
        Some(bval) => merge_at(bval, oval, &key_path),
        None => {
            base_map.insert(key, strip_operators(oval, &key_path)?);
            Ok(())
        }
    }
}

fn is_indexed_override(map: &IndexMap<String, Value>) -> bool {
    !map.is_empty()
        && map.keys().all(|k| {
            k.strip_prefix(REPLACE_PREFIX)
                .unwrap_or(k)
                .parse::<usize>()
                .is_ok()
        })
}

fn apply_indexed(
    base_seq: &mut [Value],
    overlay_map: IndexMap<String, Value>,
    path: &str,
) -> Result<()> {
    for (key, oval) in overlay_map {
        let (replace, index_text) = match key.strip_prefix(REPLACE_PREFIX) {
            Some(rest) => (true, rest),
            None => (false, key.as_str()),
        };
        let idx: usize = index_text.parse().expect("checked by is_indexed_override");
        let key_path = join_path(path, index_text);
        let len = base_seq.len();
        let slot = base_seq.get_mut(idx).ok_or_else(|| {
            Error::merge(
                key_path.clone(),
                format!("Index {} is out of range for a sequence of length {}", idx, len),
            )
        })?;
        if replace {
            *slot = strip_operators(oval, &key_path)?;
        } else {
            merge_at(slot, oval, &key_path)?;
        }
    }
    Ok(())
}

/// Validate and strip operator prefixes from a value inserted at a fresh
/// position: `=K` has nothing to replace and fails, `~K: null` is a no-op
/// and is dropped, `~K` with a child list names children that cannot exist.
fn strip_operators(value: Value, path: &str) -> Result<Value> {
    match value {
        Value::Mapping(map) => {
            let mut out = IndexMap::with_capacity(map.len());
            for (key, val) in map {
                if let Some(target) = key.strip_prefix(REPLACE_PREFIX) {
                    return Err(Error::merge(
                        join_path(path, target),
                        format!("'{}{}' replaces a key that does not exist", REPLACE_PREFIX, target),
                    )
                    .with_help(format!("Add it with plain '{}' instead", target)));
                }
                if let Some(target) = key.strip_prefix(DELETE_PREFIX) {
                    match val {
                        Value::Null => continue,
                        Value::Sequence(items) if items.is_empty() => continue,
                        _ => {
                            return Err(Error::merge(
                                join_path(path, target),
                                format!(
                                    "'{}{}' deletes children of a key that does not exist",
                                    DELETE_PREFIX, target
                                ),
                            ))
                        }
                    }
                }
                let key_path = join_path(path, &key);
                out.insert(key, strip_operators(val, &key_path)?);
            }
            Ok(Value::Mapping(out))
        }
        Value::Sequence(seq) => {
            let mut out = Vec::with_capacity(seq.len());
            for item in seq {
                out.push(strip_operators(item, path)?);
            }
            Ok(Value::Sequence(out))
        }
        other => Ok(other),
    }
}

fn join_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}::{}", path, key)
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::Id;
    use crate::value::from_yaml_str;
    use pretty_assertions::assert_eq;

    fn yaml(text: &str) -> Value {
        from_yaml_str(text, false).unwrap()
    }

    fn merged(layers: &[&str]) -> Value {
        merge_layers(layers.iter().map(|t| yaml(t))).unwrap()
    }

    fn merged_err(layers: &[&str]) -> Error {
        merge_layers(layers.iter().map(|t| yaml(t))).unwrap_err()
    }

    #[test]
    fn test_compose_mappings_recursively() {
        let out = merged(&["m:\n  p: 1\n  q: 2", "m:\n  p: 9"]);
        assert_eq!(out, yaml("m:\n  p: 9\n  q: 2"));
    }

    #[test]
    fn test_compose_adds_new_keys() {
        let out = merged(&["a: 1", "b: 2"]);
        assert_eq!(out, yaml("a: 1\nb: 2"));
    }

    #[test]
    fn test_compose_sequences_append() {
        let out = merged(&["xs: [a, b]", "xs: [c]"]);
        assert_eq!(out, yaml("xs: [a, b, c]"));
    }

    #[test]
    fn test_compose_scalar_replaces() {
        let out = merged(&["a: 1", "a: 2"]);
        assert_eq!(out, yaml("a: 2"));
        let out = merged(&["m:\n  p: 1", "m: gone"]);
        assert_eq!(out, yaml("m: gone"));
    }

    #[test]
    fn test_compose_container_onto_scalar_fails() {
        let err = merged_err(&["a: 1", "a: [1]"]);
        assert!(err.to_string().contains("a"));
        assert!(err.to_string().contains("="));
    }

    #[test]
    fn test_compose_sequence_onto_mapping_fails() {
        let err = merged_err(&["m:\n  p: 1", "m: [1]"]);
        assert!(err.to_string().contains("Cannot compose"));
    }

    #[test]
    fn test_compose_onto_null_takes_override() {
        let out = merged(&["m: null", "m:\n  p: 1"]);
        assert_eq!(out, yaml("m:\n  p: 1"));
    }

    #[test]
    fn test_replace_operator() {
        let out = merged(&["m:\n  p: 1\n  q: 2", "=m:\n  p: 9"]);
        assert_eq!(out, yaml("m:\n  p: 9"));
    }

    #[test]
    fn test_replace_dominates_regardless_of_structure() {
        // P3: the replaced value is exactly the override's value
        let out = merged(&["x: [1, 2, 3]", "=x: 5"]);
        assert_eq!(out, yaml("x: 5"));
        let out = merged(&["x: scalar", "=x:\n  nested: true"]);
        assert_eq!(out, yaml("x:\n  nested: true"));
    }

    #[test]
    fn test_replace_missing_key_fails() {
        let err = merged_err(&["a: 1", "=b: 2"]);
        assert!(err.to_string().contains("does not exist"));
        assert!(err.to_string().contains("plain 'b'"));
    }

    #[test]
    fn test_delete_null_form() {
        let out = merged(&["a: 1\nb: 2", "~a: null"]);
        assert_eq!(out, yaml("b: 2"));
    }

    #[test]
    fn test_delete_null_form_idempotent() {
        // P4: deleting an absent key is not an error
        let out = merged(&["b: 2", "~a: null", "~a: null"]);
        assert_eq!(out, yaml("b: 2"));
    }

    #[test]
    fn test_delete_empty_list_acts_as_null_form() {
        let out = merged(&["a: 1\nb: 2", "~a: []"]);
        assert_eq!(out, yaml("b: 2"));
    }

    #[test]
    fn test_delete_sequence_indices() {
        let out = merged(&["xs: [a, b, c, d]", "~xs: [0, -1]"]);
        assert_eq!(out, yaml("xs: [b, c]"));
    }

    #[test]
    fn test_delete_sequence_duplicate_indices_collapse() {
        let out = merged(&["xs: [a, b, c]", "~xs: [1, 1, -2]"]);
        assert_eq!(out, yaml("xs: [a, c]"));
    }

    #[test]
    fn test_delete_sequence_index_out_of_range() {
        let err = merged_err(&["xs: [a]", "~xs: [3]"]);
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_delete_mapping_children() {
        let out = merged(&["m:\n  p: 1\n  q: 2\n  r: 3", "~m: [p, r]"]);
        assert_eq!(out, yaml("m:\n  q: 2"));
    }

    #[test]
    fn test_delete_missing_child_fails() {
        let err = merged_err(&["m:\n  p: 1", "~m: [q]"]);
        assert!(err.to_string().contains("m::q"));
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_delete_listed_children_of_missing_key_fails() {
        let err = merged_err(&["a: 1", "~m: [p]"]);
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_delete_with_nested_value_fails() {
        let err = merged_err(&["m:\n  p: 1", "~m:\n  p: null"]);
        assert!(err.to_string().contains("takes null or a list"));
    }

    #[test]
    fn test_delete_scalar_target_with_list_fails() {
        let err = merged_err(&["a: 1", "~a: [0]"]);
        assert!(err.to_string().contains("the value is a integer"));
    }

    #[test]
    fn test_list_extend_then_delete_scenario() {
        let out = merged(&["xs: [a, b, c]", "xs: [d]", "~xs: [0, -1]"]);
        assert_eq!(out, yaml("xs: [b, c]"));
    }

    #[test]
    fn test_indexed_override_composes_into_element() {
        let out = merged(&["xs: [1, 2, 3]", "xs:\n  1: 9"]);
        assert_eq!(out, yaml("xs: [1, 9, 3]"));
    }

    #[test]
    fn test_indexed_override_replace_element() {
        let out = merged(&["xs:\n  - p: 1\n    q: 2\n  - p: 3", "xs:\n  =0:\n    p: 9"]);
        assert_eq!(out, yaml("xs:\n  - p: 9\n  - p: 3"));
    }

    #[test]
    fn test_indexed_override_out_of_range() {
        let err = merged_err(&["xs: [1]", "xs:\n  4: 9"]);
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_compose_associative_for_conflict_free_layers() {
        // P2: merge([a, b, c]) == merge([merge([a, b]), c])
        let a = "m:\n  p: 1";
        let b = "m:\n  q: 2";
        let c = "n: [x]";
        let all = merged(&[a, b, c]);
        let ab = merged(&[a, b]);
        let staged = merge_layers([ab, yaml(c)]).unwrap();
        assert_eq!(all, staged);
    }

    #[test]
    fn test_first_layer_operators_validated() {
        let result = merge_layers([yaml("=a: 1")]);
        assert!(result.is_err());

        // Null-form deletes in a first layer are inert
        let out = merge_layers([yaml("a: 1\n~b: null")]).unwrap();
        assert_eq!(out, yaml("a: 1"));
    }

    #[test]
    fn test_fresh_insert_strips_nested_operators() {
        let out = merged(&["a: 1", "m:\n  p: 2\n  ~q: null"]);
        assert_eq!(out, yaml("a: 1\nm:\n  p: 2"));
    }

    #[test]
    fn test_merge_empty_layer_list() {
        let out = merge_layers([]).unwrap();
        assert_eq!(out, yaml(""));
    }

    #[test]
    fn test_merger_ignores_directive_keys() {
        // `_target_` is an ordinary key to the merger
        let out = merged(&[
            "lin:\n  _target_: nn.Linear\n  in_features: 4",
            "lin:\n  in_features: 8",
        ]);
        assert_eq!(
            out.descend(&Id::parse("lin::in_features").unwrap()).unwrap(),
            &Value::Integer(8)
        );
        assert_eq!(
            out.descend(&Id::parse("lin::_target_").unwrap()).unwrap(),
            &Value::String("nn.Linear".into())
        );
    }

    #[test]
    fn test_error_names_offending_path() {
        let err = merged_err(&["outer:\n  inner:\n    xs: [1]", "outer:\n  inner:\n    xs: {bad: 1}"]);
        assert!(err.to_string().contains("outer::inner::xs"));
    }
}
