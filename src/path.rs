//! Dotted-path access to the settings tree.
//!
//! Rules never walk the tree by hand; they go through these functions so a
//! rule only assumes the shape of the paths it names. Segments are separated
//! by `.`; a segment made only of digits indexes into a sequence. The empty
//! path addresses the root.
use crate::{
    error::Error,
    value::{Mapping, Value},
};

fn segments(path: &str) -> Result<Vec<&str>, Error> {
    if path.is_empty() {
        return Ok(Vec::new());
    }

    let parts: Vec<&str> = path.split('.').collect();
    if parts.iter().any(|part| part.is_empty()) {
        return Err(Error::InvalidPath {
            path: path.to_string(),
            reason: "empty path segment".to_string(),
        });
    }
    Ok(parts)
}

fn child<'a>(node: &'a Value, segment: &str) -> Option<&'a Value> {
    match node {
        Value::Mapping(map) => map.get(segment),
        Value::Sequence(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn child_mut<'a>(node: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match node {
        Value::Mapping(map) => map.get_mut(segment),
        Value::Sequence(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get_mut(i)),
        _ => None,
    }
}

/// Joins a base path and a path relative to it.
///
/// ```rust
/// use config_deprecation::path::join;
///
/// assert_eq!(join("monitoring", "ui.enabled"), "monitoring.ui.enabled");
/// assert_eq!(join("", "server.port"), "server.port");
/// ```
pub fn join(base: &str, key: &str) -> String {
    match (base.is_empty(), key.is_empty()) {
        (true, _) => key.to_string(),
        (_, true) => base.to_string(),
        _ => format!("{base}.{key}"),
    }
}

/// Returns the value at `path`, if present. A present `null` counts as a
/// value.
pub fn get<'a>(tree: &'a Value, path: &str) -> Option<&'a Value> {
    let parts = segments(path).ok()?;
    parts.into_iter().try_fold(tree, child)
}

pub fn get_mut<'a>(tree: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    let parts = segments(path).ok()?;
    parts.into_iter().try_fold(tree, child_mut)
}

/// Whether `path` resolves to a value.
pub fn has(tree: &Value, path: &str) -> bool {
    get(tree, path).is_some()
}

/// Stores `value` at `path` and returns the value it replaced.
///
/// Missing intermediate nodes are created as mappings. An intermediate node
/// that is a scalar is replaced by an empty mapping. A numeric segment past
/// the end of a sequence pads the sequence with `null`.
pub fn set(tree: &mut Value, path: &str, value: Value) -> Result<Option<Value>, Error> {
    let parts = segments(path)?;
    let Some((last, parents)) = parts.split_last() else {
        return Ok(Some(std::mem::replace(tree, value)));
    };

    let mut node = tree;
    for segment in parents {
        node = container_entry(node, segment);
    }

    Ok(match (node, last.parse::<usize>()) {
        (Value::Sequence(items), Ok(index)) => {
            if index < items.len() {
                Some(std::mem::replace(&mut items[index], value))
            } else {
                items.resize(index, Value::Null);
                items.push(value);
                None
            }
        }
        (Value::Mapping(map), _) => map.insert((*last).to_string(), value),
        (other, _) => {
            let mut map = Mapping::new();
            map.insert((*last).to_string(), value);
            *other = Value::Mapping(map);
            None
        }
    })
}

fn container_entry<'a>(node: &'a mut Value, segment: &str) -> &'a mut Value {
    let index = segment
        .parse::<usize>()
        .ok()
        .filter(|_| matches!(node, Value::Sequence(_)));
    if index.is_none() && !matches!(node, Value::Mapping(_)) {
        *node = Value::mapping();
    }

    let slot = match (node, index) {
        (Value::Sequence(items), Some(index)) => {
            if index >= items.len() {
                items.resize(index + 1, Value::Null);
            }
            &mut items[index]
        }
        (Value::Mapping(map), _) => map
            .entry(segment.to_string())
            .or_insert_with(Value::mapping),
        (other, _) => other,
    };
    if !matches!(slot, Value::Mapping(_) | Value::Sequence(_)) {
        *slot = Value::mapping();
    }
    slot
}

/// Removes the value at `path` and returns it. Removing a sequence element
/// shifts the elements after it.
pub fn unset(tree: &mut Value, path: &str) -> Option<Value> {
    let parts = segments(path).ok()?;
    let (last, parents) = parts.split_last()?;

    let parent = parents.iter().try_fold(tree, |node, segment| child_mut(node, segment))?;
    match parent {
        Value::Mapping(map) => map.shift_remove(*last),
        Value::Sequence(items) => {
            let index = last.parse::<usize>().ok()?;
            (index < items.len()).then(|| items.remove(index))
        }
        _ => None,
    }
}

/// Removes the value at `path`, then removes each ancestor mapping the
/// removal left empty. Ancestors at or above `boundary` are kept.
pub fn unset_pruning(tree: &mut Value, path: &str, boundary: &str) -> Option<Value> {
    let removed = unset(tree, path)?;

    let floor = segments(boundary).map(|b| b.len()).unwrap_or(0);
    let parts = segments(path).unwrap_or_default();
    for depth in (floor + 1..parts.len()).rev() {
        let ancestor = parts[..depth].join(".");
        let is_empty = get(tree, &ancestor)
            .and_then(Value::as_mapping)
            .is_some_and(Mapping::is_empty);
        if !is_empty {
            break;
        }
        unset(tree, &ancestor);
    }

    Some(removed)
}
