use apiscout_core::{ObjectMap, kind_name};
use log::trace;
use serde_json::Value;

use crate::error::{MergeError, MergeResult};

/// Keys whose list values are merged element-by-element instead of replaced
pub const KEYED_LIST_KEYS: [&str; 2] = ["endpoints", "plans"];

/// Field that identifies an element of a keyed list
pub const LIST_KEY_FIELD: &str = "requestPathAlias";

/// Merge `src` into `dst` and return the result
///
/// Rules, applied to every key of `src`:
/// 1. Key absent from `dst`: the `src` value is installed as is.
/// 2. Both values are maps: merged recursively.
/// 3. Key is one of [`KEYED_LIST_KEYS`] and both values are lists: keyed-list
///    merge (see below).
/// 4. Anything else (scalars, type mismatch): the `src` value wins.
/// 5. Keys only present in `dst` are left untouched.
///
/// Keyed-list merge matches elements on [`LIST_KEY_FIELD`]. Every `dst`
/// element is merged with each `src` element carrying the same key, in `dst`
/// order; `dst` elements without a match are dropped, and `src` elements
/// without a match are appended in `src` order. `src` is authoritative for
/// list membership.
///
/// `dst` is consumed; clone it first if the original is still needed.
/// `depth` only feeds diagnostics.
pub fn merge(mut dst: ObjectMap, src: ObjectMap, depth: usize) -> MergeResult<ObjectMap> {
    for (key, src_value) in src {
        match dst.get_mut(&key) {
            None => {
                dst.insert(key, src_value);
            }
            Some(slot) => {
                let dst_value = slot.take();
                *slot = merge_value(&key, dst_value, src_value, depth)?;
            }
        }
    }
    Ok(dst)
}

fn merge_value(key: &str, dst: Value, src: Value, depth: usize) -> MergeResult<Value> {
    match (dst, src) {
        (Value::Object(dst_map), Value::Object(src_map)) => {
            trace!("merging map '{}' at depth {}", key, depth);
            Ok(Value::Object(merge(dst_map, src_map, depth + 1)?))
        }
        (Value::Array(dst_list), Value::Array(src_list)) if KEYED_LIST_KEYS.contains(&key) => {
            trace!("merging keyed list '{}' at depth {}", key, depth);
            Ok(Value::Array(merge_keyed_list(
                key,
                dst_list,
                src_list,
                depth + 1,
            )?))
        }
        (_, src) => Ok(src),
    }
}

fn merge_keyed_list(
    key: &str,
    dst: Vec<Value>,
    src: Vec<Value>,
    depth: usize,
) -> MergeResult<Vec<Value>> {
    let dst_items = into_maps(key, dst, depth)?;
    let src_items = into_maps(key, src, depth)?;

    let mut merged = Vec::with_capacity(src_items.len());

    for dst_item in &dst_items {
        for src_item in src_items.iter().filter(|s| same_key(s, dst_item)) {
            merged.push(Value::Object(merge(
                dst_item.clone(),
                src_item.clone(),
                depth + 1,
            )?));
        }
    }

    for src_item in src_items {
        if !dst_items.iter().any(|d| same_key(d, &src_item)) {
            merged.push(Value::Object(src_item));
        }
    }

    Ok(merged)
}

/// Elements without a key field compare equal to each other
fn same_key(a: &ObjectMap, b: &ObjectMap) -> bool {
    a.get(LIST_KEY_FIELD) == b.get(LIST_KEY_FIELD)
}

fn into_maps(key: &str, items: Vec<Value>, depth: usize) -> MergeResult<Vec<ObjectMap>> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(map) => Ok(map),
            other => Err(MergeError::NonObjectListElement {
                key: key.to_string(),
                index,
                found: kind_name(&other),
                depth,
            }),
        })
        .collect()
}
