//! Structural edits to a TextMate grammar tree
//!
//! Nodes are addressed by stable name, never by position, so hand edits
//! that reorder unrelated parts of the grammar do not break the patcher.
//! A node's stable names are its `name` field and, for entries of a
//! `repository` map, `#<key>` (the spelling used by `include`). Capture
//! mappings are scope assignments, not pattern nodes, and carry no stable
//! name; pattern nodes nested inside them are still visited.
//!
//! Generated nodes carry a `comment` starting with [`GENERATED_MARKER`].
//! They are invisible to name lookup and are the only nodes ever removed.

use serde_json::{Map, Value, json};
use tracing::debug;

use crate::config::Placement;
use crate::{OpgenError, Result};

/// Prefix of the `comment` field that tags generator-owned nodes
pub const GENERATED_MARKER: &str = "@generated";

const CAPTURE_KEYS: [&str; 4] = ["captures", "beginCaptures", "endCaptures", "whileCaptures"];

/// How an object was reached during the walk
#[derive(Debug, Clone, Copy)]
enum NodeRole<'a> {
    Pattern,
    RepositoryEntry(&'a str),
    Capture,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Key(String),
    Index(usize),
}

/// True for nodes emitted by the generator, in any group
pub fn is_generated(node: &Map<String, Value>) -> bool {
    node.get("comment")
        .and_then(Value::as_str)
        .is_some_and(|c| c.starts_with(GENERATED_MARKER))
}

/// True for nodes emitted by the generator for `group`
pub fn is_generated_in_group(node: &Map<String, Value>, group: &str) -> bool {
    node.get("comment")
        .and_then(Value::as_str)
        .and_then(|c| c.strip_prefix(GENERATED_MARKER))
        .and_then(|rest| rest.strip_prefix(' '))
        .and_then(|rest| rest.strip_prefix(group))
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(' '))
}

fn carries_name(node: &Map<String, Value>, role: NodeRole<'_>, name: &str) -> bool {
    match role {
        NodeRole::Capture => false,
        NodeRole::RepositoryEntry(key) => {
            name.strip_prefix('#') == Some(key)
                || node.get("name").and_then(Value::as_str) == Some(name)
        }
        NodeRole::Pattern => node.get("name").and_then(Value::as_str) == Some(name),
    }
}

fn walk(
    value: &Value,
    role: NodeRole<'_>,
    name: &str,
    path: &mut Vec<Step>,
    hits: &mut Vec<Vec<Step>>,
) {
    match value {
        Value::Object(node) => {
            if is_generated(node) {
                return;
            }
            if carries_name(node, role, name) {
                hits.push(path.clone());
            }
            for (key, child) in node {
                path.push(Step::Key(key.clone()));
                match (key.as_str(), child) {
                    ("repository", Value::Object(entries)) => {
                        for (entry_key, entry) in entries {
                            path.push(Step::Key(entry_key.clone()));
                            walk(entry, NodeRole::RepositoryEntry(entry_key), name, path, hits);
                            path.pop();
                        }
                    }
                    (k, Value::Object(captures)) if CAPTURE_KEYS.contains(&k) => {
                        for (index, capture) in captures {
                            path.push(Step::Key(index.clone()));
                            walk(capture, NodeRole::Capture, name, path, hits);
                            path.pop();
                        }
                    }
                    _ => walk(child, NodeRole::Pattern, name, path, hits),
                }
                path.pop();
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                path.push(Step::Index(index));
                walk(item, NodeRole::Pattern, name, path, hits);
                path.pop();
            }
        }
        _ => {}
    }
}

fn locate(document: &Value, name: &str) -> Result<Vec<Step>> {
    let mut hits = Vec::new();
    walk(document, NodeRole::Pattern, name, &mut Vec::new(), &mut hits);
    match hits.len() {
        0 => Err(OpgenError::PatternNotFound {
            name: name.to_string(),
        }),
        1 => Ok(hits.remove(0)),
        count => Err(OpgenError::AmbiguousPattern {
            name: name.to_string(),
            count,
        }),
    }
}

fn resolve_mut<'a>(root: &'a mut Value, path: &[Step]) -> Option<&'a mut Value> {
    path.iter().try_fold(root, |value, step| match step {
        Step::Key(key) => value.get_mut(key.as_str()),
        Step::Index(index) => value.get_mut(*index),
    })
}

fn resolve<'a>(root: &'a Value, path: &[Step]) -> Option<&'a Value> {
    path.iter().try_fold(root, |value, step| match step {
        Step::Key(key) => value.get(key.as_str()),
        Step::Index(index) => value.get(*index),
    })
}

/// The single node carrying `name`
pub fn find_node<'a>(document: &'a Value, name: &str) -> Result<&'a Map<String, Value>> {
    let path = locate(document, name)?;
    resolve(document, &path)
        .and_then(Value::as_object)
        .ok_or_else(|| OpgenError::PatternNotFound {
            name: name.to_string(),
        })
}

/// The single node carrying `name`, for editing
pub fn find_node_by_name<'a>(
    document: &'a mut Value,
    name: &str,
) -> Result<&'a mut Map<String, Value>> {
    let path = locate(document, name)?;
    resolve_mut(document, &path)
        .and_then(Value::as_object_mut)
        .ok_or_else(|| OpgenError::PatternNotFound {
            name: name.to_string(),
        })
}

/// Replace the node's `match`, keeping its position and every other field
pub fn set_match_rule(node: &mut Map<String, Value>, regex: &str) {
    match node.get_mut("match") {
        Some(existing) => *existing = Value::String(regex.to_string()),
        None => {
            node.insert("match".to_string(), Value::String(regex.to_string()));
        }
    }
}

/// The `patterns` list of the node carrying `name`
pub fn patterns_of<'a>(document: &'a mut Value, name: &str) -> Result<&'a mut Vec<Value>> {
    find_node_by_name(document, name)?
        .get_mut("patterns")
        .and_then(Value::as_array_mut)
        .ok_or_else(|| OpgenError::PatternListMissing {
            name: name.to_string(),
        })
}

/// A generated match node for chunk `index` (zero-based) of `total`
pub fn generated_node(group: &str, index: usize, total: usize, scope: &str, regex: &str) -> Value {
    json!({
        "comment": format!("{GENERATED_MARKER} {group} {}/{total}", index + 1),
        "name": scope,
        "match": regex,
    })
}

/// Whether a sibling is the anchor: by `name`, or by an `include` of it
fn is_anchor(item: &Value, anchor: &str) -> bool {
    let Some(node) = item.as_object() else {
        return false;
    };
    if is_generated(node) {
        return false;
    }
    node.get("name").and_then(Value::as_str) == Some(anchor)
        || node.get("include").and_then(Value::as_str) == Some(anchor)
}

/// Replace the group's generated nodes in `parent_list`
///
/// Previously generated nodes of `group` are removed, then `nodes` are
/// inserted next to the anchor. Returns the index of the first inserted node.
pub fn upsert_generated_nodes(
    parent_list: &mut Vec<Value>,
    group: &str,
    nodes: Vec<Value>,
    anchor: &str,
    placement: Placement,
) -> usize {
    let before = parent_list.len();
    parent_list.retain(|item| {
        !item
            .as_object()
            .is_some_and(|node| is_generated_in_group(node, group))
    });
    debug!(
        "Removed {} generated '{}' node(s)",
        before - parent_list.len(),
        group
    );

    let anchor_index = parent_list.iter().position(|item| is_anchor(item, anchor));
    let at = match (anchor_index, placement) {
        (Some(index), Placement::Before) => index,
        (Some(index), Placement::After) => index + 1,
        (None, Placement::Before) => 0,
        (None, Placement::After) => parent_list.len(),
    };
    if anchor_index.is_none() {
        debug!("Anchor '{}' not found, inserting '{}' at {}", anchor, group, at);
    }

    parent_list.splice(at..at, nodes);
    at
}

fn include_target(item: &Value) -> Option<&str> {
    item.get("include").and_then(Value::as_str)
}

/// Move the listed include directives ahead of the `before` include
///
/// Only directives currently after `before` move; they land immediately in
/// front of it, in the order given by `includes`. Returns how many moved.
pub fn reorder_includes(list: &mut Vec<Value>, includes: &[String], before: &str) -> usize {
    let Some(target) = list.iter().position(|i| include_target(i) == Some(before)) else {
        debug!("Include '{}' not in list, nothing to reorder", before);
        return 0;
    };

    let mut moved = Vec::new();
    for wanted in includes {
        let mut index = target + 1;
        while index < list.len() {
            if include_target(&list[index]) == Some(wanted.as_str()) {
                moved.push(list.remove(index));
            } else {
                index += 1;
            }
        }
    }

    let count = moved.len();
    list.splice(target..target, moved);
    count
}
