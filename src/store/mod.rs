//! Implementations of [`RemoteStore`](crate::traits::RemoteStore), and helpers to walk the JSON trees they hold

pub mod memory_store;
pub mod rest_store;

use std::fmt::{Display, Formatter};

use serde_json::{Map, Value};

/// A slash-separated location in a hierarchical store, e.g. `tasks/<uid>`
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct StorePath {
    segments: Vec<String>,
}

impl StorePath {
    /// The root of the store
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a path. Leading, trailing and repeated slashes are ignored
    pub fn new<S: AsRef<str>>(path: S) -> Self {
        let segments = path.as_ref()
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();
        Self { segments }
    }

    pub fn child<S: AsRef<str>>(&self, relative: S) -> Self {
        let mut child = self.clone();
        child.segments.extend(StorePath::new(relative).segments);
        child
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether `self` is `other` or one of its parents
    pub fn contains(&self, other: &StorePath) -> bool {
        other.segments.starts_with(&self.segments)
    }

    /// Whether a write at one of these paths may change the value at the other one
    pub fn overlaps(&self, other: &StorePath) -> bool {
        self.contains(other) || other.contains(self)
    }
}

impl Display for StorePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

impl From<&str> for StorePath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}


/// Returns the value at `path` in `root`, if any.
///
/// Arrays are indexed by the decimal representation of their indices
pub fn value_at<'a>(root: &'a Value, path: &StorePath) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.segments() {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    match current {
        Value::Null => None,
        found => Some(found),
    }
}

/// Overwrites the value at `path` in `root`, creating the missing parents.
///
/// Setting `Value::Null` deletes the value, and every parent that becomes empty
pub fn set_at(root: &mut Value, path: &StorePath, value: Value) {
    set_segments(root, path.segments(), value)
}

/// Overwrites the given children of the value at `path`.
/// Keys of `fields` can be relative paths themselves
pub fn merge_at(root: &mut Value, path: &StorePath, fields: Map<String, Value>) {
    for (key, value) in fields {
        set_at(root, &path.child(&key), value);
    }
}

fn set_segments(node: &mut Value, segments: &[String], value: Value) {
    let (key, rest) = match segments.split_first() {
        None => {
            *node = value;
            return;
        },
        Some(split) => split,
    };

    if value.is_null() && has_child(node, key) == false {
        return;
    }

    let child = child_entry(node, key);
    set_segments(child, rest, value);
    if is_empty(child) {
        remove_child(node, key);
    }
}

fn has_child(node: &Value, key: &str) -> bool {
    match node {
        Value::Object(map) => map.contains_key(key),
        Value::Array(items) => key.parse::<usize>().map(|i| i < items.len()).unwrap_or(false),
        _ => false,
    }
}

/// Returns the child called `key`, turning `node` into an object if it cannot hold such a child
fn child_entry<'a>(node: &'a mut Value, key: &str) -> &'a mut Value {
    let array_index = match &*node {
        Value::Array(items) => key.parse::<usize>().ok().filter(|i| *i < items.len()),
        _ => None,
    };

    match (node, array_index) {
        (Value::Array(items), Some(index)) => &mut items[index],
        (node, _) => {
            if node.is_object() == false {
                let previous = std::mem::take(node);
                *node = Value::Object(into_object(previous));
            }
            match node {
                Value::Object(map) => map.entry(key.to_string()).or_insert(Value::Null),
                // into_object always gives an object
                other => other,
            }
        },
    }
}

fn into_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Array(items) => items.into_iter()
            .enumerate()
            .filter(|(_, v)| v.is_null() == false)
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn remove_child(node: &mut Value, key: &str) {
    match node {
        Value::Object(map) => {
            map.remove(key);
        },
        Value::Array(items) => {
            if let Ok(index) = key.parse::<usize>() {
                if index < items.len() {
                    items[index] = Value::Null;
                }
            }
            while items.last().map(|v| v.is_null()).unwrap_or(false) {
                items.pop();
            }
        },
        _ => {},
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn paths() {
        let path = StorePath::new("/tasks//uid42/");
        assert_eq!(path.to_string(), "tasks/uid42");
        assert_eq!(path.child("0/title").to_string(), "tasks/uid42/0/title");
        assert!(StorePath::new("tasks").contains(&path));
        assert!(path.overlaps(&StorePath::root()));
        assert!(path.overlaps(&StorePath::new("users/uid42")) == false);
    }

    #[test]
    fn set_creates_parents() {
        let mut root = Value::Null;
        set_at(&mut root, &StorePath::new("users/u1"), json!({"name": "Jan"}));
        assert_eq!(root, json!({"users": {"u1": {"name": "Jan"}}}));
        assert_eq!(value_at(&root, &StorePath::new("users/u1/name")), Some(&json!("Jan")));
        assert_eq!(value_at(&root, &StorePath::new("users/u2")), None);
    }

    #[test]
    fn null_deletes_and_prunes() {
        let mut root = json!({"tasks": {"u1": [1, 2]}, "users": {"u1": {}}});
        set_at(&mut root, &StorePath::new("tasks/u1"), Value::Null);
        assert_eq!(root, json!({"users": {"u1": {}}}));
        set_at(&mut root, &StorePath::new("nothing/here"), Value::Null);
        assert_eq!(root, json!({"users": {"u1": {}}}));
    }

    #[test]
    fn arrays_are_indexable() {
        let mut root = json!({"tasks": [{"title": "a"}, {"title": "b"}]});
        merge_at(&mut root, &StorePath::new("tasks/1"), json!({"title": "c", "completed": true}).as_object().unwrap().clone());
        assert_eq!(root, json!({"tasks": [{"title": "a"}, {"title": "c", "completed": true}]}));

        set_at(&mut root, &StorePath::new("tasks/5"), json!({"title": "far"}));
        assert_eq!(root["tasks"]["5"], json!({"title": "far"}));
        assert_eq!(root["tasks"]["0"], json!({"title": "a"}));
    }
}
