//! The configuration tree and its read accessors.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A nested mapping from string keys to scalar, sequence or mapping values.
///
/// Trees are values: every merge or override produces a new tree and leaves
/// its inputs untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigTree(Map<String, Value>);

impl ConfigTree {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wrap a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Nested sub-tree at `key`, if that value is a mapping.
    pub fn subtree(&self, key: &str) -> Option<ConfigTree> {
        match self.0.get(key) {
            Some(Value::Object(map)) => Some(ConfigTree(map.clone())),
            _ => None,
        }
    }

    /// Return a copy of this tree with `key` removed, and the removed value.
    pub(crate) fn without(&self, key: &str) -> (ConfigTree, Option<Value>) {
        let mut map = self.0.clone();
        let removed = map.remove(key);
        (ConfigTree(map), removed)
    }
}

impl From<Map<String, Value>> for ConfigTree {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Read-only view of one task's settings with fail-loud accessors.
///
/// Missing keys and type mismatches are errors; nothing is defaulted.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskConfig<'a> {
    task: &'a str,
    tree: &'a Map<String, Value>,
}

impl<'a> TaskConfig<'a> {
    pub(crate) fn new(task: &'a str, tree: &'a Map<String, Value>) -> Self {
        Self { task, tree }
    }

    pub fn task(&self) -> &str {
        self.task
    }

    pub fn contains(&self, key: &str) -> bool {
        self.tree.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.tree.get(key)
    }

    pub fn to_tree(&self) -> ConfigTree {
        ConfigTree(self.tree.clone())
    }

    pub fn value(&self, key: &str) -> Result<&'a Value> {
        self.tree
            .get(key)
            .ok_or_else(|| Error::missing_setting(self.task, key, "not set"))
    }

    /// A string setting. Numbers and booleans are rendered to strings.
    pub fn string(&self, key: &str) -> Result<String> {
        match self.value(key)? {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(Error::missing_setting(
                self.task,
                key,
                format!("expected a string, found {}", kind_of(other)),
            )),
        }
    }

    /// A list of strings. A single scalar is accepted as a one-element list.
    pub fn strings(&self, key: &str) -> Result<Vec<String>> {
        string_list(self.value(key)?)
            .map_err(|reason| Error::missing_setting(self.task, key, reason))
    }

    /// A nested mapping setting.
    pub fn section(&self, key: &str) -> Result<TaskConfig<'a>> {
        match self.value(key)? {
            Value::Object(map) => Ok(TaskConfig {
                task: self.task,
                tree: map,
            }),
            other => Err(Error::missing_setting(
                self.task,
                key,
                format!("expected a mapping, found {}", kind_of(other)),
            )),
        }
    }
}

/// Flatten a scalar or a sequence of scalars into strings.
pub fn string_list(value: &Value) -> std::result::Result<Vec<String>, String> {
    let scalar = |v: &Value| match v {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(format!("expected a string, found {}", kind_of(other))),
    };
    match value {
        Value::Array(items) => items.iter().map(scalar).collect(),
        other => scalar(other).map(|s| vec![s]),
    }
}

/// Short description of a value's shape for error messages.
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

/// Join a parent key path and a child key with `.`.
pub(crate) fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}
