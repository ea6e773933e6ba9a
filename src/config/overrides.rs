//! Directive-driven overrides applied on top of a resolved tree.
//!
//! An override delta mirrors part of the configuration tree. Intermediate
//! nodes are plain mappings; each leaf is an [`UpdateDirective`] written as
//! `{mode: APPEND|OVERRIDE, value: ...}`:
//!
//! ```yaml
//! install-docker:
//!   packages: {mode: APPEND, value: [docker-compose-plugin]}
//!   daemon:
//!     bip: {mode: OVERRIDE, value: 10.30.0.1/24}
//! ```

use super::tree::{ConfigTree, child_path, kind_of};
use crate::enums::{NamedEnum, UpdateMode};
use crate::error::{Error, Result};
use serde_json::{Map, Value};
use tracing::info;

/// One override leaf: how to apply `value` to the base.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateDirective {
    pub mode: UpdateMode,
    pub value: Value,
}

impl UpdateDirective {
    /// Recognize a directive by shape.
    ///
    /// A directive is a mapping with exactly the keys `mode` (a string) and
    /// `value`. Returns `Ok(None)` for any other value, and an error when the
    /// shape matches but the mode name is unknown.
    pub fn parse(value: &Value) -> Result<Option<Self>> {
        let Value::Object(map) = value else {
            return Ok(None);
        };
        if map.len() != 2 {
            return Ok(None);
        }
        let (Some(Value::String(mode)), Some(value)) = (map.get("mode"), map.get("value")) else {
            return Ok(None);
        };
        Ok(Some(Self {
            mode: UpdateMode::from_name(mode)?,
            value: value.clone(),
        }))
    }
}

/// A sparse, directive-annotated delta tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideDelta(ConfigTree);

impl OverrideDelta {
    pub fn new(tree: ConfigTree) -> Self {
        Self(tree)
    }

    pub fn tree(&self) -> &ConfigTree {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Apply `overrides` onto `base`, returning a new tree.
///
/// - Keys absent from the overrides carry the base value unchanged
/// - Plain mappings on both sides are walked recursively
/// - `OVERRIDE` replaces the base value regardless of its type
/// - `APPEND` concatenates a sequence onto a base sequence
/// - Keys absent from the base are introduced with the directive's value
///
/// Fails with [`Error::DirectiveApplication`] on `APPEND` to a non-sequence,
/// on a bare value where a directive is expected, or on a plain mapping laid
/// over a non-mapping. Unknown mode names fail with [`Error::UnknownEnumValue`].
pub fn apply_overrides(base: &ConfigTree, overrides: &OverrideDelta) -> Result<ConfigTree> {
    apply_map(base.as_map(), overrides.tree().as_map(), "").map(ConfigTree::from)
}

fn apply_map(
    base: &Map<String, Value>,
    overrides: &Map<String, Value>,
    path: &str,
) -> Result<Map<String, Value>> {
    let mut result = base.clone();
    for (key, delta) in overrides {
        let key_path = child_path(path, key);
        let updated = apply_value(base.get(key), delta, &key_path)?;
        result.insert(key.clone(), updated);
    }
    Ok(result)
}

fn apply_value(base: Option<&Value>, delta: &Value, path: &str) -> Result<Value> {
    if let Some(directive) = UpdateDirective::parse(delta)? {
        return apply_directive(base, directive, path);
    }

    match (base, delta) {
        (Some(Value::Object(b)), Value::Object(d)) => apply_map(b, d, path).map(Value::Object),
        (None, Value::Object(d)) => apply_map(&Map::new(), d, path).map(Value::Object),
        (Some(b), Value::Object(_)) => Err(Error::directive(
            path,
            format!("nested overrides target a {} value", kind_of(b)),
        )),
        (_, d) => Err(Error::directive(
            path,
            format!(
                "expected {{mode, value}} directive or mapping, found {}",
                kind_of(d)
            ),
        )),
    }
}

fn apply_directive(base: Option<&Value>, directive: UpdateDirective, path: &str) -> Result<Value> {
    match directive.mode {
        UpdateMode::Override => {
            info!(key = %path, value = %directive.value, "Overriding config");
            Ok(directive.value)
        }
        UpdateMode::Append => {
            let extra = match directive.value {
                Value::Array(extra) => extra,
                other => {
                    return Err(Error::directive(
                        path,
                        format!("APPEND value must be a sequence, found {}", kind_of(&other)),
                    ));
                }
            };
            info!(key = %path, value = ?extra, "Appending config");
            match base {
                Some(Value::Array(items)) => {
                    let mut combined = items.clone();
                    combined.extend(extra);
                    Ok(Value::Array(combined))
                }
                None => Ok(Value::Array(extra)),
                Some(other) => Err(Error::directive(
                    path,
                    format!("APPEND targets a {} value, not a sequence", kind_of(other)),
                )),
            }
        }
    }
}
