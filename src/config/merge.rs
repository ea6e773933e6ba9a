//! Structural merging of configuration trees.
//!
//! Two merges live here and they are deliberately different:
//! - [`merge`] combines two trees of equal rank. On a conflict the *first*
//!   argument wins, so callers pass the preferred source first.
//! - [`apply_structural`] lays an undecorated delta over a base. On a conflict
//!   the *delta* wins. It resolves a distro document onto its `base` document.
//!
//! In both, mappings on both sides are merged recursively and sequences are
//! never concatenated.

use super::tree::ConfigTree;
use serde_json::{Map, Value};

/// Merge two trees, with `preferred` winning every non-mapping conflict.
///
/// - Keys present in only one tree are carried over unchanged
/// - Keys present in both whose values are both mappings are merged recursively
/// - Any other conflict keeps `preferred`'s value; lists are not unioned
///
/// The result's key set at every level is the union of both inputs' key sets.
///
/// # Example
/// ```
/// use serde_json::json;
/// use host_provision::config::{merge, ConfigTree};
///
/// let distro = ConfigTree::from_value(json!({"install-x": {"pkgs": ["b"]}})).unwrap();
/// let common = ConfigTree::from_value(json!({"install-x": {"pkgs": ["a"], "user": "ops"}})).unwrap();
/// let result = merge(&distro, &common);
/// assert_eq!(result.into_value(), json!({"install-x": {"pkgs": ["b"], "user": "ops"}}));
/// ```
pub fn merge(preferred: &ConfigTree, other: &ConfigTree) -> ConfigTree {
    ConfigTree::from(merge_maps(preferred.as_map(), other.as_map()))
}

fn merge_maps(preferred: &Map<String, Value>, other: &Map<String, Value>) -> Map<String, Value> {
    let mut result = preferred.clone();
    for (key, other_value) in other {
        let merged = match preferred.get(key) {
            Some(Value::Object(a)) => match other_value {
                Value::Object(b) => Value::Object(merge_maps(a, b)),
                _ => continue,
            },
            // Conflict on a non-mapping: preferred already holds its value
            Some(_) => continue,
            None => other_value.clone(),
        };
        result.insert(key.clone(), merged);
    }
    result
}

/// Lay `delta` over `base`, with the delta winning every non-mapping conflict.
///
/// - Mappings on both sides are merged recursively
/// - Arrays, strings, numbers, booleans and nulls in the delta replace the base value
/// - Keys only in the base are preserved; keys only in the delta are added
pub fn apply_structural(base: &ConfigTree, delta: &ConfigTree) -> ConfigTree {
    ConfigTree::from(overlay_maps(base.as_map(), delta.as_map()))
}

fn overlay_maps(base: &Map<String, Value>, delta: &Map<String, Value>) -> Map<String, Value> {
    let mut result = base.clone();
    for (key, delta_value) in delta {
        let merged = match (base.get(key), delta_value) {
            (Some(Value::Object(b)), Value::Object(d)) => Value::Object(overlay_maps(b, d)),
            (_, d) => d.clone(),
        };
        result.insert(key.clone(), merged);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree(value: Value) -> ConfigTree {
        ConfigTree::from_value(value).unwrap()
    }

    #[test]
    fn test_merge_disjoint_keys() {
        let a = tree(json!({"temp": 123}));
        let b = tree(json!({"height": 6}));
        assert_eq!(merge(&a, &b), tree(json!({"temp": 123, "height": 6})));
    }

    #[test]
    fn test_merge_prefers_first_on_scalar_conflict() {
        let a = tree(json!({"k": 1}));
        let b = tree(json!({"k": 2}));
        assert_eq!(merge(&a, &b), tree(json!({"k": 1})));
        assert_eq!(merge(&b, &a), tree(json!({"k": 2})));
    }

    #[test]
    fn test_merge_recurses_into_mappings() {
        let a = tree(json!({"k": {"x": 1}}));
        let b = tree(json!({"k": {"y": 2}}));
        assert_eq!(merge(&a, &b), tree(json!({"k": {"x": 1, "y": 2}})));
    }

    #[test]
    fn test_merge_lists_are_not_unioned() {
        let distro = tree(json!({"install-x": {"pkgs": ["b"]}}));
        let common = tree(json!({"install-x": {"pkgs": ["a"]}}));
        assert_eq!(
            merge(&distro, &common),
            tree(json!({"install-x": {"pkgs": ["b"]}}))
        );
    }

    #[test]
    fn test_merge_mapping_against_scalar_keeps_preferred() {
        let a = tree(json!({"k": 5}));
        let b = tree(json!({"k": {"nested": true}}));
        assert_eq!(merge(&a, &b), tree(json!({"k": 5})));

        let a = tree(json!({"k": {"nested": true}}));
        let b = tree(json!({"k": [1, 2]}));
        assert_eq!(merge(&a, &b), tree(json!({"k": {"nested": true}})));
    }

    #[test]
    fn test_merge_deeply_nested() {
        let a = tree(json!({
            "key_one": {"temp": 123, "height": 3},
            "configs": {"foo": 1, "bar": 2, "sub_key": {"x": 1, "y": 2}}
        }));
        let b = tree(json!({
            "key_one": {"packages": ["a", "b", "c"]},
            "configs": {"foo": 2, "ka": 1, "kb": 2}
        }));
        assert_eq!(
            merge(&a, &b),
            tree(json!({
                "key_one": {"temp": 123, "height": 3, "packages": ["a", "b", "c"]},
                "configs": {
                    "foo": 1,
                    "bar": 2,
                    "sub_key": {"x": 1, "y": 2},
                    "ka": 1,
                    "kb": 2
                }
            }))
        );
    }

    #[test]
    fn test_merge_key_set_is_union_at_every_level() {
        let a = tree(json!({"p": {"q": 1, "r": {"s": 1}}, "only_a": true}));
        let b = tree(json!({"p": {"t": 2, "r": {"u": 2}}, "only_b": false}));
        let merged = merge(&a, &b);

        let top: Vec<_> = merged.keys().cloned().collect();
        assert_eq!(top, vec!["only_a", "only_b", "p"]);
        let p = merged.subtree("p").unwrap();
        let p_keys: Vec<_> = p.keys().cloned().collect();
        assert_eq!(p_keys, vec!["q", "r", "t"]);
        assert_eq!(p.subtree("r").unwrap(), tree(json!({"s": 1, "u": 2})));
    }

    #[test]
    fn test_merge_does_not_mutate_inputs() {
        let a = tree(json!({"k": {"x": 1}, "list": [1]}));
        let b = tree(json!({"k": {"y": 2}, "list": [2]}));
        let (a_before, b_before) = (a.clone(), b.clone());
        let _ = merge(&a, &b);
        assert_eq!(a, a_before);
        assert_eq!(b, b_before);
    }

    #[test]
    fn test_merge_chain_keeps_first_preference() {
        let a = tree(json!({"a": 1}));
        let b = tree(json!({"a": 2, "b": 2}));
        let c = tree(json!({"b": 3, "c": 3}));
        assert_eq!(
            merge(&merge(&a, &b), &c),
            tree(json!({"a": 1, "b": 2, "c": 3}))
        );
    }

    #[test]
    fn test_structural_delta_wins() {
        let base = tree(json!({"version": "11", "pkgs": ["x"]}));
        let delta = tree(json!({"version": "12"}));
        assert_eq!(
            apply_structural(&base, &delta),
            tree(json!({"version": "12", "pkgs": ["x"]}))
        );
    }

    #[test]
    fn test_structural_recurses_and_replaces_lists() {
        let base = tree(json!({
            "install-x": {"pkgs": ["a", "b"], "repo": {"url": "old", "key": "k"}}
        }));
        let delta = tree(json!({
            "install-x": {"pkgs": ["c"], "repo": {"url": "new"}}
        }));
        assert_eq!(
            apply_structural(&base, &delta),
            tree(json!({
                "install-x": {"pkgs": ["c"], "repo": {"url": "new", "key": "k"}}
            }))
        );
    }

    #[test]
    fn test_structural_replaces_across_shapes() {
        let base = tree(json!({"value": {"nested": true}, "other": 42}));
        let delta = tree(json!({"value": 42, "other": {"nested": true}}));
        assert_eq!(
            apply_structural(&base, &delta),
            tree(json!({"value": 42, "other": {"nested": true}}))
        );
    }
}
