//! Configuration loader with distro/common layering.
//!
//! Reads the common document and the distro document (resolving its optional
//! `base` document), merges them with the distro side preferred, then applies
//! the run's override delta.

use super::merge::{apply_structural, merge};
use super::overrides::{OverrideDelta, apply_overrides};
use super::tree::{ConfigTree, TaskConfig, child_path, kind_of};
use super::types::{DistroSelection, RunDocument};
use crate::error::{Error, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Key in a distro document naming the document it extends.
pub const BASE_KEY: &str = "base";

/// Explicit config directory.
pub const ENV_CONFIG_DIR: &str = "HOST_PROVISION_CONFIG_DIR";
/// Path to the per-run document.
pub const ENV_CONFIG_PATH: &str = "HOST_PROVISION_CONFIG_PATH";
/// Compact `<distro>_<version>` selection used when no run document is given.
pub const ENV_DISTRO: &str = "HOST_PROVISION_DISTRO";
/// Path to a bare override delta document.
pub const ENV_USER_CONFIGS: &str = "HOST_PROVISION_USER_CONFIGS";

/// Deserialize one YAML document into a tree.
///
/// An empty document yields an empty tree. A missing file, a parse failure,
/// a top level that is not a mapping, or a `.nan`/`.inf` value is a
/// [`Error::DocumentLoad`].
pub fn load_document(path: impl AsRef<Path>) -> Result<ConfigTree> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| Error::document_load(path, e))?;
    let raw: serde_yaml::Value =
        serde_yaml::from_str(&content).map_err(|e| Error::document_load(path, e))?;
    // JSON values have no NaN or infinity; they would silently become null.
    if let Some(at) = find_non_finite(&raw, "") {
        return Err(Error::document_load(
            path,
            format!("non-finite number at '{}'", at),
        ));
    }
    let value: Value = serde_yaml::from_value(raw).map_err(|e| Error::document_load(path, e))?;
    debug!(path = %path.display(), "Loaded document");

    match value {
        Value::Null => Ok(ConfigTree::new()),
        Value::Object(map) => Ok(ConfigTree::from(map)),
        other => Err(Error::document_load(
            path,
            format!("top level must be a mapping, found {}", kind_of(&other)),
        )),
    }
}

/// Dotted path of the first non-finite float in `value`, if any.
fn find_non_finite(value: &serde_yaml::Value, path: &str) -> Option<String> {
    match value {
        serde_yaml::Value::Number(n) if n.as_f64().is_some_and(|f| !f.is_finite()) => {
            Some(path.to_string())
        }
        serde_yaml::Value::Sequence(items) => items
            .iter()
            .enumerate()
            .find_map(|(i, item)| find_non_finite(item, &child_path(path, &i.to_string()))),
        serde_yaml::Value::Mapping(map) => map.iter().find_map(|(key, item)| {
            let key = key.as_str().map_or_else(|| format!("{:?}", key), str::to_string);
            find_non_finite(item, &child_path(path, &key))
        }),
        serde_yaml::Value::Tagged(tagged) => find_non_finite(&tagged.value, path),
        _ => None,
    }
}

/// Load `distro_dir/file_name`, resolving a single level of `base` indirection.
///
/// When the document names a `base` file, that file is loaded from the same
/// directory and the distro document is laid over it structurally. The `base`
/// key itself does not appear in the result. A base document that declares its
/// own `base` is rejected.
pub fn load_distro_config(distro_dir: impl AsRef<Path>, file_name: &str) -> Result<ConfigTree> {
    let distro_dir = distro_dir.as_ref();
    let path = distro_dir.join(file_name);
    let document = load_document(&path)?;

    let (own, base) = document.without(BASE_KEY);
    let base_name = match base {
        None => return Ok(own),
        Some(Value::String(name)) => name,
        Some(other) => {
            return Err(Error::document_load(
                &path,
                format!("'{}' must name a file, found {}", BASE_KEY, kind_of(&other)),
            ));
        }
    };

    let base_path = distro_dir.join(&base_name);
    let base_doc = load_document(&base_path)?;
    if let Some(nested) = base_doc.get(BASE_KEY) {
        return Err(Error::NestedBase {
            path: base_path,
            base: nested.as_str().map(str::to_string).unwrap_or_else(|| nested.to_string()),
        });
    }

    info!(distro = %file_name, base = %base_name, "Resolved distro base document");
    Ok(apply_structural(&base_doc, &own))
}

/// Locations of the shipped configuration documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    /// Directory holding `common/` and `distros/`
    pub config_dir: PathBuf,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::discover()
    }
}

impl ConfigPaths {
    /// Discover the config directory.
    ///
    /// `HOST_PROVISION_CONFIG_DIR`, then `./configs` if present, then
    /// `~/.host-provision`.
    pub fn discover() -> Self {
        if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
            return Self::with_dir(dir);
        }

        let local = PathBuf::from("configs");
        if local.is_dir() {
            return Self::with_dir(local);
        }

        let config_dir = dirs::home_dir()
            .map(|h| h.join(".host-provision"))
            .unwrap_or(local);
        Self { config_dir }
    }

    /// Create paths with an explicit directory.
    pub fn with_dir(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    pub fn common_path(&self) -> PathBuf {
        self.config_dir.join("common").join("common.yaml")
    }

    pub fn distros_dir(&self) -> PathBuf {
        self.config_dir.join("distros")
    }

    pub fn distro_path(&self, selection: &DistroSelection) -> PathBuf {
        self.distros_dir().join(selection.file_name())
    }
}

/// The final configuration for a run, keyed by task name. Read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    tree: ConfigTree,
}

impl ResolvedConfig {
    pub fn new(tree: ConfigTree) -> Self {
        Self { tree }
    }

    pub fn tree(&self) -> &ConfigTree {
        &self.tree
    }

    pub fn task_names(&self) -> impl Iterator<Item = &String> {
        self.tree.keys()
    }

    /// Settings for one task.
    ///
    /// Fails with [`Error::TaskNotFound`] if the task has no entry, and with
    /// [`Error::MissingSetting`] if its entry is not a mapping.
    pub fn get_task_config<'a>(&'a self, task: &'a str) -> Result<TaskConfig<'a>> {
        match self.tree.get(task) {
            Some(Value::Object(map)) => Ok(TaskConfig::new(task, map)),
            Some(other) => Err(Error::missing_setting(
                task,
                "<root>",
                format!("task entry must be a mapping, found {}", kind_of(other)),
            )),
            None => Err(Error::TaskNotFound(task.to_string())),
        }
    }
}

/// Configuration loader that layers common, distro and override documents.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Paths the documents were read from
    pub paths: ConfigPaths,
    selection: DistroSelection,
    common: ConfigTree,
    distro: ConfigTree,
    resolved: ResolvedConfig,
}

impl ConfigLoader {
    /// Load and resolve configuration from discovered paths.
    pub fn load(selection: DistroSelection, overrides: Option<&OverrideDelta>) -> Result<Self> {
        Self::load_with_paths(ConfigPaths::discover(), selection, overrides)
    }

    /// Load and resolve configuration with explicit paths.
    pub fn load_with_paths(
        paths: ConfigPaths,
        selection: DistroSelection,
        overrides: Option<&OverrideDelta>,
    ) -> Result<Self> {
        let common = load_document(paths.common_path())?;
        let distro = load_distro_config(paths.distros_dir(), &selection.file_name())?;

        // Distro-specific settings win over common ones.
        let merged = merge(&distro, &common);

        let tree = match overrides {
            Some(delta) if !delta.is_empty() => apply_overrides(&merged, delta)?,
            _ => merged,
        };

        info!(
            distro = %selection.distro,
            version = %selection.version,
            tasks = tree.len(),
            "Configs initialization complete"
        );

        Ok(Self {
            paths,
            selection,
            common,
            distro,
            resolved: ResolvedConfig::new(tree),
        })
    }

    /// Resolve configuration for a run.
    ///
    /// The run document supplies the distro selection and overrides. Without
    /// one, the selection comes from `HOST_PROVISION_DISTRO` and overrides
    /// from `HOST_PROVISION_USER_CONFIGS`.
    pub fn for_run(paths: ConfigPaths, run: Option<&RunDocument>) -> Result<Self> {
        match run {
            Some(doc) => Self::load_with_paths(paths, doc.distro.clone(), doc.task_configs.as_ref()),
            None => {
                let selection = selection_from_env()?.ok_or_else(|| {
                    Error::document_load(
                        "<run document>",
                        format!("no run document given and {} is not set", ENV_DISTRO),
                    )
                })?;
                let overrides = overrides_from_env()?;
                Self::load_with_paths(paths, selection, overrides.as_ref())
            }
        }
    }

    pub fn selection(&self) -> &DistroSelection {
        &self.selection
    }

    /// The common document as loaded.
    pub fn common(&self) -> &ConfigTree {
        &self.common
    }

    /// The distro document with its base resolved.
    pub fn distro(&self) -> &ConfigTree {
        &self.distro
    }

    pub fn resolved(&self) -> &ResolvedConfig {
        &self.resolved
    }

    /// Consume the loader and return the resolved configuration.
    pub fn into_resolved(self) -> ResolvedConfig {
        self.resolved
    }
}

/// Distro selection from `HOST_PROVISION_DISTRO`, if set.
pub fn selection_from_env() -> Result<Option<DistroSelection>> {
    std::env::var(ENV_DISTRO)
        .ok()
        .map(|value| DistroSelection::parse(&value))
        .transpose()
}

/// Override delta from the document named by `HOST_PROVISION_USER_CONFIGS`, if set.
pub fn overrides_from_env() -> Result<Option<OverrideDelta>> {
    std::env::var(ENV_USER_CONFIGS)
        .ok()
        .map(|path| load_document(path).map(OverrideDelta::new))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::Distro;
    use serde_json::json;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn tree(value: Value) -> ConfigTree {
        ConfigTree::from_value(value).unwrap()
    }

    #[test]
    fn test_load_document_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = load_document(temp.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, Error::DocumentLoad { .. }));
    }

    #[test]
    fn test_load_document_malformed() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "bad.yaml", "a: [unclosed\n");
        let err = load_document(temp.path().join("bad.yaml")).unwrap_err();
        assert!(matches!(err, Error::DocumentLoad { .. }));
    }

    #[test]
    fn test_load_document_requires_mapping() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "list.yaml", "- a\n- b\n");
        let err = load_document(temp.path().join("list.yaml")).unwrap_err();
        assert!(err.to_string().contains("top level must be a mapping"));
    }

    #[test]
    fn test_load_document_rejects_non_finite_numbers() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "nan.yaml", "install-x:\n  limits: [1, .nan]\n");
        let err = load_document(temp.path().join("nan.yaml")).unwrap_err();
        assert!(matches!(
            err,
            Error::DocumentLoad { ref reason, .. } if reason.contains("install-x.limits.1")
        ));

        write(temp.path(), "inf.yaml", "ratio: -.inf\n");
        assert!(load_document(temp.path().join("inf.yaml")).is_err());

        write(temp.path(), "ok.yaml", "ratio: 0.5\n");
        assert_eq!(
            load_document(temp.path().join("ok.yaml")).unwrap(),
            tree(json!({"ratio": 0.5}))
        );
    }

    #[test]
    fn test_load_document_empty_is_empty_tree() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "empty.yaml", "");
        assert!(load_document(temp.path().join("empty.yaml")).unwrap().is_empty());
    }

    #[test]
    fn test_distro_without_base() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "debian_12.yaml", "version: '12'\npkgs: [x]\n");
        let distro = load_distro_config(temp.path(), "debian_12.yaml").unwrap();
        assert_eq!(distro, tree(json!({"version": "12", "pkgs": ["x"]})));
    }

    #[test]
    fn test_distro_base_indirection() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "generic.yaml", "version: '11'\npkgs: [x]\n");
        write(
            temp.path(),
            "debian_12.yaml",
            "base: generic.yaml\nversion: '12'\n",
        );
        let distro = load_distro_config(temp.path(), "debian_12.yaml").unwrap();
        assert_eq!(distro, tree(json!({"version": "12", "pkgs": ["x"]})));
    }

    #[test]
    fn test_distro_base_must_not_chain() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "root.yaml", "a: 1\n");
        write(temp.path(), "generic.yaml", "base: root.yaml\nb: 2\n");
        write(temp.path(), "debian_12.yaml", "base: generic.yaml\n");
        let err = load_distro_config(temp.path(), "debian_12.yaml").unwrap_err();
        assert!(matches!(err, Error::NestedBase { ref base, .. } if base == "root.yaml"));
    }

    #[test]
    fn test_distro_missing_base_file() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "debian_12.yaml", "base: gone.yaml\n");
        let err = load_distro_config(temp.path(), "debian_12.yaml").unwrap_err();
        assert!(matches!(err, Error::DocumentLoad { .. }));
    }

    #[test]
    fn test_distro_base_must_be_string() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "debian_12.yaml", "base: [a, b]\n");
        let err = load_distro_config(temp.path(), "debian_12.yaml").unwrap_err();
        assert!(matches!(err, Error::DocumentLoad { .. }));
    }

    #[test]
    fn test_paths_layout() {
        let paths = ConfigPaths::with_dir("/srv/cfg");
        let sel = DistroSelection::new(Distro::Debian, "12");
        assert_eq!(paths.common_path(), PathBuf::from("/srv/cfg/common/common.yaml"));
        assert_eq!(
            paths.distro_path(&sel),
            PathBuf::from("/srv/cfg/distros/debian_12.yaml")
        );
    }

    #[test]
    fn test_resolved_task_lookup() {
        let resolved = ResolvedConfig::new(tree(json!({
            "install-x": {"pkgs": ["a"]},
            "broken": 5
        })));
        let cfg = resolved.get_task_config("install-x").unwrap();
        assert_eq!(cfg.strings("pkgs").unwrap(), vec!["a"]);

        assert!(matches!(
            resolved.get_task_config("install-y").unwrap_err(),
            Error::TaskNotFound(ref t) if t == "install-y"
        ));
        assert!(matches!(
            resolved.get_task_config("broken").unwrap_err(),
            Error::MissingSetting { .. }
        ));
    }
}
