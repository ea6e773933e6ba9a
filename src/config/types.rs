//! Typed views of the per-run user document.

use super::overrides::OverrideDelta;
use super::tree::ConfigTree;
use crate::enums::{Distro, NamedEnum, WindowManager};
use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::path::Path;

/// Which distribution and release a run targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistroSelection {
    pub distro: Distro,
    pub version: String,
    pub window_manager: Option<WindowManager>,
}

impl DistroSelection {
    pub fn new(distro: Distro, version: impl Into<String>) -> Self {
        Self {
            distro,
            version: version.into(),
            window_manager: None,
        }
    }

    /// Parse the compact `<name>_<version>` form, e.g. `debian_12`.
    pub fn parse(compact: &str) -> Result<Self> {
        let (name, version) = compact.rsplit_once('_').ok_or_else(|| Error::UnknownEnumValue {
            kind: "distro",
            value: compact.to_string(),
        })?;
        Ok(Self::new(Distro::from_name(name)?, version))
    }

    /// File name of the distro document, e.g. `debian_12.yaml`.
    pub fn file_name(&self) -> String {
        format!("{}_{}.yaml", self.distro.file_stem(), self.version)
    }
}

/// The `distro:` section as written in YAML.
#[derive(Debug, Clone, Deserialize)]
struct RawDistro {
    name: String,
    #[serde(deserialize_with = "scalar_string")]
    version: String,
    #[serde(default)]
    window_manager: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawRunDocument {
    distro: RawDistro,
    #[serde(default)]
    task_configs: Option<ConfigTree>,
}

/// Accept `version: 12` as well as `version: "12"`.
fn scalar_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number, found {}",
            other
        ))),
    }
}

/// The per-run document: target distro plus optional task overrides.
///
/// ```yaml
/// distro:
///   name: debian
///   version: 12
///   window_manager: xfce4
/// task_configs:
///   install-docker:
///     packages: {mode: APPEND, value: [docker-compose-plugin]}
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RunDocument {
    pub distro: DistroSelection,
    pub task_configs: Option<OverrideDelta>,
}

impl RunDocument {
    /// Load and validate a run document from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let tree = super::loader::load_document(path)?;
        Self::from_tree(tree).map_err(|err| match err {
            Error::DocumentLoad { reason, .. } => Error::document_load(path, reason),
            other => other,
        })
    }

    /// Validate an already-parsed run document.
    pub fn from_tree(tree: ConfigTree) -> Result<Self> {
        let raw: RawRunDocument = serde_json::from_value(tree.into_value())
            .map_err(|e| Error::document_load("<run document>", e))?;

        let window_manager = raw
            .distro
            .window_manager
            .as_deref()
            .map(WindowManager::from_name)
            .transpose()?;

        Ok(Self {
            distro: DistroSelection {
                distro: Distro::from_name(&raw.distro.name)?,
                version: raw.distro.version,
                window_manager,
            },
            task_configs: raw.task_configs.map(OverrideDelta::new),
        })
    }
}
