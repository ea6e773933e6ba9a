//! Hierarchical configuration resolution.
//!
//! Builds one configuration tree per run from three layers:
//! 1. **Common** - `<config_dir>/common/common.yaml`, shared by all distributions
//! 2. **Distro** - `<config_dir>/distros/<distro>_<version>.yaml`, optionally
//!    extending one `base` document in the same directory
//! 3. **Overrides** - the run document's `task_configs`, each leaf tagged
//!    `{mode: APPEND|OVERRIDE, value: ...}`
//!
//! ## Merge Strategy
//! - Common and distro: deep merge, distro wins any non-mapping conflict
//! - Distro over its base: deep merge, distro wins any non-mapping conflict
//! - Overrides: explicit per-leaf mode; `APPEND` extends sequences only
//!
//! Resolution happens before any host is contacted; every failure here is
//! fatal to the run.
//!
//! ## Environment Variables
//! - `HOST_PROVISION_CONFIG_DIR` - Config directory
//! - `HOST_PROVISION_CONFIG_PATH` - Per-run document
//! - `HOST_PROVISION_DISTRO` - `<distro>_<version>` when no run document is given
//! - `HOST_PROVISION_USER_CONFIGS` - Bare override delta document

mod loader;
mod merge;
mod overrides;
mod tree;
mod types;

pub use loader::{
    BASE_KEY, ConfigLoader, ConfigPaths, ENV_CONFIG_DIR, ENV_CONFIG_PATH, ENV_DISTRO,
    ENV_USER_CONFIGS, ResolvedConfig, load_distro_config, load_document, overrides_from_env,
    selection_from_env,
};
pub use merge::{apply_structural, merge};
pub use overrides::{OverrideDelta, UpdateDirective, apply_overrides};
pub use tree::{ConfigTree, TaskConfig, kind_of, string_list};
pub use types::{DistroSelection, RunDocument};
