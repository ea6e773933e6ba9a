//! Per-run state shared by every provisioning task.

use crate::config::{ResolvedConfig, TaskConfig};
use crate::distro::Distribution;
use crate::error::Result;
use std::path::PathBuf;
use std::sync::Arc;

pub const DEFAULT_SSH_PORT: u16 = 22;

/// Connection details for one target host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostTarget {
    pub host: String,
    pub user: String,
    pub port: u16,
    pub identity_file: Option<PathBuf>,
}

impl HostTarget {
    /// Build one target per entry of a comma-separated host list.
    ///
    /// Blank entries are skipped; surrounding whitespace is trimmed.
    pub fn parse_list(
        hosts: &str,
        user: &str,
        port: u16,
        identity_file: Option<PathBuf>,
    ) -> Vec<Self> {
        hosts
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(|host| Self {
                host: host.to_string(),
                user: user.to_string(),
                port,
                identity_file: identity_file.clone(),
            })
            .collect()
    }

    /// `user@host:port` form used in logs.
    pub fn address(&self) -> String {
        format!("{}@{}:{}", self.user, self.host, self.port)
    }
}

/// Everything a task needs, built once at startup and passed explicitly.
///
/// Cloning is cheap and shares the resolved configuration.
#[derive(Debug, Clone)]
pub struct RuntimeContext {
    config: Arc<ResolvedConfig>,
    distribution: Distribution,
    hosts: Vec<HostTarget>,
    requests_verify: bool,
}

impl RuntimeContext {
    pub fn new(config: ResolvedConfig, distribution: Distribution) -> Self {
        Self {
            config: Arc::new(config),
            distribution,
            hosts: Vec::new(),
            requests_verify: true,
        }
    }

    pub fn with_hosts(mut self, hosts: Vec<HostTarget>) -> Self {
        self.hosts = hosts;
        self
    }

    /// Disable TLS verification for downloads run on the hosts.
    pub fn with_requests_warnings_disabled(mut self, disabled: bool) -> Self {
        self.requests_verify = !disabled;
        self
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// Resolved settings for one task.
    pub fn get_task_config<'a>(&'a self, task: &'a str) -> Result<TaskConfig<'a>> {
        self.config.get_task_config(task)
    }

    pub fn distribution(&self) -> &Distribution {
        &self.distribution
    }

    pub fn hosts(&self) -> &[HostTarget] {
        &self.hosts
    }

    /// Whether downloads on the hosts verify TLS certificates.
    pub fn requests_verify(&self) -> bool {
        self.requests_verify
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigTree;
    use crate::enums::Distro;
    use serde_json::json;

    fn context() -> RuntimeContext {
        let tree = ConfigTree::from_value(json!({"install-x": {"pkgs": ["a"]}})).unwrap();
        RuntimeContext::new(ResolvedConfig::new(tree), Distribution::for_distro(Distro::Debian))
    }

    #[test]
    fn test_parse_host_list() {
        let hosts = HostTarget::parse_list(" web1, ,web2 ", "ops", 2222, None);
        assert_eq!(hosts.len(), 2);
        assert_eq!(hosts[0].address(), "ops@web1:2222");
        assert_eq!(hosts[1].host, "web2");
    }

    #[test]
    fn test_clones_share_config() {
        let ctx = context();
        let other = ctx.clone();
        assert!(Arc::ptr_eq(&ctx.config, &other.config));
        assert_eq!(
            other.get_task_config("install-x").unwrap().strings("pkgs").unwrap(),
            vec!["a"]
        );
    }

    #[test]
    fn test_requests_verify_flag() {
        let ctx = context();
        assert!(ctx.requests_verify());
        let ctx = ctx.with_requests_warnings_disabled(true);
        assert!(!ctx.requests_verify());
    }
}
