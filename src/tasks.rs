//! Generic package task driven entirely by a task's resolved settings.
//!
//! Recognised keys, all optional except as noted:
//! - `cert_path` (with `cert_validation`, `ca_cert_dir`, `ca_certs_bundle_path`) - install a CA certificate
//! - `repo_file_template` (with `key_url`, `key_file_name`, `repo_file_name`) - add a repository
//! - `packages` - packages to install
//! - `local_packages` - package files already on the host; checked first when a `verify` section is set
//! - `remove_packages` - packages to purge
//! - `groups` (with `user`) - groups to add the user to
//!
//! Every setting is read into a [`PackagePlan`] before the host is contacted.

use crate::config::TaskConfig;
use crate::context::RuntimeContext;
use crate::distro::{CertSpec, PackageManager, PackageVerification, RepoSpec};
use crate::error::{Error, Result};
use crate::remote::RemoteExecutor;
use tracing::info;

const TRIGGER_KEYS: [&str; 6] = [
    "cert_path",
    "repo_file_template",
    "packages",
    "local_packages",
    "remove_packages",
    "groups",
];

/// What a package task did on one host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageTaskReport {
    pub cert_installed: Option<String>,
    pub repo_added: Option<String>,
    pub installed: Vec<String>,
    pub local_installed: Vec<String>,
    pub removed: Vec<String>,
    pub groups: Vec<String>,
}

/// Validated settings for one package task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagePlan {
    pub cert: Option<CertSpec>,
    pub repo: Option<RepoSpec>,
    pub packages: Vec<String>,
    pub local_packages: Vec<String>,
    pub verification: Option<PackageVerification>,
    pub remove_packages: Vec<String>,
    /// User and the groups to add them to
    pub groups: Option<(String, Vec<String>)>,
}

impl PackagePlan {
    /// Read and type-check every setting the task will use.
    ///
    /// A task with none of the recognised keys is a configuration error.
    pub fn from_task(cfg: &TaskConfig<'_>, verify_tls: bool) -> Result<Self> {
        if !TRIGGER_KEYS.iter().any(|k| cfg.contains(k)) {
            return Err(Error::missing_setting(
                cfg.task(),
                "packages",
                "task defines no certificate, repository, packages or groups",
            ));
        }

        let optional_list = |key: &str| -> Result<Vec<String>> {
            if cfg.contains(key) {
                cfg.strings(key)
            } else {
                Ok(Vec::new())
            }
        };

        let cert = if cfg.contains("cert_path") {
            Some(CertSpec::from_task(cfg)?)
        } else {
            None
        };
        let repo = if cfg.contains("repo_file_template") {
            Some(RepoSpec::from_task(cfg, verify_tls)?)
        } else {
            None
        };

        let local_packages = optional_list("local_packages")?;
        let verification = if !local_packages.is_empty() && cfg.contains("verify") {
            Some(PackageVerification::from_section(
                &cfg.section("verify")?,
                verify_tls,
            )?)
        } else {
            None
        };

        let groups = if cfg.contains("groups") {
            Some((cfg.string("user")?, cfg.strings("groups")?))
        } else {
            None
        };

        Ok(Self {
            cert,
            repo,
            packages: optional_list("packages")?,
            local_packages,
            verification,
            remove_packages: optional_list("remove_packages")?,
            groups,
        })
    }
}

/// Run the package task named `task` against one host.
pub fn run_package_task(
    ctx: &RuntimeContext,
    exec: &dyn RemoteExecutor,
    task: &str,
) -> Result<PackageTaskReport> {
    let cfg = ctx.get_task_config(task)?;
    let plan = PackagePlan::from_task(&cfg, ctx.requests_verify())?;
    let distro = ctx.distribution();
    let mut report = PackageTaskReport::default();

    if let Some(cert) = &plan.cert {
        if !distro.install_cert(exec, cert)? {
            return Err(Error::VerificationFailed {
                host: exec.host().to_string(),
                target: cert.cert_path.clone(),
            });
        }
        report.cert_installed = Some(cert.cert_path.clone());
    }

    if let Some(repo) = &plan.repo {
        distro.add_repo(exec, repo)?;
        report.repo_added = Some(repo.repo_file_name.clone());
    }

    if !plan.packages.is_empty() {
        distro.install_package(exec, &plan.packages)?;
    }
    report.installed = plan.packages;

    if !plan.local_packages.is_empty() {
        if let Some(verify) = &plan.verification {
            for path in &plan.local_packages {
                if !distro.verify_package(exec, path, verify)? {
                    return Err(Error::VerificationFailed {
                        host: exec.host().to_string(),
                        target: path.clone(),
                    });
                }
            }
        }
        distro.install_local_package(exec, &plan.local_packages)?;
    }
    report.local_installed = plan.local_packages;

    if !plan.remove_packages.is_empty() {
        distro.remove_package(exec, &plan.remove_packages)?;
    }
    report.removed = plan.remove_packages;

    if let Some((user, groups)) = plan.groups {
        distro.add_user_to_group(exec, &user, &groups)?;
        report.groups = groups;
    }

    info!(host = %exec.host(), task = %task, "Task complete");
    Ok(report)
}
