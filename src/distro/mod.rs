//! Distribution-specific provisioning behind one capability interface.
//!
//! [`Distribution`] is a closed set of supported distributions. Each variant
//! implements the required half of [`PackageManager`]; the provided half
//! (install/remove packages, add repositories, group membership, CA bundle
//! checks) is shared.
//!
//! Settings are read from a task into [`RepoSpec`], [`CertSpec`] and
//! [`PackageVerification`] before any of these operations run, so a host is
//! never touched with an incomplete configuration.

mod debian;

pub use debian::Debian;

use crate::config::TaskConfig;
use crate::enums::{Distro, PackageCommand};
use crate::error::Result;
use crate::remote::{RemoteExecutor, quote_all, shell_quote};
use crate::template::substitute;
use std::collections::HashMap;
use tracing::{error, info};

/// A package repository to install. The source file is still a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSpec {
    pub key_url: String,
    pub key_file_name: String,
    pub repo_file_name: String,
    /// May reference `$architecture` and `$release`
    pub repo_file_template: String,
    pub verify_tls: bool,
}

impl RepoSpec {
    pub fn from_task(task: &TaskConfig<'_>, verify_tls: bool) -> Result<Self> {
        Ok(Self {
            key_url: task.string("key_url")?,
            key_file_name: task.string("key_file_name")?,
            repo_file_name: task.string("repo_file_name")?,
            repo_file_template: task.string("repo_file_template")?,
            verify_tls,
        })
    }
}

/// A CA certificate already uploaded to the host, and where it goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertSpec {
    pub cert_path: String,
    /// Text expected in the certificate subject once it is in the bundle
    pub validation: String,
    pub ca_cert_dir: String,
    pub bundle_path: String,
}

impl CertSpec {
    pub fn from_task(task: &TaskConfig<'_>) -> Result<Self> {
        Ok(Self {
            cert_path: task.string("cert_path")?,
            validation: task.string("cert_validation")?,
            ca_cert_dir: task.string("ca_cert_dir")?,
            bundle_path: task.string("ca_certs_bundle_path")?,
        })
    }
}

/// How to check a package file's signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageVerification {
    pub public_key_url: String,
    pub public_key_filename: String,
    pub keyring_dir: String,
    pub policy_dir: String,
    pub policy_filename: String,
    pub policy_contents: String,
    pub verify_tls: bool,
}

impl PackageVerification {
    /// Read from a task's `verify` section.
    pub fn from_section(verify: &TaskConfig<'_>, verify_tls: bool) -> Result<Self> {
        Ok(Self {
            public_key_url: verify.string("public_key_url")?,
            public_key_filename: verify.string("public_key_filename")?,
            keyring_dir: verify.string("debsig_keyring_dir")?,
            policy_dir: verify.string("debsig_policy_dir")?,
            policy_filename: verify.string("debsig_policy_filename")?,
            policy_contents: verify.string("debsig_policy_contents")?,
            verify_tls,
        })
    }
}

/// `curl` command fetching `url` to `dest` on the host.
pub(crate) fn download_cmd(url: &str, dest: &str, verify_tls: bool) -> String {
    format!(
        "curl -fsSL{} {} -o {}",
        if verify_tls { "" } else { " --insecure" },
        shell_quote(url),
        shell_quote(dest)
    )
}

/// Capabilities every supported distribution provides.
///
/// Command builders receive arguments already shell-quoted.
pub trait PackageManager {
    fn update_packages_cmd(&self) -> String;

    fn install_packages_cmd(&self, packages: &str) -> String;

    fn install_local_packages_cmd(&self, packages: &str) -> String;

    fn remove_packages_cmd(&self, packages: &str) -> String;

    /// Package architecture of the host, e.g. `amd64`.
    fn architecture(&self, exec: &dyn RemoteExecutor) -> Result<String>;

    /// Release codename of the host, e.g. `bookworm`.
    fn release(&self, exec: &dyn RemoteExecutor) -> Result<String>;

    /// Install the signing key and the rendered repository source file.
    fn add_repo_impl(&self, exec: &dyn RemoteExecutor, repo: &RepoSpec, contents: &str)
    -> Result<()>;

    /// Install a CA certificate already present on the host.
    ///
    /// Returns whether the certificate shows up in the rebuilt bundle.
    fn install_cert(&self, exec: &dyn RemoteExecutor, cert: &CertSpec) -> Result<bool>;

    /// Check the signature of a package file already on the host.
    fn verify_package(
        &self,
        exec: &dyn RemoteExecutor,
        package_path: &str,
        verify: &PackageVerification,
    ) -> Result<bool>;

    /// Refresh package indexes then run one package command.
    fn apply_packages_command(
        &self,
        exec: &dyn RemoteExecutor,
        command: PackageCommand,
        packages: &[String],
        local: bool,
    ) -> Result<()> {
        let joined = quote_all(packages);
        let cmd = match command {
            PackageCommand::Install if local => self.install_local_packages_cmd(&joined),
            PackageCommand::Install => self.install_packages_cmd(&joined),
            PackageCommand::Remove => self.remove_packages_cmd(&joined),
        };

        exec.run_checked(&self.update_packages_cmd())?;
        exec.run_checked(&cmd)?;
        info!(host = %exec.host(), package_command = %command, packages = ?packages, "Success");
        Ok(())
    }

    fn install_package(&self, exec: &dyn RemoteExecutor, packages: &[String]) -> Result<()> {
        self.apply_packages_command(exec, PackageCommand::Install, packages, false)
    }

    fn install_local_package(&self, exec: &dyn RemoteExecutor, paths: &[String]) -> Result<()> {
        self.apply_packages_command(exec, PackageCommand::Install, paths, true)
    }

    fn remove_package(&self, exec: &dyn RemoteExecutor, packages: &[String]) -> Result<()> {
        self.apply_packages_command(exec, PackageCommand::Remove, packages, false)
    }

    /// Render the repository template for this host and install the repo.
    ///
    /// Returns the rendered source file contents.
    fn add_repo(&self, exec: &dyn RemoteExecutor, repo: &RepoSpec) -> Result<String> {
        let vars = HashMap::from([
            ("architecture", self.architecture(exec)?),
            ("release", self.release(exec)?),
        ]);
        let contents = substitute(&repo.repo_file_template, &vars);
        self.add_repo_impl(exec, repo, &contents)?;
        info!(host = %exec.host(), repo = %repo.repo_file_name, "Repository added");
        Ok(contents)
    }

    fn add_user_to_group(
        &self,
        exec: &dyn RemoteExecutor,
        user: &str,
        groups: &[String],
    ) -> Result<()> {
        for group in groups {
            exec.run_checked(&format!(
                "usermod -aG {} {}",
                shell_quote(group),
                shell_quote(user)
            ))?;
            info!(host = %exec.host(), user = %user, group = %group, "User added to group");
        }
        Ok(())
    }

    /// Whether any certificate subject in the bundle contains `validation`.
    fn is_cert_in_cert_bundle(
        &self,
        exec: &dyn RemoteExecutor,
        bundle_path: &str,
        validation: &str,
    ) -> Result<bool> {
        let cmd = format!(
            "awk -v cmd='openssl x509 -noout -subject' '/BEGIN/{{close(cmd)}};{{print | cmd}}' < {} | grep -i {}",
            shell_quote(bundle_path),
            shell_quote(validation)
        );
        let output = exec.run(&cmd)?;
        let found = output
            .stdout
            .to_lowercase()
            .contains(&validation.to_lowercase());
        if found {
            info!(host = %exec.host(), bundle = %bundle_path, "CA cert was found in bundle");
        } else {
            error!(
                host = %exec.host(),
                bundle = %bundle_path,
                stdout = %output.stdout.trim(),
                stderr = %output.stderr.trim(),
                "Unable to find CA cert in certificate bundle"
            );
        }
        Ok(found)
    }
}

/// The supported distributions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Distribution {
    Debian(Debian),
}

impl Distribution {
    pub fn for_distro(distro: Distro) -> Self {
        match distro {
            Distro::Debian => Distribution::Debian(Debian),
        }
    }

    pub fn distro(&self) -> Distro {
        match self {
            Distribution::Debian(_) => Distro::Debian,
        }
    }
}

impl PackageManager for Distribution {
    fn update_packages_cmd(&self) -> String {
        match self {
            Distribution::Debian(d) => d.update_packages_cmd(),
        }
    }

    fn install_packages_cmd(&self, packages: &str) -> String {
        match self {
            Distribution::Debian(d) => d.install_packages_cmd(packages),
        }
    }

    fn install_local_packages_cmd(&self, packages: &str) -> String {
        match self {
            Distribution::Debian(d) => d.install_local_packages_cmd(packages),
        }
    }

    fn remove_packages_cmd(&self, packages: &str) -> String {
        match self {
            Distribution::Debian(d) => d.remove_packages_cmd(packages),
        }
    }

    fn architecture(&self, exec: &dyn RemoteExecutor) -> Result<String> {
        match self {
            Distribution::Debian(d) => d.architecture(exec),
        }
    }

    fn release(&self, exec: &dyn RemoteExecutor) -> Result<String> {
        match self {
            Distribution::Debian(d) => d.release(exec),
        }
    }

    fn add_repo_impl(
        &self,
        exec: &dyn RemoteExecutor,
        repo: &RepoSpec,
        contents: &str,
    ) -> Result<()> {
        match self {
            Distribution::Debian(d) => d.add_repo_impl(exec, repo, contents),
        }
    }

    fn install_cert(&self, exec: &dyn RemoteExecutor, cert: &CertSpec) -> Result<bool> {
        match self {
            Distribution::Debian(d) => d.install_cert(exec, cert),
        }
    }

    fn verify_package(
        &self,
        exec: &dyn RemoteExecutor,
        package_path: &str,
        verify: &PackageVerification,
    ) -> Result<bool> {
        match self {
            Distribution::Debian(d) => d.verify_package(exec, package_path, verify),
        }
    }
}
