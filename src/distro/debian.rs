//! Debian and derivatives: apt, dpkg and debsig-verify.

use super::{CertSpec, PackageManager, PackageVerification, RepoSpec, download_cmd};
use crate::error::Result;
use crate::remote::{RemoteExecutor, shell_quote};
use tracing::{info, warn};

const REMOTE_TMP_DIR: &str = "/var/tmp";
const TRUSTED_GPG_DIR: &str = "/etc/apt/trusted.gpg.d";
const SOURCES_LIST_DIR: &str = "/etc/apt/sources.list.d";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Debian;

impl PackageManager for Debian {
    fn update_packages_cmd(&self) -> String {
        "apt-get update".to_string()
    }

    fn install_packages_cmd(&self, packages: &str) -> String {
        format!("apt-get install -y {}", packages)
    }

    fn install_local_packages_cmd(&self, packages: &str) -> String {
        self.install_packages_cmd(packages)
    }

    fn remove_packages_cmd(&self, packages: &str) -> String {
        format!("apt-get remove -y --purge {}", packages)
    }

    fn architecture(&self, exec: &dyn RemoteExecutor) -> Result<String> {
        let output = exec.run_checked("dpkg --print-architecture")?;
        Ok(output.stdout.trim().to_string())
    }

    fn release(&self, exec: &dyn RemoteExecutor) -> Result<String> {
        let output = exec.run_checked("lsb_release -cs")?;
        Ok(output.stdout.trim().to_string())
    }

    fn add_repo_impl(
        &self,
        exec: &dyn RemoteExecutor,
        repo: &RepoSpec,
        contents: &str,
    ) -> Result<()> {
        // Signing key
        let key_download = format!("{}/{}", REMOTE_TMP_DIR, repo.key_file_name);
        exec.run_checked(&download_cmd(&repo.key_url, &key_download, repo.verify_tls))?;
        let key_tmp = shell_quote(&key_download);
        let key_target = shell_quote(&format!("{}/{}", TRUSTED_GPG_DIR, repo.key_file_name));
        exec.run_checked(&format!("rm -f {}", key_target))?;
        exec.run_checked(&format!("gpg --dearmor -o {} {}", key_target, key_tmp))?;
        exec.run_checked(&format!("rm -f {}", key_tmp))?;

        // sources.list.d entry
        let repo_tmp = format!("{}/{}", REMOTE_TMP_DIR, repo.repo_file_name);
        let repo_target = shell_quote(&format!("{}/{}", SOURCES_LIST_DIR, repo.repo_file_name));
        exec.put(contents.as_bytes(), &repo_tmp)?;
        exec.run_checked(&format!("mv -f {} {}", shell_quote(&repo_tmp), repo_target))?;
        exec.run_checked(&format!("chown root: {}", repo_target))?;
        exec.run_checked(&self.update_packages_cmd())?;
        Ok(())
    }

    fn install_cert(&self, exec: &dyn RemoteExecutor, cert: &CertSpec) -> Result<bool> {
        exec.run_checked(&format!(
            "mv -f {} {}",
            shell_quote(&cert.cert_path),
            shell_quote(&cert.ca_cert_dir)
        ))?;
        exec.run_checked("update-ca-certificates -f")?;
        self.is_cert_in_cert_bundle(exec, &cert.bundle_path, &cert.validation)
    }

    fn verify_package(
        &self,
        exec: &dyn RemoteExecutor,
        package_path: &str,
        verify: &PackageVerification,
    ) -> Result<bool> {
        // Maintainer public key
        let public_key_path = format!("{}/{}", REMOTE_TMP_DIR, verify.public_key_filename);
        exec.run_checked(&download_cmd(
            &verify.public_key_url,
            &public_key_path,
            verify.verify_tls,
        ))?;

        for dir in [&verify.keyring_dir, &verify.policy_dir] {
            exec.run_checked(&format!("rm -rf {}", shell_quote(dir)))?;
            exec.run_checked(&format!("mkdir -p {}", shell_quote(dir)))?;
        }

        // GPGv1 keys need an existing empty keyring to import into
        let keyring_path = shell_quote(&format!("{}/debsig.gpg", verify.keyring_dir));
        exec.run_checked(&format!("touch {}", keyring_path))?;
        exec.run_checked(&format!(
            "gpg --no-default-keyring --keyring {} --import {}",
            keyring_path,
            shell_quote(&public_key_path)
        ))?;

        let policy_path = format!("{}/{}", verify.policy_dir, verify.policy_filename);
        exec.put(verify.policy_contents.as_bytes(), &policy_path)?;
        exec.run_checked(&format!("chown root: {}", shell_quote(&policy_path)))?;

        let output = exec.run(&format!("debsig-verify {}", shell_quote(package_path)))?;
        exec.run_checked(&format!("rm -f {}", shell_quote(&public_key_path)))?;

        if output.succeeded() {
            info!(host = %exec.host(), package = %package_path, "Package signature verified");
        } else {
            warn!(
                host = %exec.host(),
                package = %package_path,
                exit_code = output.exit_code,
                stderr = %output.stderr.trim(),
                "Package signature verification failed"
            );
        }
        Ok(output.succeeded())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{CommandOutput, Recorded, RecordingExecutor};

    fn verification() -> PackageVerification {
        PackageVerification {
            public_key_url: "https://example.com/signing.key".into(),
            public_key_filename: "signing.key".into(),
            keyring_dir: "/usr/share/debsig/keyrings/ABC".into(),
            policy_dir: "/etc/debsig/policies/ABC".into(),
            policy_filename: "zoom.pol".into(),
            policy_contents: "<Policy/>".into(),
            verify_tls: true,
        }
    }

    #[test]
    fn test_package_commands() {
        assert_eq!(Debian.install_packages_cmd("git vim"), "apt-get install -y git vim");
        assert_eq!(
            Debian.install_local_packages_cmd("/var/tmp/x.deb"),
            "apt-get install -y /var/tmp/x.deb"
        );
        assert_eq!(Debian.remove_packages_cmd("nano"), "apt-get remove -y --purge nano");
    }

    #[test]
    fn test_architecture_and_release_are_trimmed() {
        let exec = RecordingExecutor::new("web1")
            .with_reply("dpkg", CommandOutput::success("arm64\n"))
            .with_reply("lsb_release", CommandOutput::success("bullseye\n"));
        assert_eq!(Debian.architecture(&exec).unwrap(), "arm64");
        assert_eq!(Debian.release(&exec).unwrap(), "bullseye");
    }

    #[test]
    fn test_add_repo_impl_writes_source_file() {
        let exec = RecordingExecutor::new("web1");
        let repo = RepoSpec {
            key_url: "https://example.com/key.asc".into(),
            key_file_name: "example.gpg".into(),
            repo_file_name: "example.list".into(),
            repo_file_template: "deb https://example.com $release main\n".into(),
            verify_tls: true,
        };
        Debian
            .add_repo_impl(&exec, &repo, "deb https://example.com stable main\n")
            .unwrap();

        let recorded = exec.recorded();
        assert_eq!(
            recorded[0],
            Recorded::Command("curl -fsSL https://example.com/key.asc -o /var/tmp/example.gpg".into())
        );
        assert!(recorded.contains(&Recorded::Upload {
            path: "/var/tmp/example.list".into(),
            contents: "deb https://example.com stable main\n".into(),
        }));
        assert!(recorded.contains(&Recorded::Command(
            "gpg --dearmor -o /etc/apt/trusted.gpg.d/example.gpg /var/tmp/example.gpg".into()
        )));
        assert_eq!(
            recorded.last(),
            Some(&Recorded::Command("apt-get update".into()))
        );
    }

    #[test]
    fn test_verify_package() {
        let exec = RecordingExecutor::new("web1");
        assert!(Debian.verify_package(&exec, "/var/tmp/zoom.deb", &verification()).unwrap());
        assert!(exec.commands().contains(&"debsig-verify /var/tmp/zoom.deb".to_string()));
        assert!(exec.recorded().contains(&Recorded::Upload {
            path: "/etc/debsig/policies/ABC/zoom.pol".into(),
            contents: "<Policy/>".into(),
        }));

        let exec = RecordingExecutor::new("web1")
            .with_reply("debsig-verify", CommandOutput::failure(13, "BAD SIGNATURE"));
        assert!(!Debian.verify_package(&exec, "/var/tmp/zoom.deb", &verification()).unwrap());
    }

    #[test]
    fn test_install_cert() {
        let cert = CertSpec {
            cert_path: "/var/tmp/corp.crt".into(),
            validation: "corp root".into(),
            ca_cert_dir: "/usr/local/share/ca-certificates/corp".into(),
            bundle_path: "/etc/ssl/certs/ca-certificates.crt".into(),
        };
        let exec = RecordingExecutor::new("web1")
            .with_reply("awk", CommandOutput::success("subject=CN = Corp Root\n"));

        assert!(Debian.install_cert(&exec, &cert).unwrap());
        assert_eq!(
            &exec.commands()[..2],
            &[
                "mv -f /var/tmp/corp.crt /usr/local/share/ca-certificates/corp".to_string(),
                "update-ca-certificates -f".to_string()
            ]
        );
    }
}
