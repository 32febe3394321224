//! Command construction - Argument lists and environment for each restic call
//!
//! Secrets only ever travel through the environment, never through
//! arguments, so they do not show up in process listings.

use std::path::{Path, PathBuf};

use resticmon_domain::{Credential, Endpoint, RepositoryDescriptor, SnapshotId};

use super::invocation::Invocation;

/// Always left out of backups
pub const ALWAYS_EXCLUDED: &str = "lost+found";

#[derive(Debug, Clone)]
pub struct CommandBuilder {
    binary: PathBuf,
}

impl CommandBuilder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn init(&self, repo: &RepositoryDescriptor) -> Invocation {
        let invocation = self.for_repository(repo).arg("init");
        match &repo.copy_from {
            Some(source) => with_source(invocation, source)
                .args(["--from-repo", source.location.as_str(), "--copy-chunker-params"]),
            None => invocation,
        }
    }

    pub fn snapshots(&self, repo: &RepositoryDescriptor) -> Invocation {
        self.for_repository(repo).args(["snapshots", "--json"])
    }

    /// `backup` for a regular repository, `copy` for a duplicate
    pub fn create(&self, repo: &RepositoryDescriptor) -> Invocation {
        match &repo.copy_from {
            Some(source) => with_source(self.for_repository(repo), source)
                .args(["copy", "--from-repo", source.location.as_str()]),
            None => {
                let mut invocation = self
                    .for_repository(repo)
                    .arg("backup")
                    .arg(format!("--exclude={}", ALWAYS_EXCLUDED));
                for pattern in &repo.excludes {
                    invocation = invocation.arg(format!("--exclude={}", pattern));
                }
                invocation.arg("--").args(expand_includes(&repo.includes))
            }
        }
    }

    pub fn forget(&self, repo: &RepositoryDescriptor, id: &SnapshotId) -> Invocation {
        self.for_repository(repo).args(["forget", id.as_str()])
    }

    pub fn prune(&self, repo: &RepositoryDescriptor) -> Invocation {
        self.for_repository(repo).arg("prune")
    }

    pub fn check(&self, repo: &RepositoryDescriptor) -> Invocation {
        self.for_repository(repo).args(["check", "--read-data"])
    }

    pub fn unlock(&self, repo: &RepositoryDescriptor) -> Invocation {
        self.for_repository(repo).arg("unlock")
    }

    pub fn self_update(&self) -> Invocation {
        Invocation::new(&self.binary).arg("self-update")
    }

    fn for_repository(&self, repo: &RepositoryDescriptor) -> Invocation {
        let invocation = Invocation::new(&self.binary).args(["--repo", repo.location()]);
        with_endpoint(invocation, &repo.endpoint, "RESTIC_PASSWORD")
    }
}

/// Credentials of the source repository of a copy
///
/// Object-store keys share variable names with the destination, so the
/// destination's keys are re-applied afterwards and take precedence.
fn with_source(invocation: Invocation, source: &Endpoint) -> Invocation {
    let destination: Vec<(String, String)> = invocation.env.clone();
    let mut invocation = with_endpoint(invocation, source, "RESTIC_FROM_PASSWORD");
    for (key, value) in destination.into_iter().filter(|(k, _)| k != "RESTIC_PASSWORD") {
        invocation = invocation.env(key, value);
    }
    invocation
}

fn with_endpoint(invocation: Invocation, endpoint: &Endpoint, password_var: &str) -> Invocation {
    let invocation = invocation.env(password_var, endpoint.credential.password());
    match &endpoint.credential {
        Credential::Password(_) => invocation,
        Credential::ObjectStore {
            key_id,
            application_key,
            ..
        } => {
            if endpoint.location.starts_with("b2:") {
                invocation
                    .env("B2_ACCOUNT_ID", key_id.as_str())
                    .env("B2_ACCOUNT_KEY", application_key.as_str())
            } else {
                invocation
                    .env("AWS_ACCESS_KEY_ID", key_id.as_str())
                    .env("AWS_SECRET_ACCESS_KEY", application_key.as_str())
            }
        }
    }
}

/// Expand shell-style wildcards in include paths
///
/// Patterns without a match are passed on unchanged, as a shell would.
pub fn expand_includes(includes: &[String]) -> Vec<String> {
    let mut expanded = Vec::with_capacity(includes.len());
    for include in includes {
        if !include.contains(['*', '?', '[']) {
            expanded.push(include.clone());
            continue;
        }
        let matches: Vec<String> = match glob::glob(include) {
            Ok(paths) => paths
                .filter_map(Result::ok)
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        };
        if matches.is_empty() {
            expanded.push(include.clone());
        } else {
            expanded.extend(matches);
        }
    }
    expanded
}

#[cfg(test)]
mod tests {
    use super::*;
    use resticmon_domain::{AgePolicy, RepositoryLabel};

    fn builder() -> CommandBuilder {
        CommandBuilder::new("/usr/local/bin/restic")
    }

    fn home() -> RepositoryDescriptor {
        RepositoryDescriptor::new(
            RepositoryLabel::new("home"),
            Endpoint::new("/srv/restic/home", Credential::Password("hunter2".into())),
            AgePolicy::new(1, 30).unwrap(),
            vec!["/home".into(), "/etc".into()],
        )
        .with_excludes(vec!["*.cache".into()])
    }

    fn offsite() -> RepositoryDescriptor {
        RepositoryDescriptor::new(
            RepositoryLabel::new("offsite"),
            Endpoint::new(
                "b2:backups:home",
                Credential::ObjectStore {
                    key_id: "0012ab".into(),
                    application_key: "K001secret".into(),
                    password: "offsite-pw".into(),
                },
            ),
            AgePolicy::new(2, 90).unwrap(),
            vec![],
        )
        .with_copy_from(home().endpoint)
    }

    #[test]
    fn test_snapshots() {
        let invocation = builder().snapshots(&home());
        assert_eq!(invocation.program, PathBuf::from("/usr/local/bin/restic"));
        assert_eq!(invocation.args, vec!["--repo", "/srv/restic/home", "snapshots", "--json"]);
        assert_eq!(invocation.env_value("RESTIC_PASSWORD"), Some("hunter2"));
    }

    #[test]
    fn test_backup() {
        let invocation = builder().create(&home());
        assert_eq!(
            invocation.args,
            vec![
                "--repo",
                "/srv/restic/home",
                "backup",
                "--exclude=lost+found",
                "--exclude=*.cache",
                "--",
                "/home",
                "/etc"
            ]
        );
        assert!(!invocation.args.iter().any(|a| a.contains("hunter2")));
    }

    #[test]
    fn test_backup_includes_follow_separator() {
        let repo = RepositoryDescriptor::new(
            RepositoryLabel::new("odd"),
            Endpoint::new("/srv/restic/odd", Credential::Password("pw".into())),
            AgePolicy::new(1, 7).unwrap(),
            vec!["--dry-run".into()],
        );
        let args = builder().create(&repo).args;
        let separator = args.iter().position(|a| a == "--").unwrap();
        assert_eq!(&args[separator + 1..], ["--dry-run"]);
    }

    #[test]
    fn test_copy_uses_source_repository() {
        let invocation = builder().create(&offsite());
        assert_eq!(
            invocation.args,
            vec!["--repo", "b2:backups:home", "copy", "--from-repo", "/srv/restic/home"]
        );
        assert_eq!(invocation.env_value("RESTIC_PASSWORD"), Some("offsite-pw"));
        assert_eq!(invocation.env_value("RESTIC_FROM_PASSWORD"), Some("hunter2"));
        assert_eq!(invocation.env_value("B2_ACCOUNT_ID"), Some("0012ab"));
        assert_eq!(invocation.env_value("B2_ACCOUNT_KEY"), Some("K001secret"));
    }

    #[test]
    fn test_init_copy_shares_chunker_params() {
        let invocation = builder().init(&offsite());
        assert_eq!(
            invocation.args,
            vec![
                "--repo",
                "b2:backups:home",
                "init",
                "--from-repo",
                "/srv/restic/home",
                "--copy-chunker-params"
            ]
        );
        assert_eq!(builder().init(&home()).args, vec!["--repo", "/srv/restic/home", "init"]);
    }

    #[test]
    fn test_s3_credentials() {
        let repo = RepositoryDescriptor::new(
            RepositoryLabel::new("s3"),
            Endpoint::new(
                "s3:s3.amazonaws.com/bucket",
                Credential::ObjectStore {
                    key_id: "AKIA".into(),
                    application_key: "secret".into(),
                    password: "pw".into(),
                },
            ),
            AgePolicy::new(1, 7).unwrap(),
            vec!["/data".into()],
        );
        let invocation = builder().unlock(&repo);
        assert_eq!(invocation.env_value("AWS_ACCESS_KEY_ID"), Some("AKIA"));
        assert_eq!(invocation.env_value("AWS_SECRET_ACCESS_KEY"), Some("secret"));
        assert_eq!(invocation.env_value("RESTIC_PASSWORD"), Some("pw"));
    }

    #[test]
    fn test_maintenance_commands() {
        let id = SnapshotId::new("4bba301e");
        assert_eq!(
            builder().forget(&home(), &id).args,
            vec!["--repo", "/srv/restic/home", "forget", "4bba301e"]
        );
        assert_eq!(builder().prune(&home()).args, vec!["--repo", "/srv/restic/home", "prune"]);
        assert_eq!(
            builder().check(&home()).args,
            vec!["--repo", "/srv/restic/home", "check", "--read-data"]
        );
        assert_eq!(builder().self_update().args, vec!["self-update"]);
        assert!(builder().self_update().env.is_empty());
    }

    #[test]
    fn test_expand_includes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("a")).unwrap();
        std::fs::create_dir(dir.path().join("b")).unwrap();
        let pattern = format!("{}/*", dir.path().display());
        let missing = format!("{}/nothing-*", dir.path().display());

        let expanded = expand_includes(&["/etc".to_string(), pattern, missing.clone()]);
        assert_eq!(
            expanded,
            vec![
                "/etc".to_string(),
                format!("{}/a", dir.path().display()),
                format!("{}/b", dir.path().display()),
                missing,
            ]
        );
    }
}
