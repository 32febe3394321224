//! Configuration - The YAML repository file (`backup.yml`)
//!
//! ```yaml
//! restic_binary_location: /usr/local/bin/restic
//! repos:
//!   home:
//!     location: /srv/restic/home
//!     key: correct-horse-battery-staple
//!     min_age: 1
//!     max_age: 30
//!     includes: [/home, /etc]
//!     excludes: ["*.cache"]
//!   offsite:
//!     location: b2:backups:home
//!     key: {keyID: "...", applicationKey: "...", password: "..."}
//!     min_age: 2
//!     max_age: 90
//!     duplicate: home
//! ```

use std::path::{Path, PathBuf};

use resticmon_domain::{AgePolicy, Credential, Endpoint, RepositoryDescriptor, RepositoryLabel};
use serde::{de, Deserialize, Deserializer};
use serde_yaml::{Mapping, Value};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_CONFIG_FILE: &str = "backup.yml";

/// Configuration could not be used; nothing has touched a repository yet
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file {} does not exist", .0.display())]
    Missing(PathBuf),

    #[error("Error reading the configuration file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error parsing the configuration file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Repository {label} absent from {}", path.display())]
    UnknownRepository { label: String, path: PathBuf },

    #[error("Repository {label}: {reason}")]
    InvalidRepository { label: String, reason: String },

    #[error("No repositories declared in {}", .0.display())]
    Empty(PathBuf),
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    restic_binary_location: PathBuf,
    /// Kept as a mapping so repositories stay in file order
    #[serde(default)]
    repos: Mapping,
}

#[derive(Debug, Deserialize)]
struct RawRepository {
    location: Scalar,
    key: RawKey,
    min_age: Scalar,
    max_age: Scalar,
    #[serde(default)]
    includes: Vec<Scalar>,
    #[serde(default)]
    excludes: Vec<Scalar>,
    #[serde(default)]
    duplicate: Option<Scalar>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawKey {
    Password(Scalar),
    ObjectStore {
        #[serde(rename = "keyID")]
        key_id: Scalar,
        #[serde(rename = "applicationKey")]
        application_key: Scalar,
        password: Scalar,
    },
}

/// Any YAML scalar, read as text
///
/// `key: 123456` or `location: 2024` are as valid as their quoted forms.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Scalar(String);

impl Scalar {
    fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(text) => Ok(Scalar(text)),
            Value::Number(number) => Ok(Scalar(number.to_string())),
            Value::Bool(flag) => Ok(Scalar(flag.to_string())),
            _ => Err(de::Error::custom("expected a text, number or boolean value")),
        }
    }
}

fn texts(scalars: &[Scalar]) -> Vec<String> {
    scalars.iter().map(|s| s.0.clone()).collect()
}

/// Ages may be written as numbers or as quoted numbers
fn days(value: &Scalar, field: &str, label: &str) -> Result<u32, ConfigError> {
    value.as_str().trim().parse().map_err(|_| ConfigError::InvalidRepository {
        label: label.to_string(),
        reason: format!("{} must be a whole number of days, got '{}'", field, value.as_str()),
    })
}

/// Loaded and validated configuration
///
/// Passed explicitly to whoever needs it; there is no global instance.
#[derive(Debug, Clone)]
pub struct Config {
    pub restic_binary: PathBuf,
    /// Repositories in the order the file declares them
    pub repositories: Vec<RepositoryDescriptor>,
    origin: PathBuf,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::Missing(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content, path)
    }

    /// Parse configuration text; `origin` is only used in messages
    pub fn from_yaml_str(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        if raw.repos.is_empty() {
            return Err(ConfigError::Empty(origin.to_path_buf()));
        }

        let mut declared: Vec<(String, RawRepository)> = Vec::with_capacity(raw.repos.len());
        for (key, value) in raw.repos {
            let Scalar(label) = serde_yaml::from_value(key).map_err(|source| ConfigError::Parse {
                path: origin.to_path_buf(),
                source,
            })?;
            let repo = serde_yaml::from_value(value).map_err(|err| ConfigError::InvalidRepository {
                label: label.clone(),
                reason: err.to_string(),
            })?;
            declared.push((label, repo));
        }

        let mut repositories = Vec::with_capacity(declared.len());
        for (label, repo) in &declared {
            repositories.push(build_repository(label, repo, &declared)?);
        }
        debug!(path = %origin.display(), repositories = repositories.len(), "configuration loaded");

        Ok(Self {
            restic_binary: raw.restic_binary_location,
            repositories,
            origin: origin.to_path_buf(),
        })
    }

    /// Find a repository by label
    pub fn repository(&self, label: &str) -> Result<&RepositoryDescriptor, ConfigError> {
        self.repositories
            .iter()
            .find(|r| r.label.as_str() == label)
            .ok_or_else(|| ConfigError::UnknownRepository {
                label: label.to_string(),
                path: self.origin.clone(),
            })
    }

    /// The named repository, or every repository when no label is given
    pub fn select(&self, label: Option<&str>) -> Result<Vec<&RepositoryDescriptor>, ConfigError> {
        match label {
            Some(label) => Ok(vec![self.repository(label)?]),
            None => Ok(self.repositories.iter().collect()),
        }
    }

    pub fn labels(&self) -> Vec<&str> {
        self.repositories.iter().map(|r| r.label.as_str()).collect()
    }
}

fn build_repository(
    label: &str,
    raw: &RawRepository,
    all: &[(String, RawRepository)],
) -> Result<RepositoryDescriptor, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidRepository {
        label: label.to_string(),
        reason,
    };

    let min_age = days(&raw.min_age, "min_age", label)?;
    let max_age = days(&raw.max_age, "max_age", label)?;
    let policy = AgePolicy::new(min_age, max_age).map_err(|e| invalid(e.to_string()))?;
    let primary = endpoint(label, raw)?;

    let mut repository = RepositoryDescriptor::new(
        RepositoryLabel::new(label),
        primary,
        policy,
        texts(&raw.includes),
    )
    .with_excludes(texts(&raw.excludes));

    match raw.duplicate.as_ref().map(Scalar::as_str) {
        Some(source_label) => {
            let source = all
                .iter()
                .find(|(declared, _)| declared == source_label)
                .map(|(_, repo)| repo)
                .ok_or_else(|| {
                    invalid(format!("duplicate refers to unknown repository {}", source_label))
                })?;
            if source_label == label {
                return Err(invalid("a repository cannot duplicate itself".to_string()));
            }
            if source.duplicate.is_some() {
                return Err(invalid(format!(
                    "duplicate source {} is itself a duplicate",
                    source_label
                )));
            }
            repository = repository.with_copy_from(endpoint(source_label, source)?);
        }
        None if raw.includes.is_empty() => {
            return Err(invalid("includes must list at least one path".to_string()));
        }
        None => {}
    }

    Ok(repository)
}

fn endpoint(label: &str, raw: &RawRepository) -> Result<Endpoint, ConfigError> {
    let location = raw.location.as_str();
    let credential = match &raw.key {
        RawKey::Password(password) => Credential::Password(password.as_str().to_string()),
        RawKey::ObjectStore {
            key_id,
            application_key,
            password,
        } => {
            if !(location.starts_with("s3:") || location.starts_with("b2:")) {
                return Err(ConfigError::InvalidRepository {
                    label: label.to_string(),
                    reason: "keyID/applicationKey credentials need an s3: or b2: location"
                        .to_string(),
                });
            }
            Credential::ObjectStore {
                key_id: key_id.as_str().to_string(),
                application_key: application_key.as_str().to_string(),
                password: password.as_str().to_string(),
            }
        }
    };
    Ok(Endpoint::new(location, credential))
}
