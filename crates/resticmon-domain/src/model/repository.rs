//! Repository - A backup destination and the policy that judges it
//!
//! RepositoryDescriptor is an Entity: its label identifies it across
//! invocations even when the location or thresholds change.

/// Unique identifier for a repository (the key in the configuration mapping)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepositoryLabel(String);

impl RepositoryLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for RepositoryLabel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Secret material needed to open a repository
///
/// `Debug` never prints the secret values.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Repository password only
    Password(String),
    /// Object-store access keys plus the repository password (s3:, b2:)
    ObjectStore {
        key_id: String,
        application_key: String,
        password: String,
    },
}

impl Credential {
    /// The repository encryption password
    pub fn password(&self) -> &str {
        match self {
            Credential::Password(password) => password,
            Credential::ObjectStore { password, .. } => password,
        }
    }
}

impl core::fmt::Debug for Credential {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Credential::Password(_) => f.write_str("Password(<redacted>)"),
            Credential::ObjectStore { key_id, .. } => f
                .debug_struct("ObjectStore")
                .field("key_id", key_id)
                .field("application_key", &"<redacted>")
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

/// Where a repository lives and how to open it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Backend-specific address, opaque to the domain
    pub location: String,
    pub credential: Credential,
}

impl Endpoint {
    pub fn new(location: impl Into<String>, credential: Credential) -> Self {
        Self {
            location: location.into(),
            credential,
        }
    }
}

/// Errors raised when building an age policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// The minimum age exceeds the maximum age
    InvertedThresholds { min_age_days: u32, max_age_days: u32 },
}

impl core::fmt::Display for PolicyError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PolicyError::InvertedThresholds {
                min_age_days,
                max_age_days,
            } => write!(
                f,
                "min_age ({} days) must not exceed max_age ({} days)",
                min_age_days, max_age_days
            ),
        }
    }
}

/// Age thresholds, in whole days
///
/// - `min_age_days`: the newest snapshot must be no older than this
/// - `max_age_days`: older snapshots are prune-eligible, and at least one
///   snapshot must be no older than this
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgePolicy {
    min_age_days: u32,
    max_age_days: u32,
}

impl AgePolicy {
    /// Build a policy, enforcing `min_age_days <= max_age_days`
    pub fn new(min_age_days: u32, max_age_days: u32) -> Result<Self, PolicyError> {
        if min_age_days > max_age_days {
            return Err(PolicyError::InvertedThresholds {
                min_age_days,
                max_age_days,
            });
        }
        Ok(Self {
            min_age_days,
            max_age_days,
        })
    }

    pub fn min_age_days(&self) -> u32 {
        self.min_age_days
    }

    pub fn max_age_days(&self) -> u32 {
        self.max_age_days
    }
}

/// Everything needed to operate on one repository
#[derive(Debug, Clone)]
pub struct RepositoryDescriptor {
    pub label: RepositoryLabel,
    pub endpoint: Endpoint,
    pub policy: AgePolicy,
    /// Paths to back up, in configuration order
    pub includes: Vec<String>,
    /// Patterns to leave out of backups
    pub excludes: Vec<String>,
    /// Source repository when this one is a copy of another
    pub copy_from: Option<Endpoint>,
}

impl RepositoryDescriptor {
    /// Create a descriptor that backs up `includes`
    pub fn new(
        label: RepositoryLabel,
        endpoint: Endpoint,
        policy: AgePolicy,
        includes: Vec<String>,
    ) -> Self {
        Self {
            label,
            endpoint,
            policy,
            includes,
            excludes: Vec::new(),
            copy_from: None,
        }
    }

    /// Builder: set exclude patterns
    pub fn with_excludes(mut self, excludes: Vec<String>) -> Self {
        self.excludes = excludes;
        self
    }

    /// Builder: make this repository a copy of `source`
    pub fn with_copy_from(mut self, source: Endpoint) -> Self {
        self.copy_from = Some(source);
        self
    }

    pub fn location(&self) -> &str {
        &self.endpoint.location
    }

    pub fn is_copy(&self) -> bool {
        self.copy_from.is_some()
    }
}
