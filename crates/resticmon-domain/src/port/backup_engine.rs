//! Backup Engine - Abstract access to the external backup tool
//!
//! Every call is blocking and happens exactly once; retries and timeouts
//! belong to whoever runs the process.

use crate::model::repository::RepositoryDescriptor;
use crate::model::snapshot::{SnapshotId, SnapshotRecord};

/// Raw output captured from the backup tool
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    pub stdout: String,
    pub stderr: String,
}

impl Transcript {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Concatenate another transcript onto this one
    pub fn append(&mut self, other: &Transcript) {
        push_block(&mut self.stdout, &other.stdout);
        push_block(&mut self.stderr, &other.stderr);
    }

    pub fn is_empty(&self) -> bool {
        self.stdout.trim().is_empty() && self.stderr.trim().is_empty()
    }
}

fn push_block(target: &mut String, block: &str) {
    if block.is_empty() {
        return;
    }
    if !target.is_empty() && !target.ends_with('\n') {
        target.push('\n');
    }
    target.push_str(block);
}

/// Snapshots of one repository, in the order the tool reported them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    pub snapshots: Vec<SnapshotRecord>,
    pub transcript: Transcript,
}

/// Outcome of a content verification that ran to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationResult {
    /// No problems found
    Clean,
    /// The repository is readable but the tool reported anomalies
    Degraded { findings: Vec<String> },
    /// Stored data does not match its recorded content
    Mismatch { findings: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub result: VerificationResult,
    pub transcript: Transcript,
}

/// The backup tool could not complete an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    /// The tool could not be started at all
    Unavailable { operation: String, reason: String },
    /// The tool ran and reported failure
    Failed {
        operation: String,
        exit_code: Option<i32>,
        reason: String,
        transcript: Transcript,
    },
    /// The tool succeeded but its output could not be understood
    MalformedOutput {
        operation: String,
        reason: String,
        transcript: Transcript,
    },
}

impl CollaboratorError {
    pub fn operation(&self) -> &str {
        match self {
            CollaboratorError::Unavailable { operation, .. }
            | CollaboratorError::Failed { operation, .. }
            | CollaboratorError::MalformedOutput { operation, .. } => operation,
        }
    }

    /// Raw tool output, when the tool got far enough to produce any
    pub fn transcript(&self) -> Option<&Transcript> {
        match self {
            CollaboratorError::Unavailable { .. } => None,
            CollaboratorError::Failed { transcript, .. }
            | CollaboratorError::MalformedOutput { transcript, .. } => Some(transcript),
        }
    }
}

impl core::fmt::Display for CollaboratorError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CollaboratorError::Unavailable { operation, reason } => {
                write!(f, "could not run {}: {}", operation, reason)
            }
            CollaboratorError::Failed {
                operation,
                exit_code: Some(code),
                reason,
                ..
            } => write!(f, "{} failed (exit {}): {}", operation, code, reason),
            CollaboratorError::Failed {
                operation, reason, ..
            } => write!(f, "{} failed: {}", operation, reason),
            CollaboratorError::MalformedOutput {
                operation, reason, ..
            } => write!(f, "unreadable output from {}: {}", operation, reason),
        }
    }
}

/// Backup Engine Trait
///
/// This is a PORT in hexagonal architecture.
/// The domain defines what it needs; adapters provide implementations.
pub trait BackupEngine {
    /// Initialise a new, empty repository
    fn init_repository(&mut self, repo: &RepositoryDescriptor) -> Result<Transcript, CollaboratorError>;

    /// Read the snapshot inventory
    fn list_snapshots(&self, repo: &RepositoryDescriptor) -> Result<Inventory, CollaboratorError>;

    /// Create a snapshot of the repository's includes (or copy from its source)
    fn create_snapshot(&mut self, repo: &RepositoryDescriptor) -> Result<Transcript, CollaboratorError>;

    /// Remove one snapshot from the repository index
    fn delete_snapshot(
        &mut self,
        repo: &RepositoryDescriptor,
        id: &SnapshotId,
    ) -> Result<Transcript, CollaboratorError>;

    /// Drop data no longer referenced by any snapshot
    fn reclaim_space(&mut self, repo: &RepositoryDescriptor) -> Result<Transcript, CollaboratorError>;

    /// Read back and verify all stored content
    fn verify(&self, repo: &RepositoryDescriptor) -> Result<Verification, CollaboratorError>;

    /// Remove stale locks left behind by interrupted runs
    fn unlock(&mut self, repo: &RepositoryDescriptor) -> Result<Transcript, CollaboratorError>;

    /// Update the backup tool itself
    fn self_update(&mut self) -> Result<Transcript, CollaboratorError>;
}
