//! AgePolicyVerdict - What a health evaluation concluded
//!
//! Verdicts are computed fresh on every invocation and never stored.

use super::repository::AgePolicy;
use super::snapshot::SnapshotRecord;
use super::status::Status;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgePolicyVerdict {
    pub status: Status,
    /// Age of the most recent snapshot; None without dated snapshots
    pub newest_age_days: Option<u64>,
    /// Age of the least recent snapshot; None without dated snapshots
    pub oldest_age_days: Option<u64>,
    /// Snapshots older than the policy's maximum age
    pub prune_candidates: Vec<SnapshotRecord>,
    /// Number of snapshots evaluated; None when the inventory was never read
    pub snapshot_count: Option<usize>,
    /// Thresholds the verdict was evaluated against
    pub policy: AgePolicy,
    pub message: String,
}

impl AgePolicyVerdict {
    /// A verdict for a repository whose inventory could not be read
    pub fn unknown(policy: AgePolicy, message: impl Into<String>) -> Self {
        Self {
            status: Status::Unknown,
            newest_age_days: None,
            oldest_age_days: None,
            prune_candidates: Vec::new(),
            snapshot_count: None,
            policy,
            message: message.into(),
        }
    }

    /// Raise the status to at least `status` and append `note` to the message
    pub fn escalate(&mut self, status: Status, note: impl AsRef<str>) {
        self.status = self.status.worst(status);
        let note = note.as_ref();
        if !note.is_empty() {
            if self.message.is_empty() {
                self.message = note.to_string();
            } else {
                self.message = format!("{}; {}", self.message, note);
            }
        }
    }

    /// Prefix the message, e.g. with the repository it concerns
    pub fn with_subject(mut self, subject: impl core::fmt::Display) -> Self {
        self.message = format!("{}: {}", subject, self.message);
        self
    }
}
