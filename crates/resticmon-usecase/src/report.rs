//! Reports - What each action hands back to the caller
//!
//! Monitoring actions (`check`, `run`) produce a [`CheckReport`] with a
//! verdict; everything else produces an [`ActionReport`] that simply
//! succeeded or failed.

use resticmon_domain::{
    format_many, AgePolicyVerdict, MonitoringReport, RepositoryLabel, SnapshotId, SnapshotRecord,
    Transcript,
};

/// Exit code for a failed non-monitoring action
pub const ACTION_FAILURE_EXIT_CODE: i32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded(String),
    Failed(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Outcome::Succeeded(message) | Outcome::Failed(message) => message,
        }
    }
}

/// Result of a best-effort prune
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneSummary {
    /// Candidates the engine selected
    pub candidates: usize,
    pub deleted: Vec<SnapshotId>,
    /// Snapshot (or step) that failed, with the reason
    pub failures: Vec<(String, String)>,
    /// Newest snapshot kept back by the keep-newest guard
    pub protected: Option<SnapshotId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionDetail {
    None,
    Snapshots(Vec<SnapshotRecord>),
    Prune(PruneSummary),
}

/// Outcome of `init`, `create`, `list` or `prune` on one repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionReport {
    pub label: RepositoryLabel,
    pub outcome: Outcome,
    pub detail: ActionDetail,
    pub transcript: Transcript,
}

/// Outcome of `check` or `run` on one repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub label: RepositoryLabel,
    pub verdict: AgePolicyVerdict,
    pub transcript: Transcript,
}

/// Everything one invocation produced, across all selected repositories
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchReport {
    Monitoring(Vec<CheckReport>),
    Actions(Vec<ActionReport>),
}

impl DispatchReport {
    /// Combined status line for monitoring actions
    pub fn monitoring(&self, include_perfdata: bool) -> Option<MonitoringReport> {
        match self {
            DispatchReport::Monitoring(reports) => {
                let entries: Vec<(&RepositoryLabel, &AgePolicyVerdict)> =
                    reports.iter().map(|r| (&r.label, &r.verdict)).collect();
                Some(format_many(&entries, include_perfdata))
            }
            DispatchReport::Actions(_) => None,
        }
    }

    /// Process exit code
    ///
    /// Monitoring actions use the four-tier mapping; other actions return
    /// 0 when every repository succeeded.
    pub fn exit_code(&self) -> i32 {
        match self {
            DispatchReport::Monitoring(_) => self
                .monitoring(false)
                .map(|report| report.exit_code)
                .unwrap_or(ACTION_FAILURE_EXIT_CODE),
            DispatchReport::Actions(reports) => {
                if reports.iter().all(|r| r.outcome.is_success()) {
                    0
                } else {
                    ACTION_FAILURE_EXIT_CODE
                }
            }
        }
    }

    /// Raw tool output of every repository, in processing order
    pub fn transcript(&self) -> Transcript {
        let mut combined = Transcript::default();
        match self {
            DispatchReport::Monitoring(reports) => {
                reports.iter().for_each(|r| combined.append(&r.transcript))
            }
            DispatchReport::Actions(reports) => {
                reports.iter().for_each(|r| combined.append(&r.transcript))
            }
        }
        combined
    }
}
