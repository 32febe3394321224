//! Dispatcher - Runs one CLI action against one or more repositories
//!
//! ```text
//! RepositoryDescriptor ──▶ BackupEngine ──▶ AgePolicyEngine ──▶ report
//!                          (inventory,      (verdict,
//!                           backup, ...)     prune candidates)
//! ```
//!
//! Repositories are processed one after another and never share state.
//! After every action the repository is unlocked, so an interrupted run
//! does not leave stale locks behind.

use resticmon_domain::{
    AgePolicyEngine, AgePolicyVerdict, BackupEngine, RepositoryDescriptor, SnapshotRecord, Status,
    Timestamp, Transcript, VerificationResult,
};
use tracing::{debug, info, warn};

use crate::report::{
    ActionDetail, ActionReport, CheckReport, DispatchReport, Outcome, PruneSummary,
};

/// The actions offered on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Back up, then check
    Run,
    /// Back up (or copy from the source repository)
    Create,
    /// Initialise the repository
    Init,
    /// Show the snapshot inventory
    List,
    /// Delete snapshots older than the maximum age
    Prune,
    /// Evaluate repository health
    Check,
}

impl Action {
    /// Whether the action reports through the monitoring formatter
    pub fn is_monitoring(&self) -> bool {
        matches!(self, Action::Run | Action::Check)
    }
}

/// Switches that alter how actions behave
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOptions {
    /// `check`: also verify stored content
    pub full: bool,
    /// `prune`: never delete the newest snapshot
    pub keep_newest: bool,
    /// `run`: prune between backup and check
    pub prune_on_run: bool,
}

pub struct Dispatcher<E: BackupEngine> {
    engine: E,
    policy_engine: AgePolicyEngine,
    options: DispatchOptions,
}

impl<E: BackupEngine> Dispatcher<E> {
    pub fn new(engine: E, options: DispatchOptions) -> Self {
        Self {
            engine,
            policy_engine: AgePolicyEngine::new(),
            options,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Run `action` on every repository in `repos`, in order
    pub fn dispatch(
        &mut self,
        action: Action,
        repos: &[&RepositoryDescriptor],
        now: Timestamp,
    ) -> DispatchReport {
        info!(?action, repositories = repos.len(), "dispatching");
        match action {
            Action::Run => {
                DispatchReport::Monitoring(repos.iter().map(|repo| self.run(repo, now)).collect())
            }
            Action::Check => {
                DispatchReport::Monitoring(repos.iter().map(|repo| self.check(repo, now)).collect())
            }
            Action::Create => {
                DispatchReport::Actions(repos.iter().map(|repo| self.create(repo)).collect())
            }
            Action::Init => {
                DispatchReport::Actions(repos.iter().map(|repo| self.init(repo)).collect())
            }
            Action::List => {
                DispatchReport::Actions(repos.iter().map(|repo| self.list(repo)).collect())
            }
            Action::Prune => {
                DispatchReport::Actions(repos.iter().map(|repo| self.prune(repo, now)).collect())
            }
        }
    }

    /// Back up, optionally prune, then check; a failed backup still gets
    /// checked and drags the verdict to CRITICAL
    pub fn run(&mut self, repo: &RepositoryDescriptor, now: Timestamp) -> CheckReport {
        let mut transcript = Transcript::default();
        let created = self.create_snapshot(repo, &mut transcript);

        let pruned = if self.options.prune_on_run {
            Some(self.prune_snapshots(repo, now, &mut transcript))
        } else {
            None
        };

        let mut verdict = self.evaluate(repo, now, &mut transcript);
        if let Outcome::Failed(message) = created {
            verdict.escalate(Status::Critical, message);
        }
        if let Some((Outcome::Failed(message), _)) = pruned {
            verdict.escalate(Status::Warning, message);
        }
        if let Some(message) = self.release(repo, &mut transcript) {
            verdict.escalate(Status::Warning, message);
        }

        CheckReport {
            label: repo.label.clone(),
            verdict,
            transcript,
        }
    }

    pub fn create(&mut self, repo: &RepositoryDescriptor) -> ActionReport {
        let mut transcript = Transcript::default();
        let outcome = self.create_snapshot(repo, &mut transcript);
        self.release(repo, &mut transcript);
        action_report(repo, outcome, ActionDetail::None, transcript)
    }

    pub fn init(&mut self, repo: &RepositoryDescriptor) -> ActionReport {
        info!(repository = %repo.label, "initialising repository");
        let mut transcript = Transcript::default();
        let outcome = match self.engine.init_repository(repo) {
            Ok(output) => {
                transcript.append(&output);
                Outcome::Succeeded(format!(
                    "repository {} successfully created at location {}",
                    repo.label,
                    repo.location()
                ))
            }
            Err(err) => {
                if let Some(output) = err.transcript() {
                    transcript.append(output);
                }
                Outcome::Failed(format!("error creating repository {}: {}", repo.label, err))
            }
        };
        self.release(repo, &mut transcript);
        action_report(repo, outcome, ActionDetail::None, transcript)
    }

    pub fn list(&mut self, repo: &RepositoryDescriptor) -> ActionReport {
        let mut transcript = Transcript::default();
        let (outcome, detail) = match self.engine.list_snapshots(repo) {
            Ok(inventory) => {
                transcript.append(&inventory.transcript);
                (
                    Outcome::Succeeded(format!(
                        "snapshot list retrieved for repository {}",
                        repo.label
                    )),
                    ActionDetail::Snapshots(inventory.snapshots),
                )
            }
            Err(err) => {
                if let Some(output) = err.transcript() {
                    transcript.append(output);
                }
                (
                    Outcome::Failed(format!(
                        "error listing snapshots on repository {}: {}",
                        repo.label, err
                    )),
                    ActionDetail::None,
                )
            }
        };
        self.release(repo, &mut transcript);
        action_report(repo, outcome, detail, transcript)
    }

    pub fn prune(&mut self, repo: &RepositoryDescriptor, now: Timestamp) -> ActionReport {
        let mut transcript = Transcript::default();
        let (outcome, summary) = self.prune_snapshots(repo, now, &mut transcript);
        self.release(repo, &mut transcript);
        let detail = summary.map_or(ActionDetail::None, ActionDetail::Prune);
        action_report(repo, outcome, detail, transcript)
    }

    pub fn check(&mut self, repo: &RepositoryDescriptor, now: Timestamp) -> CheckReport {
        let mut transcript = Transcript::default();
        let mut verdict = self.evaluate(repo, now, &mut transcript);
        if let Some(message) = self.release(repo, &mut transcript) {
            verdict.escalate(Status::Warning, message);
        }
        CheckReport {
            label: repo.label.clone(),
            verdict,
            transcript,
        }
    }

    /// Update the backup tool before doing anything else
    pub fn self_update(&mut self) -> Result<Transcript, String> {
        info!("updating backup tool");
        self.engine
            .self_update()
            .map_err(|err| format!("restic self-update failed: {}", err))
    }

    fn create_snapshot(&mut self, repo: &RepositoryDescriptor, transcript: &mut Transcript) -> Outcome {
        info!(repository = %repo.label, copy = repo.is_copy(), "creating snapshot");
        match self.engine.create_snapshot(repo) {
            Ok(output) => {
                transcript.append(&output);
                if repo.is_copy() {
                    Outcome::Succeeded(format!("snapshots successfully copied to repository {}", repo.label))
                } else {
                    Outcome::Succeeded(format!("snapshot successfully created on repository {}", repo.label))
                }
            }
            Err(err) => {
                warn!(repository = %repo.label, error = %err, "snapshot creation failed");
                if let Some(output) = err.transcript() {
                    transcript.append(output);
                }
                Outcome::Failed(format!(
                    "error creating new snapshot on repository {}: {}",
                    repo.label, err
                ))
            }
        }
    }

    /// Inventory, age policy and (with `full`) content verification
    fn evaluate(
        &mut self,
        repo: &RepositoryDescriptor,
        now: Timestamp,
        transcript: &mut Transcript,
    ) -> AgePolicyVerdict {
        let subject = format!("repository {}", repo.label);
        let inventory = match self.engine.list_snapshots(repo) {
            Ok(inventory) => inventory,
            Err(err) => {
                warn!(repository = %repo.label, error = %err, "inventory unavailable");
                if let Some(output) = err.transcript() {
                    transcript.append(output);
                }
                return AgePolicyVerdict::unknown(
                    repo.policy,
                    format!("error getting snapshots: {}", err),
                )
                .with_subject(subject);
            }
        };
        transcript.append(&inventory.transcript);

        let mut verdict = self
            .policy_engine
            .evaluate(&inventory.snapshots, repo.policy, now);
        debug!(
            repository = %repo.label,
            status = %verdict.status,
            newest = ?verdict.newest_age_days,
            oldest = ?verdict.oldest_age_days,
            "age policy evaluated"
        );

        if self.options.full {
            match self.engine.verify(repo) {
                Ok(verification) => {
                    transcript.append(&verification.transcript);
                    match verification.result {
                        VerificationResult::Clean => {}
                        VerificationResult::Degraded { findings } => verdict.escalate(
                            Status::Warning,
                            format!("verification reported: {}", findings.join(", ")),
                        ),
                        VerificationResult::Mismatch { findings } => verdict.escalate(
                            Status::Critical,
                            format!("content verification failed: {}", findings.join(", ")),
                        ),
                    }
                }
                Err(err) => {
                    if let Some(output) = err.transcript() {
                        transcript.append(output);
                    }
                    verdict.escalate(
                        Status::Unknown,
                        format!("verification could not complete: {}", err),
                    );
                }
            }
        }

        verdict.with_subject(subject)
    }

    fn prune_snapshots(
        &mut self,
        repo: &RepositoryDescriptor,
        now: Timestamp,
        transcript: &mut Transcript,
    ) -> (Outcome, Option<PruneSummary>) {
        let inventory = match self.engine.list_snapshots(repo) {
            Ok(inventory) => inventory,
            Err(err) => {
                if let Some(output) = err.transcript() {
                    transcript.append(output);
                }
                return (
                    Outcome::Failed(format!(
                        "error cleaning up repository {}: {}",
                        repo.label, err
                    )),
                    None,
                );
            }
        };
        transcript.append(&inventory.transcript);

        let verdict = self
            .policy_engine
            .evaluate(&inventory.snapshots, repo.policy, now);
        let mut candidates = verdict.prune_candidates;
        let mut summary = PruneSummary {
            candidates: candidates.len(),
            ..PruneSummary::default()
        };

        if self.options.keep_newest {
            if let Some(newest) = newest_snapshot(&inventory.snapshots) {
                let before = candidates.len();
                candidates.retain(|c| c.id != newest.id);
                if candidates.len() < before {
                    info!(repository = %repo.label, snapshot = %newest.id, "keeping newest snapshot");
                    summary.protected = Some(newest.id.clone());
                }
            }
        }

        if candidates.is_empty() {
            return (
                Outcome::Succeeded(format!("nothing to prune on repository {}", repo.label)),
                Some(summary),
            );
        }

        for candidate in &candidates {
            match self.engine.delete_snapshot(repo, &candidate.id) {
                Ok(output) => {
                    transcript.append(&output);
                    summary.deleted.push(candidate.id.clone());
                }
                Err(err) => {
                    warn!(repository = %repo.label, snapshot = %candidate.id, error = %err, "delete failed");
                    if let Some(output) = err.transcript() {
                        transcript.append(output);
                    }
                    summary
                        .failures
                        .push((candidate.id.to_string(), err.to_string()));
                }
            }
        }

        if !summary.deleted.is_empty() {
            match self.engine.reclaim_space(repo) {
                Ok(output) => transcript.append(&output),
                Err(err) => {
                    if let Some(output) = err.transcript() {
                        transcript.append(output);
                    }
                    summary
                        .failures
                        .push(("reclaim space".to_string(), err.to_string()));
                }
            }
        }

        let deleted = format!(
            "deleted {} of {} snapshots from repository {}",
            summary.deleted.len(),
            candidates.len(),
            repo.label
        );
        let outcome = if summary.failures.is_empty() {
            Outcome::Succeeded(deleted)
        } else {
            let failures: Vec<String> = summary
                .failures
                .iter()
                .map(|(what, why)| format!("{}: {}", what, why))
                .collect();
            Outcome::Failed(format!("{}; failures: {}", deleted, failures.join("; ")))
        };
        (outcome, Some(summary))
    }

    /// Unlock the repository; returns a message when that failed
    fn release(&mut self, repo: &RepositoryDescriptor, transcript: &mut Transcript) -> Option<String> {
        match self.engine.unlock(repo) {
            Ok(output) => {
                transcript.append(&output);
                None
            }
            Err(err) => {
                warn!(repository = %repo.label, error = %err, "unlock failed");
                if let Some(output) = err.transcript() {
                    transcript.append(output);
                }
                Some(format!("unlock failed: {}", err))
            }
        }
    }
}

fn action_report(
    repo: &RepositoryDescriptor,
    outcome: Outcome,
    detail: ActionDetail,
    transcript: Transcript,
) -> ActionReport {
    ActionReport {
        label: repo.label.clone(),
        outcome,
        detail,
        transcript,
    }
}

/// The most recent dated snapshot
fn newest_snapshot(snapshots: &[SnapshotRecord]) -> Option<&SnapshotRecord> {
    snapshots
        .iter()
        .filter(|s| s.created_at.is_some())
        .max_by_key(|s| s.created_at)
}
