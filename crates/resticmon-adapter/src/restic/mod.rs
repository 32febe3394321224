//! restic Adapter - The BackupEngine port implemented with the restic CLI
//!
//! ```text
//! BackupEngine call ──▶ CommandBuilder ──▶ ProcessRunner ──▶ output parsing
//!                       (args + env)       (spawn, wait)     (JSON, check)
//! ```

pub mod command;
pub mod invocation;
pub mod output;

use std::path::PathBuf;

use resticmon_domain::{
    BackupEngine, CollaboratorError, Inventory, RepositoryDescriptor, SnapshotId, Transcript,
    Verification,
};
use tracing::debug;

pub use command::CommandBuilder;
pub use invocation::{Invocation, ProcessOutput, ProcessRunner, SystemRunner};

/// restic, driven through its command line
#[derive(Debug, Clone)]
pub struct ResticCli<R: ProcessRunner = SystemRunner> {
    commands: CommandBuilder,
    runner: R,
}

impl ResticCli<SystemRunner> {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self::with_runner(binary, SystemRunner)
    }
}

impl<R: ProcessRunner> ResticCli<R> {
    pub fn with_runner(binary: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            commands: CommandBuilder::new(binary),
            runner,
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Run an invocation; any outcome other than a clean exit is an error
    fn execute(&self, invocation: Invocation) -> Result<(Transcript, ProcessOutput), CollaboratorError> {
        let finished = self.spawn(&invocation)?;
        let transcript = Transcript::new(finished.stdout.clone(), finished.stderr.clone());
        if finished.success() {
            Ok((transcript, finished))
        } else {
            Err(CollaboratorError::Failed {
                operation: invocation.describe(),
                exit_code: finished.exit_code,
                reason: output::failure_reason(&finished),
                transcript,
            })
        }
    }

    fn spawn(&self, invocation: &Invocation) -> Result<ProcessOutput, CollaboratorError> {
        debug!(command = %invocation.describe(), args = ?invocation.args, "running restic");
        let finished = self
            .runner
            .run(invocation)
            .map_err(|err| CollaboratorError::Unavailable {
                operation: invocation.describe(),
                reason: format!("{}: {}", invocation.program.display(), err),
            })?;
        debug!(command = %invocation.describe(), exit_code = ?finished.exit_code, "restic finished");
        Ok(finished)
    }
}

impl<R: ProcessRunner> BackupEngine for ResticCli<R> {
    fn init_repository(&mut self, repo: &RepositoryDescriptor) -> Result<Transcript, CollaboratorError> {
        self.execute(self.commands.init(repo)).map(|(transcript, _)| transcript)
    }

    fn list_snapshots(&self, repo: &RepositoryDescriptor) -> Result<Inventory, CollaboratorError> {
        let invocation = self.commands.snapshots(repo);
        let operation = invocation.describe();
        let (transcript, finished) = self.execute(invocation)?;
        match output::parse_snapshots(&finished.stdout) {
            Ok(snapshots) => Ok(Inventory {
                snapshots,
                transcript,
            }),
            Err(err) => Err(CollaboratorError::MalformedOutput {
                operation,
                reason: err.to_string(),
                transcript,
            }),
        }
    }

    fn create_snapshot(&mut self, repo: &RepositoryDescriptor) -> Result<Transcript, CollaboratorError> {
        self.execute(self.commands.create(repo)).map(|(transcript, _)| transcript)
    }

    fn delete_snapshot(
        &mut self,
        repo: &RepositoryDescriptor,
        id: &SnapshotId,
    ) -> Result<Transcript, CollaboratorError> {
        self.execute(self.commands.forget(repo, id)).map(|(transcript, _)| transcript)
    }

    fn reclaim_space(&mut self, repo: &RepositoryDescriptor) -> Result<Transcript, CollaboratorError> {
        self.execute(self.commands.prune(repo)).map(|(transcript, _)| transcript)
    }

    fn verify(&self, repo: &RepositoryDescriptor) -> Result<Verification, CollaboratorError> {
        let invocation = self.commands.check(repo);
        let finished = self.spawn(&invocation)?;
        let transcript = Transcript::new(finished.stdout.clone(), finished.stderr.clone());
        match output::classify_check(&finished) {
            Some(result) => Ok(Verification { result, transcript }),
            None => Err(CollaboratorError::Failed {
                operation: invocation.describe(),
                exit_code: finished.exit_code,
                reason: output::failure_reason(&finished),
                transcript,
            }),
        }
    }

    fn unlock(&mut self, repo: &RepositoryDescriptor) -> Result<Transcript, CollaboratorError> {
        self.execute(self.commands.unlock(repo)).map(|(transcript, _)| transcript)
    }

    fn self_update(&mut self) -> Result<Transcript, CollaboratorError> {
        self.execute(self.commands.self_update()).map(|(transcript, _)| transcript)
    }
}
