//! Command-line arguments
//!
//! Usage:
//!   resticmon run [repo] [--prune]       - Back up, then check
//!   resticmon create [repo]              - Back up (or copy for a duplicate)
//!   resticmon init [repo]                - Initialise the repository
//!   resticmon list [repo]                - Show snapshots
//!   resticmon prune [repo] [--keep-newest] - Delete snapshots past max_age
//!   resticmon check [repo] [--full]      - Nagios status line
//!
//! Leaving out `repo` runs the action on every configured repository.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use resticmon_adapter::config::DEFAULT_CONFIG_FILE;
use resticmon_usecase::{Action, DispatchOptions};

use crate::output::RenderOptions;

#[derive(Debug, Parser)]
#[command(name = "resticmon")]
#[command(about = "restic wrapper and Nagios-compatible backup status checker")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file
    #[arg(short = 'c', long = "config-file", global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config_file: PathBuf,

    /// Also read back and verify all stored data (check, run)
    #[arg(long, global = true)]
    pub full: bool,

    /// Append performance data to the status line (check, run)
    #[arg(long, global = true)]
    pub perfdata: bool,

    /// Echo raw restic output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Run `restic self-update` first
    #[arg(short = 'u', long, global = true)]
    pub self_update: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Back up, then check
    Run(RunCommand),
    /// Back up, or copy from the source of a duplicate
    Create(Target),
    /// Initialise a new repository
    Init(Target),
    /// List snapshots
    List(Target),
    /// Delete snapshots older than max_age
    Prune(PruneCommand),
    /// Evaluate snapshot ages and report in Nagios format
    Check(Target),
}

#[derive(Debug, Args)]
pub struct Target {
    /// Repository label; every repository when omitted
    pub repo: Option<String>,
}

#[derive(Debug, Args)]
pub struct RunCommand {
    #[command(flatten)]
    pub target: Target,

    /// Prune between backup and check
    #[arg(long)]
    pub prune: bool,
}

#[derive(Debug, Args)]
pub struct PruneCommand {
    #[command(flatten)]
    pub target: Target,

    /// Never delete the newest snapshot, however old
    #[arg(long)]
    pub keep_newest: bool,
}

impl Commands {
    pub fn action(&self) -> Action {
        match self {
            Commands::Run(_) => Action::Run,
            Commands::Create(_) => Action::Create,
            Commands::Init(_) => Action::Init,
            Commands::List(_) => Action::List,
            Commands::Prune(_) => Action::Prune,
            Commands::Check(_) => Action::Check,
        }
    }

    pub fn repository(&self) -> Option<&str> {
        let target = match self {
            Commands::Run(cmd) => &cmd.target,
            Commands::Prune(cmd) => &cmd.target,
            Commands::Create(target)
            | Commands::Init(target)
            | Commands::List(target)
            | Commands::Check(target) => target,
        };
        target.repo.as_deref()
    }
}

impl Cli {
    pub fn dispatch_options(&self) -> DispatchOptions {
        DispatchOptions {
            full: self.full,
            keep_newest: matches!(&self.command, Commands::Prune(cmd) if cmd.keep_newest),
            prune_on_run: matches!(&self.command, Commands::Run(cmd) if cmd.prune),
        }
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            verbose: self.verbose,
            quiet: self.quiet,
            perfdata: self.perfdata,
        }
    }
}
