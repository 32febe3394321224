//! resticmon CLI - Wires configuration, restic and the dispatcher together
//!
//! ```text
//! Cli ──▶ Config ──▶ Dispatcher<ResticCli> ──▶ DispatchReport ──▶ stdout
//!                                                     │
//!                                                     └──▶ exit code
//! ```

pub mod args;
pub mod output;

use std::io::Write;

use resticmon_adapter::{clock, Config, ResticCli};
use resticmon_usecase::{Dispatcher, ACTION_FAILURE_EXIT_CODE};
use tracing::info;

pub use args::{Cli, Commands};

/// Exit code when nothing could be attempted (configuration problems)
pub const FATAL_EXIT_CODE: i32 = ACTION_FAILURE_EXIT_CODE;

/// Run one command line, writing the report to `out`
///
/// Returns the process exit code. Errors mean no repository was touched.
pub fn run(cli: &Cli, out: &mut impl Write) -> anyhow::Result<i32> {
    let config = Config::from_file(&cli.config_file)?;
    let repos = config.select(cli.command.repository())?;
    info!(
        config = %cli.config_file.display(),
        repositories = ?repos.iter().map(|r| r.label.as_str()).collect::<Vec<_>>(),
        "configuration ready"
    );

    let engine = ResticCli::new(config.restic_binary.clone());
    let mut dispatcher = Dispatcher::new(engine, cli.dispatch_options());

    if cli.self_update {
        match dispatcher.self_update() {
            Ok(transcript) => {
                if cli.verbose {
                    output::write_transcript(out, &transcript)?;
                }
            }
            Err(message) => {
                writeln!(out, "CRITICAL - {}", message)?;
                return Ok(FATAL_EXIT_CODE);
            }
        }
    }

    let report = dispatcher.dispatch(cli.command.action(), &repos, clock::wall_clock_now());
    output::render(out, &report, cli.render_options())?;
    Ok(report.exit_code())
}
