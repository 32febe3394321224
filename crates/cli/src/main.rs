//! resticmon - restic wrapper and Nagios-compatible backup status checker
//!
//! Exit codes follow the Nagios plugin convention for `check` and `run`
//! (0 OK, 1 WARNING, 2 CRITICAL, 3 UNKNOWN); other actions exit 0 on
//! success and 2 on failure.

use std::io::Write;

use clap::Parser;
use resticmon_cli::{run, Cli, FATAL_EXIT_CODE};

fn main() {
    // Logs go to stderr; stdout carries the status line
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut stdout = std::io::stdout().lock();

    let code = match run(&cli, &mut stdout) {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %err, "giving up before touching any repository");
            let _ = writeln!(stdout, "CRITICAL - {}", err);
            FATAL_EXIT_CODE
        }
    };
    let _ = stdout.flush();
    std::process::exit(code);
}
