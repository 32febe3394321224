//! Output - Rendering a dispatch report for humans and for Nagios
//!
//! Monitoring actions print a single status line; other actions print
//! one `OK - ...` or `CRITICAL - ...` line per repository.

use std::io::{self, Write};

use resticmon_adapter::clock;
use resticmon_domain::{SnapshotRecord, Status, Transcript};
use resticmon_usecase::{ActionDetail, ActionReport, DispatchReport, Outcome};

const SHORT_ID_LEN: usize = 8;

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    pub verbose: bool,
    pub quiet: bool,
    pub perfdata: bool,
}

pub fn render(out: &mut impl Write, report: &DispatchReport, options: RenderOptions) -> io::Result<()> {
    match report {
        DispatchReport::Monitoring(_) => {
            let Some(status_line) = report.monitoring(options.perfdata) else {
                return Ok(());
            };
            if options.quiet && status_line.status.is_ok() {
                return Ok(());
            }
            writeln!(out, "{}", status_line.text)?;
            let failed = matches!(status_line.status, Status::Critical | Status::Unknown);
            if options.verbose || failed {
                write_transcript(out, &report.transcript())?;
            }
            Ok(())
        }
        DispatchReport::Actions(reports) => {
            for action in reports {
                render_action(out, action, options)?;
            }
            Ok(())
        }
    }
}

fn render_action(out: &mut impl Write, report: &ActionReport, options: RenderOptions) -> io::Result<()> {
    match &report.outcome {
        Outcome::Succeeded(message) => {
            if !options.quiet {
                writeln!(out, "OK - {}", message)?;
                match &report.detail {
                    ActionDetail::Snapshots(snapshots) => write_snapshot_table(out, snapshots)?,
                    ActionDetail::Prune(summary) => {
                        if let Some(id) = &summary.protected {
                            writeln!(out, "kept newest snapshot {}", id)?;
                        }
                    }
                    ActionDetail::None => {}
                }
            }
            if options.verbose {
                write_transcript(out, &report.transcript)?;
            }
        }
        // Failures always carry the raw output, whatever the verbosity
        Outcome::Failed(message) => {
            writeln!(out, "CRITICAL - {}", message)?;
            write_transcript(out, &report.transcript)?;
        }
    }
    Ok(())
}

pub fn write_transcript(out: &mut impl Write, transcript: &Transcript) -> io::Result<()> {
    let stdout = transcript.stdout.trim_end();
    let stderr = transcript.stderr.trim_end();
    if !stdout.is_empty() {
        writeln!(out, "Output: {}", stdout)?;
    }
    if !stderr.is_empty() {
        writeln!(out, "Error: {}", stderr)?;
    }
    Ok(())
}

fn write_snapshot_table(out: &mut impl Write, snapshots: &[SnapshotRecord]) -> io::Result<()> {
    if snapshots.is_empty() {
        return writeln!(out, "no snapshots");
    }
    let host_width = snapshots
        .iter()
        .filter_map(|s| s.hostname.as_deref())
        .map(str::len)
        .max()
        .unwrap_or(0)
        .max("Host".len());

    writeln!(out, "{:<8}  {:<19}  {:<host_width$}  Paths", "ID", "Time", "Host")?;
    writeln!(
        out,
        "{}  {}  {}  {}",
        "-".repeat(8),
        "-".repeat(19),
        "-".repeat(host_width),
        "-".repeat(5)
    )?;
    for snapshot in snapshots {
        let id: String = snapshot.id.as_str().chars().take(SHORT_ID_LEN).collect();
        let time = snapshot
            .created_at
            .map(clock::display)
            .unwrap_or_else(|| "unknown".to_string());
        writeln!(
            out,
            "{:<8}  {:<19}  {:<host_width$}  {}",
            id,
            time,
            snapshot.hostname.as_deref().unwrap_or(""),
            snapshot.paths.join(", ")
        )?;
    }
    writeln!(out, "{} snapshots", snapshots.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use resticmon_domain::{AgePolicy, AgePolicyVerdict, RepositoryLabel, SnapshotId, Timestamp};
    use resticmon_usecase::{CheckReport, PruneSummary};

    /// 2024-03-01 02:00:13 on the wall clock
    const MARCH_FIRST: i64 = 1_709_258_413;

    fn rendered(report: &DispatchReport, options: RenderOptions) -> String {
        let mut buffer = Vec::new();
        render(&mut buffer, report, options).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    fn action(outcome: Outcome, detail: ActionDetail) -> DispatchReport {
        DispatchReport::Actions(vec![ActionReport {
            label: RepositoryLabel::new("home"),
            outcome,
            detail,
            transcript: Transcript::new("restic said hello\n", ""),
        }])
    }

    fn check(status: Status, message: &str) -> DispatchReport {
        let policy = AgePolicy::new(1, 30).unwrap();
        let mut verdict = AgePolicyVerdict::unknown(policy, "placeholder");
        verdict.status = status;
        verdict.message = message.to_string();
        DispatchReport::Monitoring(vec![CheckReport {
            label: RepositoryLabel::new("home"),
            verdict,
            transcript: Transcript::new("[]", "warning: cache is old"),
        }])
    }

    #[test]
    fn test_successful_action() {
        let report = action(
            Outcome::Succeeded("snapshot successfully created on repository home".into()),
            ActionDetail::None,
        );
        assert_eq!(
            rendered(&report, RenderOptions::default()),
            "OK - snapshot successfully created on repository home\n"
        );
        assert_eq!(
            rendered(&report, RenderOptions { verbose: true, ..Default::default() }),
            "OK - snapshot successfully created on repository home\nOutput: restic said hello\n"
        );
        assert_eq!(rendered(&report, RenderOptions { quiet: true, ..Default::default() }), "");
    }

    #[test]
    fn test_failed_action_shows_output_even_when_quiet() {
        let report = action(
            Outcome::Failed("error listing snapshots on repository home: boom".into()),
            ActionDetail::None,
        );
        assert_eq!(
            rendered(&report, RenderOptions { quiet: true, ..Default::default() }),
            "CRITICAL - error listing snapshots on repository home: boom\nOutput: restic said hello\n"
        );
    }

    #[test]
    fn test_snapshot_table() {
        let snapshots = vec![
            SnapshotRecord::new(SnapshotId::new("4bba301e8c6f2a3f"), Timestamp::from_seconds(MARCH_FIRST))
                .with_hostname("nas")
                .with_paths(vec!["/home".into(), "/etc".into()]),
            SnapshotRecord::undated(SnapshotId::new("9f0e")),
        ];
        let report = action(
            Outcome::Succeeded("snapshot list retrieved for repository home".into()),
            ActionDetail::Snapshots(snapshots),
        );
        let text = rendered(&report, RenderOptions::default());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "OK - snapshot list retrieved for repository home");
        assert_eq!(lines[1], "ID        Time                 Host  Paths");
        assert_eq!(lines[3], "4bba301e  2024-03-01 02:00:13  nas   /home, /etc");
        assert!(lines[4].starts_with("9f0e      unknown"));
        assert_eq!(lines[5], "2 snapshots");
    }

    #[test]
    fn test_prune_mentions_protected_snapshot() {
        let summary = PruneSummary {
            candidates: 1,
            protected: Some(SnapshotId::new("4bba301e")),
            ..Default::default()
        };
        let report = action(
            Outcome::Succeeded("nothing to prune on repository home".into()),
            ActionDetail::Prune(summary),
        );
        assert_eq!(
            rendered(&report, RenderOptions::default()),
            "OK - nothing to prune on repository home\nkept newest snapshot 4bba301e\n"
        );
    }

    #[test]
    fn test_monitoring_line() {
        let report = check(Status::Warning, "verification reported: hint");
        assert_eq!(
            rendered(&report, RenderOptions { quiet: true, ..Default::default() }),
            "WARNING - verification reported: hint\n"
        );
        assert_eq!(
            rendered(&report, RenderOptions { verbose: true, ..Default::default() }),
            "WARNING - verification reported: hint\nOutput: []\nError: warning: cache is old\n"
        );
    }

    #[test]
    fn test_failing_status_line_echoes_output() {
        let report = check(Status::Critical, "repository home: newest snapshot is 9 days old");
        let expected = "CRITICAL - repository home: newest snapshot is 9 days old\nOutput: []\nError: warning: cache is old\n";
        assert_eq!(rendered(&report, RenderOptions::default()), expected);
        assert_eq!(rendered(&report, RenderOptions { quiet: true, ..Default::default() }), expected);

        let report = check(Status::Unknown, "repository home: error getting snapshots");
        assert!(rendered(&report, RenderOptions::default()).contains("Error: warning: cache is old\n"));

        let report = check(Status::Warning, "verification reported: hint");
        assert_eq!(
            rendered(&report, RenderOptions::default()),
            "WARNING - verification reported: hint\n"
        );
    }

    #[test]
    fn test_quiet_suppresses_ok_status_line() {
        let report = check(Status::Ok, "newest snapshot is 0 days old");
        assert_eq!(rendered(&report, RenderOptions { quiet: true, ..Default::default() }), "");
        assert_eq!(
            rendered(&report, RenderOptions::default()),
            "OK - newest snapshot is 0 days old\n"
        );
    }
}
