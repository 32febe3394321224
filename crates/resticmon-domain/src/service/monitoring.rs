//! Monitoring Output - Nagios-style status lines
//!
//! ```text
//! OK - repository home: newest snapshot is 0 days old ... | newest_age_days=0;;1;0 ...
//! └┬┘   └──────────────────────┬─────────────────────┘     └────────────┬───────────┘
//! status keyword            message                               perfdata
//! ```
//!
//! Exit codes: OK=0, WARNING=1, CRITICAL=2, UNKNOWN=3.

use crate::model::repository::RepositoryLabel;
use crate::model::status::Status;
use crate::model::verdict::AgePolicyVerdict;

/// A rendered status line and the exit code that goes with it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitoringReport {
    pub status: Status,
    pub exit_code: i32,
    pub text: String,
}

/// Render one verdict
pub fn format(verdict: &AgePolicyVerdict, include_perfdata: bool) -> MonitoringReport {
    let metrics = if include_perfdata {
        perfdata(verdict, None)
    } else {
        Vec::new()
    };
    render(verdict.status, &verdict.message, &metrics)
}

/// Render several repositories as one status line
///
/// The worst status wins and messages are joined in the given order.
/// With more than one repository, perfdata labels carry the repository
/// label as a prefix.
pub fn format_many(
    entries: &[(&RepositoryLabel, &AgePolicyVerdict)],
    include_perfdata: bool,
) -> MonitoringReport {
    match entries {
        [] => render(Status::Unknown, "no repositories to report on", &[]),
        [(_, verdict)] => format(verdict, include_perfdata),
        _ => {
            let status = entries
                .iter()
                .fold(Status::Ok, |acc, (_, verdict)| acc.worst(verdict.status));
            let message = entries
                .iter()
                .map(|(_, verdict)| verdict.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            let metrics = if include_perfdata {
                entries
                    .iter()
                    .flat_map(|(label, verdict)| perfdata(verdict, Some(label.as_str())))
                    .collect()
            } else {
                Vec::new()
            };
            render(status, &message, &metrics)
        }
    }
}

fn render(status: Status, message: &str, metrics: &[String]) -> MonitoringReport {
    let mut text = format!("{} - {}", status.keyword(), message);
    if !metrics.is_empty() {
        text.push_str(" | ");
        text.push_str(&metrics.join(" "));
    }
    MonitoringReport {
        status,
        exit_code: status.exit_code(),
        text,
    }
}

/// `label=value;warn;crit;min` entries; undefined values are left out
fn perfdata(verdict: &AgePolicyVerdict, prefix: Option<&str>) -> Vec<String> {
    let mut metrics = Vec::new();
    if let Some(newest) = verdict.newest_age_days {
        metrics.push(format!(
            "{}={};;{};0",
            perf_label(prefix, "newest_age_days"),
            newest,
            verdict.policy.min_age_days()
        ));
    }
    if let Some(oldest) = verdict.oldest_age_days {
        metrics.push(format!("{}={};;;0", perf_label(prefix, "oldest_age_days"), oldest));
    }
    if let Some(count) = verdict.snapshot_count {
        metrics.push(format!("{}={};;;0", perf_label(prefix, "snapshots"), count));
        metrics.push(format!(
            "{}={};;;0",
            perf_label(prefix, "prune_candidates"),
            verdict.prune_candidates.len()
        ));
    }
    metrics
}

fn perf_label(prefix: Option<&str>, name: &str) -> String {
    let label = match prefix {
        Some(prefix) => format!("{}_{}", prefix, name),
        None => name.to_string(),
    };
    if label.contains(|c: char| c.is_whitespace() || c == '=' || c == '\'') {
        format!("'{}'", label.replace('\'', "''"))
    } else {
        label
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::repository::AgePolicy;
    use crate::model::snapshot::{SnapshotId, SnapshotRecord, Timestamp};

    fn verdict(status: Status) -> AgePolicyVerdict {
        AgePolicyVerdict {
            status,
            newest_age_days: Some(0),
            oldest_age_days: Some(10),
            prune_candidates: vec![SnapshotRecord::new(
                SnapshotId::new("old"),
                Timestamp::from_seconds(0),
            )],
            snapshot_count: Some(3),
            policy: AgePolicy::new(1, 7).unwrap(),
            message: "repository home: fine".to_string(),
        }
    }

    #[test]
    fn test_exit_code_per_status() {
        for (status, code) in Status::all().iter().zip([0, 1, 2, 3]) {
            let report = format(&verdict(*status), false);
            assert_eq!(report.exit_code, code);
            assert!(report.text.starts_with(status.keyword()));
        }
    }

    #[test]
    fn test_plain_line() {
        let report = format(&verdict(Status::Ok), false);
        assert_eq!(report.text, "OK - repository home: fine");
    }

    #[test]
    fn test_perfdata_block() {
        let report = format(&verdict(Status::Ok), true);
        assert_eq!(
            report.text,
            "OK - repository home: fine | newest_age_days=0;;1;0 oldest_age_days=10;;;0 snapshots=3;;;0 prune_candidates=1;;;0"
        );
    }

    #[test]
    fn test_undefined_ages_are_omitted() {
        let policy = AgePolicy::new(1, 7).unwrap();
        let report = format(&AgePolicyVerdict::unknown(policy, "restic failed"), true);
        assert_eq!(report.text, "UNKNOWN - restic failed");
        assert!(!report.text.contains("age_days"));

        let empty = AgePolicyVerdict {
            snapshot_count: Some(0),
            status: Status::Critical,
            message: "no snapshots found".to_string(),
            ..AgePolicyVerdict::unknown(policy, "")
        };
        let report = format(&empty, true);
        assert_eq!(
            report.text,
            "CRITICAL - no snapshots found | snapshots=0;;;0 prune_candidates=0;;;0"
        );
    }

    #[test]
    fn test_many_takes_worst_status_and_prefixes_labels() {
        let home = RepositoryLabel::new("home");
        let offsite = RepositoryLabel::new("off site");
        let mut stale = verdict(Status::Critical);
        stale.message = "repository off site: stale".to_string();
        stale.snapshot_count = None;
        stale.oldest_age_days = None;

        let ok = verdict(Status::Ok);
        let report = format_many(&[(&home, &ok), (&offsite, &stale)], true);
        assert_eq!(report.status, Status::Critical);
        assert_eq!(report.exit_code, 2);
        assert!(report
            .text
            .starts_with("CRITICAL - repository home: fine; repository off site: stale | "));
        assert!(report.text.contains(" home_newest_age_days=0;;1;0"));
        assert!(report.text.contains(" 'off site_newest_age_days'=0;;1;0"));
        assert!(!report.text.contains("off site_snapshots"));
    }

    #[test]
    fn test_many_with_one_entry_matches_format() {
        let home = RepositoryLabel::new("home");
        let ok = verdict(Status::Ok);
        assert_eq!(format_many(&[(&home, &ok)], true), format(&ok, true));
    }

    #[test]
    fn test_many_without_entries_is_unknown() {
        assert_eq!(format_many(&[], false).exit_code, 3);
    }
}
