//! Output parsing - Making sense of what restic printed

use resticmon_domain::{SnapshotId, SnapshotRecord, VerificationResult};
use serde::Deserialize;
use tracing::warn;

use super::invocation::ProcessOutput;
use crate::clock::parse_restic_time;

/// One entry of `restic snapshots --json`
#[derive(Debug, Deserialize)]
struct ResticSnapshot {
    id: String,
    time: String,
    #[serde(default)]
    hostname: Option<String>,
    #[serde(default)]
    paths: Vec<String>,
}

/// Parse `restic snapshots --json` output
///
/// An unreadable `time` leaves the record undated rather than failing
/// the whole inventory.
pub fn parse_snapshots(stdout: &str) -> Result<Vec<SnapshotRecord>, serde_json::Error> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let raw: Option<Vec<ResticSnapshot>> = serde_json::from_str(trimmed)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|snapshot| {
            let id = SnapshotId::new(snapshot.id);
            let mut record = match parse_restic_time(&snapshot.time) {
                Some(created_at) => SnapshotRecord::new(id, created_at),
                None => {
                    warn!(snapshot = %id, time = %snapshot.time, "unreadable snapshot time");
                    SnapshotRecord::undated(id)
                }
            };
            if let Some(hostname) = snapshot.hostname {
                record = record.with_hostname(hostname);
            }
            record.with_paths(snapshot.paths)
        })
        .collect())
}

/// Lines of a `restic check` run that point at recoverable anomalies
const DEGRADED_MARKERS: &[&str] = &[
    "additional files were found",
    "not referenced in any index",
    "hint:",
];

/// Lines that point at damaged content
const MISMATCH_MARKERS: &[&str] = &[
    "repository contains errors",
    "error for tree",
    "does not match",
    "ciphertext verification failed",
    "pack file cannot be listed",
];

/// Classify a finished `restic check --read-data`
///
/// Returns None when the run says nothing about the content, e.g. a
/// wrong password or an unreachable repository.
pub fn classify_check(output: &ProcessOutput) -> Option<VerificationResult> {
    let lines: Vec<&str> = output
        .stdout
        .lines()
        .chain(output.stderr.lines())
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let matching = |markers: &[&str]| -> Vec<String> {
        lines
            .iter()
            .filter(|line| {
                let lower = line.to_lowercase();
                markers.iter().any(|marker| lower.contains(marker))
            })
            .map(|line| line.to_string())
            .collect()
    };

    match output.exit_code {
        Some(0) => {
            let findings = matching(DEGRADED_MARKERS);
            if findings.is_empty() {
                Some(VerificationResult::Clean)
            } else {
                Some(VerificationResult::Degraded { findings })
            }
        }
        Some(1) => {
            let findings = matching(MISMATCH_MARKERS);
            if findings.is_empty() {
                None
            } else {
                Some(VerificationResult::Mismatch { findings })
            }
        }
        _ => None,
    }
}

/// Short explanation of a restic exit code
pub fn describe_exit(code: Option<i32>) -> &'static str {
    match code {
        Some(1) => "command failed",
        Some(3) => "some source data could not be read",
        Some(10) => "repository does not exist",
        Some(11) => "repository is locked",
        Some(12) => "wrong password",
        Some(130) => "interrupted",
        Some(_) => "unexpected exit status",
        None => "terminated by a signal",
    }
}

/// The last `Fatal:` line restic printed, or the last stderr line
pub fn failure_reason(output: &ProcessOutput) -> String {
    let detail = output
        .stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .fold(None, |found: Option<&str>, line| {
            if line.starts_with("Fatal:") || found.map_or(true, |f| !f.starts_with("Fatal:")) {
                Some(line)
            } else {
                found
            }
        });
    match detail {
        Some(detail) => format!("{}: {}", describe_exit(output.exit_code), detail),
        None => describe_exit(output.exit_code).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock;
    use chrono::NaiveDate;

    const SNAPSHOTS: &str = r#"[
      {"time":"2024-03-01T02:00:13.520731+01:00","tree":"1a2b","paths":["/home","/etc"],"hostname":"nas","username":"root","id":"4bba301e8c6f2a3f","short_id":"4bba301e"},
      {"time":"2024-03-08T02:00:09.1+01:00","tree":"3c4d","paths":["/home"],"hostname":"nas","id":"9f0e1d2c3b4a5968","short_id":"9f0e1d2c"}
    ]"#;

    fn output(code: i32, stdout: &str, stderr: &str) -> ProcessOutput {
        ProcessOutput {
            exit_code: Some(code),
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }
    }

    #[test]
    fn test_parse_snapshots() {
        let snapshots = parse_snapshots(SNAPSHOTS).unwrap();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].id.as_str(), "4bba301e8c6f2a3f");
        assert_eq!(snapshots[0].hostname.as_deref(), Some("nas"));
        assert_eq!(snapshots[0].paths, vec!["/home".to_string(), "/etc".to_string()]);
        let expected = NaiveDate::from_ymd_opt(2024, 3, 8)
            .unwrap()
            .and_hms_opt(2, 0, 9)
            .unwrap();
        assert_eq!(snapshots[1].created_at, Some(clock::from_naive(expected)));
    }

    #[test]
    fn test_parse_empty_inventories() {
        assert!(parse_snapshots("[]").unwrap().is_empty());
        assert!(parse_snapshots("null\n").unwrap().is_empty());
        assert!(parse_snapshots("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_keeps_undated_snapshots() {
        let snapshots = parse_snapshots(r#"[{"id":"abc","time":"soon"}]"#).unwrap();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].created_at, None);
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        assert!(parse_snapshots("Fatal: wrong password").is_err());
        assert!(parse_snapshots(r#"[{"time":"2024-03-01T02:00:13Z"}]"#).is_err());
    }

    #[test]
    fn test_classify_clean_check() {
        let result = classify_check(&output(
            0,
            "using temporary cache\nread all data\nno errors were found\n",
            "",
        ));
        assert_eq!(result, Some(VerificationResult::Clean));
    }

    #[test]
    fn test_classify_degraded_check() {
        let result = classify_check(&output(
            0,
            "check snapshots, trees and blobs\n2 additional files were found in the repo, which likely contain duplicate data.\nno errors were found\n",
            "",
        ));
        assert_eq!(
            result,
            Some(VerificationResult::Degraded {
                findings: vec![
                    "2 additional files were found in the repo, which likely contain duplicate data."
                        .to_string()
                ]
            })
        );
    }

    #[test]
    fn test_classify_mismatch() {
        let result = classify_check(&output(
            1,
            "read all data\nPack ID does not match, want 2818331a, got 5c6f9b8a\n",
            "Fatal: repository contains errors\n",
        ));
        match result {
            Some(VerificationResult::Mismatch { findings }) => assert_eq!(findings.len(), 2),
            other => panic!("unexpected classification: {:?}", other),
        }
    }

    #[test]
    fn test_classify_access_failures() {
        assert_eq!(
            classify_check(&output(12, "", "Fatal: wrong password or no key found\n")),
            None
        );
        assert_eq!(
            classify_check(&output(1, "", "Fatal: unable to open config file\n")),
            None
        );
    }

    #[test]
    fn test_failure_reason_prefers_fatal_line() {
        let reason = failure_reason(&output(
            12,
            "",
            "subprocess ssh: connected\nFatal: wrong password or no key found\nretrying\n",
        ));
        assert_eq!(reason, "wrong password: Fatal: wrong password or no key found");
        assert_eq!(failure_reason(&output(1, "", "")), "command failed");
        assert_eq!(
            failure_reason(&ProcessOutput::default()),
            "terminated by a signal"
        );
    }
}
