//! Age Policy Engine - Judges a repository by the age of its snapshots
//!
//! Given an inventory, the thresholds and the current time, the engine
//! decides:
//! 1. Health: is the newest snapshot recent enough, and is anything left
//!    inside the maximum-age window?
//! 2. Pruning: which snapshots are older than the maximum age?
//! 3. Metrics: how old are the newest and oldest snapshots?
//!
//! This is pure domain logic - no I/O, no clock, no external dependencies.

use crate::model::repository::AgePolicy;
use crate::model::snapshot::{SnapshotRecord, Timestamp};
use crate::model::status::Status;
use crate::model::verdict::AgePolicyVerdict;

/// AgePolicyEngine - stateless; everything it needs arrives as arguments
#[derive(Debug, Clone, Copy, Default)]
pub struct AgePolicyEngine;

impl AgePolicyEngine {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate an inventory against a policy at time `now`
    ///
    /// Status precedence, first match wins:
    /// 1. newest snapshot older than `min_age` → CRITICAL
    /// 2. oldest snapshot older than `max_age` and nothing within
    ///    `max_age` → CRITICAL
    /// 3. otherwise → OK
    ///
    /// Prune candidates are every snapshot strictly older than `max_age`,
    /// whatever the status. The newest snapshot is not protected here.
    pub fn evaluate(
        &self,
        snapshots: &[SnapshotRecord],
        policy: AgePolicy,
        now: Timestamp,
    ) -> AgePolicyVerdict {
        let min_age = u64::from(policy.min_age_days());
        let max_age = u64::from(policy.max_age_days());

        if snapshots.is_empty() {
            return AgePolicyVerdict {
                status: Status::Critical,
                newest_age_days: None,
                oldest_age_days: None,
                prune_candidates: Vec::new(),
                snapshot_count: Some(0),
                policy,
                message: "no snapshots found".to_string(),
            };
        }

        let ages: Vec<u64> = snapshots.iter().filter_map(|s| s.age_days(now)).collect();
        let prune_candidates: Vec<SnapshotRecord> = snapshots
            .iter()
            .filter(|s| s.age_days(now).is_some_and(|age| age > max_age))
            .cloned()
            .collect();

        let (newest, oldest) = match (ages.iter().min(), ages.iter().max()) {
            (Some(&newest), Some(&oldest)) => (newest, oldest),
            _ => {
                return AgePolicyVerdict {
                    status: Status::Unknown,
                    newest_age_days: None,
                    oldest_age_days: None,
                    prune_candidates,
                    snapshot_count: Some(snapshots.len()),
                    policy,
                    message: format!(
                        "none of the {} snapshots has a readable creation time",
                        snapshots.len()
                    ),
                };
            }
        };

        let (status, mut message) = if newest > min_age {
            (
                Status::Critical,
                format!(
                    "newest snapshot is {} old, exceeding the {} minimum-age threshold",
                    days(newest),
                    days(min_age)
                ),
            )
        } else if oldest > max_age && !ages.iter().any(|&age| age <= max_age) {
            (
                Status::Critical,
                format!(
                    "no snapshot within the {} maximum-age window (newest is {} old)",
                    days(max_age),
                    days(newest)
                ),
            )
        } else {
            (
                Status::Ok,
                format!(
                    "newest snapshot is {} old, oldest is {} old",
                    days(newest),
                    days(oldest)
                ),
            )
        };

        message.push_str(&format!(
            " ({} snapshots, {} prune candidates",
            snapshots.len(),
            prune_candidates.len()
        ));
        let undated = snapshots.len() - ages.len();
        if undated > 0 {
            message.push_str(&format!(", {} without a readable creation time", undated));
        }
        message.push(')');

        AgePolicyVerdict {
            status,
            newest_age_days: Some(newest),
            oldest_age_days: Some(oldest),
            prune_candidates,
            snapshot_count: Some(snapshots.len()),
            policy,
            message,
        }
    }
}

fn days(n: u64) -> String {
    if n == 1 {
        "1 day".to_string()
    } else {
        format!("{} days", n)
    }
}
