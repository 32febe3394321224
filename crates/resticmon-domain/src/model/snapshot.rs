//! Snapshot - An immutable point-in-time backup record

pub const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Seconds since the epoch, read on the wall clock shared by all hosts
///
/// No timezone travels with a Timestamp; every value the engine compares
/// must come from the same clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn from_seconds(seconds: i64) -> Self {
        Self(seconds)
    }

    pub fn as_seconds(&self) -> i64 {
        self.0
    }

    /// Whole days elapsed between `self` and `now`, truncated
    ///
    /// Timestamps later than `now` count as zero days old.
    pub fn age_days(&self, now: Timestamp) -> u64 {
        let elapsed = now.0.saturating_sub(self.0);
        if elapsed <= 0 {
            0
        } else {
            (elapsed / SECONDS_PER_DAY) as u64
        }
    }
}

/// Identifier of a snapshot, unique within its repository
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotId(String);

impl SnapshotId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One snapshot as reported by the backup engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRecord {
    pub id: SnapshotId,
    /// Creation time; None when the engine reported something unreadable
    pub created_at: Option<Timestamp>,
    pub hostname: Option<String>,
    pub paths: Vec<String>,
}

impl SnapshotRecord {
    pub fn new(id: SnapshotId, created_at: Timestamp) -> Self {
        Self {
            id,
            created_at: Some(created_at),
            hostname: None,
            paths: Vec::new(),
        }
    }

    /// A record whose creation time could not be read
    pub fn undated(id: SnapshotId) -> Self {
        Self {
            id,
            created_at: None,
            hostname: None,
            paths: Vec::new(),
        }
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn with_paths(mut self, paths: Vec<String>) -> Self {
        self.paths = paths;
        self
    }

    /// Age in whole days, or None when the creation time is undefined
    pub fn age_days(&self, now: Timestamp) -> Option<u64> {
        self.created_at.map(|created| created.age_days(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_truncates_to_whole_days() {
        let now = Timestamp::from_seconds(100 * SECONDS_PER_DAY);
        let exactly_seven = Timestamp::from_seconds(93 * SECONDS_PER_DAY);
        let almost_eight = Timestamp::from_seconds(92 * SECONDS_PER_DAY + 1);

        assert_eq!(exactly_seven.age_days(now), 7);
        assert_eq!(almost_eight.age_days(now), 7);
        assert_eq!(now.age_days(now), 0);
    }

    #[test]
    fn test_future_timestamp_is_zero_days_old() {
        let now = Timestamp::from_seconds(1_000);
        let later = Timestamp::from_seconds(1_000 + 3 * SECONDS_PER_DAY);
        assert_eq!(later.age_days(now), 0);
    }

    #[test]
    fn test_undated_record_has_no_age() {
        let record = SnapshotRecord::undated(SnapshotId::new("abc"));
        assert_eq!(record.age_days(Timestamp::from_seconds(0)), None);
    }
}
