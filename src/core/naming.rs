//! core::naming
//!
//! Commit naming rules.
//!
//! # Features
//!
//! - Commit ids are `{branch}-{timestamp}` at microsecond resolution
//! - [`CommitClock`] hands out strictly increasing timestamps, so two
//!   commits taken through one engine never share a name even when the
//!   wall clock has not ticked (or has stepped backwards)
//!
//! Separate processes writing the same branch can still pick the same
//! name; that surfaces as an already-exists failure from the snapshot.

use std::sync::Mutex;

use chrono::{DateTime, Duration, FixedOffset, Local};

use super::types::{BranchName, CommitId};

/// Source of wall-clock time, replaceable in tests.
pub trait TimeSource: Send + Sync {
    /// The current time with its UTC offset.
    fn now(&self) -> DateTime<FixedOffset>;
}

/// The system clock in the local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTime;

impl TimeSource for SystemTime {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Hands out strictly increasing commit timestamps.
///
/// If the time source returns a value not later than the last one issued
/// (same microsecond, or a clock step backwards), the clock issues the last
/// value plus one microsecond instead.
///
/// # Example
///
/// ```
/// use snaprepo::core::naming::CommitClock;
/// use snaprepo::core::types::BranchName;
///
/// let clock = CommitClock::system();
/// let a = clock.commit_id(&BranchName::master());
/// let b = clock.commit_id(&BranchName::master());
/// assert_ne!(a, b);
/// assert!(a.as_str().starts_with("master-"));
/// ```
pub struct CommitClock {
    source: Box<dyn TimeSource>,
    last: Mutex<Option<DateTime<FixedOffset>>>,
}

impl std::fmt::Debug for CommitClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitClock")
            .field("last", &self.last)
            .finish()
    }
}

impl CommitClock {
    /// A clock backed by an arbitrary time source.
    pub fn new(source: impl TimeSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            last: Mutex::new(None),
        }
    }

    /// A clock backed by the system clock.
    pub fn system() -> Self {
        Self::new(SystemTime)
    }

    /// Next timestamp, truncated to microseconds and strictly greater than
    /// every timestamp issued before.
    pub fn next(&self) -> DateTime<FixedOffset> {
        let now = truncate_micros(self.source.now());
        // A poisoned lock only means another thread panicked mid-update;
        // the stored value is still a valid timestamp.
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let stamp = match *last {
            Some(prev) if now <= prev => {
                let bumped = prev + Duration::microseconds(1);
                bumped.with_timezone(now.offset())
            }
            _ => now,
        };
        *last = Some(stamp);
        stamp
    }

    /// Name for a new commit on `branch`.
    pub fn commit_id(&self, branch: &BranchName) -> CommitId {
        CommitId::for_branch(branch, self.next())
    }
}

impl Default for CommitClock {
    fn default() -> Self {
        Self::system()
    }
}

fn truncate_micros(at: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    let extra = at.timestamp_subsec_nanos() % 1_000;
    at - Duration::nanoseconds(extra as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::{Arc, Mutex as StdMutex};

    /// Replays a fixed sequence of instants, repeating the last one.
    struct Scripted(StdMutex<Vec<DateTime<FixedOffset>>>);

    impl Scripted {
        fn new(mut times: Vec<DateTime<FixedOffset>>) -> Self {
            times.reverse();
            Self(StdMutex::new(times))
        }
    }

    impl TimeSource for Scripted {
        fn now(&self) -> DateTime<FixedOffset> {
            let mut times = self.0.lock().unwrap();
            if times.len() > 1 {
                times.pop().unwrap()
            } else {
                times[0]
            }
        }
    }

    fn t(secs: u32, nanos: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 5, 1, 12, 0, secs)
            .unwrap()
            + Duration::nanoseconds(nanos as i64)
    }

    #[test]
    fn passes_through_advancing_time() {
        let clock = CommitClock::new(Scripted::new(vec![t(1, 0), t(2, 0)]));
        assert_eq!(clock.next(), t(1, 0));
        assert_eq!(clock.next(), t(2, 0));
    }

    #[test]
    fn same_tick_is_bumped() {
        let clock = CommitClock::new(Scripted::new(vec![t(1, 5_000)]));
        let a = clock.next();
        let b = clock.next();
        let c = clock.next();
        assert_eq!(a, t(1, 5_000));
        assert_eq!(b, t(1, 6_000));
        assert_eq!(c, t(1, 7_000));
    }

    #[test]
    fn clock_stepping_back_is_bumped() {
        let clock = CommitClock::new(Scripted::new(vec![t(5, 0), t(3, 0)]));
        assert_eq!(clock.next(), t(5, 0));
        assert_eq!(clock.next(), t(5, 1_000));
    }

    #[test]
    fn sub_microsecond_is_truncated() {
        let clock = CommitClock::new(Scripted::new(vec![t(1, 1_999)]));
        assert_eq!(clock.next(), t(1, 1_000));
    }

    #[test]
    fn same_tick_commit_ids_differ() {
        let clock = CommitClock::new(Scripted::new(vec![t(1, 0)]));
        let branch = BranchName::master();
        let a = clock.commit_id(&branch);
        let b = clock.commit_id(&branch);
        assert_ne!(a, b);
        assert_eq!(a.as_str(), "master-2024-05-01T12:00:01.000000+00:00");
        assert_eq!(b.as_str(), "master-2024-05-01T12:00:01.000001+00:00");
    }

    #[test]
    fn unique_across_threads() {
        let clock = Arc::new(CommitClock::new(Scripted::new(vec![t(1, 0)])));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let clock = Arc::clone(&clock);
                std::thread::spawn(move || (0..50).map(|_| clock.next()).collect::<Vec<_>>())
            })
            .collect();
        let mut all: Vec<_> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        let total = all.len();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), total);
    }

    #[test]
    fn system_clock_prefix() {
        let id = CommitClock::system().commit_id(&BranchName::new("dev").unwrap());
        assert!(id.as_str().starts_with("dev-"));
        assert_eq!(id.branch().unwrap().as_str(), "dev");
    }
}
