//! Index build state and progress tracking.

use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Index build state.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[repr(u8)]
pub enum IndexBuildState {
    Idle = 0,
    Building = 1,
    Ready = 2,
    Error = 3,
}

impl IndexBuildState {
    /// Loads the state from an atomic.
    pub fn load(atomic: &AtomicU8) -> Self {
        match atomic.load(Ordering::Relaxed) {
            1 => Self::Building,
            2 => Self::Ready,
            3 => Self::Error,
            _ => Self::Idle,
        }
    }

    pub fn store(self, atomic: &AtomicU8) {
        atomic.store(self as u8, Ordering::Relaxed);
    }

    /// Returns the state as a string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Building => "building",
            Self::Ready => "ready",
            Self::Error => "error",
        }
    }
}

/// Progress counters updated while a build walks the tree.
#[derive(Debug, Default)]
pub struct IndexBuildProgress {
    pub scanned_files: AtomicUsize,
    pub scanned_dirs: AtomicUsize,
    pub skipped: AtomicUsize,
    pub errors: AtomicUsize,
    pub started_at: AtomicU64,
    pub finished_at: AtomicU64,
}

impl IndexBuildProgress {
    /// Resets progress for a new build.
    pub fn reset_for_build(&self, started_at: u64) {
        self.scanned_files.store(0, Ordering::Relaxed);
        self.scanned_dirs.store(0, Ordering::Relaxed);
        self.skipped.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
        self.started_at.store(started_at, Ordering::Relaxed);
        self.finished_at.store(0, Ordering::Relaxed);
    }

    pub fn finish(&self, finished_at: u64) {
        self.finished_at.store(finished_at, Ordering::Relaxed);
    }

    /// Takes a snapshot of the progress values.
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            scanned_files: self.scanned_files.load(Ordering::Relaxed),
            scanned_dirs: self.scanned_dirs.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            started_at: zero_to_none(self.started_at.load(Ordering::Relaxed)),
            finished_at: zero_to_none(self.finished_at.load(Ordering::Relaxed)),
        }
    }
}

/// A snapshot of build progress values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub scanned_files: usize,
    pub scanned_dirs: usize,
    pub skipped: usize,
    pub errors: usize,
    pub started_at: Option<u64>,
    pub finished_at: Option<u64>,
}

/// Returns the current Unix timestamp in milliseconds.
pub fn unix_now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|value| value.as_millis() as u64)
        .unwrap_or(0)
}

/// Converts 0 to None for optional timestamps.
pub fn zero_to_none(value: u64) -> Option<u64> {
    if value == 0 {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_round_trips_through_atomic() {
        let atomic = AtomicU8::new(0);
        assert_eq!(IndexBuildState::load(&atomic), IndexBuildState::Idle);
        IndexBuildState::Error.store(&atomic);
        assert_eq!(IndexBuildState::load(&atomic), IndexBuildState::Error);
        assert_eq!(IndexBuildState::load(&atomic).as_str(), "error");
    }

    #[test]
    fn reset_clears_counters() {
        let progress = IndexBuildProgress::default();
        progress.scanned_files.store(4, Ordering::Relaxed);
        progress.errors.store(1, Ordering::Relaxed);
        progress.finish(99);

        progress.reset_for_build(10);
        let snapshot = progress.snapshot();
        assert_eq!(snapshot.scanned_files, 0);
        assert_eq!(snapshot.errors, 0);
        assert_eq!(snapshot.started_at, Some(10));
        assert_eq!(snapshot.finished_at, None);
    }
}
