//! Per-subscription call timings.
//!
//! Enabled with [`DispatchConfig::timings`](crate::DispatchConfig::timings). A timed
//! subscription records how often its callback ran and how long it took in total, including
//! calls that returned an error. Calls that panicked or were skipped are not recorded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::owner::{ListenerId, OwnerId};
use crate::priority::Priority;

/// Counters attached to one timed subscription.
#[derive(Debug, Default)]
pub struct Timings {
	count: AtomicU64,
	total_nanos: AtomicU64,
}

impl Timings {
	pub fn new() -> Self {
		Self::default()
	}

	/// Runs `f`, recording one call and its elapsed time.
	#[inline]
	pub fn measure<R>(&self, f: impl FnOnce() -> R) -> R {
		let start = Instant::now();
		let out = f();
		self.record(start.elapsed());
		out
	}

	pub fn record(&self, elapsed: Duration) {
		let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
		self.count.fetch_add(1, Ordering::Relaxed);
		self.total_nanos.fetch_add(nanos, Ordering::Relaxed);
	}

	pub fn count(&self) -> u64 {
		self.count.load(Ordering::Relaxed)
	}

	pub fn total(&self) -> Duration {
		Duration::from_nanos(self.total_nanos.load(Ordering::Relaxed))
	}

	pub fn reset(&self) {
		self.count.store(0, Ordering::Relaxed);
		self.total_nanos.store(0, Ordering::Relaxed);
	}
}

/// One line of a [`Catalog::timings_report`](crate::Catalog::timings_report).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingsEntry {
	pub event: &'static str,
	pub owner: OwnerId,
	pub listener: ListenerId,
	pub priority: Priority,
	pub count: u64,
	pub total: Duration,
}

impl TimingsEntry {
	/// Mean time per call, zero if the callback never ran.
	pub fn average(&self) -> Duration {
		if self.count == 0 {
			return Duration::ZERO;
		}
		let nanos = self.total.as_nanos() / u128::from(self.count);
		Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
	}
}
