// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing refresh-coordinator activity.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	flights: AtomicU64,
	joins: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
}
impl RefreshMetrics {
	/// Returns the number of physical refresh calls started.
	pub fn flights(&self) -> u64 {
		self.flights.load(Ordering::Relaxed)
	}

	/// Returns the number of callers that joined an in-flight refresh instead of
	/// starting their own.
	pub fn joins(&self) -> u64 {
		self.joins.load(Ordering::Relaxed)
	}

	/// Returns the number of refresh flights that settled successfully.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of refresh flights that settled with an error.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	pub(crate) fn record_flight(&self) {
		self.flights.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_join(&self) {
		self.joins.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
	}
}
