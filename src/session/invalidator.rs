//! Session teardown on unrecoverable authentication failure.

// std
use std::sync::atomic::{AtomicBool, Ordering};
// self
use crate::{_prelude::*, store::SessionStore};

/// Host-supplied hook fired when the session cannot be salvaged.
pub type UnauthorizedCallback = Arc<dyn Fn() + Send + Sync>;

/// Clears the session store and notifies the host exactly once per session loss.
///
/// The callback is injected at construction time rather than registered through a
/// mutable global slot, so separate client instances never observe each other's
/// hooks. Concurrent invalidations collapse into a single store clear and a single
/// callback invocation; the latch re-arms when a new session is installed.
pub struct SessionInvalidator {
	store: Arc<dyn SessionStore>,
	on_unauthorized: Option<UnauthorizedCallback>,
	tripped: AtomicBool,
}
impl SessionInvalidator {
	/// Creates an invalidator over the provided store with an optional host callback.
	pub fn new(store: Arc<dyn SessionStore>, on_unauthorized: Option<UnauthorizedCallback>) -> Self {
		Self { store, on_unauthorized, tripped: AtomicBool::new(false) }
	}

	/// Clears the store and fires the callback; concurrent calls collapse into one.
	pub async fn invalidate(&self) {
		if self.tripped.swap(true, Ordering::SeqCst) {
			return;
		}

		if let Err(err) = self.store.clear().await {
			#[cfg(feature = "tracing")]
			tracing::warn!(error = %err, "Failed to clear the session store during invalidation.");
			#[cfg(not(feature = "tracing"))]
			let _ = err;
		}

		match self.on_unauthorized.as_ref() {
			Some(callback) => callback(),
			None => {
				// A library cannot redirect the host UI on its own.
				#[cfg(feature = "tracing")]
				tracing::warn!("Session invalidated with no unauthorized callback registered.");
			},
		}
	}

	/// Re-arms the latch after a new session is installed.
	pub fn rearm(&self) {
		self.tripped.store(false, Ordering::SeqCst);
	}
}
impl Debug for SessionInvalidator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionInvalidator")
			.field("callback_set", &self.on_unauthorized.is_some())
			.field("tripped", &self.tripped.load(Ordering::SeqCst))
			.finish()
	}
}
