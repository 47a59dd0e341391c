//! Post-receive hook implementing refresh-and-replay-once semantics.

// self
use crate::{
	_prelude::*,
	error::RefreshError,
	http::{Request, Response, Transport},
	policy::{Access, EndpointPolicy},
	refresh::RefreshCoordinator,
	session::{SessionInvalidator, TokenSecret},
	store::SessionStore,
};

/// One logical request together with its replay status.
///
/// The `replayed` transition happens exactly once, by constructing a
/// replacement value rather than mutating shared state, so an aliased request
/// can never be retried twice.
#[derive(Clone, Debug)]
pub struct RequestAttempt {
	request: Request,
	replayed: bool,
}
impl RequestAttempt {
	/// Wraps a request that has not been replayed yet.
	pub fn new(request: Request) -> Self {
		Self { request, replayed: false }
	}

	/// Returns the replacement attempt marking the single permitted replay.
	pub fn into_replay(self) -> Self {
		Self { replayed: true, ..self }
	}

	/// The request this attempt dispatches.
	pub fn request(&self) -> &Request {
		&self.request
	}

	/// Whether the replay has already been spent.
	pub fn replayed(&self) -> bool {
		self.replayed
	}
}

/// Decision produced by [`ResponseAuthGate::assess`].
#[derive(Debug)]
pub enum Verdict {
	/// Return this outcome to the caller as-is.
	Settle(Result<Response>),
	/// Replay the original request once, carrying the provided token.
	Replay {
		/// Fresh access token to attach to the replayed request verbatim.
		token: TokenSecret,
	},
}

/// Inspects settled outcomes and drives the refresh flow for recoverable 401s.
pub struct ResponseAuthGate<T>
where
	T: ?Sized + Transport,
{
	policy: Arc<EndpointPolicy>,
	store: Arc<dyn SessionStore>,
	coordinator: Arc<RefreshCoordinator<T>>,
	invalidator: Arc<SessionInvalidator>,
}
impl<T> ResponseAuthGate<T>
where
	T: ?Sized + Transport,
{
	pub(crate) fn new(
		policy: Arc<EndpointPolicy>,
		store: Arc<dyn SessionStore>,
		coordinator: Arc<RefreshCoordinator<T>>,
		invalidator: Arc<SessionInvalidator>,
	) -> Self {
		Self { policy, store, coordinator, invalidator }
	}

	/// Applies the retry-once state machine to a settled outcome.
	///
	/// Only the first 401 on a protected path enters the refresh flow; every
	/// other outcome settles unchanged. When the refresh fails, the caller that
	/// owned the refresh keeps its original error while joined callers surface
	/// the refresh failure itself.
	pub async fn assess(&self, attempt: &RequestAttempt, outcome: Result<Response>) -> Verdict {
		let error = match outcome {
			Ok(response) => return Verdict::Settle(Ok(response)),
			Err(error) => error,
		};

		// Network failures and non-401 statuses pass through untouched.
		if !error.is_unauthenticated() {
			return Verdict::Settle(Err(error));
		}
		// A 401 from a public path is an application error, not an expiry signal.
		if self.policy.classify(&attempt.request().path) == Access::Public {
			return Verdict::Settle(Err(error));
		}
		if attempt.replayed() {
			return Verdict::Settle(Err(error));
		}
		// Without a refresh secret the flight cannot succeed; skip straight to teardown.
		if !self.refresh_token_present().await {
			self.invalidator.invalidate().await;

			return Verdict::Settle(Err(error));
		}

		match self.coordinator.fresh_token().await {
			Ok(token) => Verdict::Replay { token },
			// The owning caller keeps its original 401; the coordinator already
			// tore the session down.
			Err(RefreshError::Owned { .. }) => Verdict::Settle(Err(error)),
			Err(joined) => Verdict::Settle(Err(joined.into())),
		}
	}

	async fn refresh_token_present(&self) -> bool {
		match self.store.load().await {
			Ok(Some(session)) => session.refresh_token.is_some(),
			_ => false,
		}
	}
}
impl<T> Clone for ResponseAuthGate<T>
where
	T: ?Sized + Transport,
{
	fn clone(&self) -> Self {
		Self {
			policy: self.policy.clone(),
			store: self.store.clone(),
			coordinator: self.coordinator.clone(),
			invalidator: self.invalidator.clone(),
		}
	}
}
impl<T> Debug for ResponseAuthGate<T>
where
	T: ?Sized + Transport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ResponseAuthGate").field("coordinator", &self.coordinator).finish()
	}
}
