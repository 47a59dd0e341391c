//! Singleflight refresh coordination: one network call serves every concurrent 401.
//!
//! The coordinator owns the `Idle`/`Refreshing` state machine. The first caller
//! to observe `Idle` flips the in-flight flag inside one synchronous critical
//! section and performs the refresh call over the raw transport; there is no
//! await point between the read and the write, so cooperative interleaving can
//! only observe the flag once it is already set. Every caller that arrives
//! while the flight is up parks on a waiter cell instead of issuing network
//! traffic, and the owner settles the whole batch in FIFO order the moment the
//! call resolves.

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	error::{ConfigError, RefreshError, StatusError},
	http::{Request, Transport},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::{RefreshGrant, RefreshRequest, SessionInvalidator, TokenSecret},
	store::SessionStore,
};

/// Backend path the refresh call is issued against by default.
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";

/// Shared result distributed to every participant of one refresh flight.
pub type RefreshOutcome = Result<TokenSecret, RefreshError>;

type Waiter = Arc<AsyncOnceCell<RefreshOutcome>>;

/// FIFO backlog of callers parked on the in-flight refresh.
///
/// `drain` swaps the entire backlog out under the state lock, so a caller
/// arriving mid-settlement can never observe a partially drained queue; it
/// either joins the old flight before the swap or starts a new one after it.
#[derive(Debug, Default)]
struct WaiterQueue(Vec<Waiter>);
impl WaiterQueue {
	fn enqueue(&mut self) -> Waiter {
		let cell = Arc::new(AsyncOnceCell::new());

		self.0.push(cell.clone());

		cell
	}

	fn drain(&mut self) -> Vec<Waiter> {
		std::mem::take(&mut self.0)
	}

	#[cfg(test)]
	fn len(&self) -> usize {
		self.0.len()
	}
}

/// Mutable coordinator state guarded by a synchronous mutex.
///
/// Invariant: `in_flight == false` implies the queue is empty.
#[derive(Debug, Default)]
struct RefreshState {
	in_flight: bool,
	waiters: WaiterQueue,
}

/// Seat assigned to a caller entering the coordinator.
enum Seat {
	Owner,
	Waiter(Waiter),
}

/// Coordinates at most one refresh call across any number of concurrent 401s.
pub struct RefreshCoordinator<T>
where
	T: ?Sized + Transport,
{
	transport: Arc<T>,
	store: Arc<dyn SessionStore>,
	invalidator: Arc<SessionInvalidator>,
	refresh_path: String,
	state: Mutex<RefreshState>,
	metrics: Arc<RefreshMetrics>,
}
impl<T> RefreshCoordinator<T>
where
	T: ?Sized + Transport,
{
	/// Creates a coordinator issuing refresh calls against `refresh_path`.
	///
	/// The transport is used directly, bypassing the authenticator, so the
	/// refresh call never carries the stale access token that triggered it.
	pub fn new(
		transport: Arc<T>,
		store: Arc<dyn SessionStore>,
		invalidator: Arc<SessionInvalidator>,
		refresh_path: impl Into<String>,
	) -> Self {
		Self {
			transport,
			store,
			invalidator,
			refresh_path: refresh_path.into(),
			state: Mutex::new(RefreshState::default()),
			metrics: Default::default(),
		}
	}

	/// Shared counters describing refresh activity.
	pub fn metrics(&self) -> Arc<RefreshMetrics> {
		self.metrics.clone()
	}

	/// Obtains a fresh access token, joining the in-flight refresh when one exists.
	///
	/// Exactly one physical refresh call is outstanding at any time. Errors
	/// carry the refresh call's failure as their source: [`RefreshError::Owned`]
	/// marks the caller that performed the call, [`RefreshError::Joined`] the
	/// callers that waited on it.
	pub async fn fresh_token(&self) -> RefreshOutcome {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "fresh_token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				// Check-and-set in one critical section; the lock is released
				// before any await.
				let seat = {
					let mut state = self.state.lock();

					if state.in_flight {
						Seat::Waiter(state.waiters.enqueue())
					} else {
						state.in_flight = true;

						Seat::Owner
					}
				};

				match seat {
					Seat::Owner => self.run_flight().await,
					Seat::Waiter(cell) => {
						self.metrics.record_join();

						cell.wait().await.clone()
					},
				}
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn run_flight(&self) -> RefreshOutcome {
		self.metrics.record_flight();

		let flight = FlightGuard::new(self);

		match self.call_refresh_endpoint().await {
			Ok(token) => {
				flight.settle(Ok(token.clone()));
				self.metrics.record_success();

				Ok(token)
			},
			Err(error) => {
				let shared = Arc::new(error);

				flight.settle(Err(RefreshError::Joined { source: shared.clone() }));
				self.invalidator.invalidate().await;
				self.metrics.record_failure();

				Err(RefreshError::Owned { source: shared })
			},
		}
	}

	/// Issues the physical refresh call and rotates the stored session on success.
	async fn call_refresh_endpoint(&self) -> Result<TokenSecret> {
		let session = self
			.store
			.load()
			.await?
			.ok_or_else(|| Error::from(ConfigError::MissingRefreshToken))?;
		let refresh_token = session
			.refresh_token
			.clone()
			.ok_or_else(|| Error::from(ConfigError::MissingRefreshToken))?;
		let request =
			Request::post(&self.refresh_path).with_json_body(&RefreshRequest { refresh_token })?;
		let response = self.transport.execute(request).await?;

		if !response.is_success() {
			return Err(
				StatusError::new(response.status, &self.refresh_path, &response.body).into()
			);
		}

		let grant = response.json::<RefreshGrant>()?;
		let rotated = session.rotate(
			grant.access_token.expose(),
			grant.refresh_token.as_ref().map(|secret| secret.expose().to_owned()),
		);

		self.store.save(rotated).await?;

		Ok(grant.access_token)
	}
}
impl<T> Debug for RefreshCoordinator<T>
where
	T: ?Sized + Transport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshCoordinator")
			.field("refresh_path", &self.refresh_path)
			.field("in_flight", &self.state.lock().in_flight)
			.finish()
	}
}

/// Returns the coordinator to `Idle` on every exit path.
///
/// [`settle`](Self::settle) clears the flag, drains the queue atomically, and
/// resolves the waiters in FIFO order. Dropping the guard without settling (a
/// flight that unwound) performs the same transition but wakes every waiter
/// with [`RefreshError::Aborted`], so no waiter can outlive the flight.
struct FlightGuard<'a, T>
where
	T: ?Sized + Transport,
{
	coordinator: &'a RefreshCoordinator<T>,
	armed: bool,
}
impl<'a, T> FlightGuard<'a, T>
where
	T: ?Sized + Transport,
{
	fn new(coordinator: &'a RefreshCoordinator<T>) -> Self {
		Self { coordinator, armed: true }
	}

	fn settle(mut self, outcome: RefreshOutcome) {
		self.armed = false;

		Self::finish(self.coordinator, outcome);
	}

	fn finish(coordinator: &RefreshCoordinator<T>, outcome: RefreshOutcome) {
		let waiters = {
			let mut state = coordinator.state.lock();

			state.in_flight = false;

			state.waiters.drain()
		};

		for waiter in waiters {
			// Each cell is set at most once; after the drain nothing else holds it.
			let _ = waiter.set_blocking(outcome.clone());
		}
	}
}
impl<T> Drop for FlightGuard<'_, T>
where
	T: ?Sized + Transport,
{
	fn drop(&mut self) {
		if self.armed {
			Self::finish(self.coordinator, Err(RefreshError::Aborted));
		}
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;
	use crate::{
		http::{Response, TransportFuture},
		session::{Identity, Session, UnauthorizedCallback},
		store::MemoryStore,
	};

	/// Transport whose responses are held back until the test releases them,
	/// so every concurrent caller deterministically reaches the coordinator
	/// while the flight is still up.
	struct ScriptedTransport {
		calls: AtomicUsize,
		gate: Arc<AsyncOnceCell<()>>,
		status: u16,
		body: String,
	}
	impl ScriptedTransport {
		fn new(status: u16, body: &str) -> Self {
			Self {
				calls: AtomicUsize::new(0),
				gate: Arc::new(AsyncOnceCell::new()),
				status,
				body: body.into(),
			}
		}

		async fn release(&self) {
			let _ = self.gate.set(()).await;
		}

		fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}
	}
	impl Transport for ScriptedTransport {
		fn execute(&self, _request: Request) -> TransportFuture<'_> {
			Box::pin(async move {
				self.calls.fetch_add(1, Ordering::SeqCst);
				self.gate.wait().await;

				Ok(Response {
					status: self.status,
					headers: Vec::new(),
					body: self.body.clone().into_bytes(),
				})
			})
		}
	}

	struct PanickingTransport {
		gate: Arc<AsyncOnceCell<()>>,
	}
	impl Transport for PanickingTransport {
		fn execute(&self, _request: Request) -> TransportFuture<'_> {
			Box::pin(async move {
				self.gate.wait().await;

				panic!("transport fixture unwound mid-flight");
			})
		}
	}

	async fn seeded_store() -> Arc<MemoryStore> {
		let store = Arc::new(MemoryStore::default());
		let identity =
			Identity { id: "u-1".into(), display_name: "Ada".into(), role: "admin".into() };

		store
			.save(Session::new("stale", identity).with_refresh_token("refresh-1"))
			.await
			.expect("Failed to seed session fixture.");

		store
	}

	fn counting_callback() -> (Arc<AtomicUsize>, UnauthorizedCallback) {
		let fired = Arc::new(AtomicUsize::new(0));
		let counter = fired.clone();
		let callback: UnauthorizedCallback = Arc::new(move || {
			counter.fetch_add(1, Ordering::SeqCst);
		});

		(fired, callback)
	}

	fn build_coordinator<T>(
		transport: Arc<T>,
		store: Arc<MemoryStore>,
		callback: Option<UnauthorizedCallback>,
	) -> Arc<RefreshCoordinator<T>>
	where
		T: Transport,
	{
		let invalidator = Arc::new(SessionInvalidator::new(store.clone(), callback));

		Arc::new(RefreshCoordinator::new(transport, store, invalidator, DEFAULT_REFRESH_PATH))
	}

	#[tokio::test]
	async fn one_flight_serves_every_concurrent_caller() {
		let store = seeded_store().await;
		let transport = Arc::new(ScriptedTransport::new(200, "{\"accessToken\":\"fresh\"}"));
		let coordinator = build_coordinator(transport.clone(), store.clone(), None);
		let mut handles = Vec::new();

		for _ in 0..5 {
			let coordinator = coordinator.clone();

			handles.push(tokio::spawn(async move { coordinator.fresh_token().await }));
		}

		// Let every late caller park on the flight before it settles.
		while coordinator.metrics().joins() < 4 {
			tokio::task::yield_now().await;
		}

		transport.release().await;

		for handle in handles {
			let token = handle
				.await
				.expect("Coordinator task should not panic.")
				.expect("Every caller should receive the refreshed token.");

			assert_eq!(token.expose(), "fresh");
		}

		assert_eq!(transport.calls(), 1);
		assert_eq!(coordinator.metrics().flights(), 1);
		assert_eq!(coordinator.metrics().joins(), 4);

		let rotated = store
			.load()
			.await
			.expect("Store load should succeed after refresh.")
			.expect("Session should survive a successful refresh.");

		assert_eq!(rotated.access_token.expose(), "fresh");
	}

	#[tokio::test]
	async fn failed_flight_rejects_the_batch_and_tears_the_session_down() {
		let store = seeded_store().await;
		let transport =
			Arc::new(ScriptedTransport::new(401, "{\"error\":\"invalid_grant\"}"));
		let (fired, callback) = counting_callback();
		let coordinator = build_coordinator(transport.clone(), store.clone(), Some(callback));
		let mut handles = Vec::new();

		for _ in 0..4 {
			let coordinator = coordinator.clone();

			handles.push(tokio::spawn(async move { coordinator.fresh_token().await }));
		}

		while coordinator.metrics().joins() < 3 {
			tokio::task::yield_now().await;
		}

		transport.release().await;

		let mut owned = 0;
		let mut joined = 0;

		for handle in handles {
			match handle.await.expect("Coordinator task should not panic.") {
				Err(RefreshError::Owned { source }) => {
					owned += 1;

					assert!(source.is_unauthenticated());
				},
				Err(RefreshError::Joined { source }) => {
					joined += 1;

					assert!(source.is_unauthenticated());
				},
				other => panic!("Unexpected flight outcome: {other:?}"),
			}
		}

		assert_eq!(owned, 1);
		assert_eq!(joined, 3);
		assert_eq!(transport.calls(), 1);
		assert_eq!(fired.load(Ordering::SeqCst), 1);
		assert!(
			store.load().await.expect("Store load should succeed after teardown.").is_none()
		);
	}

	#[tokio::test]
	async fn missing_refresh_token_fails_without_a_network_call() {
		let store = Arc::new(MemoryStore::default());
		let transport = Arc::new(ScriptedTransport::new(200, "{}"));
		let (fired, callback) = counting_callback();
		let coordinator = build_coordinator(transport.clone(), store, Some(callback));
		let error = coordinator
			.fresh_token()
			.await
			.expect_err("Refresh without a stored refresh token should fail.");

		match error {
			RefreshError::Owned { source } =>
				assert!(matches!(*source, Error::Config(ConfigError::MissingRefreshToken))),
			other => panic!("Unexpected flight outcome: {other:?}"),
		}

		assert_eq!(transport.calls(), 0);
		assert_eq!(fired.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn unwound_flight_settles_waiters_and_returns_to_idle() {
		let store = seeded_store().await;
		let release = Arc::new(AsyncOnceCell::new());
		let transport = Arc::new(PanickingTransport { gate: release.clone() });
		let coordinator = build_coordinator(transport, store.clone(), None);
		let first_task = {
			let coordinator = coordinator.clone();

			tokio::spawn(async move { coordinator.fresh_token().await })
		};
		let second_task = {
			let coordinator = coordinator.clone();

			tokio::spawn(async move { coordinator.fresh_token().await })
		};

		while coordinator.metrics().joins() < 1 {
			tokio::task::yield_now().await;
		}

		let _ = release.set(()).await;

		let mut panicked = 0;
		let mut aborted = 0;

		for outcome in [first_task.await, second_task.await] {
			match outcome {
				Err(join_error) => {
					assert!(join_error.is_panic());

					panicked += 1;
				},
				Ok(Err(RefreshError::Aborted)) => aborted += 1,
				other => panic!("Unexpected flight outcome: {other:?}"),
			}
		}

		assert_eq!(panicked, 1, "The owning task should propagate its panic.");
		assert_eq!(aborted, 1, "The waiting task should observe the aborted flight.");
		assert!(!coordinator.state.lock().in_flight);
		assert_eq!(coordinator.state.lock().waiters.len(), 0);
	}

	#[test]
	fn waiter_queue_drains_atomically() {
		let mut queue = WaiterQueue::default();
		let first = queue.enqueue();
		let second = queue.enqueue();
		let drained = queue.drain();

		assert_eq!(drained.len(), 2);
		assert_eq!(queue.len(), 0);
		assert!(Arc::ptr_eq(&drained[0], &first));
		assert!(Arc::ptr_eq(&drained[1], &second));
	}
}
