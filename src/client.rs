//! The HTTP client facade composing authenticator, gate, and coordinator.

// self
use crate::{
	_prelude::*,
	authn::RequestAuthenticator,
	error::StatusError,
	gate::{RequestAttempt, ResponseAuthGate, Verdict},
	http::{Request, Response, Transport},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	policy::EndpointPolicy,
	refresh::{DEFAULT_REFRESH_PATH, RefreshCoordinator, RefreshMetrics},
	session::{Session, SessionInvalidator, TokenSecret, UnauthorizedCallback},
	store::SessionStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestGateClient = Client<ReqwestTransport>;

/// Authenticated HTTP client for a single backend.
///
/// The facade is the only entry point the rest of an application calls: it
/// attaches credentials on the way out, inspects failures on the way back, and
/// transparently performs the refresh-and-replay dance. The coordinator and
/// invalidator it owns are constructed here and injected into the gate, so all
/// refresh state lives in this object graph rather than at module scope.
pub struct Client<T>
where
	T: ?Sized + Transport,
{
	/// Transport executing every network call.
	pub transport: Arc<T>,
	/// Store holding the session record.
	pub store: Arc<dyn SessionStore>,
	/// Endpoint access policy shared by authenticator and gate.
	pub policy: Arc<EndpointPolicy>,
	authenticator: RequestAuthenticator,
	gate: ResponseAuthGate<T>,
	coordinator: Arc<RefreshCoordinator<T>>,
	invalidator: Arc<SessionInvalidator>,
}
impl<T> Client<T>
where
	T: ?Sized + Transport,
{
	/// Starts building a client over the provided transport and store.
	pub fn builder(
		transport: impl Into<Arc<T>>,
		store: Arc<dyn SessionStore>,
	) -> ClientBuilder<T> {
		ClientBuilder::new(transport, store)
	}

	/// Sends a request, attaching credentials and replaying once on token expiry.
	///
	/// The request is prepared by the authenticator, executed, and the outcome
	/// is assessed by the gate. At most one replay is dispatched, carrying the
	/// exact token the refresh returned rather than re-reading the store.
	pub async fn send(&self, request: Request) -> Result<Response> {
		const KIND: FlowKind = FlowKind::Dispatch;

		let span = FlowSpan::new(KIND, "send");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let mut attempt = RequestAttempt::new(request);
				let mut replay_token = None;

				loop {
					let outcome = self.dispatch(attempt.request(), replay_token.as_ref()).await;

					match self.gate.assess(&attempt, outcome).await {
						Verdict::Settle(result) => return result,
						Verdict::Replay { token } => {
							obs::record_flow_outcome(FlowKind::Replay, FlowOutcome::Attempt);

							attempt = attempt.into_replay();
							replay_token = Some(token);
						},
					}
				}
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn dispatch(
		&self,
		request: &Request,
		replay_token: Option<&TokenSecret>,
	) -> Result<Response> {
		let prepared = match replay_token {
			Some(token) => request.clone().with_bearer(token.expose()),
			None => self.authenticator.prepare(request.clone()).await?,
		};
		let response = self.transport.execute(prepared).await?;

		if response.is_success() {
			Ok(response)
		} else {
			Err(StatusError::new(response.status, &request.path, &response.body).into())
		}
	}

	/// Stores a freshly issued session and re-arms the invalidator.
	pub async fn install_session(&self, session: Session) -> Result<()> {
		self.store.save(session).await?;
		self.invalidator.rearm();

		Ok(())
	}

	/// Clears the stored session without firing the unauthorized callback.
	pub async fn sign_out(&self) -> Result<()> {
		self.store.clear().await?;

		Ok(())
	}

	/// Shared counters describing refresh activity.
	pub fn refresh_metrics(&self) -> Arc<RefreshMetrics> {
		self.coordinator.metrics()
	}

	/// Issues a `GET` request against `path`.
	pub async fn get(&self, path: impl Into<String>) -> Result<Response> {
		self.send(Request::get(path)).await
	}

	/// Issues a `POST` request with `payload` serialized as JSON.
	pub async fn post_json<P>(&self, path: impl Into<String>, payload: &P) -> Result<Response>
	where
		P: ?Sized + Serialize,
	{
		self.send(Request::post(path).with_json_body(payload)?).await
	}

	/// Issues a `PUT` request with `payload` serialized as JSON.
	pub async fn put_json<P>(&self, path: impl Into<String>, payload: &P) -> Result<Response>
	where
		P: ?Sized + Serialize,
	{
		self.send(Request::put(path).with_json_body(payload)?).await
	}

	/// Issues a `DELETE` request against `path`.
	pub async fn delete(&self, path: impl Into<String>) -> Result<Response> {
		self.send(Request::delete(path)).await
	}
}
#[cfg(feature = "reqwest")]
impl Client<ReqwestTransport> {
	/// Creates a client over a default reqwest transport bound to `base_url`.
	///
	/// Use [`Client::builder`] with [`ReqwestTransport::with_client`] when the
	/// application needs custom TLS, timeout, or proxy settings.
	pub fn new(base_url: impl AsRef<str>, store: Arc<dyn SessionStore>) -> Result<Self> {
		Ok(Self::builder(ReqwestTransport::new(base_url)?, store).build())
	}
}
impl<T> Clone for Client<T>
where
	T: ?Sized + Transport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			store: self.store.clone(),
			policy: self.policy.clone(),
			authenticator: self.authenticator.clone(),
			gate: self.gate.clone(),
			coordinator: self.coordinator.clone(),
			invalidator: self.invalidator.clone(),
		}
	}
}
impl<T> Debug for Client<T>
where
	T: ?Sized + Transport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Client")
			.field("policy", &self.policy)
			.field("coordinator", &self.coordinator)
			.finish()
	}
}

/// Builder for [`Client`] values.
pub struct ClientBuilder<T>
where
	T: ?Sized + Transport,
{
	transport: Arc<T>,
	store: Arc<dyn SessionStore>,
	policy: EndpointPolicy,
	refresh_path: String,
	on_unauthorized: Option<UnauthorizedCallback>,
}
impl<T> ClientBuilder<T>
where
	T: ?Sized + Transport,
{
	fn new(transport: impl Into<Arc<T>>, store: Arc<dyn SessionStore>) -> Self {
		Self {
			transport: transport.into(),
			store,
			policy: EndpointPolicy::default(),
			refresh_path: DEFAULT_REFRESH_PATH.into(),
			on_unauthorized: None,
		}
	}

	/// Overrides the endpoint access policy.
	pub fn policy(mut self, policy: EndpointPolicy) -> Self {
		self.policy = policy;

		self
	}

	/// Overrides the backend path of the refresh endpoint.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Registers the host callback fired on unrecoverable session loss.
	pub fn on_unauthorized(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
		self.on_unauthorized = Some(Arc::new(callback));

		self
	}

	/// Consumes the builder and wires the component graph.
	pub fn build(self) -> Client<T> {
		let policy = Arc::new(self.policy);
		let invalidator =
			Arc::new(SessionInvalidator::new(self.store.clone(), self.on_unauthorized));
		let coordinator = Arc::new(RefreshCoordinator::new(
			self.transport.clone(),
			self.store.clone(),
			invalidator.clone(),
			self.refresh_path,
		));
		let authenticator = RequestAuthenticator::new(policy.clone(), self.store.clone());
		let gate = ResponseAuthGate::new(
			policy.clone(),
			self.store.clone(),
			coordinator.clone(),
			invalidator.clone(),
		);

		Client {
			transport: self.transport,
			store: self.store,
			policy,
			authenticator,
			gate,
			coordinator,
			invalidator,
		}
	}
}
impl<T> Debug for ClientBuilder<T>
where
	T: ?Sized + Transport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientBuilder")
			.field("refresh_path", &self.refresh_path)
			.field("callback_set", &self.on_unauthorized.is_some())
			.finish()
	}
}
