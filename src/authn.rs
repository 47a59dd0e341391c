//! Pre-send hook attaching the bearer credential to protected requests.

// self
use crate::{
	_prelude::*,
	http::Request,
	policy::{Access, EndpointPolicy},
	store::SessionStore,
};

/// Attaches the current access token to protected requests before dispatch.
#[derive(Clone)]
pub struct RequestAuthenticator {
	policy: Arc<EndpointPolicy>,
	store: Arc<dyn SessionStore>,
}
impl RequestAuthenticator {
	/// Creates an authenticator over the provided policy and store.
	pub fn new(policy: Arc<EndpointPolicy>, store: Arc<dyn SessionStore>) -> Self {
		Self { policy, store }
	}

	/// Returns the request with the bearer header attached when its path is protected.
	///
	/// Public paths pass through untouched regardless of store contents. A
	/// protected path with no stored session also passes through; the backend's
	/// 401 then drives the refresh flow instead of failing locally.
	pub async fn prepare(&self, request: Request) -> Result<Request> {
		if self.policy.classify(&request.path) == Access::Public {
			return Ok(request);
		}

		match self.store.load().await? {
			Some(session) => Ok(request.with_bearer(session.access_token.expose())),
			None => Ok(request),
		}
	}
}
impl Debug for RequestAuthenticator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestAuthenticator").finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		http::AUTHORIZATION_HEADER,
		session::{Identity, Session},
		store::MemoryStore,
	};

	async fn seeded_authenticator() -> RequestAuthenticator {
		let store = Arc::new(MemoryStore::default());
		let identity =
			Identity { id: "u-1".into(), display_name: "Ada".into(), role: "admin".into() };

		store
			.save(Session::new("access-1", identity))
			.await
			.expect("Failed to seed session fixture.");

		RequestAuthenticator::new(Arc::new(EndpointPolicy::default()), store)
	}

	#[tokio::test]
	async fn protected_requests_receive_the_bearer_header() {
		let authenticator = seeded_authenticator().await;
		let prepared = authenticator
			.prepare(Request::get("/vehicles"))
			.await
			.expect("Prepare should succeed for protected paths.");

		assert_eq!(prepared.header(AUTHORIZATION_HEADER), Some("Bearer access-1"));
	}

	#[tokio::test]
	async fn public_requests_never_carry_a_credential() {
		let authenticator = seeded_authenticator().await;
		let prepared = authenticator
			.prepare(Request::get("/health"))
			.await
			.expect("Prepare should succeed for public paths.");

		assert_eq!(prepared.header(AUTHORIZATION_HEADER), None);
	}

	#[tokio::test]
	async fn missing_session_passes_the_request_through() {
		let authenticator = RequestAuthenticator::new(
			Arc::new(EndpointPolicy::default()),
			Arc::new(MemoryStore::default()),
		);
		let prepared = authenticator
			.prepare(Request::get("/vehicles"))
			.await
			.expect("Prepare should succeed without a session.");

		assert_eq!(prepared.header(AUTHORIZATION_HEADER), None);
	}
}
