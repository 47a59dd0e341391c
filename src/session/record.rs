//! The session record and its wholesale-replacement lifecycle helpers.

// self
use crate::{
	_prelude::*,
	session::{identity::Identity, secret::TokenSecret},
};

/// Authenticated session owned by the store.
///
/// The record is replaced wholesale rather than mutated in place: a successful
/// refresh produces a new value via [`rotate`](Self::rotate), login installs a
/// fresh one, and invalidation removes it entirely. Only the coordinator, the
/// invalidator, and session installation write it through the store.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
	/// Short-lived credential attached to protected requests.
	pub access_token: TokenSecret,
	/// Longer-lived credential used solely to obtain a new access token.
	pub refresh_token: Option<TokenSecret>,
	/// Minimal identity record for the signed-in principal.
	pub identity: Identity,
}
impl Session {
	/// Creates a session holding the provided access token and identity.
	pub fn new(access_token: impl Into<String>, identity: Identity) -> Self {
		Self { access_token: TokenSecret::new(access_token), refresh_token: None, identity }
	}

	/// Attaches the refresh token issued alongside the access token.
	pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Returns the replacement session produced by a successful refresh.
	///
	/// The refresh token and identity persist unless the refresh response rotated
	/// the former; only the access token is always replaced.
	pub fn rotate(
		&self,
		access_token: impl Into<String>,
		refresh_token: Option<String>,
	) -> Self {
		Self {
			access_token: TokenSecret::new(access_token),
			refresh_token: refresh_token.map(TokenSecret::new).or_else(|| self.refresh_token.clone()),
			identity: self.identity.clone(),
		}
	}
}
impl Debug for Session {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Session")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("identity", &self.identity)
			.finish()
	}
}
