//! Wire payloads exchanged with the auth endpoints.

// self
use crate::{
	_prelude::*,
	session::{identity::Identity, record::Session, secret::TokenSecret},
};

/// Body of the refresh call (`POST` to the refresh path).
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
	/// Refresh token presented to mint a new access token.
	pub refresh_token: TokenSecret,
}

/// Success body returned by the refresh endpoint.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshGrant {
	/// Replacement access token.
	pub access_token: TokenSecret,
	/// Rotated refresh token; absent means the stored one remains valid.
	#[serde(default)]
	pub refresh_token: Option<TokenSecret>,
}

/// Success body returned by the login endpoint.
///
/// The login flow itself lives outside this crate; the grant is consumed only to
/// build the [`Session`] the store holds afterwards.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginGrant {
	/// Initial access token.
	pub access_token: TokenSecret,
	/// Initial refresh token.
	pub refresh_token: TokenSecret,
	/// Minimal identity payload for the signed-in user.
	pub user: Identity,
}
impl From<LoginGrant> for Session {
	fn from(grant: LoginGrant) -> Self {
		Session::new(grant.access_token.expose(), grant.user)
			.with_refresh_token(grant.refresh_token.expose())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn login_grant_builds_a_complete_session() {
		let payload = "{\"accessToken\":\"a-1\",\"refreshToken\":\"r-1\",\
			\"user\":{\"id\":\"u-1\",\"displayName\":\"Ada\",\"role\":\"admin\"}}";
		let grant: LoginGrant =
			serde_json::from_str(payload).expect("Login grant should deserialize from JSON.");
		let session = Session::from(grant);

		assert_eq!(session.access_token.expose(), "a-1");
		assert_eq!(session.refresh_token.as_ref().map(TokenSecret::expose), Some("r-1"));
		assert_eq!(session.identity.id, "u-1");
	}

	#[test]
	fn refresh_grant_tolerates_a_missing_rotation() {
		let grant: RefreshGrant = serde_json::from_str("{\"accessToken\":\"a-2\"}")
			.expect("Refresh grant should deserialize without a refreshToken field.");

		assert_eq!(grant.access_token.expose(), "a-2");
		assert!(grant.refresh_token.is_none());
	}

	#[test]
	fn refresh_request_serializes_in_camel_case() {
		let request = RefreshRequest { refresh_token: TokenSecret::new("r-9") };
		let payload =
			serde_json::to_string(&request).expect("Refresh request should serialize to JSON.");

		assert_eq!(payload, "{\"refreshToken\":\"r-9\"}");
	}
}
