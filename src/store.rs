//! Storage contracts and built-in stores for the authenticated session.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	session::{Identity, Session, TokenSecret},
};

/// Storage key holding the access token entry.
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Storage key holding the refresh token entry.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
/// Storage key holding the serialized identity record.
pub const IDENTITY_KEY: &str = "identity";

/// Boxed future returned by [`SessionStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persistence contract for the session record.
///
/// Implementations expose pure key/value semantics: the session is read and
/// replaced as a whole. Write discipline is enforced by the components above
/// the trait, not by the stores themselves: the coordinator rotates, the
/// invalidator clears, and session installation saves. Nothing else writes.
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Loads the persisted session, if one exists.
	fn load(&self) -> StoreFuture<'_, Option<Session>>;

	/// Persists or replaces the session record.
	fn save(&self, session: Session) -> StoreFuture<'_, ()>;

	/// Removes every session entry.
	fn clear(&self) -> StoreFuture<'_, ()>;
}

/// Error type produced by [`SessionStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Reassembles a [`Session`] from the three persisted entries.
///
/// A missing access token or identity entry means no usable session is stored;
/// a missing refresh token entry is a valid (refresh-less) session.
pub(crate) fn decode_entries(
	access: Option<&str>,
	refresh: Option<&str>,
	identity: Option<&str>,
) -> Result<Option<Session>, StoreError> {
	let (access, identity) = match (access, identity) {
		(Some(access), Some(identity)) => (access, identity),
		_ => return Ok(None),
	};
	let identity =
		serde_json::from_str::<Identity>(identity).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse the identity entry: {e}"),
		})?;
	let mut session = Session::new(access, identity);

	if let Some(value) = refresh {
		session = session.with_refresh_token(value);
	}

	Ok(Some(session))
}

/// Serializes the identity record for its key/value entry.
pub(crate) fn encode_identity(identity: &Identity) -> Result<String, StoreError> {
	serde_json::to_string(identity).map_err(|e| StoreError::Serialization {
		message: format!("Failed to serialize the identity entry: {e}"),
	})
}

/// Flattens a session into its three key/value entries.
pub(crate) fn encode_entries(session: &Session) -> Result<Vec<(String, String)>, StoreError> {
	let mut entries = vec![
		(ACCESS_TOKEN_KEY.to_owned(), session.access_token.expose().to_owned()),
		(IDENTITY_KEY.to_owned(), encode_identity(&session.identity)?),
	];

	if let Some(refresh) = session.refresh_token.as_ref().map(TokenSecret::expose) {
		entries.push((REFRESH_TOKEN_KEY.to_owned(), refresh.to_owned()));
	}

	Ok(entries)
}
