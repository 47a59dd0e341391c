//! Thread-safe in-memory [`SessionStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	session::Session,
	store::{
		self, ACCESS_TOKEN_KEY, IDENTITY_KEY, REFRESH_TOKEN_KEY, SessionStore, StoreError,
		StoreFuture,
	},
};

type EntryMap = Arc<RwLock<HashMap<String, String>>>;

/// Keeps the session entries in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(EntryMap);
impl MemoryStore {
	fn load_now(map: EntryMap) -> Result<Option<Session>, StoreError> {
		let guard = map.read();

		store::decode_entries(
			guard.get(ACCESS_TOKEN_KEY).map(String::as_str),
			guard.get(REFRESH_TOKEN_KEY).map(String::as_str),
			guard.get(IDENTITY_KEY).map(String::as_str),
		)
	}

	fn save_now(map: EntryMap, session: Session) -> Result<(), StoreError> {
		let entries = store::encode_entries(&session)?;
		let mut guard = map.write();

		// Replace wholesale so a refresh-less session does not inherit a stale entry.
		guard.clear();
		guard.extend(entries);

		Ok(())
	}

	fn clear_now(map: EntryMap) {
		map.write().clear();
	}
}
impl SessionStore for MemoryStore {
	fn load(&self) -> StoreFuture<'_, Option<Session>> {
		let map = self.0.clone();

		Box::pin(async move { Self::load_now(map) })
	}

	fn save(&self, session: Session) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move { Self::save_now(map, session) })
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			Self::clear_now(map);

			Ok(())
		})
	}
}
