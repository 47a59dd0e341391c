// std
use std::sync::Arc;
// self
use refresh_gate::{
	session::{Identity, Session, TokenSecret},
	store::{MemoryStore, SessionStore},
};

fn identity_fixture() -> Identity {
	Identity { id: "u-42".into(), display_name: "Grace".into(), role: "manager".into() }
}

#[tokio::test]
async fn session_round_trips_through_the_memory_store() {
	let store = Arc::new(MemoryStore::default());
	let session = Session::new("access-1", identity_fixture()).with_refresh_token("refresh-1");

	store.save(session).await.expect("Saving a session should succeed.");

	let restored = store
		.load()
		.await
		.expect("Loading should succeed.")
		.expect("A saved session should be restored.");

	assert_eq!(restored.access_token.expose(), "access-1");
	assert_eq!(restored.refresh_token.as_ref().map(TokenSecret::expose), Some("refresh-1"));
	assert_eq!(restored.identity, identity_fixture());
}

#[tokio::test]
async fn a_refresh_less_session_restores_without_a_refresh_token() {
	let store = Arc::new(MemoryStore::default());

	store
		.save(Session::new("access-only", identity_fixture()))
		.await
		.expect("Saving a refresh-less session should succeed.");

	let restored = store
		.load()
		.await
		.expect("Loading should succeed.")
		.expect("A saved session should be restored.");

	assert!(restored.refresh_token.is_none());
}

#[tokio::test]
async fn replacing_a_session_discards_stale_entries() {
	let store = Arc::new(MemoryStore::default());

	store
		.save(Session::new("access-1", identity_fixture()).with_refresh_token("refresh-1"))
		.await
		.expect("Saving the first session should succeed.");
	store
		.save(Session::new("access-2", identity_fixture()))
		.await
		.expect("Replacing the session should succeed.");

	let restored = store
		.load()
		.await
		.expect("Loading should succeed.")
		.expect("The replacement session should be restored.");

	assert_eq!(restored.access_token.expose(), "access-2");
	assert!(restored.refresh_token.is_none(), "The stale refresh entry must not survive.");
}

#[tokio::test]
async fn clear_removes_every_entry() {
	let store = Arc::new(MemoryStore::default());

	store
		.save(Session::new("access-1", identity_fixture()).with_refresh_token("refresh-1"))
		.await
		.expect("Saving a session should succeed.");
	store.clear().await.expect("Clearing should succeed.");

	assert!(store.load().await.expect("Loading should succeed.").is_none());
}
