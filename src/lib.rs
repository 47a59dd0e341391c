//! Rust's transparent bearer-token HTTP client—singleflight refresh coordination, replay-once
//! retries, and session-aware stores in one crate built for production.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod authn;
pub mod client;
pub mod error;
pub mod gate;
pub mod http;
pub mod obs;
pub mod policy;
pub mod refresh;
pub mod session;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		client::Client,
		http::ReqwestTransport,
		session::{Identity, Session},
		store::{MemoryStore, SessionStore},
	};

	/// Client type alias used by reqwest-backed integration tests.
	pub type ReqwestTestClient = Client<ReqwestTransport>;

	/// Builds a reqwest transport pointed at the provided mock backend base URL.
	pub fn test_reqwest_transport(base_url: &str) -> ReqwestTransport {
		ReqwestTransport::new(base_url).expect("Failed to build Reqwest transport for tests.")
	}

	/// Constructs a [`Client`] backed by an in-memory store and the reqwest transport used
	/// across integration tests.
	pub fn build_reqwest_test_client(base_url: &str) -> (ReqwestTestClient, Arc<MemoryStore>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn SessionStore> = store_backend.clone();
		let client = Client::builder(test_reqwest_transport(base_url), store).build();

		(client, store_backend)
	}

	/// Session fixture carrying the provided tokens and a minimal identity record.
	pub fn test_session(access: &str, refresh: Option<&str>) -> Session {
		let identity = Identity {
			id: "user-1".into(),
			display_name: "Test User".into(),
			role: "admin".into(),
		};
		let mut session = Session::new(access, identity);

		if let Some(value) = refresh {
			session = session.with_refresh_token(value);
		}

		session
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::OnceCell as AsyncOnceCell;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _, tokio as _};
