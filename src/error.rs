//! Client-level error types shared across the facade, gate, coordinator, and stores.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Backend payload could not be decoded.
	#[error(transparent)]
	Decode(#[from] DecodeError),
	/// Session refresh failure observed by a caller.
	#[error(transparent)]
	Refresh(#[from] RefreshError),
	/// Backend answered with a non-success status.
	#[error(transparent)]
	Status(#[from] StatusError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
}
impl Error {
	/// Returns `true` when the error is the designated unauthenticated status.
	///
	/// Transport failures without a response deliberately return `false`: it is
	/// ambiguous whether the backend saw the request at all, so they never drive
	/// a refresh.
	pub fn is_unauthenticated(&self) -> bool {
		matches!(self, Self::Status(status) if status.is_unauthenticated())
	}
}

/// Configuration and validation failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP transport could not be constructed.
	#[error("HTTP transport could not be constructed.")]
	TransportBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Base URL cannot be parsed.
	#[error("Base URL is invalid.")]
	InvalidBaseUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request path cannot be joined onto the base URL.
	#[error("Request path `{path}` cannot be joined onto the base URL.")]
	InvalidPath {
		/// Offending backend-relative path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request body could not be serialized to JSON.
	#[error("Request body could not be serialized.")]
	BodyEncode {
		/// Underlying serialization failure.
		#[source]
		source: serde_json::Error,
	},
	/// Stored session lacks the refresh secret the coordinator needs.
	#[error("Stored session is missing a refresh token.")]
	MissingRefreshToken,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn transport_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::TransportBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::transport_build(e)
	}
}

/// Decode failures for backend JSON payloads.
#[derive(Debug, ThisError)]
pub enum DecodeError {
	/// Backend returned JSON that does not match the expected shape.
	#[error("Backend returned malformed JSON.")]
	Json {
		/// Structured parsing failure naming the failing path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status the payload arrived with.
		status: u16,
	},
}

/// Non-success HTTP status observed on an otherwise healthy transport.
#[derive(Clone, Debug, ThisError)]
#[error("Backend responded with HTTP {status} for `{path}`.")]
pub struct StatusError {
	/// HTTP status code returned by the backend.
	pub status: u16,
	/// Request path that produced the response.
	pub path: String,
	/// Truncated response body retained for diagnostics.
	pub body: String,
}
impl StatusError {
	/// Designated status signalling an expired or missing credential.
	pub const UNAUTHENTICATED: u16 = 401;

	const BODY_SNIPPET_LEN: usize = 256;

	/// Builds a status error, truncating the body snippet to a diagnostic-sized chunk.
	pub fn new(status: u16, path: impl Into<String>, body: &[u8]) -> Self {
		let mut snippet = String::from_utf8_lossy(body).into_owned();

		if snippet.len() > Self::BODY_SNIPPET_LEN {
			let cut = (0..=Self::BODY_SNIPPET_LEN)
				.rev()
				.find(|idx| snippet.is_char_boundary(*idx))
				.unwrap_or(0);

			snippet.truncate(cut);
		}

		Self { status, path: path.into(), body: snippet }
	}

	/// Returns `true` when the status is the designated unauthenticated code.
	pub fn is_unauthenticated(&self) -> bool {
		self.status == Self::UNAUTHENTICATED
	}
}

/// Refresh-flow failures surfaced by the coordinator.
///
/// The variants distinguish the caller that performed the physical refresh call
/// from the callers that joined it, so the gate can preserve caller-visible
/// semantics: the owner keeps its original request error, waiters surface the
/// refresh failure itself.
#[derive(Clone, Debug, ThisError)]
pub enum RefreshError {
	/// This caller owned the refresh call and it failed.
	#[error("Session refresh failed.")]
	Owned {
		/// Underlying refresh failure, shared with every queued waiter.
		#[source]
		source: Arc<Error>,
	},
	/// A refresh owned by another caller failed while this caller waited on it.
	#[error("Session refresh failed while waiting on the in-flight call.")]
	Joined {
		/// Underlying refresh failure, shared across the waiting batch.
		#[source]
		source: Arc<Error>,
	},
	/// The in-flight refresh unwound before settling its waiters.
	#[error("Session refresh was aborted before settling.")]
	Aborted,
}
impl RefreshError {
	/// Returns the underlying refresh failure, if the flight settled with one.
	pub fn source_error(&self) -> Option<&Error> {
		match self {
			Self::Owned { source } | Self::Joined { source } => Some(source),
			Self::Aborted => None,
		}
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP stack reported a network failure.
	#[error("Network error occurred while calling the backend.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the backend.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn unauthenticated_detection_is_limited_to_the_designated_status() {
		let unauthenticated: Error = StatusError::new(401, "/vehicles", b"{}").into();
		let forbidden: Error = StatusError::new(403, "/vehicles", b"{}").into();
		let network: Error = TransportError::network(std::io::Error::other("down")).into();

		assert!(unauthenticated.is_unauthenticated());
		assert!(!forbidden.is_unauthenticated());
		assert!(!network.is_unauthenticated());
	}

	#[test]
	fn status_error_truncates_body_on_char_boundaries() {
		let body = "é".repeat(300);
		let error = StatusError::new(500, "/reports", body.as_bytes());

		assert!(error.body.len() <= 256);
		assert!(error.body.starts_with('é'));
	}

	#[test]
	fn refresh_error_exposes_the_shared_source() {
		let source = Arc::new(Error::from(StatusError::new(401, "/auth/refresh", b"{}")));
		let owned = RefreshError::Owned { source: source.clone() };
		let joined = RefreshError::Joined { source };

		assert!(owned.source_error().is_some_and(Error::is_unauthenticated));
		assert!(joined.source_error().is_some_and(Error::is_unauthenticated));
		assert!(RefreshError::Aborted.source_error().is_none());
	}
}
