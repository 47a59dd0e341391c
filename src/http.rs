//! Transport primitives for the authenticated client.
//!
//! The module exposes [`Transport`] alongside the crate's [`Request`] and
//! [`Response`] types so downstream applications can integrate custom HTTP
//! stacks without losing refresh or replay semantics. Implementations execute
//! exactly one network call per [`Transport::execute`] invocation: retries,
//! credential attachment, and refresh handling all live above this seam, which
//! is also what keeps the refresh call itself credential-free.

// self
use crate::{
	_prelude::*,
	error::{ConfigError, DecodeError, TransportError},
};

/// Header name carrying the bearer credential.
pub const AUTHORIZATION_HEADER: &str = "authorization";
/// Header name carrying the request body media type.
pub const CONTENT_TYPE_HEADER: &str = "content-type";

/// HTTP methods used by the dashboard backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
	/// HTTP `DELETE`.
	Delete,
	/// HTTP `GET`.
	Get,
	/// HTTP `PATCH`.
	Patch,
	/// HTTP `POST`.
	Post,
	/// HTTP `PUT`.
	Put,
}
impl Method {
	/// Returns the canonical method token.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Delete => "DELETE",
			Method::Get => "GET",
			Method::Patch => "PATCH",
			Method::Post => "POST",
			Method::Put => "PUT",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outgoing request addressed by a backend-relative path.
#[derive(Clone, Debug)]
pub struct Request {
	/// HTTP method.
	pub method: Method,
	/// Backend-relative path, starting with `/`.
	pub path: String,
	/// Header name/value pairs; names are matched case-insensitively.
	pub headers: Vec<(String, String)>,
	/// Optional request body.
	pub body: Option<Vec<u8>>,
}
impl Request {
	/// Creates a request with the provided method and path.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), headers: Vec::new(), body: None }
	}

	/// Convenience constructor for `GET` requests.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::Get, path)
	}

	/// Convenience constructor for `POST` requests.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::Post, path)
	}

	/// Convenience constructor for `PUT` requests.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::Put, path)
	}

	/// Convenience constructor for `DELETE` requests.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::Delete, path)
	}

	/// Sets a header, replacing any existing value with the same name.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		let name = name.into();

		self.headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
		self.headers.push((name, value.into()));

		self
	}

	/// Attaches the bearer credential header.
	pub fn with_bearer(self, token: &str) -> Self {
		self.with_header(AUTHORIZATION_HEADER, format!("Bearer {token}"))
	}

	/// Sets the raw request body.
	pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Serializes `payload` as the JSON body and sets the content type.
	pub fn with_json_body<T>(self, payload: &T) -> Result<Self>
	where
		T: ?Sized + Serialize,
	{
		let body = serde_json::to_vec(payload)
			.map_err(|source| ConfigError::BodyEncode { source })?;

		Ok(self.with_header(CONTENT_TYPE_HEADER, "application/json").with_body(body))
	}

	/// Returns the header value for `name`, if set.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(existing, _)| existing.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}
}

/// Response produced by a [`Transport`].
#[derive(Clone, Debug)]
pub struct Response {
	/// HTTP status code.
	pub status: u16,
	/// Response headers as name/value pairs.
	pub headers: Vec<(String, String)>,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl Response {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Deserializes the body as JSON, reporting the failing path on mismatch.
	pub fn json<T>(&self) -> Result<T, DecodeError>
	where
		T: for<'de> Deserialize<'de>,
	{
		let mut deserializer = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| DecodeError::Json { source, status: self.status })
	}

	/// Returns the body as UTF-8 text, replacing invalid sequences.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}

/// Boxed future returned by [`Transport::execute`].
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<Response>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing dashboard requests.
///
/// The trait is the crate's only dependency on an HTTP implementation.
/// Implementations must not retry, follow auth-driven redirects, or attach
/// credentials on their own; they translate one [`Request`] into one network
/// call and surface transport failures as [`TransportError`] values.
pub trait Transport
where
	Self: 'static + Send + Sync,
{
	/// Executes a single network call for `request`.
	fn execute(&self, request: Request) -> TransportFuture<'_>;
}

#[cfg(feature = "reqwest")]
/// Thin wrapper around [`ReqwestClient`] bound to the backend base URL.
///
/// Timeouts configured on the wrapped client govern every call, including the
/// refresh call; a refresh that exceeds them surfaces as a transport failure
/// rather than leaving waiters pending.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
	client: ReqwestClient,
	base_url: Url,
}
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Builds a transport for the provided base URL with a default client.
	pub fn new(base_url: impl AsRef<str>) -> Result<Self, ConfigError> {
		let base_url = Url::parse(base_url.as_ref())
			.map_err(|source| ConfigError::InvalidBaseUrl { source })?;

		Ok(Self { client: ReqwestClient::default(), base_url })
	}

	/// Replaces the wrapped [`ReqwestClient`] (custom TLS, timeouts, proxies).
	pub fn with_client(mut self, client: ReqwestClient) -> Self {
		self.client = client;

		self
	}

	fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
		self.base_url
			.join(path)
			.map_err(|source| ConfigError::InvalidPath { path: path.into(), source })
	}
}
#[cfg(feature = "reqwest")]
impl Transport for ReqwestTransport {
	fn execute(&self, request: Request) -> TransportFuture<'_> {
		Box::pin(async move {
			let url = self.endpoint(&request.path)?;
			let mut builder = match request.method {
				Method::Delete => self.client.delete(url),
				Method::Get => self.client.get(url),
				Method::Patch => self.client.patch(url),
				Method::Post => self.client.post(url),
				Method::Put => self.client.put(url),
			};

			for (name, value) in &request.headers {
				builder = builder.header(name.as_str(), value.as_str());
			}
			if let Some(body) = request.body {
				builder = builder.body(body);
			}

			let response = builder.send().await.map_err(TransportError::from)?;
			let status = response.status().as_u16();
			let headers = response
				.headers()
				.iter()
				.map(|(name, value)| {
					(name.as_str().to_owned(), String::from_utf8_lossy(value.as_bytes()).into_owned())
				})
				.collect();
			let body = response.bytes().await.map_err(TransportError::from)?.to_vec();

			Ok(Response { status, headers, body })
		})
	}
}
