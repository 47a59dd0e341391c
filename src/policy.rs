//! Endpoint access classification driving credential attachment and refresh gating.

// self
use crate::_prelude::*;

/// Access classification for a request path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Access {
	/// No credential is attached and a 401 never triggers a refresh.
	Public,
	/// Requests must carry the session's access token.
	Protected,
}
impl Access {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Access::Public => "public",
			Access::Protected => "protected",
		}
	}
}
impl Display for Access {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Errors raised while constructing or validating an endpoint policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum EndpointPolicyError {
	/// Public prefixes must be non-empty.
	#[error("Public prefix cannot be empty.")]
	EmptyPrefix,
	/// Public prefixes must be rooted at `/`.
	#[error("Public prefix `{prefix}` must start with `/`.")]
	UnrootedPrefix {
		/// Offending prefix value.
		prefix: String,
	},
}

/// Immutable classification table mapping path prefixes to [`Access`] levels.
///
/// Review the public allowlist whenever a new unauthenticated endpoint is added.
/// A missing prefix causes spurious refresh attempts when such an endpoint
/// returns 401, and attaches a credential to an endpoint that was never meant
/// to receive one.
#[derive(Clone, Debug)]
pub struct EndpointPolicy {
	public_prefixes: Vec<String>,
}
impl EndpointPolicy {
	/// Prefixes treated as public when no custom policy is supplied.
	///
	/// The auth endpoints must stay public: the refresh call itself would
	/// otherwise carry the very credential whose expiry triggered it.
	pub const DEFAULT_PUBLIC_PREFIXES: [&'static str; 2] = ["/auth/", "/health"];

	/// Builds a policy from the provided public prefixes.
	pub fn new<I, S>(prefixes: I) -> Result<Self, EndpointPolicyError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let public_prefixes = prefixes
			.into_iter()
			.map(|prefix| {
				let prefix = prefix.into();

				if prefix.is_empty() {
					return Err(EndpointPolicyError::EmptyPrefix);
				}
				if !prefix.starts_with('/') {
					return Err(EndpointPolicyError::UnrootedPrefix { prefix });
				}

				Ok(prefix)
			})
			.collect::<Result<Vec<_>, _>>()?;

		Ok(Self { public_prefixes })
	}

	/// Classifies a request path, ignoring any query or fragment component.
	pub fn classify(&self, path: &str) -> Access {
		let path = path.split(['?', '#']).next().unwrap_or(path);

		if self.public_prefixes.iter().any(|prefix| path.starts_with(prefix)) {
			Access::Public
		} else {
			Access::Protected
		}
	}
}
impl Default for EndpointPolicy {
	fn default() -> Self {
		Self { public_prefixes: Self::DEFAULT_PUBLIC_PREFIXES.map(str::to_owned).to_vec() }
	}
}
