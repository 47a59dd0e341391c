//! Minimal identity record persisted alongside the session tokens.

// self
use crate::_prelude::*;

/// Minimal identity persisted with the session.
///
/// Only the fields required to render the shell of a signed-in application are
/// kept here; full profiles are fetched separately by services outside this
/// crate's scope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
	/// Stable subject identifier.
	pub id: String,
	/// Human-readable display name.
	pub display_name: String,
	/// Coarse authorization role.
	pub role: String,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn identity_round_trips_in_camel_case() {
		let payload = "{\"id\":\"u-1\",\"displayName\":\"Ada\",\"role\":\"admin\"}";
		let identity: Identity =
			serde_json::from_str(payload).expect("Identity should deserialize from camelCase JSON.");

		assert_eq!(identity.display_name, "Ada");

		let serialized =
			serde_json::to_string(&identity).expect("Identity should serialize back to JSON.");

		assert_eq!(serialized, payload);
	}
}
