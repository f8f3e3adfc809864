//! Bearer credential types with log-safe redaction.

// self
use crate::_prelude::*;

/// Redacted credential wrapper keeping bearer material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret(String);
impl Secret {
	/// Wraps a new credential string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner credential value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for Secret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl From<String> for Secret {
	fn from(value: String) -> Self {
		Self(value)
	}
}
impl From<&str> for Secret {
	fn from(value: &str) -> Self {
		Self(value.into())
	}
}
impl Debug for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("Secret").field(&"<redacted>").finish()
	}
}
impl Display for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Opaque bearer credential pair for an authenticated session.
///
/// The relay never parses either value and never inspects expiry; the remote
/// service is the sole authority on validity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
	/// Short-lived access credential attached to outbound calls.
	pub access: Secret,
	/// Longer-lived refresh credential used solely for renewal.
	pub refresh: Secret,
}
impl CredentialPair {
	/// Builds a pair from the two bearer strings.
	pub fn new(access: impl Into<Secret>, refresh: impl Into<Secret>) -> Self {
		Self { access: access.into(), refresh: refresh.into() }
	}
}
