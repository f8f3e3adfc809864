//! Relay-level error types and the failure classification shared across dispatch,
//! renewal, and storage.

// crates.io
use http::StatusCode;
// self
use crate::_prelude::*;

/// Relay-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical relay error exposed by public APIs.
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
	/// Transport failure (DNS, TCP, TLS, timeout); the network failure class.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Renewal could not produce a usable credential; the session has been torn down.
	#[error(transparent)]
	Renewal(#[from] RenewalError),

	/// Remote service rejected the access credential and the retry budget is spent.
	#[error("Remote service rejected the access credential.")]
	Unauthorized,
	/// Remote service refused the operation for an authenticated caller; never retried.
	#[error("Remote service refused the operation for this session.")]
	Forbidden,
	/// Any other non-success response, surfaced to the caller unchanged.
	#[error("Remote service returned an unexpected status: {status}.")]
	Upstream {
		/// HTTP status code returned by the remote service.
		status: u16,
		/// Raw response body, passed through for caller-side inspection.
		body: Vec<u8>,
	},
}
impl Error {
	/// Returns the [`FailureClass`] tag assigned when this error was produced.
	pub fn class(&self) -> FailureClass {
		match self {
			Self::Transport(_) => FailureClass::Network,
			Self::Unauthorized | Self::Renewal(_) => FailureClass::Unauthorized,
			Self::Forbidden => FailureClass::Forbidden,
			Self::Storage(_) | Self::Config(_) | Self::Upstream { .. } => FailureClass::Other,
		}
	}
}

/// Four-way classification assigned to every failed call.
///
/// The tag is derived exactly once per failure, at the dispatcher's decision point
/// for status-bearing responses or at the transport boundary for connection-level
/// failures, and drives all branching from there.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureClass {
	/// No response was received from the remote service.
	Network,
	/// The remote service answered 401; the credential may be renewable.
	Unauthorized,
	/// The remote service answered 403; authenticated but not permitted.
	Forbidden,
	/// Every other failure.
	Other,
}
impl FailureClass {
	/// Classifies a status-bearing response.
	///
	/// Connection-level failures never reach this function; they are tagged
	/// [`FailureClass::Network`] where the transport error surfaces.
	pub fn of_status(status: StatusCode) -> Self {
		match status.as_u16() {
			401 => Self::Unauthorized,
			403 => Self::Forbidden,
			_ => Self::Other,
		}
	}

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Network => "network",
			Self::Unauthorized => "unauthorized",
			Self::Forbidden => "forbidden",
			Self::Other => "other",
		}
	}
}
impl Display for FailureClass {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Configuration and validation failures raised by the relay.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Access credential cannot be encoded as an Authorization header.
	#[error("Access credential cannot be encoded as an Authorization header.")]
	CredentialHeader {
		/// Underlying header encoding failure.
		#[source]
		source: http::header::InvalidHeaderValue,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while reaching the remote service.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while reaching the remote service.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Verdict of a failed renewal cycle.
///
/// Cloneable so the single verdict can fan out to every suspended request. Every
/// variant except [`Abandoned`](RenewalError::Abandoned) implies the session has
/// been torn down.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RenewalError {
	/// A renewal endpoint rejected the refresh credential itself.
	#[error("Renewal endpoint rejected the refresh credential (status {status}).")]
	Rejected {
		/// HTTP status code returned by the renewal endpoint (401 or 403).
		status: u16,
	},
	/// Every candidate endpoint was tried without obtaining a credential.
	#[error("No renewal endpoint produced a usable access credential.")]
	Exhausted,
	/// The cycle's driving future was cancelled before a verdict was reached.
	/// Unlike the other variants the session is left intact; the next failure
	/// elects a fresh driver.
	#[error("Renewal cycle was abandoned before completing.")]
	Abandoned,
	/// No refresh credential exists, so no recovery path exists.
	#[error("No refresh credential is available to renew the session.")]
	MissingRefresh,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn status_classification_is_four_way() {
		assert_eq!(FailureClass::of_status(StatusCode::UNAUTHORIZED), FailureClass::Unauthorized);
		assert_eq!(FailureClass::of_status(StatusCode::FORBIDDEN), FailureClass::Forbidden);
		assert_eq!(FailureClass::of_status(StatusCode::NOT_FOUND), FailureClass::Other);
		assert_eq!(FailureClass::of_status(StatusCode::INTERNAL_SERVER_ERROR), FailureClass::Other);
	}

	#[test]
	fn error_class_matches_taxonomy() {
		let network: Error = TransportError::Io(std::io::Error::other("down")).into();

		assert_eq!(network.class(), FailureClass::Network);
		assert_eq!(Error::Unauthorized.class(), FailureClass::Unauthorized);
		assert_eq!(Error::Renewal(RenewalError::Exhausted).class(), FailureClass::Unauthorized);
		assert_eq!(Error::Forbidden.class(), FailureClass::Forbidden);
		assert_eq!(Error::Upstream { status: 500, body: Vec::new() }.class(), FailureClass::Other);
	}

	#[test]
	fn store_error_converts_with_source() {
		let store_error = crate::store::StoreError::Backend { message: "disk unreachable".into() };
		let relay_error: Error = store_error.clone().into();

		assert!(matches!(relay_error, Error::Storage(_)));
		assert!(relay_error.to_string().contains("disk unreachable"));

		let source = StdError::source(&relay_error)
			.expect("Relay error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}
}
