//! Transport primitives shared by dispatch and renewal.
//!
//! The module exposes [`Transport`] together with the [`RequestParts`] and
//! [`ResponseParts`] wire records so downstream crates can plug in custom HTTP
//! stacks. The relay only ever inspects the status-code class of a response and,
//! during renewal, the `access` field of its JSON body; everything else passes
//! through untouched.

// crates.io
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
// self
use crate::{_prelude::*, error::TransportError};

/// Boxed future returned by [`Transport`] implementations.
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<ResponseParts, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing relay calls.
///
/// The trait is the relay's only dependency on an HTTP stack. Implementations must
/// be `Send + Sync` so a single transport (typically behind `Arc<T>`) can serve many
/// logically concurrent in-flight requests, and the returned futures must be `Send`
/// for the same reason. The relay imposes no timeout of its own; transports should
/// surface their own timeout as a [`TransportError`], which the relay classifies as
/// a network-level failure.
pub trait Transport
where
	Self: Send + Sync,
{
	/// Executes one HTTP exchange and resolves with the raw response parts.
	///
	/// Every non-transport outcome, including 4xx and 5xx statuses, must resolve
	/// `Ok` so the relay can classify it; `Err` is reserved for cases where no
	/// response was received at all.
	fn execute(&self, request: RequestParts) -> TransportFuture<'_>;
}

/// Everything needed to issue (and re-issue) one outbound HTTP request.
#[derive(Clone, Debug)]
pub struct RequestParts {
	/// HTTP method.
	pub method: Method,
	/// Absolute request URL.
	pub url: Url,
	/// Request headers; the relay overwrites `Authorization` at dispatch time.
	pub headers: HeaderMap,
	/// Optional request body.
	pub body: Option<Vec<u8>>,
}
impl RequestParts {
	/// Creates a request with no headers and no body.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, headers: HeaderMap::new(), body: None }
	}

	/// Creates a GET request.
	pub fn get(url: Url) -> Self {
		Self::new(Method::GET, url)
	}

	/// Creates a POST request.
	pub fn post(url: Url) -> Self {
		Self::new(Method::POST, url)
	}

	/// Appends a header.
	pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Sets the request body.
	pub fn body(mut self, bytes: impl Into<Vec<u8>>) -> Self {
		self.body = Some(bytes.into());

		self
	}
}

/// Raw response surface the relay classifies and hands back to callers.
#[derive(Clone, Debug)]
pub struct ResponseParts {
	/// HTTP status code.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Response body bytes.
	pub body: Vec<u8>,
}
impl ResponseParts {
	/// Deserializes the JSON body, reporting the failing path on malformed input.
	pub fn json<T>(&self) -> Result<T, serde_path_to_error::Error<serde_json::Error>>
	where
		T: serde::de::DeserializeOwned,
	{
		let mut deserializer = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut deserializer)
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// The bundled transport reads whole response bodies eagerly; the relay needs the
/// bytes in hand anyway to re-deliver them to suspended callers after a replay.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl std::ops::Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Transport for ReqwestTransport {
	fn execute(&self, request: RequestParts) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let RequestParts { method, url, headers, body } = request;
			let mut builder = client.request(method, url).headers(headers);

			if let Some(body) = body {
				builder = builder.body(body);
			}

			let response = builder.send().await.map_err(TransportError::from)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let body = response.bytes().await.map_err(TransportError::from)?.to_vec();

			Ok(ResponseParts { status, headers, body })
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde::Deserialize;
	// self
	use super::*;

	#[derive(Debug, Deserialize)]
	struct Grant {
		access: String,
	}

	fn response(body: &str) -> ResponseParts {
		ResponseParts { status: StatusCode::OK, headers: HeaderMap::new(), body: body.into() }
	}

	#[test]
	fn json_parses_well_formed_bodies() {
		let grant: Grant =
			response("{\"access\":\"A2\"}").json().expect("Well-formed body should parse.");

		assert_eq!(grant.access, "A2");
	}

	#[test]
	fn json_reports_failing_path() {
		let err = response("{\"access\":42}")
			.json::<Grant>()
			.expect_err("Mistyped field should fail to parse.");

		assert_eq!(err.path().to_string(), "access");
	}

	#[test]
	fn builders_compose() {
		let url = Url::parse("https://api.example/report").expect("Fixture URL should parse.");
		let request = RequestParts::post(url)
			.header(http::header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
			.body("{}");

		assert_eq!(request.method, Method::POST);
		assert_eq!(request.headers.len(), 1);
		assert_eq!(request.body.as_deref(), Some("{}".as_bytes()));
	}
}
