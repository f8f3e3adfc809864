//! Static relay configuration.

// self
use crate::_prelude::*;

/// Endpoints a [`Relay`](crate::relay::Relay) needs beyond the per-request URL.
///
/// The renewal candidate list exists because backend deployments have historically
/// drifted in how the renewal route is named; only one candidate is expected to
/// exist for a given deployment, and the list is configuration rather than
/// behavior baked into the relay.
#[derive(Clone, Debug)]
pub struct RelayConfig {
	/// Ordered renewal endpoint candidates, tried first to last.
	pub renewal_endpoints: Vec<Url>,
	/// Login entry point the application navigates to on session teardown.
	pub login_url: Url,
}
impl RelayConfig {
	/// Creates a configuration with the provided login entry point and no
	/// renewal candidates yet.
	pub fn new(login_url: Url) -> Self {
		Self { renewal_endpoints: Vec::new(), login_url }
	}

	/// Appends a renewal endpoint candidate; candidates are tried in insertion order.
	pub fn renewal_endpoint(mut self, url: Url) -> Self {
		self.renewal_endpoints.push(url);

		self
	}

	/// Appends several renewal endpoint candidates at once.
	pub fn renewal_endpoints(mut self, urls: impl IntoIterator<Item = Url>) -> Self {
		self.renewal_endpoints.extend(urls);

		self
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(s: &str) -> Url {
		Url::parse(s).expect("Test URL fixture should parse.")
	}

	#[test]
	fn candidates_keep_insertion_order() {
		let config = RelayConfig::new(url("https://app.example/login"))
			.renewal_endpoint(url("https://api.example/auth/renew"))
			.renewal_endpoints([
				url("https://api.example/auth/refresh"),
				url("https://api.example/token/refresh"),
			]);

		let paths: Vec<_> = config.renewal_endpoints.iter().map(Url::path).collect();

		assert_eq!(paths, ["/auth/renew", "/auth/refresh", "/token/refresh"]);
	}
}
