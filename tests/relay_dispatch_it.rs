#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use auth_relay::{
	config::RelayConfig,
	credential::CredentialPair,
	error::{Error, FailureClass},
	http::RequestParts,
	relay::{Relay, ReqwestRelay},
	sink::RecordingSink,
	store::{CredentialStore, MemoryStore},
	url::Url,
};

fn parse(url: &str) -> Url {
	Url::parse(url).expect("Test URL should parse successfully.")
}

fn build_relay(
	server: &MockServer,
	store: std::sync::Arc<MemoryStore>,
	sink: std::sync::Arc<RecordingSink>,
	candidates: &[&str],
) -> ReqwestRelay {
	let mut config = RelayConfig::new(parse(&server.url("/login")));

	for path in candidates {
		config = config.renewal_endpoint(parse(&server.url(*path)));
	}

	Relay::new(store, sink, config)
}

#[tokio::test]
async fn bearer_credential_is_attached_and_success_passes_through() {
	let server = MockServer::start_async().await;
	let store = std::sync::Arc::new(MemoryStore::seeded(CredentialPair::new("A1", "R1")));
	let sink = std::sync::Arc::new(RecordingSink::default());
	let relay = build_relay(&server, store, sink.clone(), &["/session/renew"]);
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/profile").header("authorization", "Bearer A1");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"name\":\"dashboard\"}");
		})
		.await;
	let response = relay
		.dispatch(RequestParts::get(parse(&server.url("/profile"))))
		.await
		.expect("Authenticated dispatch should succeed.");

	mock.assert_async().await;

	assert_eq!(response.status.as_u16(), 200);
	assert_eq!(response.body, b"{\"name\":\"dashboard\"}");
	assert!(sink.notices().is_empty());
}

#[tokio::test]
async fn unauthenticated_dispatch_proceeds_without_error() {
	let server = MockServer::start_async().await;
	let store = std::sync::Arc::new(MemoryStore::default());
	let sink = std::sync::Arc::new(RecordingSink::default());
	let relay = build_relay(&server, store, sink.clone(), &["/session/renew"]);
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/public");
			then.status(200).body("ok");
		})
		.await;
	let response = relay
		.dispatch(RequestParts::get(parse(&server.url("/public"))))
		.await
		.expect("Unauthenticated dispatch of a public endpoint should succeed.");

	mock.assert_async().await;

	assert_eq!(response.body, b"ok");
	assert!(sink.expirations().is_empty());
}

#[tokio::test]
async fn forbidden_never_triggers_renewal() {
	let server = MockServer::start_async().await;
	let store = std::sync::Arc::new(MemoryStore::seeded(CredentialPair::new("A1", "R1")));
	let sink = std::sync::Arc::new(RecordingSink::default());
	let relay = build_relay(&server, store.clone(), sink.clone(), &["/session/renew"]);
	let forbidden = server
		.mock_async(|when, then| {
			when.method(GET).path("/admin");
			then.status(403);
		})
		.await;
	let renewal = server
		.mock_async(|when, then| {
			when.method(POST).path("/session/renew");
			then.status(200).body("{\"access\":\"A2\"}");
		})
		.await;
	let err = relay
		.dispatch(RequestParts::get(parse(&server.url("/admin"))))
		.await
		.expect_err("Forbidden responses should surface to the caller.");

	forbidden.assert_async().await;
	renewal.assert_calls_async(0).await;

	assert!(matches!(err, Error::Forbidden));
	assert_eq!(err.class(), FailureClass::Forbidden);
	assert_eq!(relay.renewal_metrics().attempts(), 0);
	// The credential pair is untouched; forbidden is not a credential problem.
	assert_eq!(
		store.get().expect("Pair should survive a forbidden response.").access.expose(),
		"A1",
	);
	assert!(sink.expirations().is_empty());
}

#[tokio::test]
async fn upstream_failures_pass_through_unchanged() {
	let server = MockServer::start_async().await;
	let store = std::sync::Arc::new(MemoryStore::seeded(CredentialPair::new("A1", "R1")));
	let sink = std::sync::Arc::new(RecordingSink::default());
	let relay = build_relay(&server, store, sink.clone(), &["/session/renew"]);
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/report");
			then.status(502).body("upstream exploded");
		})
		.await;
	let err = relay
		.dispatch(RequestParts::get(parse(&server.url("/report"))))
		.await
		.expect_err("A 502 should reject the dispatch.");

	mock.assert_async().await;

	match err {
		Error::Upstream { status, body } => {
			assert_eq!(status, 502);
			assert_eq!(body, b"upstream exploded");
		},
		other => panic!("Expected an upstream error, got: {other:?}"),
	}

	assert!(sink.notices().is_empty());
	assert!(sink.expirations().is_empty());
}

#[tokio::test]
async fn network_failure_is_noticed_once_and_never_renews() {
	// Reserve a port and release it so the connection is refused.
	let port = {
		let listener = std::net::TcpListener::bind("127.0.0.1:0")
			.expect("Ephemeral port reservation should succeed.");
		let port =
			listener.local_addr().expect("Listener should expose its local address.").port();

		drop(listener);

		port
	};
	let store = std::sync::Arc::new(MemoryStore::seeded(CredentialPair::new("A1", "R1")));
	let sink = std::sync::Arc::new(RecordingSink::default());
	let config = RelayConfig::new(parse("http://127.0.0.1:1/login"))
		.renewal_endpoint(parse(&format!("http://127.0.0.1:{port}/session/renew")));
	let relay = Relay::new(store.clone(), sink.clone(), config);
	let err = relay
		.dispatch(RequestParts::get(parse(&format!("http://127.0.0.1:{port}/report"))))
		.await
		.expect_err("An unreachable endpoint should reject the dispatch.");

	assert!(matches!(err, Error::Transport(_)));
	assert_eq!(err.class(), FailureClass::Network);
	assert_eq!(sink.notices().len(), 1);
	assert_eq!(relay.renewal_metrics().attempts(), 0);
	// The session is untouched; network trouble is not an auth failure.
	assert!(store.get().is_some());
	assert!(sink.expirations().is_empty());
}
