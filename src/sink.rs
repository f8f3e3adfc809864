//! Application-facing hooks for user-visible relay events.

// self
use crate::_prelude::*;

/// Receives the two user-visible side effects the relay can produce.
///
/// The relay guarantees [`network_notice`](SessionSink::network_notice) fires at
/// most once per physical request, even when many requests fail in the same
/// window, and [`session_expired`](SessionSink::session_expired) fires only on
/// irrecoverable auth failure, after the credential store has been cleared.
/// Callers should treat any still-pending dispatch as abandoned once
/// `session_expired` fires; its result still resolves, but the application is
/// already navigating away.
pub trait SessionSink
where
	Self: Send + Sync,
{
	/// A request failed at the network level; show the user a single notice.
	fn network_notice(&self, url: &Url);

	/// The session is irrecoverable; navigate to the login entry point.
	fn session_expired(&self, login: &Url);
}

/// Sink that ignores every event, for embedding scenarios and tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;
impl SessionSink for NullSink {
	fn network_notice(&self, _: &Url) {}

	fn session_expired(&self, _: &Url) {}
}

/// Sink that records every event for later inspection in tests and diagnostics.
#[derive(Debug, Default)]
pub struct RecordingSink {
	notices: Mutex<Vec<Url>>,
	expirations: Mutex<Vec<Url>>,
}
impl RecordingSink {
	/// Returns the URLs of every network notice seen so far.
	pub fn notices(&self) -> Vec<Url> {
		self.notices.lock().clone()
	}

	/// Returns the login URLs of every session expiration seen so far.
	pub fn expirations(&self) -> Vec<Url> {
		self.expirations.lock().clone()
	}
}
impl SessionSink for RecordingSink {
	fn network_notice(&self, url: &Url) {
		self.notices.lock().push(url.clone());
	}

	fn session_expired(&self, login: &Url) {
		self.expirations.lock().push(login.clone());
	}
}
