//! Request dispatch with transparent credential renewal.
//!
//! [`Relay::dispatch`] is the single choke point for every outbound call: it
//! attaches the current access credential, classifies every failure exactly once,
//! recovers expired credentials through the single-flight
//! [`RenewalCoordinator`], and replays suspended requests once a renewal lands.
//! Callers see none of this: a recovered call simply succeeds late, and an
//! irrecoverable one rejects after the session has been torn down.

// crates.io
use futures_util::future::join_all;
use http::{HeaderValue, header::AUTHORIZATION};
use tokio::sync::oneshot;
// self
use crate::{
	_prelude::*,
	config::RelayConfig,
	credential::CredentialPair,
	error::{ConfigError, FailureClass, RenewalError},
	http::{RequestParts, ResponseParts, Transport},
	obs::{self, StageKind, StageOutcome, StageSpan},
	queue::Suspended,
	renewal::{Admission, CycleGuard, RenewalCoordinator, RenewalMetrics},
	sink::SessionSink,
	store::CredentialStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Relay specialized for the crate's default reqwest transport.
pub type ReqwestRelay = Relay<ReqwestTransport>;

type DispatchFuture<'a> = Pin<Box<dyn Future<Output = Result<ResponseParts>> + 'a + Send>>;

/// How many times a logical request has been issued.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Attempt {
	/// First issue of the request.
	Initial,
	/// Re-issued after a renewal; a further 401 is terminal.
	Replayed,
}

/// Immutable dispatch record for one logical request.
///
/// The attempt marker is fixed when the record is built, never mutated in place,
/// so "has this been retried" is carried by the value threaded through
/// dispatch → suspend → replay rather than by a flag on a shared request object.
#[derive(Clone, Debug)]
pub(crate) struct OutboundRequest {
	parts: RequestParts,
	attempt: Attempt,
}
impl OutboundRequest {
	pub(crate) fn initial(parts: RequestParts) -> Self {
		Self { parts, attempt: Attempt::Initial }
	}

	/// Builds the replayed record for the same logical request.
	pub(crate) fn replayed(&self) -> Self {
		Self { parts: self.parts.clone(), attempt: Attempt::Replayed }
	}

	pub(crate) fn parts(&self) -> &RequestParts {
		&self.parts
	}
}

/// Coordinates authenticated dispatch against a single remote service.
///
/// The relay owns the transport, credential store, session sink, and renewal
/// coordinator so callers can treat it as a plain HTTP client. Cloning is not
/// provided; share the relay behind an [`Arc`] instead, since the renewal slot
/// must be process-wide to keep its single-flight guarantee.
pub struct Relay<T>
where
	T: ?Sized + Transport,
{
	/// Transport used for every outbound call, renewals included.
	pub transport: Arc<T>,
	/// Store holding the session's credential pair.
	pub store: Arc<dyn CredentialStore>,
	/// Receiver of user-visible notices and teardown navigation.
	pub sink: Arc<dyn SessionSink>,
	/// Endpoint configuration.
	pub config: RelayConfig,
	coordinator: RenewalCoordinator,
}
impl<T> Relay<T>
where
	T: ?Sized + Transport,
{
	/// Creates a relay that uses the caller-provided transport.
	pub fn with_transport(
		store: Arc<dyn CredentialStore>,
		sink: Arc<dyn SessionSink>,
		config: RelayConfig,
		transport: impl Into<Arc<T>>,
	) -> Self {
		Self {
			transport: transport.into(),
			store,
			sink,
			config,
			coordinator: RenewalCoordinator::default(),
		}
	}

	/// Counters for renewal cycle outcomes.
	pub fn renewal_metrics(&self) -> &RenewalMetrics {
		self.coordinator.metrics()
	}

	/// Returns `true` while a credential renewal is in flight.
	pub fn renewal_in_flight(&self) -> bool {
		self.coordinator.is_in_flight()
	}

	/// Dispatches a request, transparently renewing an expired credential.
	///
	/// The current access credential, when present, is attached as a bearer
	/// `Authorization` header; absence is not an error, the remote service decides
	/// whether an unauthenticated call is acceptable. Failures reject with the
	/// classification rules described at the module level.
	pub async fn dispatch(&self, request: RequestParts) -> Result<ResponseParts> {
		const KIND: StageKind = StageKind::Dispatch;

		let span = StageSpan::new(KIND, "dispatch");

		obs::record_stage_outcome(KIND, StageOutcome::Attempt);

		let result = span.instrument(self.dispatch_outbound(OutboundRequest::initial(request))).await;

		match &result {
			Ok(_) => obs::record_stage_outcome(KIND, StageOutcome::Success),
			Err(_) => obs::record_stage_outcome(KIND, StageOutcome::Failure),
		}

		result
	}

	// Boxed so the dispatch → renewal → replay → dispatch cycle has indirection.
	fn dispatch_outbound(&self, request: OutboundRequest) -> DispatchFuture<'_> {
		Box::pin(async move {
			let parts = self.authorized_parts(&request)?;
			let response = match self.transport.execute(parts).await {
				Ok(response) => response,
				Err(source) => {
					// One notice per physical request; renewal is never attempted
					// for network-class failures.
					self.sink.network_notice(&request.parts.url);

					return Err(source.into());
				},
			};

			if response.status.is_success() {
				return Ok(response);
			}

			match FailureClass::of_status(response.status) {
				FailureClass::Unauthorized => self.recover_unauthorized(request).await,
				// Authenticated but not permitted; not a credential problem.
				FailureClass::Forbidden => Err(Error::Forbidden),
				// A status-bearing response is never network class.
				FailureClass::Network | FailureClass::Other => Err(Error::Upstream {
					status: response.status.as_u16(),
					body: response.body,
				}),
			}
		})
	}

	fn authorized_parts(&self, request: &OutboundRequest) -> Result<RequestParts> {
		let mut parts = request.parts.clone();

		if let Some(pair) = self.store.get() {
			let bearer = HeaderValue::from_str(&format!("Bearer {}", pair.access.expose()))
				.map_err(|source| ConfigError::CredentialHeader { source })?;

			parts.headers.insert(AUTHORIZATION, bearer);
		}

		Ok(parts)
	}

	async fn recover_unauthorized(&self, request: OutboundRequest) -> Result<ResponseParts> {
		if request.attempt == Attempt::Replayed {
			// Retried once already; a second rejection is terminal.
			return Err(Error::Unauthorized);
		}
		if self.store.get().is_none() {
			self.teardown();

			return Err(RenewalError::MissingRefresh.into());
		}

		let (reply, outcome) = oneshot::channel();

		let admission = self.coordinator.admit(Suspended::new(request.replayed(), reply));

		if let Admission::Lead(guard) = admission {
			self.drive_renewal(guard).await;
		}

		// Every drain path delivers a verdict; a dropped sender can only mean the
		// cycle's driver was cancelled after it had already taken the queue.
		outcome.await.unwrap_or_else(|_| Err(RenewalError::Abandoned.into()))
	}

	/// Runs one renewal cycle end to end: renew, publish the credential, drain.
	///
	/// Only the admission leader reaches this function, so exactly one cycle runs
	/// per expiry no matter how many requests failed together. The guard keeps the
	/// cycle cancellation-safe: if this future is dropped mid-renewal, the guard's
	/// drop handler settles the lane and rejects the queue instead of leaving the
	/// coordinator in flight forever.
	async fn drive_renewal(&self, guard: CycleGuard<'_>) {
		let refresh = self.store.get().map(|pair| pair.refresh);
		let renewed = match refresh {
			Some(refresh) => self
				.coordinator
				.renew(self.transport.as_ref(), &self.config.renewal_endpoints, &refresh)
				.await
				// The refresh credential is not rotated by renewal.
				.map(|access| CredentialPair::new(access, refresh)),
			None => Err(RenewalError::MissingRefresh),
		};

		match renewed {
			Ok(pair) => match self.store.set(pair) {
				// The store write lands before `settle`, so every replay and any
				// request admitted to a later cycle observes the new credential.
				Ok(()) => {
					let entries = guard.settle();

					join_all(entries.into_iter().map(|entry| self.replay(entry))).await;
				},
				Err(source) => {
					for entry in guard.settle() {
						entry.reject(Error::Storage(source.clone()));
					}
				},
			},
			Err(reason) => {
				for entry in guard.settle() {
					entry.reject(Error::Renewal(reason.clone()));
				}

				self.teardown();
			},
		}
	}

	/// Re-issues a suspended request through the full dispatch path, so a
	/// second-in-a-row 401 still hits the retried-once rule.
	async fn replay(&self, entry: Suspended) {
		const KIND: StageKind = StageKind::Replay;

		let span = StageSpan::new(KIND, "replay");
		let (request, reply) = entry.into_parts();

		obs::record_stage_outcome(KIND, StageOutcome::Attempt);

		let result = span.instrument(self.dispatch_outbound(request)).await;

		match &result {
			Ok(_) => obs::record_stage_outcome(KIND, StageOutcome::Success),
			Err(_) => obs::record_stage_outcome(KIND, StageOutcome::Failure),
		}

		let _ = reply.send(result);
	}

	/// Clears the session and tells the application to navigate to login.
	fn teardown(&self) {
		let _ = self.store.clear();
		self.sink.session_expired(&self.config.login_url);
	}
}
#[cfg(feature = "reqwest")]
impl Relay<ReqwestTransport> {
	/// Creates a relay backed by a default reqwest transport.
	pub fn new(
		store: Arc<dyn CredentialStore>,
		sink: Arc<dyn SessionSink>,
		config: RelayConfig,
	) -> Self {
		Self::with_transport(store, sink, config, ReqwestTransport::default())
	}
}
impl<T> Debug for Relay<T>
where
	T: ?Sized + Transport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Relay")
			.field("config", &self.config)
			.field("renewal_in_flight", &self.coordinator.is_in_flight())
			.finish()
	}
}
