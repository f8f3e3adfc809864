//! Single-flight credential renewal coordination.
//!
//! The coordinator owns the whole `idle → refreshing → idle` lifecycle behind one
//! mutex: observing an in-flight renewal and starting one happen under the same
//! lock acquisition, with no suspension point in between, so two requests can
//! never both decide to renew. Requests that lose the race park themselves in the
//! suspended queue and share the single renewal's verdict.

mod metrics;

pub use metrics::RenewalMetrics;

// crates.io
use http::{HeaderValue, header::CONTENT_TYPE};
// self
use crate::{
	_prelude::*,
	credential::Secret,
	error::RenewalError,
	http::{RequestParts, Transport},
	obs::{self, StageKind, StageOutcome, StageSpan},
	queue::{Suspended, SuspendedQueue},
};

/// Verdict handed to a request that just parked itself in the queue.
#[derive(Debug)]
pub(crate) enum Admission<'a> {
	/// The lane was idle; this request must drive the renewal and the drain,
	/// holding the guard until the cycle completes.
	Lead(CycleGuard<'a>),
	/// A renewal is already in flight; await the shared outcome.
	Follow,
}

/// Exclusive hold on the renewal lane for the duration of one cycle.
///
/// Settling through the guard marks the cycle complete. If the guard is instead
/// dropped, because the driving future was cancelled mid-cycle, the drop handler
/// settles the lane and rejects every parked request with
/// [`RenewalError::Abandoned`], so a cancelled driver can never leave the lane
/// wedged in flight or a suspended request pending forever.
#[derive(Debug)]
pub(crate) struct CycleGuard<'a> {
	coordinator: &'a RenewalCoordinator,
	armed: bool,
}
impl CycleGuard<'_> {
	/// Completes the cycle: resets the lane to idle and takes the whole queue
	/// for draining.
	pub(crate) fn settle(mut self) -> Vec<Suspended> {
		self.armed = false;

		self.coordinator.settle()
	}
}
impl Drop for CycleGuard<'_> {
	fn drop(&mut self) {
		if self.armed {
			for entry in self.coordinator.settle() {
				entry.reject(RenewalError::Abandoned.into());
			}
		}
	}
}

#[derive(Debug, Default)]
struct Lane {
	in_flight: bool,
	queue: SuspendedQueue,
}

/// Shape of a successful renewal endpoint response.
#[derive(Debug, Deserialize)]
struct RenewalGrant {
	access: String,
}

/// Owns the renewal state slot and the suspended queue.
#[derive(Debug, Default)]
pub struct RenewalCoordinator {
	lane: Mutex<Lane>,
	metrics: RenewalMetrics,
}
impl RenewalCoordinator {
	/// Returns `true` while a renewal attempt is in flight.
	pub fn is_in_flight(&self) -> bool {
		self.lane.lock().in_flight
	}

	/// Shared counters for renewal cycle outcomes.
	pub fn metrics(&self) -> &RenewalMetrics {
		&self.metrics
	}

	/// Parks a request and reports whether it must drive the renewal.
	///
	/// The check-and-flip happens under a single lock acquisition; this is the
	/// decision point that enforces at most one in-flight renewal.
	pub(crate) fn admit(&self, entry: Suspended) -> Admission<'_> {
		let mut lane = self.lane.lock();

		lane.queue.push(entry);

		if lane.in_flight {
			Admission::Follow
		} else {
			lane.in_flight = true;

			Admission::Lead(CycleGuard { coordinator: self, armed: true })
		}
	}

	/// Resets the slot to idle and takes the whole queue for draining. Reached
	/// only through [`CycleGuard`], on every completion path including drop.
	fn settle(&self) -> Vec<Suspended> {
		let mut lane = self.lane.lock();

		lane.in_flight = false;
		lane.queue.take()
	}

	/// Attempts the ordered candidate endpoints until one yields a new access
	/// credential.
	///
	/// Candidate semantics: a 2xx response carrying a non-empty `access` field
	/// wins; 401/403 means the refresh credential itself is invalid and stops the
	/// search; anything else (a 404-class status, a transport failure or a
	/// malformed body) means "this candidate does not exist here" and moves on. Exhausting
	/// the list yields [`RenewalError::Exhausted`] rather than a panic or a retry
	/// loop.
	pub(crate) async fn renew<T>(
		&self,
		transport: &T,
		candidates: &[Url],
		refresh: &Secret,
	) -> Result<Secret, RenewalError>
	where
		T: ?Sized + Transport,
	{
		const KIND: StageKind = StageKind::Renewal;

		let span = StageSpan::new(KIND, "renew");

		obs::record_stage_outcome(KIND, StageOutcome::Attempt);
		self.metrics.record_attempt();

		let result = span.instrument(self.try_candidates(transport, candidates, refresh)).await;

		match &result {
			Ok(_) => {
				self.metrics.record_success();
				obs::record_stage_outcome(KIND, StageOutcome::Success);
			},
			Err(_) => {
				self.metrics.record_failure();
				obs::record_stage_outcome(KIND, StageOutcome::Failure);
			},
		}

		result
	}

	async fn try_candidates<T>(
		&self,
		transport: &T,
		candidates: &[Url],
		refresh: &Secret,
	) -> Result<Secret, RenewalError>
	where
		T: ?Sized + Transport,
	{
		let payload = serde_json::json!({ "refresh": refresh.expose() }).to_string();

		for candidate in candidates {
			let request = RequestParts::post(candidate.clone())
				.header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
				.body(payload.clone());
			let response = match transport.execute(request).await {
				Ok(response) => response,
				// No response from this shape; the next candidate may still exist.
				Err(_) => continue,
			};

			if response.status.is_success() {
				match response.json::<RenewalGrant>() {
					Ok(grant) if !grant.access.is_empty() => return Ok(Secret::new(grant.access)),
					// A 2xx without a usable credential is a shape mismatch.
					_ => continue,
				}
			}

			if matches!(response.status.as_u16(), 401 | 403) {
				// An invalid refresh credential will not become valid against a
				// different endpoint shape.
				return Err(RenewalError::Rejected { status: response.status.as_u16() });
			}
		}

		Err(RenewalError::Exhausted)
	}
}
