//! Ordered holding area for requests parked while a credential renewal is in flight.

// crates.io
use tokio::sync::oneshot;
// self
use crate::{_prelude::*, http::ResponseParts, relay::OutboundRequest};

/// Channel half through which a parked request eventually receives its outcome.
pub(crate) type Delivery = oneshot::Sender<Result<ResponseParts>>;

/// A request suspended pending the outcome of an in-flight renewal.
///
/// Each entry leaves the queue exactly once: replayed with the renewed credential
/// or rejected with the renewal's failure. The paired receiver is held by the
/// original caller, so the outcome lands wherever the request was dispatched from.
pub struct Suspended {
	request: OutboundRequest,
	reply: Delivery,
}
impl Suspended {
	pub(crate) fn new(request: OutboundRequest, reply: Delivery) -> Self {
		Self { request, reply }
	}

	/// Splits the entry for replay.
	pub(crate) fn into_parts(self) -> (OutboundRequest, Delivery) {
		(self.request, self.reply)
	}

	/// Delivers a terminal failure without any network activity.
	pub(crate) fn reject(self, error: Error) {
		let _ = self.reply.send(Err(error));
	}
}
impl Debug for Suspended {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Suspended").field("request", &self.request).finish()
	}
}

/// FIFO append/take queue; fairness is the only ordering guarantee.
#[derive(Debug, Default)]
pub struct SuspendedQueue(Vec<Suspended>);
impl SuspendedQueue {
	/// Appends an entry; never blocks.
	pub(crate) fn push(&mut self, entry: Suspended) {
		self.0.push(entry);
	}

	/// Removes and returns every entry in insertion order, leaving the queue empty.
	pub(crate) fn take(&mut self) -> Vec<Suspended> {
		std::mem::take(&mut self.0)
	}

	/// Returns the number of currently suspended requests.
	pub(crate) fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns `true` when nothing is suspended.
	pub(crate) fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
