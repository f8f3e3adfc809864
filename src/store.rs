//! Storage contract and built-in credential store implementations.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, credential::CredentialPair};

/// Persistence contract for the session credential pair.
///
/// The store is the only component allowed to touch the underlying persistence;
/// everything else reads and writes through this trait. All three operations are
/// synchronous from the caller's point of view; implementations must keep writes
/// small enough not to stall the calling task.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Returns the current pair, or `None` when unauthenticated. No side effects.
	fn get(&self) -> Option<CredentialPair>;

	/// Atomically replaces both credentials.
	fn set(&self, pair: CredentialPair) -> Result<(), StoreError>;

	/// Removes both credentials; idempotent.
	fn clear(&self) -> Result<(), StoreError>;
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
