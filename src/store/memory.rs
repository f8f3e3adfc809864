//! Thread-safe in-memory [`CredentialStore`] for local development and tests.

// self
use crate::{
	_prelude::*,
	credential::CredentialPair,
	store::{CredentialStore, StoreError},
};

type Slot = Arc<RwLock<Option<CredentialPair>>>;

/// Keeps the credential pair in-process; nothing survives a restart.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Slot);
impl MemoryStore {
	/// Creates a store pre-seeded with a credential pair.
	pub fn seeded(pair: CredentialPair) -> Self {
		Self(Arc::new(RwLock::new(Some(pair))))
	}
}
impl CredentialStore for MemoryStore {
	fn get(&self) -> Option<CredentialPair> {
		self.0.read().clone()
	}

	fn set(&self, pair: CredentialPair) -> Result<(), StoreError> {
		*self.0.write() = Some(pair);

		Ok(())
	}

	fn clear(&self) -> Result<(), StoreError> {
		self.0.write().take();

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn set_replaces_both_credentials() {
		let store = MemoryStore::seeded(CredentialPair::new("A1", "R1"));

		store.set(CredentialPair::new("A2", "R1")).expect("Memory set should not fail.");

		let pair = store.get().expect("Pair should be present after set.");

		assert_eq!(pair.access.expose(), "A2");
		assert_eq!(pair.refresh.expose(), "R1");
	}

	#[test]
	fn clear_is_idempotent() {
		let store = MemoryStore::seeded(CredentialPair::new("A1", "R1"));

		store.clear().expect("First clear should not fail.");
		store.clear().expect("Second clear should not fail.");

		assert!(store.get().is_none());
	}
}
