//! Credential key-value contracts and built-in store implementations.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::_prelude::*;

/// Boxed future returned by every [`CredentialStore`] operation.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Key-value backend holding the credential pair.
///
/// Stores give no transactional isolation: concurrent writers race and the last write
/// observed by the backend wins.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Returns the value stored under `key`, if any.
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>>;

	/// Stores `value` under `key`, replacing any previous value.
	fn set<'a>(&'a self, key: &'a str, value: String) -> StoreFuture<'a, ()>;

	/// Removes the value stored under `key`; removing a missing key is not an error.
	fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()>;
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

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn store_error_can_be_serialized() {
		let error = StoreError::Serialization { message: "bad json".into() };
		let payload = serde_json::to_string(&error).expect("StoreError should serialize to JSON.");

		assert_eq!(payload, "{\"Serialization\":{\"message\":\"bad json\"}}");

		let round_trip: StoreError = serde_json::from_str(&payload)
			.expect("Serialized store error should deserialize from JSON.");

		assert_eq!(round_trip, error);
	}
}
