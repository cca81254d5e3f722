//! Storage contracts and built-in key-value stores for session tokens.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, auth::AccessToken};

/// Boxed future returned by [`TokenStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persistent key-value contract standing in for the platform credential store.
///
/// The relay reads and writes a single key taken from its service descriptor, the way a
/// browser shell keeps the access token under one local-storage entry. Implementations must
/// tolerate concurrent readers while a refresh cycle rotates the value.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Loads the token stored under `key`, if present.
	fn load<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<AccessToken>>;

	/// Persists or replaces the token stored under `key`.
	fn save<'a>(&'a self, key: &'a str, token: AccessToken) -> StoreFuture<'a, ()>;

	/// Removes the token stored under `key`, if present.
	fn clear<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()>;
}

/// Error type produced by [`TokenStore`] implementations.
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
