//! Storage contracts and built-in backends for the encrypted token cache.
//!
//! [`TokenCache`] is the mandatory capability (get/put/forget with TTL). [`LockProvider`] is an
//! optional companion capability: backends that can provide mutual exclusion implement it and
//! are handed to the token manager separately, so a cache without locking still works (with
//! possibly redundant refreshes).

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// crates.io
use time::PrimitiveDateTime;
// self
use crate::_prelude::*;

/// Boxed future returned by [`TokenCache`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;
/// Boxed future returned by [`LockProvider`] operations.
pub type LockFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, LockError>> + 'a + Send>>;

/// Returns `now + ttl`, saturating at the latest representable instant.
pub fn expiry_after(now: OffsetDateTime, ttl: Duration) -> OffsetDateTime {
	now.checked_add(ttl).unwrap_or_else(|| PrimitiveDateTime::MAX.assume_utc())
}

/// Key/value store with per-entry TTL used to persist sealed tokens across calls and processes.
pub trait TokenCache
where
	Self: Send + Sync,
{
	/// Fetches the live value stored under `key`, if any.
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>>;

	/// Stores `value` under `key` for `ttl`.
	fn put<'a>(&'a self, key: &'a str, value: String, ttl: Duration) -> StoreFuture<'a, ()>;

	/// Removes `key`, returning `true` if an entry existed.
	fn forget<'a>(&'a self, key: &'a str) -> StoreFuture<'a, bool>;
}

/// Named mutual-exclusion capability with a bounded wait and a bounded hold.
pub trait LockProvider
where
	Self: Send + Sync,
{
	/// Waits at most `wait` for the lock named `name` and holds it for at most `hold`.
	fn acquire<'a>(
		&'a self,
		name: &'a str,
		hold: Duration,
		wait: Duration,
	) -> LockFuture<'a, LockLease>;

	/// Releases a lease; returns `false` when the lease had already expired or been reclaimed.
	fn release<'a>(&'a self, lease: &'a LockLease) -> LockFuture<'a, bool>;
}

/// Proof of lock ownership returned by [`LockProvider::acquire`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockLease {
	/// Lock name.
	pub name: String,
	/// Random owner token distinguishing this holder from later ones.
	pub owner: u64,
	/// Instant after which other callers may reclaim the lock.
	pub expires_at: OffsetDateTime,
}
impl LockLease {
	/// Creates a lease for `name` owned by a fresh random token.
	pub fn new(name: impl Into<String>, hold: Duration) -> Self {
		Self {
			name: name.into(),
			owner: rand::random(),
			expires_at: expiry_after(OffsetDateTime::now_utc(), hold),
		}
	}

	/// Returns `true` when the hold bound has elapsed at `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}
}

/// Error type produced by [`TokenCache`] implementations.
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

/// Error type produced by [`LockProvider`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum LockError {
	/// The bounded wait elapsed before the lock became available.
	#[error("Lock `{name}` was not acquired within {waited}.")]
	Timeout {
		/// Lock name.
		name: String,
		/// Time spent waiting.
		waited: Duration,
	},
	/// Backend-level failure.
	#[error(transparent)]
	Backend(#[from] StoreError),
}
