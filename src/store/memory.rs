//! Thread-safe in-memory [`TokenCache`] + [`LockProvider`] for single-process deployments and tests.

// crates.io
use async_lock::MutexGuardArc;
use tokio::time::{self, Instant};
// self
use crate::{
	_prelude::*,
	store::{
		LockError, LockFuture, LockLease, LockProvider, StoreFuture, TokenCache, expiry_after,
	},
};

type CacheMap = Arc<RwLock<HashMap<String, CacheSlot>>>;
type LockMap = Arc<Mutex<HashMap<String, Arc<LockSlot>>>>;

/// Waiters re-check for an expired lease at least this often.
const RECLAIM_INTERVAL: std::time::Duration = std::time::Duration::from_millis(50);

#[derive(Clone, Debug)]
struct CacheSlot {
	value: String,
	expires_at: OffsetDateTime,
}

#[derive(Default)]
struct LockSlot {
	gate: Arc<AsyncMutex<()>>,
	held: Mutex<Option<HeldLease>>,
}
impl LockSlot {
	fn grant(&self, name: &str, hold: Duration, guard: MutexGuardArc<()>) -> LockLease {
		let lease = LockLease::new(name, hold);

		*self.held.lock() = Some(HeldLease { lease: lease.clone(), _guard: guard });

		lease
	}

	fn reclaim_expired(&self, now: OffsetDateTime) {
		let mut held = self.held.lock();

		if held.as_ref().is_some_and(|current| current.lease.is_expired_at(now)) {
			*held = None;
		}
	}
}

struct HeldLease {
	lease: LockLease,
	_guard: MutexGuardArc<()>,
}

/// Process-local TTL cache that also hands out named locks.
///
/// Locks are backed by one async mutex per name. A lease that outlives its hold bound is
/// reclaimed by the next waiter, so a holder that never releases blocks others for at most
/// `hold`.
#[derive(Clone, Default)]
pub struct MemoryStore {
	entries: CacheMap,
	locks: LockMap,
}
impl MemoryStore {
	fn get_now(map: &CacheMap, key: &str, now: OffsetDateTime) -> Option<String> {
		{
			let guard = map.read();

			match guard.get(key) {
				Some(slot) if now < slot.expires_at => return Some(slot.value.clone()),
				Some(_) => {},
				None => return None,
			}
		}

		let mut guard = map.write();

		if guard.get(key).is_some_and(|slot| now >= slot.expires_at) {
			guard.remove(key);
		}

		None
	}

	fn put_now(map: &CacheMap, key: &str, value: String, ttl: Duration, now: OffsetDateTime) {
		let mut guard = map.write();

		if ttl <= Duration::ZERO {
			guard.remove(key);

			return;
		}

		guard.insert(key.to_owned(), CacheSlot { value, expires_at: expiry_after(now, ttl) });
	}

	fn lock_slot(&self, name: &str) -> Arc<LockSlot> {
		let mut locks = self.locks.lock();

		locks.entry(name.to_owned()).or_default().clone()
	}

	/// Number of live (unexpired) cache entries.
	pub fn len(&self) -> usize {
		let now = OffsetDateTime::now_utc();

		self.entries.read().values().filter(|slot| now < slot.expires_at).count()
	}

	/// Returns `true` when the cache holds no live entries.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
impl TokenCache for MemoryStore {
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
		let map = self.entries.clone();

		Box::pin(async move { Ok(Self::get_now(&map, key, OffsetDateTime::now_utc())) })
	}

	fn put<'a>(&'a self, key: &'a str, value: String, ttl: Duration) -> StoreFuture<'a, ()> {
		let map = self.entries.clone();

		Box::pin(async move {
			Self::put_now(&map, key, value, ttl, OffsetDateTime::now_utc());

			Ok(())
		})
	}

	fn forget<'a>(&'a self, key: &'a str) -> StoreFuture<'a, bool> {
		let map = self.entries.clone();

		Box::pin(async move { Ok(map.write().remove(key).is_some()) })
	}
}
impl LockProvider for MemoryStore {
	fn acquire<'a>(
		&'a self,
		name: &'a str,
		hold: Duration,
		wait: Duration,
	) -> LockFuture<'a, LockLease> {
		let slot = self.lock_slot(name);

		Box::pin(async move {
			// `None` when the bound is too large to represent; the wait is then unbounded.
			let deadline = Instant::now().checked_add(wait.unsigned_abs());

			loop {
				if let Some(guard) = slot.gate.try_lock_arc() {
					return Ok(slot.grant(name, hold, guard));
				}

				let now = Instant::now();
				let slice = match deadline {
					Some(deadline) if now >= deadline =>
						return Err(LockError::Timeout { name: name.to_owned(), waited: wait }),
					Some(deadline) => (deadline - now).min(RECLAIM_INTERVAL),
					None => RECLAIM_INTERVAL,
				};

				match time::timeout(slice, slot.gate.lock_arc()).await {
					Ok(guard) => return Ok(slot.grant(name, hold, guard)),
					Err(_) => slot.reclaim_expired(OffsetDateTime::now_utc()),
				}
			}
		})
	}

	fn release<'a>(&'a self, lease: &'a LockLease) -> LockFuture<'a, bool> {
		let slot = self.locks.lock().get(&lease.name).cloned();

		Box::pin(async move {
			let Some(slot) = slot else {
				return Ok(false);
			};
			let mut held = slot.held.lock();

			match held.as_ref() {
				Some(current) if current.lease.owner == lease.owner => {
					*held = None;

					Ok(true)
				},
				_ => Ok(false),
			}
		})
	}
}
impl Debug for MemoryStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MemoryStore")
			.field("entries", &self.entries.read().len())
			.field("locks", &self.locks.lock().len())
			.finish()
	}
}
