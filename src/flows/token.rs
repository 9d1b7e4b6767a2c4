//! Token lifecycle: encrypted cache lookup, single-flight refresh, and cache invalidation.
//!
//! [`TokenManager::get_token`] serves the sealed token from the cache without any locking in the
//! common case. When the cache is empty (or holds an entry that no longer decrypts, which is
//! discarded) the manager refreshes through [`OAuthClient`]:
//!
//! - with a [`LockProvider`], it takes the named refresh lock with bounded wait and hold, then
//!   re-checks the cache before calling upstream, so concurrent callers that queued behind the
//!   holder reuse its token instead of refreshing again;
//! - without one, it refreshes directly. Concurrent refreshes are then possible; each yields a
//!   valid token and the last write wins.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, CachedTokenEntry},
	cipher::TokenCipher,
	http::CarrierHttpClient,
	oauth::OAuthClient,
	obs::{self, CacheEvent, FlowKind, FlowOutcome, FlowSpan},
	store::{LockError, LockProvider, TokenCache},
};

/// Cache key, lock name, and lock bounds used by a [`TokenManager`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenManagerSettings {
	/// Cache key holding the sealed token.
	pub cache_key: String,
	/// Name of the refresh lock.
	pub lock_name: String,
	/// Longest time a caller waits for the refresh lock.
	pub lock_wait: Duration,
	/// Longest time a holder keeps the refresh lock.
	pub lock_hold: Duration,
}
impl TokenManagerSettings {
	/// Default cache key.
	pub const DEFAULT_CACHE_KEY: &str = "carrier_access_token_enc";
	/// Default refresh lock name.
	pub const DEFAULT_LOCK_NAME: &str = "token-refresh";
	/// Default lock wait and hold bound.
	pub const DEFAULT_LOCK_BOUND: Duration = Duration::seconds(10);

	/// Overrides the cache key.
	pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
		self.cache_key = key.into();

		self
	}

	/// Overrides the refresh lock name.
	pub fn with_lock_name(mut self, name: impl Into<String>) -> Self {
		self.lock_name = name.into();

		self
	}

	/// Overrides the bounded lock wait.
	pub fn with_lock_wait(mut self, wait: Duration) -> Self {
		self.lock_wait = if wait.is_negative() { Duration::ZERO } else { wait };

		self
	}

	/// Overrides the bounded lock hold.
	pub fn with_lock_hold(mut self, hold: Duration) -> Self {
		self.lock_hold = if hold.is_negative() { Duration::ZERO } else { hold };

		self
	}
}
impl Default for TokenManagerSettings {
	fn default() -> Self {
		Self {
			cache_key: Self::DEFAULT_CACHE_KEY.into(),
			lock_name: Self::DEFAULT_LOCK_NAME.into(),
			lock_wait: Self::DEFAULT_LOCK_BOUND,
			lock_hold: Self::DEFAULT_LOCK_BOUND,
		}
	}
}

/// Thread-safe counters describing how tokens were served.
#[derive(Debug, Default)]
pub struct TokenMetrics {
	cache_hits: AtomicU64,
	refreshes: AtomicU64,
	discarded_entries: AtomicU64,
	expired_entries: AtomicU64,
	lock_timeouts: AtomicU64,
}
impl TokenMetrics {
	/// Tokens served from the cache, including re-checks under the lock.
	pub fn cache_hits(&self) -> u64 {
		self.cache_hits.load(Ordering::Relaxed)
	}

	/// Upstream refresh invocations.
	pub fn refreshes(&self) -> u64 {
		self.refreshes.load(Ordering::Relaxed)
	}

	/// Cache entries removed because they failed to decrypt.
	pub fn discarded_entries(&self) -> u64 {
		self.discarded_entries.load(Ordering::Relaxed)
	}

	/// Cache entries removed because the token inside had already expired.
	pub fn expired_entries(&self) -> u64 {
		self.expired_entries.load(Ordering::Relaxed)
	}

	/// Callers that gave up waiting for the refresh lock.
	pub fn lock_timeouts(&self) -> u64 {
		self.lock_timeouts.load(Ordering::Relaxed)
	}

	fn record(&self, event: CacheEvent) {
		match event {
			CacheEvent::Hit => {
				self.cache_hits.fetch_add(1, Ordering::Relaxed);
			},
			CacheEvent::Discarded => {
				self.discarded_entries.fetch_add(1, Ordering::Relaxed);
			},
			CacheEvent::Expired => {
				self.expired_entries.fetch_add(1, Ordering::Relaxed);
			},
			CacheEvent::Miss => (),
		}

		obs::record_cache_event(event);
	}

	fn record_refresh(&self) {
		self.refreshes.fetch_add(1, Ordering::Relaxed);
	}

	fn record_lock_timeout(&self) {
		self.lock_timeouts.fetch_add(1, Ordering::Relaxed);
	}
}

/// Owns the cached token's lifecycle: creation, refresh, and invalidation.
pub struct TokenManager<C>
where
	C: ?Sized + CarrierHttpClient,
{
	oauth: Arc<OAuthClient<C>>,
	cache: Arc<dyn TokenCache>,
	cipher: Arc<dyn TokenCipher>,
	locks: Option<Arc<dyn LockProvider>>,
	settings: TokenManagerSettings,
	metrics: Arc<TokenMetrics>,
}
impl<C> TokenManager<C>
where
	C: ?Sized + CarrierHttpClient,
{
	/// Creates a manager without a lock provider and with default settings.
	pub fn new(
		oauth: OAuthClient<C>,
		cache: Arc<dyn TokenCache>,
		cipher: Arc<dyn TokenCipher>,
	) -> Self {
		Self {
			oauth: Arc::new(oauth),
			cache,
			cipher,
			locks: None,
			settings: TokenManagerSettings::default(),
			metrics: Default::default(),
		}
	}

	/// Enables single-flight refreshes through `locks`.
	pub fn with_lock_provider(mut self, locks: Arc<dyn LockProvider>) -> Self {
		self.locks = Some(locks);

		self
	}

	/// Replaces the cache key, lock name, and lock bounds.
	pub fn with_settings(mut self, settings: TokenManagerSettings) -> Self {
		self.settings = settings;

		self
	}

	/// Active settings.
	pub fn settings(&self) -> &TokenManagerSettings {
		&self.settings
	}

	/// Shared counters for this manager.
	pub fn metrics(&self) -> &Arc<TokenMetrics> {
		&self.metrics
	}

	/// Returns `true` when refreshes run under the lock.
	pub fn is_single_flight(&self) -> bool {
		self.locks.is_some()
	}

	/// Returns a usable access token, refreshing it upstream when the cache cannot serve one.
	///
	/// Fails with [`Error::Auth`] when the exchange fails and with [`Error::LockTimeout`] when the
	/// refresh lock is not acquired within its bounded wait. A cache entry that fails to decrypt
	/// is never reported; it is discarded and replaced.
	pub async fn get_token(&self) -> Result<AccessToken> {
		const KIND: FlowKind = FlowKind::Token;

		let span = FlowSpan::new(KIND, "get_token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.resolve(&span)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Removes the cached token, returning `true` if one was stored.
	pub async fn invalidate(&self) -> Result<bool> {
		Ok(self.cache.forget(&self.settings.cache_key).await?)
	}

	async fn resolve(&self, span: &FlowSpan) -> Result<AccessToken> {
		if let Some(token) = self.cached(span).await? {
			return Ok(token);
		}

		let Some(locks) = &self.locks else {
			return self.refresh_and_store().await;
		};
		let settings = &self.settings;
		let lease = match locks
			.acquire(&settings.lock_name, settings.lock_hold, settings.lock_wait)
			.await
		{
			Ok(lease) => lease,
			Err(e) => {
				if matches!(e, LockError::Timeout { .. }) {
					self.metrics.record_lock_timeout();
				}

				return Err(e.into());
			},
		};
		// Another holder may have refreshed while this caller waited.
		let result = match self.cached(span).await {
			Ok(Some(token)) => Ok(token),
			Ok(None) => self.refresh_and_store().await,
			Err(e) => Err(e),
		};

		match locks.release(&lease).await {
			Ok(true) => (),
			Ok(false) => span.warn("Refresh lock lease expired before release.", &lease.name),
			Err(e) => span.warn("Failed to release the refresh lock.", &e),
		}

		result
	}

	async fn cached(&self, span: &FlowSpan) -> Result<Option<AccessToken>> {
		let key = &self.settings.cache_key;
		let Some(ciphertext) = self.cache.get(key).await? else {
			self.metrics.record(CacheEvent::Miss);

			return Ok(None);
		};

		match CachedTokenEntry::open(&ciphertext, self.cipher.as_ref()) {
			// The TTL floor can outlive short upstream lifetimes.
			Ok(token) if token.is_expired_at(OffsetDateTime::now_utc()) => {
				self.cache.forget(key).await?;
				self.metrics.record(CacheEvent::Expired);

				Ok(None)
			},
			Ok(token) => {
				self.metrics.record(CacheEvent::Hit);

				Ok(Some(token))
			},
			Err(e) => {
				self.cache.forget(key).await?;
				self.metrics.record(CacheEvent::Discarded);
				span.warn("Discarded unreadable token cache entry.", &e);

				Ok(None)
			},
		}
	}

	async fn refresh_and_store(&self) -> Result<AccessToken> {
		const KIND: FlowKind = FlowKind::TokenRefresh;

		let span = FlowSpan::new(KIND, "client_credentials");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.metrics.record_refresh();

		let result = span
			.instrument(async {
				let token = self.oauth.refresh().await?;
				let entry = CachedTokenEntry::seal(&token, self.cipher.as_ref())?;

				self.cache.put(&self.settings.cache_key, entry.ciphertext, entry.ttl).await?;

				Ok::<_, Error>(token)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}
}
impl<C> Clone for TokenManager<C>
where
	C: ?Sized + CarrierHttpClient,
{
	fn clone(&self) -> Self {
		Self {
			oauth: self.oauth.clone(),
			cache: self.cache.clone(),
			cipher: self.cipher.clone(),
			locks: self.locks.clone(),
			settings: self.settings.clone(),
			metrics: self.metrics.clone(),
		}
	}
}
impl<C> Debug for TokenManager<C>
where
	C: ?Sized + CarrierHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("oauth", &self.oauth)
			.field("single_flight", &self.locks.is_some())
			.field("settings", &self.settings)
			.field("metrics", &self.metrics)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		auth::ClientCredentials,
		cipher::ChaChaTokenCipher,
		config::CarrierConfig,
		error::{AuthError, TransportError},
		http::{HttpFuture, HttpRequest, HttpResponse},
		store::MemoryStore,
	};

	struct CountingHttp {
		calls: AtomicU64,
		expires_in: i64,
	}
	impl CountingHttp {
		fn lasting(expires_in: i64) -> Self {
			Self { calls: AtomicU64::new(0), expires_in }
		}
	}
	impl Default for CountingHttp {
		fn default() -> Self {
			Self::lasting(3600)
		}
	}
	impl CarrierHttpClient for CountingHttp {
		fn execute(&self, _: HttpRequest) -> HttpFuture<'_> {
			let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
			let expires_in = self.expires_in;

			Box::pin(async move {
				Ok::<_, TransportError>(HttpResponse {
					status: 200,
					headers: Vec::new(),
					body: format!(
						r#"{{"access_token":"token-{call}","expires_in":{expires_in}}}"#
					)
					.into_bytes(),
				})
			})
		}
	}

	fn manager(http: Arc<CountingHttp>, store: Arc<MemoryStore>) -> TokenManager<CountingHttp> {
		let config = CarrierConfig::builder()
			.sandbox_base_url(Url::parse("https://wwwcie.ups.com").expect("URL should parse."))
			.account_number("A1B2C3")
			.credentials(ClientCredentials::new("client", "secret"))
			.build()
			.expect("Config should build.");
		let oauth = OAuthClient::new(&config, http).expect("OAuth client should build.");

		TokenManager::new(oauth, store, Arc::new(ChaChaTokenCipher::derive("unit-test-key")))
	}

	fn block_on<F: Future>(future: F) -> F::Output {
		tokio::runtime::Builder::new_current_thread()
			.enable_time()
			.build()
			.expect("Failed to build Tokio runtime for token manager test.")
			.block_on(future)
	}

	#[test]
	fn settings_default_to_documented_bounds() {
		let settings = TokenManagerSettings::default();

		assert_eq!(settings.cache_key, "carrier_access_token_enc");
		assert_eq!(settings.lock_name, "token-refresh");
		assert_eq!(settings.lock_wait, Duration::seconds(10));
		assert_eq!(settings.lock_hold, Duration::seconds(10));
		assert_eq!(settings.with_lock_wait(Duration::seconds(-1)).lock_wait, Duration::ZERO);
	}

	#[test]
	fn cached_token_is_reused_and_stored_sealed() {
		let http = Arc::new(CountingHttp::default());
		let store = Arc::new(MemoryStore::default());
		let manager = manager(http.clone(), store.clone());

		block_on(async {
			let first = manager.get_token().await.expect("First lookup should refresh.");
			let second = manager.get_token().await.expect("Second lookup should hit the cache.");

			assert_eq!(first.expose(), "token-1");
			assert_eq!(second.expose(), "token-1");

			let sealed = store
				.get(TokenManagerSettings::DEFAULT_CACHE_KEY)
				.await
				.expect("Store read should succeed.")
				.expect("Token should be cached.");

			assert!(!sealed.contains("token-1"));
		});

		assert_eq!(http.calls.load(Ordering::SeqCst), 1);
		assert_eq!(manager.metrics().refreshes(), 1);
		assert_eq!(manager.metrics().cache_hits(), 1);
	}

	#[test]
	fn expired_token_is_refreshed_despite_cache_ttl() {
		let http = Arc::new(CountingHttp::lasting(1));
		let store = Arc::new(MemoryStore::default());
		let manager = manager(http.clone(), store.clone()).with_lock_provider(store.clone());

		block_on(async {
			let first = manager.get_token().await.expect("First lookup should refresh.");

			// The entry outlives the token because of the TTL floor.
			tokio::time::sleep(std::time::Duration::from_millis(1_100)).await;

			assert!(first.is_expired_at(OffsetDateTime::now_utc()));
			assert_eq!(store.len(), 1);

			let second = manager.get_token().await.expect("Expired tokens should be refreshed.");

			assert_eq!(second.expose(), "token-2");
		});

		assert_eq!(http.calls.load(Ordering::SeqCst), 2);
		assert_eq!(manager.metrics().refreshes(), 2);
		assert_eq!(manager.metrics().cache_hits(), 0);
		assert_eq!(manager.metrics().expired_entries(), 1);
	}

	#[test]
	fn unreadable_entry_is_discarded_and_replaced() {
		let http = Arc::new(CountingHttp::default());
		let store = Arc::new(MemoryStore::default());
		let manager = manager(http.clone(), store.clone());

		block_on(async {
			store
				.put(TokenManagerSettings::DEFAULT_CACHE_KEY, "garbage".into(), Duration::minutes(5))
				.await
				.expect("Seeding the store should succeed.");

			let token = manager.get_token().await.expect("Corrupted entries should be replaced.");

			assert_eq!(token.expose(), "token-1");
			assert!(manager.invalidate().await.expect("Invalidate should succeed."));
			assert!(!manager.invalidate().await.expect("Invalidate should succeed."));
		});

		assert_eq!(manager.metrics().discarded_entries(), 1);
		assert_eq!(manager.metrics().refreshes(), 1);
	}

	#[test]
	fn refresh_failures_leave_cache_empty() {
		struct Rejecting;
		impl CarrierHttpClient for Rejecting {
			fn execute(&self, _: HttpRequest) -> HttpFuture<'_> {
				Box::pin(async {
					Ok::<_, TransportError>(HttpResponse {
						status: 401,
						headers: Vec::new(),
						body: b"denied".to_vec(),
					})
				})
			}
		}

		let config = CarrierConfig::builder()
			.sandbox_base_url(Url::parse("https://wwwcie.ups.com").expect("URL should parse."))
			.account_number("A1B2C3")
			.credentials(ClientCredentials::new("client", "secret"))
			.build()
			.expect("Config should build.");
		let store = Arc::new(MemoryStore::default());
		let manager = TokenManager::new(
			OAuthClient::new(&config, Arc::new(Rejecting)).expect("OAuth client should build."),
			store.clone(),
			Arc::new(ChaChaTokenCipher::generate()),
		)
		.with_lock_provider(store.clone());
		let err = block_on(manager.get_token()).expect_err("Rejected refreshes should fail.");

		assert!(matches!(err, Error::Auth(AuthError::Rejected { status: 401, .. })));
		assert!(store.is_empty());
	}
}
