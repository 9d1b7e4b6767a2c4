//! Access token records, their encrypted cache form, and the cache TTL rule.

// self
use crate::{
	_prelude::*,
	auth::token::secret::TokenSecret,
	cipher::{CipherError, TokenCipher},
	store::expiry_after,
};

/// Shortest TTL a cached token entry may carry.
pub const CACHE_TTL_FLOOR: Duration = Duration::seconds(300);
/// Safety margin subtracted from the upstream lifetime before caching.
pub const CACHE_SAFETY_MARGIN: Duration = Duration::seconds(60);
/// Lifetime assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::seconds(3600);
/// Longest upstream lifetime the broker accepts; larger reported values are capped.
pub const MAX_TOKEN_LIFETIME: Duration = Duration::days(1);

/// Computes the cache-layer TTL for a token with the provided upstream lifetime.
///
/// The result is `max(300s, lifetime - 60s)`.
pub fn cache_ttl(lifetime: Duration) -> Duration {
	let ttl = lifetime.saturating_sub(CACHE_SAFETY_MARGIN);

	if ttl < CACHE_TTL_FLOOR { CACHE_TTL_FLOOR } else { ttl }
}

/// Short-lived bearer credential issued by the carrier's token endpoint.
///
/// The serde representation carries the plaintext secret and exists only so the token can be
/// sealed by a [`TokenCipher`]; never persist it directly.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
	/// Bearer secret; callers must avoid logging it.
	pub secret: TokenSecret,
	/// Instant the broker received the token.
	pub issued_at: OffsetDateTime,
	/// Instant derived from `issued_at` plus the upstream lifetime.
	pub expires_at: OffsetDateTime,
}
impl AccessToken {
	/// Creates a token issued at `issued_at` that lives for `lifetime`.
	///
	/// The expiry saturates at the latest representable instant.
	pub fn new(secret: impl Into<String>, issued_at: OffsetDateTime, lifetime: Duration) -> Self {
		Self {
			secret: TokenSecret::new(secret),
			issued_at,
			expires_at: expiry_after(issued_at, lifetime),
		}
	}

	/// Convenience helper that stamps `issued_at` with the current clock.
	pub fn issued_now(secret: impl Into<String>, lifetime: Duration) -> Self {
		Self::new(secret, OffsetDateTime::now_utc(), lifetime)
	}

	/// Upstream-reported lifetime.
	pub fn lifetime(&self) -> Duration {
		self.expires_at - self.issued_at
	}

	/// TTL the cache entry for this token should carry.
	pub fn cache_ttl(&self) -> Duration {
		cache_ttl(self.lifetime())
	}

	/// Returns `true` if the token has expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Returns the bearer value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		self.secret.expose()
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessToken")
			.field("secret", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Encrypted form of an [`AccessToken`] plus the TTL the cache should apply.
#[derive(Clone, PartialEq, Eq)]
pub struct CachedTokenEntry {
	/// Ciphertext produced by a [`TokenCipher`].
	pub ciphertext: String,
	/// Cache-layer TTL, always `max(300s, lifetime - 60s)`.
	pub ttl: Duration,
}
impl CachedTokenEntry {
	/// Encrypts the token into a cache entry.
	pub fn seal(token: &AccessToken, cipher: &dyn TokenCipher) -> Result<Self, CipherError> {
		let envelope = serde_json::to_string(token)
			.map_err(|e| CipherError::Envelope { message: e.to_string() })?;
		let ciphertext = cipher.encrypt(&envelope)?;

		Ok(Self { ciphertext, ttl: token.cache_ttl() })
	}

	/// Decrypts a cached blob back into an [`AccessToken`].
	///
	/// A blob that authenticates but does not hold a token envelope is reported like any other
	/// decryption failure.
	pub fn open(ciphertext: &str, cipher: &dyn TokenCipher) -> Result<AccessToken, CipherError> {
		let envelope = cipher.decrypt(ciphertext)?;
		let token: AccessToken = serde_json::from_str(&envelope)
			.map_err(|e| CipherError::Envelope { message: e.to_string() })?;

		if token.secret.is_empty() {
			return Err(CipherError::Envelope { message: "sealed token is empty".into() });
		}

		Ok(token)
	}
}
impl Debug for CachedTokenEntry {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CachedTokenEntry")
			.field("ciphertext_len", &self.ciphertext.len())
			.field("ttl", &self.ttl)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::cipher::ChaChaTokenCipher;

	#[test]
	fn ttl_never_drops_below_the_floor() {
		for secs in [-10, 0, 1, 59, 60, 120, 300, 359, 360] {
			assert!(cache_ttl(Duration::seconds(secs)) >= CACHE_TTL_FLOOR, "lifetime {secs}s");
		}
	}

	#[test]
	fn ttl_keeps_a_sixty_second_margin_above_the_floor() {
		for secs in [360, 361, 900, 3600, 14_399, 86_400] {
			assert_eq!(cache_ttl(Duration::seconds(secs)), Duration::seconds(secs - 60));
		}
	}

	#[test]
	fn token_derives_expiry_from_lifetime() {
		let token = AccessToken::new(
			"bearer",
			macros::datetime!(2025-01-01 00:00 UTC),
			Duration::seconds(14_399),
		);

		assert_eq!(token.expires_at, macros::datetime!(2025-01-01 03:59:59 UTC));
		assert_eq!(token.lifetime(), Duration::seconds(14_399));
		assert_eq!(token.cache_ttl(), Duration::seconds(14_339));
		assert!(!token.is_expired_at(macros::datetime!(2025-01-01 03:59:58 UTC)));
		assert!(token.is_expired_at(macros::datetime!(2025-01-01 03:59:59 UTC)));
		assert!(!format!("{token:?}").contains("bearer"));
	}

	#[test]
	fn unrepresentable_lifetime_saturates() {
		let issued_at = macros::datetime!(2025-01-01 00:00 UTC);
		let token = AccessToken::new("bearer", issued_at, Duration::MAX);

		assert!(token.expires_at > issued_at);
		assert!(token.cache_ttl() > CACHE_TTL_FLOOR);
	}

	#[test]
	fn sealed_entries_hold_ciphertext_only() {
		let cipher = ChaChaTokenCipher::derive("entry-test");
		let token = AccessToken::issued_now("plain-bearer-value", Duration::seconds(3600));
		let entry = CachedTokenEntry::seal(&token, &cipher).expect("Sealing should succeed.");

		assert!(!entry.ciphertext.contains("plain-bearer-value"));
		assert_eq!(entry.ttl, Duration::seconds(3540));

		let opened =
			CachedTokenEntry::open(&entry.ciphertext, &cipher).expect("Opening should succeed.");

		assert_eq!(opened, token);
	}

	#[test]
	fn non_envelope_plaintext_is_rejected() {
		let cipher = ChaChaTokenCipher::derive("entry-test");
		let blob = cipher.encrypt("not-json").expect("Encryption should succeed.");
		let err = CachedTokenEntry::open(&blob, &cipher)
			.expect_err("A non-envelope plaintext should not open.");

		assert!(matches!(err, CipherError::Envelope { .. }));
	}
}
