//! Resilient façade over a carrier's shipment-rating API.
//!
//! The crate caches the carrier's OAuth client-credentials token encrypted at rest, refreshes it
//! single-flight under a named lock, shapes rate-quote requests into the carrier schema, and
//! normalizes the carrier's rate responses into a uniform [`rating::RatingOutcome`].
//! [`flows::RatingService::get_rates`] is the entry point; it never returns an error or panics,
//! and reports every failure as a classified [`rating::RatingFailure`].

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cipher;
pub mod config;
pub mod error;
pub mod flows;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod rating;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::ClientCredentials,
		cipher::{ChaChaTokenCipher, TokenCipher},
		config::{CarrierConfig, Environment},
		flows::{RatingService, TokenManagerSettings},
		http::ReqwestHttpClient,
		store::{LockProvider, MemoryStore, TokenCache},
	};

	/// Rating service type alias used by reqwest-backed integration tests.
	pub type ReqwestTestService = RatingService<ReqwestHttpClient>;

	/// Client identifier baked into [`test_config`].
	pub const TEST_CLIENT_ID: &str = "test-client";
	/// Client secret baked into [`test_config`].
	pub const TEST_CLIENT_SECRET: &str = "test-secret";
	/// Account number baked into [`test_config`].
	pub const TEST_ACCOUNT: &str = "A1B2C3";

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Builds a sandbox configuration whose endpoints all point at `base_url`.
	pub fn test_config(base_url: &str) -> CarrierConfig {
		let base = Url::parse(base_url).expect("Mock server base URL should parse.");

		CarrierConfig::builder()
			.environment(Environment::Sandbox)
			.sandbox_base_url(base.clone())
			.production_base_url(base)
			.account_number(TEST_ACCOUNT)
			.credentials(ClientCredentials::new(TEST_CLIENT_ID, TEST_CLIENT_SECRET))
			.oauth_retry_delay(Duration::milliseconds(10))
			.build()
			.expect("Test carrier configuration should build.")
	}

	/// Deterministic cipher shared by tests that pre-seed the cache.
	pub fn test_cipher() -> Arc<ChaChaTokenCipher> {
		Arc::new(ChaChaTokenCipher::derive("rating-broker-test-key"))
	}

	/// Constructs a [`RatingService`] backed by an in-memory store that provides both the token
	/// cache and the refresh lock.
	pub fn build_reqwest_test_service(
		config: CarrierConfig,
		settings: TokenManagerSettings,
	) -> (ReqwestTestService, Arc<MemoryStore>) {
		let store = Arc::new(MemoryStore::default());
		let cache: Arc<dyn TokenCache> = store.clone();
		let locks: Arc<dyn LockProvider> = store.clone();
		let cipher: Arc<dyn TokenCipher> = test_cipher();
		let service = RatingService::with_http_client(
			config,
			cache,
			cipher,
			Arc::new(test_reqwest_http_client()),
		)
		.expect("Test rating service should build.")
		.with_lock_provider(locks)
		.with_token_settings(settings);

		(service, store)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
