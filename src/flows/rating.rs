//! Composition root sequencing token lookup, payload shaping, the rating call, and
//! normalization behind a boundary that always returns a [`RatingOutcome`].

// self
use crate::{
	_prelude::*,
	cipher::TokenCipher,
	config::CarrierConfig,
	error::ConfigError,
	flows::token::{TokenManager, TokenManagerSettings},
	http::CarrierHttpClient,
	oauth::OAuthClient,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	rating::{
		RateClient, RateQuoteRequest, RateRequestBuilder, RatedService, RatingOutcome,
		ResponseNormalizer,
	},
	store::{LockProvider, TokenCache},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Rating service specialized for the crate's default reqwest transport.
pub type ReqwestRatingService = RatingService<ReqwestHttpClient>;

/// Carrier rating façade.
///
/// Calls are independent and may run concurrently; the token cache is the only state they
/// share. Cloning is cheap and clones share the token manager's cache, lock, and metrics.
pub struct RatingService<C>
where
	C: ?Sized + CarrierHttpClient,
{
	tokens: TokenManager<C>,
	builder: RateRequestBuilder,
	rates: RateClient<C>,
	normalizer: ResponseNormalizer,
}
impl<C> RatingService<C>
where
	C: ?Sized + CarrierHttpClient,
{
	/// Wires the pipeline around a caller-provided transport.
	///
	/// The returned service refreshes without mutual exclusion until
	/// [`RatingService::with_lock_provider`] attaches a lock.
	pub fn with_http_client(
		config: CarrierConfig,
		cache: Arc<dyn TokenCache>,
		cipher: Arc<dyn TokenCipher>,
		http_client: impl Into<Arc<C>>,
	) -> Result<Self, ConfigError> {
		let http = http_client.into();
		let oauth = OAuthClient::new(&config, http.clone())?;
		let rates = RateClient::new(&config, http)?;

		Ok(Self {
			tokens: TokenManager::new(oauth, cache, cipher),
			builder: RateRequestBuilder::from_config(&config),
			rates,
			normalizer: ResponseNormalizer,
		})
	}

	/// Enables single-flight token refreshes through `locks`.
	pub fn with_lock_provider(mut self, locks: Arc<dyn LockProvider>) -> Self {
		self.tokens = self.tokens.with_lock_provider(locks);

		self
	}

	/// Replaces the token cache key, lock name, and lock bounds.
	pub fn with_token_settings(mut self, settings: TokenManagerSettings) -> Self {
		self.tokens = self.tokens.with_settings(settings);

		self
	}

	/// Token manager backing this service.
	pub fn token_manager(&self) -> &TokenManager<C> {
		&self.tokens
	}

	/// Payload builder backing this service.
	pub fn request_builder(&self) -> &RateRequestBuilder {
		&self.builder
	}

	/// Prices `request`, converting every failure into [`RatingOutcome::Failure`].
	pub async fn get_rates(&self, request: &RateQuoteRequest) -> RatingOutcome {
		const KIND: FlowKind = FlowKind::Rating;

		let span = FlowSpan::new(KIND, "get_rates");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.rate(request)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(e) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
				span.warn(e.kind().as_str(), e);
			},
		}

		RatingOutcome::from(result)
	}

	async fn rate(&self, request: &RateQuoteRequest) -> Result<Vec<RatedService>> {
		let token = self.tokens.get_token().await?;
		let payload = self.builder.build(request);
		let response = self.rates.send(&payload, &token).await?;

		Ok(self.normalizer.normalize(&response))
	}
}
#[cfg(feature = "reqwest")]
impl RatingService<ReqwestHttpClient> {
	/// Wires the pipeline with its own reqwest transport.
	///
	/// The transport does not follow redirects.
	pub fn new(
		config: CarrierConfig,
		cache: Arc<dyn TokenCache>,
		cipher: Arc<dyn TokenCipher>,
	) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().redirect(reqwest::redirect::Policy::none()).build()?;

		Self::with_http_client(config, cache, cipher, ReqwestHttpClient::with_client(client))
	}
}
impl<C> Clone for RatingService<C>
where
	C: ?Sized + CarrierHttpClient,
{
	fn clone(&self) -> Self {
		Self {
			tokens: self.tokens.clone(),
			builder: self.builder.clone(),
			rates: self.rates.clone(),
			normalizer: self.normalizer,
		}
	}
}
impl<C> Debug for RatingService<C>
where
	C: ?Sized + CarrierHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RatingService")
			.field("tokens", &self.tokens)
			.field("builder", &self.builder)
			.field("rates", &self.rates)
			.finish()
	}
}
