//! Bearer-authenticated transport for the rating endpoints.

// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	config::CarrierConfig,
	error::{ConfigError, RateError},
	http::{CarrierHttpClient, HttpRequest},
	rating::{builder::CarrierPayload, normalize::CarrierResponse, request::RequestMode},
};

/// Posts [`CarrierPayload`]s to the mode-specific rating endpoint.
pub struct RateClient<C>
where
	C: ?Sized + CarrierHttpClient,
{
	http: Arc<C>,
	shop_endpoint: Url,
	rate_endpoint: Url,
	timeout: Duration,
	transaction_header: String,
}
impl<C> RateClient<C>
where
	C: ?Sized + CarrierHttpClient,
{
	/// Resolves both rating endpoints from `config`.
	pub fn new(config: &CarrierConfig, http: Arc<C>) -> Result<Self, ConfigError> {
		Ok(Self {
			http,
			shop_endpoint: config.rating_endpoint(RequestMode::Shop)?,
			rate_endpoint: config.rating_endpoint(RequestMode::Rate)?,
			timeout: config.rating_timeout,
			transaction_header: config.transaction_header.clone(),
		})
	}

	/// Endpoint used for `mode`.
	pub fn endpoint(&self, mode: RequestMode) -> &Url {
		match mode {
			RequestMode::Shop => &self.shop_endpoint,
			RequestMode::Rate => &self.rate_endpoint,
		}
	}

	/// Sends `payload` authorized by `token`.
	///
	/// Non-2xx statuses become [`RateError::Rejected`] with the raw body and the transaction id
	/// header, when present. An empty 2xx body is treated as an empty response document.
	pub async fn send(
		&self,
		payload: &CarrierPayload,
		token: &AccessToken,
	) -> Result<CarrierResponse, RateError> {
		let request = HttpRequest::post(self.endpoint(payload.mode()).clone())
			.accept_json()
			.bearer_auth(token.expose())
			.timeout(self.timeout)
			.json(payload)
			.map_err(RateError::Encode)?;
		let response = self
			.http
			.execute(request)
			.await
			.map_err(|source| RateError::Transport { source })?;
		let correlation_id = response
			.header(&self.transaction_header)
			.map(str::trim)
			.filter(|value| !value.is_empty())
			.map(ToOwned::to_owned);

		if !response.is_success() {
			return Err(RateError::Rejected {
				status: response.status,
				body: response.text(),
				correlation_id,
			});
		}
		if response.body.iter().all(u8::is_ascii_whitespace) {
			return Ok(CarrierResponse { body: serde_json::Value::Null, transaction_id: correlation_id });
		}

		match serde_json::from_slice(&response.body) {
			Ok(body) => Ok(CarrierResponse { body, transaction_id: correlation_id }),
			Err(source) => Err(RateError::MalformedResponse { source, correlation_id }),
		}
	}
}
impl<C> Clone for RateClient<C>
where
	C: ?Sized + CarrierHttpClient,
{
	fn clone(&self) -> Self {
		Self {
			http: self.http.clone(),
			shop_endpoint: self.shop_endpoint.clone(),
			rate_endpoint: self.rate_endpoint.clone(),
			timeout: self.timeout,
			transaction_header: self.transaction_header.clone(),
		}
	}
}
impl<C> Debug for RateClient<C>
where
	C: ?Sized + CarrierHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RateClient")
			.field("shop_endpoint", &self.shop_endpoint.as_str())
			.field("rate_endpoint", &self.rate_endpoint.as_str())
			.field("timeout", &self.timeout)
			.field("transaction_header", &self.transaction_header)
			.finish()
	}
}
