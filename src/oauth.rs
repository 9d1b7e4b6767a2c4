//! Client-credentials exchange against the carrier's OAuth token endpoint.
//!
//! Each attempt posts `grant_type=client_credentials` with HTTP Basic client authentication and
//! the merchant header. Transport failures, `429`, and `5xx` responses are retried according to
//! the configured [`RetryPolicy`]; any other status ends the exchange immediately. Exhausting the
//! retries is not an error by itself: the last response (or transport failure) is classified like
//! a single attempt would be.

// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ClientCredentials, DEFAULT_TOKEN_LIFETIME, MAX_TOKEN_LIFETIME},
	config::{CarrierConfig, RetryPolicy},
	error::{AuthError, ConfigError, TransportError},
	http::{CarrierHttpClient, HttpRequest, HttpResponse},
};

/// Header carrying the merchant identifier on token requests.
pub const MERCHANT_HEADER: &str = "x-merchant-id";

#[derive(Debug, Deserialize)]
struct TokenResponse {
	#[serde(default)]
	access_token: Option<String>,
	#[serde(default)]
	expires_in: Option<Value>,
}

/// Performs the client-credentials grant and turns the response into an [`AccessToken`].
pub struct OAuthClient<C>
where
	C: ?Sized + CarrierHttpClient,
{
	http: Arc<C>,
	token_url: Url,
	credentials: ClientCredentials,
	merchant_id: String,
	retry: RetryPolicy,
	timeout: Duration,
}
impl<C> OAuthClient<C>
where
	C: ?Sized + CarrierHttpClient,
{
	/// Resolves the token endpoint and captures credentials from `config`.
	pub fn new(config: &CarrierConfig, http: Arc<C>) -> Result<Self, ConfigError> {
		Ok(Self {
			http,
			token_url: config.token_endpoint()?,
			credentials: config.credentials.clone(),
			merchant_id: config.merchant_id.clone(),
			retry: config.oauth_retry,
			timeout: config.oauth_timeout,
		})
	}

	/// Absolute token endpoint URL.
	pub fn token_url(&self) -> &Url {
		&self.token_url
	}

	/// Exchanges the client credentials for a fresh access token.
	pub async fn refresh(&self) -> Result<AccessToken, AuthError> {
		let response = self.exchange().await.map_err(AuthError::Transport)?;

		if !response.is_success() {
			return Err(AuthError::Rejected { status: response.status, body: response.text() });
		}

		parse_token(&response)
	}

	async fn exchange(&self) -> Result<HttpResponse, TransportError> {
		let request = HttpRequest::post(self.token_url.clone())
			.accept_json()
			.header(MERCHANT_HEADER, self.merchant_id.as_str())
			.header("Authorization", self.credentials.basic_authorization())
			.form(&[("grant_type", "client_credentials")])
			.timeout(self.timeout);
		let attempts = self.retry.attempts.max(1);
		let mut attempt = 1;

		loop {
			let outcome = self.http.execute(request.clone()).await;
			let transient = match &outcome {
				Ok(response) => response.is_transient(),
				Err(_) => true,
			};

			if !transient || attempt >= attempts {
				return outcome;
			}

			#[cfg(feature = "tracing")]
			tracing::debug!(attempt, attempts, "Retrying transient token endpoint failure.");

			attempt += 1;

			tokio::time::sleep(self.retry.delay.unsigned_abs()).await;
		}
	}
}
impl<C> Debug for OAuthClient<C>
where
	C: ?Sized + CarrierHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuthClient")
			.field("token_url", &self.token_url.as_str())
			.field("credentials", &self.credentials)
			.field("merchant_id", &self.merchant_id)
			.field("retry", &self.retry)
			.field("timeout", &self.timeout)
			.finish()
	}
}

fn parse_token(response: &HttpResponse) -> Result<AccessToken, AuthError> {
	if response.body.iter().all(u8::is_ascii_whitespace) {
		return Err(AuthError::EmptyToken);
	}

	let mut deserializer = serde_json::Deserializer::from_slice(&response.body);
	let parsed: TokenResponse = serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| AuthError::MalformedResponse { source })?;
	let secret = parsed
		.access_token
		.map(|token| token.trim().to_owned())
		.filter(|token| !token.is_empty())
		.ok_or(AuthError::EmptyToken)?;
	let lifetime = parsed.expires_in.as_ref().and_then(lifetime).unwrap_or(DEFAULT_TOKEN_LIFETIME);

	Ok(AccessToken::issued_now(secret, lifetime))
}

// Integer seconds or a numeric string, clamped to `0..=MAX_TOKEN_LIFETIME`.
fn lifetime(value: &Value) -> Option<Duration> {
	let seconds = match value {
		Value::Number(number) =>
			number.as_i64().or_else(|| number.as_f64().filter(|n| n.is_finite()).map(|n| n as i64)),
		Value::String(text) => text.trim().parse::<i64>().ok(),
		_ => None,
	}?;

	Some(Duration::seconds(seconds.clamp(0, MAX_TOKEN_LIFETIME.whole_seconds())))
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	fn ok(body: &str) -> HttpResponse {
		HttpResponse { status: 200, headers: Vec::new(), body: body.as_bytes().to_vec() }
	}

	#[test]
	fn token_lifetime_and_ttl_follow_expires_in() {
		let token = parse_token(&ok(r#"{"access_token":"abc","expires_in":"14399"}"#))
			.expect("Token response should parse.");

		assert_eq!(token.expose(), "abc");
		assert_eq!(token.lifetime(), Duration::seconds(14399));
		assert_eq!(token.cache_ttl(), Duration::seconds(14339));

		let token = parse_token(&ok(r#"{"access_token":"abc","expires_in":120}"#))
			.expect("Short-lived token response should parse.");

		assert_eq!(token.cache_ttl(), Duration::seconds(300));
	}

	#[test]
	fn missing_or_odd_expires_in_falls_back_to_default() {
		for body in [
			json!({ "access_token": "abc" }),
			json!({ "access_token": "abc", "expires_in": null }),
			json!({ "access_token": "abc", "expires_in": "soon" }),
			json!({ "access_token": "abc", "expires_in": true }),
		] {
			let token =
				parse_token(&ok(&body.to_string())).expect("Token response should parse.");

			assert_eq!(token.lifetime(), DEFAULT_TOKEN_LIFETIME);
			assert_eq!(token.cache_ttl(), Duration::seconds(3540));
		}
	}

	#[test]
	fn oversized_expires_in_is_capped() {
		for body in [
			json!({ "access_token": "abc", "expires_in": 1e300 }),
			json!({ "access_token": "abc", "expires_in": i64::MAX }),
			json!({ "access_token": "abc", "expires_in": u64::MAX }),
			json!({ "access_token": "abc", "expires_in": i64::MAX.to_string() }),
		] {
			let token =
				parse_token(&ok(&body.to_string())).expect("Oversized lifetimes should parse.");

			assert_eq!(token.lifetime(), MAX_TOKEN_LIFETIME, "body: {body}");
			assert_eq!(token.cache_ttl(), MAX_TOKEN_LIFETIME - Duration::seconds(60));
		}

		let token = parse_token(&ok(r#"{"access_token":"abc","expires_in":-30}"#))
			.expect("Negative lifetimes should parse.");

		assert_eq!(token.lifetime(), Duration::ZERO);
	}

	#[test]
	fn empty_tokens_are_rejected() {
		for body in ["", "  ", "{}", r#"{"access_token":""}"#, r#"{"access_token":null}"#] {
			assert!(matches!(parse_token(&ok(body)), Err(AuthError::EmptyToken)), "body: {body}");
		}
	}

	#[test]
	fn malformed_payload_reports_path() {
		let err = parse_token(&ok(r#"{"access_token":42}"#))
			.expect_err("Numeric access tokens are malformed.");
		let AuthError::MalformedResponse { source } = err else {
			panic!("Expected a malformed response error, got {err:?}.");
		};

		assert_eq!(source.path().to_string(), "access_token");
		assert!(matches!(parse_token(&ok("<html>")), Err(AuthError::MalformedResponse { .. })));
	}
}
