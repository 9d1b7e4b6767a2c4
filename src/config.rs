//! Carrier connection settings, their validating builder, and the environment loader.

// self
use crate::{_prelude::*, auth::ClientCredentials, error::ConfigError, rating::RequestMode};

/// Target environment selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
	#[default]
	/// Carrier sandbox (customer integration environment).
	Sandbox,
	/// Carrier production.
	Production,
}
impl Environment {
	/// Maps an environment selector string; only `prod`/`production` select production.
	pub fn from_selector(selector: &str) -> Self {
		let selector = selector.trim();

		if selector.eq_ignore_ascii_case("prod") || selector.eq_ignore_ascii_case("production") {
			Self::Production
		} else {
			Self::Sandbox
		}
	}
}

/// Unit-of-measurement codes sent with package dimensions and weight.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitCodes {
	/// Dimension unit code (e.g. `CM`, `IN`).
	pub dimension: String,
	/// Weight unit code (e.g. `KGS`, `LBS`).
	pub weight: String,
}
impl Default for UnitCodes {
	fn default() -> Self {
		Self { dimension: "CM".into(), weight: "KGS".into() }
	}
}

/// Retry policy for the token exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
	/// Total attempts, including the first one.
	pub attempts: u32,
	/// Delay between attempts.
	pub delay: Duration,
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self { attempts: 3, delay: Duration::milliseconds(200) }
	}
}

/// Validated carrier settings consumed by the OAuth client, rate client, and request builder.
#[derive(Clone, Debug)]
pub struct CarrierConfig {
	/// Selected environment.
	pub environment: Environment,
	/// Base URL of the selected environment.
	pub base_url: Url,
	/// Rating API version segment (e.g. `v2403`).
	pub api_version: String,
	/// Shipper account number.
	pub account_number: String,
	/// Path of the OAuth token endpoint relative to the base URL.
	pub oauth_path: String,
	/// Path prefix of the rating endpoints relative to the base URL.
	pub rating_path: String,
	/// Unit-of-measurement codes.
	pub units: UnitCodes,
	/// OAuth client credentials.
	pub credentials: ClientCredentials,
	/// Value of the merchant-identifying header sent with token requests.
	pub merchant_id: String,
	/// Shipper display name placed in rate requests.
	pub shipper_name: String,
	/// Recipient display name placed in rate requests.
	pub recipient_name: String,
	/// Response header carrying the carrier's transaction id.
	pub transaction_header: String,
	/// Timeout applied to each token request attempt.
	pub oauth_timeout: Duration,
	/// Timeout applied to the rating call.
	pub rating_timeout: Duration,
	/// Retry policy for the token exchange.
	pub oauth_retry: RetryPolicy,
}
impl CarrierConfig {
	/// Default rating API version.
	pub const DEFAULT_API_VERSION: &str = "v2403";
	/// Default OAuth token path.
	pub const DEFAULT_OAUTH_PATH: &str = "/security/v1/oauth/token";
	/// Default rating path prefix.
	pub const DEFAULT_RATING_PATH: &str = "/api/rating";
	/// Default transaction-id response header.
	pub const DEFAULT_TRANSACTION_HEADER: &str = "transId";
	/// Default environment-variable prefix.
	pub const DEFAULT_ENV_PREFIX: &str = "UPS";

	/// Creates a new builder.
	pub fn builder() -> CarrierConfigBuilder {
		CarrierConfigBuilder::default()
	}

	/// Loads settings from `UPS_*` environment variables.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_env_with_prefix(Self::DEFAULT_ENV_PREFIX)
	}

	/// Loads settings from `{prefix}_*` environment variables.
	pub fn from_env_with_prefix(prefix: &str) -> Result<Self, ConfigError> {
		Self::from_lookup(prefix, |name| std::env::var(name).ok())
	}

	/// Loads settings through an arbitrary `{prefix}_*` lookup; empty values count as unset.
	pub fn from_lookup<F>(prefix: &str, lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let read = |suffix: &str| {
			lookup(&format!("{prefix}_{suffix}"))
				.map(|value| value.trim().to_owned())
				.filter(|value| !value.is_empty())
		};
		let parse_url = |suffix: &str, endpoint: &'static str| {
			read(suffix)
				.map(|raw| Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl { endpoint, source }))
				.transpose()
		};
		let mut builder = Self::builder()
			.environment(read("ENV").map(|value| Environment::from_selector(&value)).unwrap_or_default());

		if let Some(url) = parse_url("BASE_URL_SANDBOX", "sandbox_base_url")? {
			builder = builder.sandbox_base_url(url);
		}
		if let Some(url) = parse_url("BASE_URL_PROD", "production_base_url")? {
			builder = builder.production_base_url(url);
		}
		if let Some(version) = read("RATING_VERSION") {
			builder = builder.api_version(version);
		}
		if let Some(account) = read("ACCOUNT_NUMBER") {
			builder = builder.account_number(account);
		}
		if let Some(path) = read("OAUTH_PATH") {
			builder = builder.oauth_path(path);
		}

		let defaults = UnitCodes::default();

		builder = builder.units(UnitCodes {
			dimension: read("UOM_DIM").unwrap_or(defaults.dimension),
			weight: read("UOM_WEIGHT").unwrap_or(defaults.weight),
		});

		if let (Some(id), Some(secret)) = (read("CLIENT_ID"), read("CLIENT_SECRET")) {
			builder = builder.credentials(ClientCredentials::new(id, secret));
		}
		if let Some(merchant) = read("MERCHANT_ID") {
			builder = builder.merchant_id(merchant);
		}
		if let Some(name) = read("SHIPPER_NAME") {
			builder = builder.shipper_name(name);
		}
		if let Some(name) = read("RECIPIENT_NAME") {
			builder = builder.recipient_name(name);
		}

		builder.build()
	}

	/// Absolute URL of the OAuth token endpoint.
	pub fn token_endpoint(&self) -> Result<Url, ConfigError> {
		join_endpoint(&self.base_url, &[&self.oauth_path], "token")
	}

	/// Absolute URL of the rating endpoint for `mode`.
	pub fn rating_endpoint(&self, mode: RequestMode) -> Result<Url, ConfigError> {
		join_endpoint(
			&self.base_url,
			&[&self.rating_path, &self.api_version, mode.as_str()],
			"rating",
		)
	}
}

/// Builder for [`CarrierConfig`] values.
#[derive(Debug, Default)]
pub struct CarrierConfigBuilder {
	environment: Environment,
	sandbox_base_url: Option<Url>,
	production_base_url: Option<Url>,
	api_version: Option<String>,
	account_number: Option<String>,
	oauth_path: Option<String>,
	rating_path: Option<String>,
	units: UnitCodes,
	credentials: Option<ClientCredentials>,
	merchant_id: Option<String>,
	shipper_name: Option<String>,
	recipient_name: Option<String>,
	transaction_header: Option<String>,
	oauth_timeout: Option<Duration>,
	rating_timeout: Option<Duration>,
	oauth_retry: RetryPolicy,
}
impl CarrierConfigBuilder {
	/// Selects the target environment.
	pub fn environment(mut self, environment: Environment) -> Self {
		self.environment = environment;

		self
	}

	/// Sets the sandbox base URL.
	pub fn sandbox_base_url(mut self, url: Url) -> Self {
		self.sandbox_base_url = Some(url);

		self
	}

	/// Sets the production base URL.
	pub fn production_base_url(mut self, url: Url) -> Self {
		self.production_base_url = Some(url);

		self
	}

	/// Overrides the rating API version (defaults to `v2403`).
	pub fn api_version(mut self, version: impl Into<String>) -> Self {
		self.api_version = Some(version.into());

		self
	}

	/// Sets the shipper account number.
	pub fn account_number(mut self, account: impl Into<String>) -> Self {
		self.account_number = Some(account.into());

		self
	}

	/// Overrides the OAuth token path.
	pub fn oauth_path(mut self, path: impl Into<String>) -> Self {
		self.oauth_path = Some(path.into());

		self
	}

	/// Overrides the rating path prefix.
	pub fn rating_path(mut self, path: impl Into<String>) -> Self {
		self.rating_path = Some(path.into());

		self
	}

	/// Overrides the unit-of-measurement codes.
	pub fn units(mut self, units: UnitCodes) -> Self {
		self.units = units;

		self
	}

	/// Sets the OAuth client credentials.
	pub fn credentials(mut self, credentials: ClientCredentials) -> Self {
		self.credentials = Some(credentials);

		self
	}

	/// Overrides the merchant header value (defaults to the client id).
	pub fn merchant_id(mut self, merchant_id: impl Into<String>) -> Self {
		self.merchant_id = Some(merchant_id.into());

		self
	}

	/// Overrides the shipper display name.
	pub fn shipper_name(mut self, name: impl Into<String>) -> Self {
		self.shipper_name = Some(name.into());

		self
	}

	/// Overrides the recipient display name.
	pub fn recipient_name(mut self, name: impl Into<String>) -> Self {
		self.recipient_name = Some(name.into());

		self
	}

	/// Overrides the transaction-id response header name.
	pub fn transaction_header(mut self, header: impl Into<String>) -> Self {
		self.transaction_header = Some(header.into());

		self
	}

	/// Overrides the per-attempt token request timeout (defaults to 15 seconds).
	pub fn oauth_timeout(mut self, timeout: Duration) -> Self {
		self.oauth_timeout = Some(timeout);

		self
	}

	/// Overrides the rating call timeout (defaults to 20 seconds).
	pub fn rating_timeout(mut self, timeout: Duration) -> Self {
		self.rating_timeout = Some(timeout);

		self
	}

	/// Overrides the total number of token request attempts (defaults to 3).
	pub fn oauth_retry_attempts(mut self, attempts: u32) -> Self {
		self.oauth_retry.attempts = attempts;

		self
	}

	/// Overrides the delay between token request attempts (defaults to 200ms).
	pub fn oauth_retry_delay(mut self, delay: Duration) -> Self {
		self.oauth_retry.delay = delay;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<CarrierConfig, ConfigError> {
		let (base_url, field) = match self.environment {
			Environment::Sandbox => (self.sandbox_base_url, "sandbox_base_url"),
			Environment::Production => (self.production_base_url, "production_base_url"),
		};
		let base_url = base_url.ok_or(ConfigError::MissingField { field })?;

		validate_endpoint(field, &base_url)?;

		let account_number = required("account_number", self.account_number)?;
		let credentials = self.credentials.ok_or(ConfigError::MissingField { field: "credentials" })?;

		if credentials.client_id.trim().is_empty() {
			return Err(invalid("client_id", "must not be empty"));
		}
		if credentials.client_secret.is_empty() {
			return Err(invalid("client_secret", "must not be empty"));
		}

		let api_version = self.api_version.unwrap_or_else(|| CarrierConfig::DEFAULT_API_VERSION.into());

		if api_version.trim().is_empty() || api_version.contains('/') {
			return Err(invalid("api_version", "must be a single non-empty path segment"));
		}
		if self.units.dimension.trim().is_empty() || self.units.weight.trim().is_empty() {
			return Err(invalid("units", "unit codes must not be empty"));
		}
		if self.oauth_retry.attempts == 0 {
			return Err(invalid("oauth_retry", "at least one attempt is required"));
		}
		if self.oauth_retry.delay.is_negative() {
			return Err(invalid("oauth_retry", "delay must not be negative"));
		}

		let oauth_timeout = positive("oauth_timeout", self.oauth_timeout, Duration::seconds(15))?;
		let rating_timeout = positive("rating_timeout", self.rating_timeout, Duration::seconds(20))?;
		let merchant_id = self.merchant_id.unwrap_or_else(|| credentials.client_id.clone());

		Ok(CarrierConfig {
			environment: self.environment,
			base_url,
			api_version,
			account_number,
			oauth_path: self.oauth_path.unwrap_or_else(|| CarrierConfig::DEFAULT_OAUTH_PATH.into()),
			rating_path: self
				.rating_path
				.unwrap_or_else(|| CarrierConfig::DEFAULT_RATING_PATH.into()),
			units: self.units,
			credentials,
			merchant_id,
			shipper_name: self.shipper_name.unwrap_or_else(|| "Shipper".into()),
			recipient_name: self.recipient_name.unwrap_or_else(|| "Recipient".into()),
			transaction_header: self
				.transaction_header
				.unwrap_or_else(|| CarrierConfig::DEFAULT_TRANSACTION_HEADER.into()),
			oauth_timeout,
			rating_timeout,
			oauth_retry: self.oauth_retry,
		})
	}
}

fn required(field: &'static str, value: Option<String>) -> Result<String, ConfigError> {
	let value = value.ok_or(ConfigError::MissingField { field })?;

	if value.trim().is_empty() {
		return Err(invalid(field, "must not be empty"));
	}

	Ok(value)
}

fn positive(
	field: &'static str,
	value: Option<Duration>,
	default: Duration,
) -> Result<Duration, ConfigError> {
	match value {
		Some(value) if !value.is_positive() => Err(invalid(field, "must be positive")),
		Some(value) => Ok(value),
		None => Ok(default),
	}
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
	ConfigError::InvalidField { field, reason: reason.into() }
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ConfigError> {
	let loopback = matches!(url.host_str(), Some("localhost" | "127.0.0.1" | "[::1]"));

	if url.scheme() == "https" || (url.scheme() == "http" && loopback) {
		Ok(())
	} else {
		Err(ConfigError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	}
}

fn join_endpoint(
	base: &Url,
	segments: &[&str],
	endpoint: &'static str,
) -> Result<Url, ConfigError> {
	let mut joined = base.as_str().trim_end_matches('/').to_owned();

	for segment in segments {
		let segment = segment.trim_matches('/');

		if segment.is_empty() {
			continue;
		}

		joined.push('/');
		joined.push_str(segment);
	}

	Url::parse(&joined).map_err(|source| ConfigError::InvalidUrl { endpoint, source })
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn base() -> CarrierConfigBuilder {
		CarrierConfig::builder()
			.sandbox_base_url(
				Url::parse("https://wwwcie.ups.com/").expect("Sandbox URL should parse."),
			)
			.production_base_url(
				Url::parse("https://onlinetools.ups.com").expect("Production URL should parse."),
			)
			.account_number("A1B2C3")
			.credentials(ClientCredentials::new("client", "secret"))
	}

	#[test]
	fn defaults_fill_optional_settings() {
		let config = base().build().expect("Config should build with defaults.");

		assert_eq!(config.environment, Environment::Sandbox);
		assert_eq!(config.api_version, "v2403");
		assert_eq!(config.units, UnitCodes { dimension: "CM".into(), weight: "KGS".into() });
		assert_eq!(config.merchant_id, "client");
		assert_eq!(config.oauth_retry, RetryPolicy::default());
		assert_eq!(config.rating_timeout, Duration::seconds(20));
		assert_eq!(config.transaction_header, "transId");
	}

	#[test]
	fn endpoints_follow_environment_and_mode() {
		let sandbox = base().build().expect("Sandbox config should build.");
		let production = base()
			.environment(Environment::Production)
			.api_version("v2409")
			.build()
			.expect("Production config should build.");

		assert_eq!(
			sandbox.token_endpoint().expect("Token endpoint should join.").as_str(),
			"https://wwwcie.ups.com/security/v1/oauth/token"
		);
		assert_eq!(
			sandbox.rating_endpoint(RequestMode::Shop).expect("Rating endpoint should join.").as_str(),
			"https://wwwcie.ups.com/api/rating/v2403/shop"
		);
		assert_eq!(
			production
				.rating_endpoint(RequestMode::Rate)
				.expect("Rating endpoint should join.")
				.as_str(),
			"https://onlinetools.ups.com/api/rating/v2409/rate"
		);
	}

	#[test]
	fn builder_rejects_missing_and_insecure_settings() {
		let err = CarrierConfig::builder()
			.account_number("A1")
			.credentials(ClientCredentials::new("c", "s"))
			.build()
			.expect_err("Missing base URL should be rejected.");

		assert!(matches!(err, ConfigError::MissingField { field: "sandbox_base_url" }));

		let err = base()
			.sandbox_base_url(Url::parse("http://carrier.example").expect("URL should parse."))
			.build()
			.expect_err("Plain HTTP should be rejected for remote hosts.");

		assert!(matches!(err, ConfigError::InsecureEndpoint { .. }));

		let err = base().oauth_retry_attempts(0).build().expect_err("Zero attempts are invalid.");

		assert!(matches!(err, ConfigError::InvalidField { field: "oauth_retry", .. }));
		assert!(
			base()
				.sandbox_base_url(Url::parse("http://127.0.0.1:8080").expect("URL should parse."))
				.build()
				.is_ok()
		);
	}

	#[test]
	fn lookup_reads_prefixed_variables() {
		let vars = HashMap::from([
			("UPS_ENV", "prod"),
			("UPS_BASE_URL_PROD", "https://onlinetools.ups.com"),
			("UPS_ACCOUNT_NUMBER", "Z9Y8X7"),
			("UPS_CLIENT_ID", "env-client"),
			("UPS_CLIENT_SECRET", "env-secret"),
			("UPS_UOM_DIM", "IN"),
			("UPS_UOM_WEIGHT", ""),
			("UPS_RATING_VERSION", "v1"),
		]);
		let config = CarrierConfig::from_lookup("UPS", |name| vars.get(name).map(|v| v.to_string()))
			.expect("Lookup-based config should build.");

		assert_eq!(config.environment, Environment::Production);
		assert_eq!(config.account_number, "Z9Y8X7");
		assert_eq!(config.units.dimension, "IN");
		assert_eq!(config.units.weight, "KGS");
		assert_eq!(config.credentials.client_id, "env-client");
		assert_eq!(
			config.rating_endpoint(RequestMode::Shop).expect("Endpoint should join.").as_str(),
			"https://onlinetools.ups.com/api/rating/v1/shop"
		);
	}
}
