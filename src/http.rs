//! Transport primitives for the carrier's OAuth and rating endpoints.
//!
//! The module exposes [`CarrierHttpClient`] alongside the transport-agnostic
//! [`HttpRequest`]/[`HttpResponse`] pair so downstream crates can plug in a custom HTTP stack
//! (or a scripted fake in tests) without the broker depending on its types. The reqwest-backed
//! [`ReqwestHttpClient`] is enabled by the default `reqwest` feature.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
use url::form_urlencoded::Serializer as FormSerializer;
// self
use crate::{_prelude::*, error::TransportError};

/// Boxed future returned by [`CarrierHttpClient::execute`].
pub type HttpFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports able to execute the broker's outbound requests.
///
/// Implementations must be `Send + Sync + 'static` so they can be shared behind an `Arc`
/// across token managers and rate clients. The request already carries every header, the
/// body, and the per-request timeout; implementations must honour that timeout and report
/// its expiry as [`TransportError::Timeout`].
pub trait CarrierHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Executes `request`, resolving to the response regardless of its status code.
	fn execute(&self, request: HttpRequest) -> HttpFuture<'_>;
}

/// HTTP methods used by the broker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
	/// `GET`.
	Get,
	/// `POST`.
	Post,
}
impl HttpMethod {
	/// Returns the canonical method token.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Get => "GET",
			Self::Post => "POST",
		}
	}
}

/// Outbound request description.
#[derive(Clone)]
pub struct HttpRequest {
	/// Request method.
	pub method: HttpMethod,
	/// Absolute target URL.
	pub url: Url,
	/// Header name/value pairs, in insertion order.
	pub headers: Vec<(String, String)>,
	/// Request body.
	pub body: Vec<u8>,
	/// Per-request timeout.
	pub timeout: Option<Duration>,
}
impl HttpRequest {
	/// Starts a `POST` request to `url`.
	pub fn post(url: Url) -> Self {
		Self { method: HttpMethod::Post, url, headers: Vec::new(), body: Vec::new(), timeout: None }
	}

	/// Appends a header.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}

	/// Sets `Accept: application/json`.
	pub fn accept_json(self) -> Self {
		self.header("Accept", "application/json")
	}

	/// Sets a bearer `Authorization` header.
	pub fn bearer_auth(self, token: &str) -> Self {
		self.header("Authorization", format!("Bearer {token}"))
	}

	/// Sets a form-encoded body.
	pub fn form(mut self, fields: &[(&str, &str)]) -> Self {
		let mut serializer = FormSerializer::new(String::new());

		for (key, value) in fields {
			serializer.append_pair(key, value);
		}

		self.body = serializer.finish().into_bytes();

		self.header("Content-Type", "application/x-www-form-urlencoded")
	}

	/// Sets a JSON body.
	pub fn json<T>(mut self, value: &T) -> Result<Self, serde_json::Error>
	where
		T: ?Sized + Serialize,
	{
		self.body = serde_json::to_vec(value)?;

		Ok(self.header("Content-Type", "application/json"))
	}

	/// Sets the per-request timeout.
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Returns the first header value matching `name` case-insensitively.
	pub fn header_value(&self, name: &str) -> Option<&str> {
		find_header(&self.headers, name)
	}
}
impl Debug for HttpRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let headers = self
			.headers
			.iter()
			.map(|(name, value)| {
				if name.eq_ignore_ascii_case("authorization") {
					(name.as_str(), "<redacted>")
				} else {
					(name.as_str(), value.as_str())
				}
			})
			.collect::<Vec<_>>();

		f.debug_struct("HttpRequest")
			.field("method", &self.method)
			.field("url", &self.url.as_str())
			.field("headers", &headers)
			.field("body_len", &self.body.len())
			.field("timeout", &self.timeout)
			.finish()
	}
}

/// Response captured from the transport.
#[derive(Clone, Debug, Default)]
pub struct HttpResponse {
	/// HTTP status code.
	pub status: u16,
	/// Header name/value pairs.
	pub headers: Vec<(String, String)>,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl HttpResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Returns `true` for statuses worth retrying (429 and 5xx).
	pub fn is_transient(&self) -> bool {
		self.status == 429 || self.status >= 500
	}

	/// Returns the first header value matching `name` case-insensitively.
	pub fn header(&self, name: &str) -> Option<&str> {
		find_header(&self.headers, name)
	}

	/// Returns the body as text, replacing invalid UTF-8 sequences.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}

/// Renders an `Authorization: Basic` header value.
pub fn basic_authorization(user: &str, password: &str) -> String {
	format!("Basic {}", STANDARD.encode(format!("{user}:{password}")))
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
	headers
		.iter()
		.find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
		.map(|(_, value)| value.as_str())
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Token requests should not follow redirects; configure any custom [`ReqwestClient`] to
/// disable redirect following before handing it to [`ReqwestHttpClient::with_client`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl CarrierHttpClient for ReqwestHttpClient {
	fn execute(&self, request: HttpRequest) -> HttpFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let method = match request.method {
				HttpMethod::Get => reqwest::Method::GET,
				HttpMethod::Post => reqwest::Method::POST,
			};
			let mut builder = client.request(method, request.url);

			for (name, value) in &request.headers {
				builder = builder.header(name.as_str(), value.as_str());
			}
			if let Some(timeout) = request.timeout {
				builder = builder.timeout(timeout.unsigned_abs());
			}

			let response = builder.body(request.body).send().await?;
			let status = response.status().as_u16();
			let headers = response
				.headers()
				.iter()
				.filter_map(|(name, value)| {
					value.to_str().ok().map(|value| (name.as_str().to_owned(), value.to_owned()))
				})
				.collect();
			let body = response.bytes().await?.to_vec();

			Ok(HttpResponse { status, headers, body })
		})
	}
}
