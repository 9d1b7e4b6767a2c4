// std
use std::collections::VecDeque;
// crates.io
use httpmock::prelude::*;
// self
use rating_broker::{
	_preludet::*,
	error::{AuthError, TransportError},
	http::{CarrierHttpClient, HttpFuture, HttpRequest, HttpResponse, ReqwestHttpClient},
	oauth::OAuthClient,
};

const BASIC_AUTHORIZATION: &str = "Basic dGVzdC1jbGllbnQ6dGVzdC1zZWNyZXQ=";

fn reqwest_oauth_client(server: &MockServer) -> OAuthClient<ReqwestHttpClient> {
	OAuthClient::new(&test_config(&server.base_url()), Arc::new(test_reqwest_http_client()))
		.expect("OAuth client should build against the mock server.")
}

struct ScriptedHttp {
	responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
	calls: Mutex<usize>,
}
impl ScriptedHttp {
	fn new(responses: impl IntoIterator<Item = Result<HttpResponse, TransportError>>) -> Arc<Self> {
		Arc::new(Self {
			responses: Mutex::new(responses.into_iter().collect()),
			calls: Mutex::new(0),
		})
	}

	fn calls(&self) -> usize {
		*self.calls.lock()
	}
}
impl CarrierHttpClient for ScriptedHttp {
	fn execute(&self, _: HttpRequest) -> HttpFuture<'_> {
		*self.calls.lock() += 1;

		let next = self
			.responses
			.lock()
			.pop_front()
			.expect("Scripted transport ran out of responses.");

		Box::pin(async move { next })
	}
}

fn status(status: u16, body: &str) -> Result<HttpResponse, TransportError> {
	Ok(HttpResponse { status, headers: Vec::new(), body: body.as_bytes().to_vec() })
}

#[tokio::test]
async fn exchange_sends_form_basic_auth_and_merchant_header() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/security/v1/oauth/token")
				.header("authorization", BASIC_AUTHORIZATION)
				.header("x-merchant-id", TEST_CLIENT_ID)
				.header("accept", "application/json")
				.header("content-type", "application/x-www-form-urlencoded")
				.body("grant_type=client_credentials");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"fresh-token\",\"expires_in\":\"14399\",\"token_type\":\"Bearer\"}");
		})
		.await;
	let token = reqwest_oauth_client(&server)
		.refresh()
		.await
		.expect("Token exchange should succeed against the mock server.");

	assert_eq!(token.expose(), "fresh-token");
	assert_eq!(token.cache_ttl(), Duration::seconds(14339));

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn unauthorized_is_not_retried() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/security/v1/oauth/token");
			then.status(401).body("{\"response\":{\"errors\":[{\"code\":\"250002\"}]}}");
		})
		.await;
	let err = reqwest_oauth_client(&server)
		.refresh()
		.await
		.expect_err("HTTP 401 should be reported as a rejection.");

	assert!(matches!(
		&err,
		AuthError::Rejected { status: 401, body } if body.contains("250002")
	));

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn persistent_server_errors_exhaust_retries() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/security/v1/oauth/token");
			then.status(503).body("maintenance");
		})
		.await;
	let err = reqwest_oauth_client(&server)
		.refresh()
		.await
		.expect_err("Exhausted retries should surface the final response.");

	assert!(matches!(err, AuthError::Rejected { status: 503, .. }));

	mock.assert_calls_async(3).await;
}

#[tokio::test]
async fn transient_failures_recover_within_attempt_budget() {
	let http = ScriptedHttp::new([
		Err(TransportError::Io(std::io::Error::other("connection reset"))),
		status(503, "busy"),
		status(200, "{\"access_token\":\"third-time\"}"),
	]);
	let client = OAuthClient::new(&test_config("https://carrier.example"), http.clone())
		.expect("OAuth client should build.");
	let token = client.refresh().await.expect("Third attempt should succeed.");

	assert_eq!(token.expose(), "third-time");
	assert_eq!(token.cache_ttl(), Duration::seconds(3540));
	assert_eq!(http.calls(), 3);
}

#[tokio::test]
async fn transport_failures_on_every_attempt_are_reported() {
	let http = ScriptedHttp::new((0..3).map(|_| {
		Err(TransportError::Io(std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out")))
	}));
	let client = OAuthClient::new(&test_config("https://carrier.example"), http.clone())
		.expect("OAuth client should build.");
	let err = client.refresh().await.expect_err("Unreachable endpoints should fail.");

	assert!(matches!(err, AuthError::Transport(TransportError::Io(_))));
	assert_eq!(http.calls(), 3);
}

#[tokio::test]
async fn empty_token_payload_is_rejected() {
	let http = ScriptedHttp::new([status(200, "{\"access_token\":\"\",\"expires_in\":3600}")]);
	let client = OAuthClient::new(&test_config("https://carrier.example"), http.clone())
		.expect("OAuth client should build.");

	assert!(matches!(client.refresh().await, Err(AuthError::EmptyToken)));
	assert_eq!(http.calls(), 1);
}
