//! Crate-level error types shared across the token lifecycle and the rating pipeline.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical broker error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// OAuth exchange failed.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// The refresh lock could not be acquired within its bounded wait.
	#[error("Timed out after {waited} waiting for the `{lock}` lock.")]
	LockTimeout {
		/// Lock name that was contended.
		lock: String,
		/// How long the caller waited before giving up.
		waited: Duration,
	},
	/// Rating call failed.
	#[error(transparent)]
	Rate(#[from] RateError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Sealing a token for the cache failed.
	#[error(transparent)]
	Cipher(#[from] crate::cipher::CipherError),
}
impl Error {
	/// Classifies the error for the failure result handed to collaborators.
	pub fn kind(&self) -> FailureKind {
		match self {
			Self::Auth(_) => FailureKind::Auth,
			Self::LockTimeout { .. } => FailureKind::LockTimeout,
			Self::Rate(_) => FailureKind::Rate,
			Self::Config(_) | Self::Storage(_) | Self::Cipher(_) => FailureKind::Unexpected,
		}
	}

	/// Upstream transaction id usable for support escalation, when the carrier supplied one.
	pub fn correlation_id(&self) -> Option<&str> {
		match self {
			Self::Rate(err) => err.correlation_id(),
			_ => None,
		}
	}
}
impl From<crate::store::LockError> for Error {
	fn from(e: crate::store::LockError) -> Self {
		match e {
			crate::store::LockError::Timeout { name, waited } =>
				Self::LockTimeout { lock: name, waited },
			crate::store::LockError::Backend(inner) => Self::Storage(inner),
		}
	}
}

/// Error classification surfaced in failure results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
	/// OAuth exchange failed.
	#[serde(rename = "AuthError")]
	Auth,
	/// Refresh lock wait exceeded its bound.
	#[serde(rename = "LockTimeoutError")]
	LockTimeout,
	/// Rating call failed.
	#[serde(rename = "RateError")]
	Rate,
	/// Any other fault raised inside the pipeline.
	#[serde(rename = "UnexpectedError")]
	Unexpected,
}
impl FailureKind {
	/// Returns a stable label suitable for logs or response bodies.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Auth => "AuthError",
			Self::LockTimeout => "LockTimeoutError",
			Self::Rate => "RateError",
			Self::Unexpected => "UnexpectedError",
		}
	}
}
impl Display for FailureKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Failures raised by the client-credentials exchange.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// Token endpoint answered with a non-2xx status on the final attempt.
	#[error("Token endpoint rejected the client credentials grant with HTTP {status}: {body}")]
	Rejected {
		/// HTTP status code of the final attempt.
		status: u16,
		/// Raw response body.
		body: String,
	},
	/// Token endpoint answered successfully but omitted the access token.
	#[error("Token endpoint returned an empty token.")]
	EmptyToken,
	/// Token endpoint responded with JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	MalformedResponse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Every attempt failed before an HTTP response arrived.
	#[error("Token endpoint could not be reached.")]
	Transport(#[source] TransportError),
}

/// Failures raised by the rating call.
#[derive(Debug, ThisError)]
pub enum RateError {
	/// Rating endpoint answered with a non-success status.
	#[error("Rating endpoint returned HTTP {status}: {body}")]
	Rejected {
		/// HTTP status code.
		status: u16,
		/// Raw response body.
		body: String,
		/// Transaction id read from the response headers.
		correlation_id: Option<String>,
	},
	/// Rating request failed before an HTTP response arrived.
	#[error("Rating endpoint could not be reached.")]
	Transport {
		/// Transport failure.
		#[source]
		source: TransportError,
	},
	/// Rating endpoint answered successfully with a body that is not JSON.
	#[error("Rating endpoint returned malformed JSON.")]
	MalformedResponse {
		/// Parsing failure.
		#[source]
		source: serde_json::Error,
		/// Transaction id read from the response headers.
		correlation_id: Option<String>,
	},
	/// Carrier payload could not be encoded.
	#[error("Rating payload could not be encoded.")]
	Encode(#[source] serde_json::Error),
}
impl RateError {
	/// Transaction id read from the carrier response, if any.
	pub fn correlation_id(&self) -> Option<&str> {
		match self {
			Self::Rejected { correlation_id, .. } | Self::MalformedResponse { correlation_id, .. } =>
				correlation_id.as_deref(),
			Self::Transport { .. } | Self::Encode(_) => None,
		}
	}
}

/// Configuration and validation failures raised by the broker.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A required setting was not supplied.
	#[error("Missing required setting `{field}`.")]
	MissingField {
		/// Setting name.
		field: &'static str,
	},
	/// A setting was supplied but is empty or malformed.
	#[error("Setting `{field}` is invalid: {reason}.")]
	InvalidField {
		/// Setting name.
		field: &'static str,
		/// Why the value was rejected.
		reason: String,
	},
	/// A base URL or derived endpoint could not be parsed.
	#[error("Endpoint `{endpoint}` is not a valid URL.")]
	InvalidUrl {
		/// Endpoint label.
		endpoint: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Endpoints must use HTTPS unless they point at a loopback host.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the carrier.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The request exceeded its timeout.
	#[error("Request timed out while calling the carrier.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the carrier.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timeout(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Timeout { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::timeout(e) } else { Self::network(e) }
	}
}
