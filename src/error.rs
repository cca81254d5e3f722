//! Relay-level error types shared across the transport, store, and session layers.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical relay error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS); no status-coded response was received.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Service answered with a non-authorization error status.
	#[error(transparent)]
	Remote(#[from] RemoteError),
	/// Terminal authorization failure; the session is over.
	#[error(transparent)]
	Auth(#[from] AuthError),
}

/// Configuration and validation failures raised by the relay.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Request path could not be appended to the service base URL.
	#[error("Request path `{path}` does not form a valid URL.")]
	InvalidRequestPath {
		/// Path that failed to resolve.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
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
	#[error("Network error occurred while calling the service.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the service.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Error-status response relayed from the service together with its own message.
#[derive(Clone, Debug, ThisError)]
#[error("Service responded with HTTP {status}: {message}.")]
pub struct RemoteError {
	/// HTTP status code returned by the service.
	pub status: u16,
	/// Server-supplied message, or [`RemoteError::FALLBACK_MESSAGE`].
	pub message: String,
	/// Retry-After hint expressed as a relative duration, when the service sent one.
	pub retry_after: Option<Duration>,
}
impl RemoteError {
	/// Neutral message used when the service supplied no parseable detail.
	pub const FALLBACK_MESSAGE: &'static str = "the service supplied no further detail";

	/// Builds a remote error from an error-status response, recovering the server-supplied
	/// message when the body carries one.
	pub fn from_response(response: &crate::api::ApiResponse) -> Self {
		Self {
			status: response.status(),
			message: response.server_message().unwrap_or_else(|| Self::FALLBACK_MESSAGE.into()),
			retry_after: response.retry_after(),
		}
	}
}

/// Terminal authorization failures; every variant ends the current session.
///
/// The enum is `Clone` so one settled refresh outcome can be broadcast to every caller queued
/// on the same cycle.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum AuthError {
	/// The service rejected a request again after a refreshed retry.
	#[error("Authorization was rejected again after a refreshed retry.")]
	RetryExhausted,
	/// The refresh endpoint failed, or the rotated token could not be persisted.
	#[error("Session refresh was rejected: {message}.")]
	RefreshRejected {
		/// HTTP status code from the refresh endpoint, when one was received.
		status: Option<u16>,
		/// Refresh failure summary.
		message: String,
	},
	/// The refresh endpoint answered successfully but without a usable access token.
	#[error("Session refresh returned an unusable payload: {message}.")]
	RefreshPayloadInvalid {
		/// Parse failure or payload shape summary.
		message: String,
	},
	/// The session already ended terminally; a new sign-in is required.
	#[error("No active session is available; sign in again.")]
	SignedOut,
}
