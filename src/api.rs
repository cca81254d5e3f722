//! Request and response descriptor values exchanged between the relay and its transports.

// self
use crate::_prelude::*;

/// HTTP methods supported by relay requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
	/// HTTP GET.
	Get,
	/// HTTP POST.
	Post,
	/// HTTP PUT.
	Put,
	/// HTTP PATCH.
	Patch,
	/// HTTP DELETE.
	Delete,
}
impl Method {
	/// Returns the canonical uppercase method name.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Patch => "PATCH",
			Method::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Describes one API call before a token or base URL is applied.
///
/// The descriptor is a plain value: the relay clones it and bumps the attempt counter for a
/// post-refresh retry instead of mutating shared request state.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	method: Method,
	path: String,
	headers: Vec<(String, String)>,
	body: Option<serde_json::Value>,
	attempt: u8,
}
impl ApiRequest {
	/// Creates a new request descriptor for the provided method and path.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), headers: Vec::new(), body: None, attempt: 0 }
	}

	/// Convenience constructor for GET requests.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::Get, path)
	}

	/// Convenience constructor for POST requests.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::Post, path)
	}

	/// Attaches a JSON body submitted with the request.
	pub fn with_json(mut self, body: serde_json::Value) -> Self {
		self.body = Some(body);

		self
	}

	/// Appends one header name/value pair.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}

	/// Returns the HTTP method.
	pub fn method(&self) -> Method {
		self.method
	}

	/// Returns the request path, relative to the service base URL.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Returns the caller-supplied headers.
	pub fn headers(&self) -> &[(String, String)] {
		&self.headers
	}

	/// Returns the JSON body, if one was attached.
	pub fn body(&self) -> Option<&serde_json::Value> {
		self.body.as_ref()
	}

	/// Number of times this descriptor has already been re-dispatched after a refresh.
	pub fn attempt(&self) -> u8 {
		self.attempt
	}

	pub(crate) fn next_attempt(mut self) -> Self {
		self.attempt = self.attempt.saturating_add(1);

		self
	}
}

/// Fully resolved request handed to an [`ApiTransport`](crate::http::ApiTransport).
#[derive(Clone)]
pub struct PreparedRequest {
	/// Absolute request URL.
	pub url: Url,
	/// HTTP method.
	pub method: Method,
	/// Header name/value pairs, including the authorization header when a token was attached.
	pub headers: Vec<(String, String)>,
	/// JSON body to submit, if any.
	pub body: Option<serde_json::Value>,
}
impl Debug for PreparedRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let headers: Vec<(&str, &str)> = self
			.headers
			.iter()
			.map(|(name, value)| {
				if name.eq_ignore_ascii_case("authorization") {
					(name.as_str(), "<redacted>")
				} else {
					(name.as_str(), value.as_str())
				}
			})
			.collect();

		f.debug_struct("PreparedRequest")
			.field("url", &self.url.as_str())
			.field("method", &self.method)
			.field("headers", &headers)
			.field("body", &self.body)
			.finish()
	}
}

/// Status-coded response surfaced by a transport.
///
/// Transports construct one whenever the service produced a status code, error statuses
/// included; connectivity failures take the [`TransportError`](crate::error::TransportError)
/// channel instead.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	status: u16,
	retry_after: Option<Duration>,
	body: Vec<u8>,
}
impl ApiResponse {
	/// Builds a response from the raw pieces a transport captured.
	pub fn new(status: u16, retry_after: Option<Duration>, body: impl Into<Vec<u8>>) -> Self {
		Self { status, retry_after, body: body.into() }
	}

	/// Returns the HTTP status code.
	pub fn status(&self) -> u16 {
		self.status
	}

	/// Returns `true` for any error status (4xx/5xx).
	pub fn is_error(&self) -> bool {
		self.status >= 400
	}

	/// Returns the Retry-After hint, when the service sent one.
	pub fn retry_after(&self) -> Option<Duration> {
		self.retry_after
	}

	/// Returns the raw response body.
	pub fn body(&self) -> &[u8] {
		&self.body
	}

	/// Deserializes the body as JSON.
	pub fn json<T>(&self) -> Result<T, serde_json::Error>
	where
		T: serde::de::DeserializeOwned,
	{
		serde_json::from_slice(&self.body)
	}

	/// Extracts the server-supplied `message` field from an error envelope body, if present.
	pub fn server_message(&self) -> Option<String> {
		serde_json::from_slice::<MessageEnvelope>(&self.body)
			.ok()
			.and_then(|envelope| envelope.message)
			.filter(|message| !message.trim().is_empty())
	}
}

/// Error envelope shape shared by the service's status-coded responses.
#[derive(Deserialize)]
struct MessageEnvelope {
	message: Option<String>,
}
