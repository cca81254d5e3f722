//! Service descriptors locating the API base, its refresh endpoint, and the sign-in entry.

// self
use crate::{_prelude::*, auth::AccessToken, error::ConfigError};

/// Errors raised while constructing or validating service descriptors.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum ServiceDescriptorError {
	/// Refresh endpoint path is mandatory.
	#[error("Missing refresh endpoint path.")]
	MissingRefreshEndpoint,
	/// Login entry path is mandatory.
	#[error("Missing login entry path.")]
	MissingLoginEntry,
	/// Endpoint paths must be absolute.
	#[error("The {field} path must start with `/`: {value}.")]
	RelativePath {
		/// Which path failed validation.
		field: &'static str,
		/// Path value that failed validation.
		value: String,
	},
	/// Authorization scheme must be a single printable token.
	#[error("Authorization scheme must be non-empty and free of whitespace.")]
	InvalidScheme,
	/// Storage key must not be empty.
	#[error("Storage key must not be empty.")]
	EmptyTokenKey,
}

/// Validated description of one backing service.
#[derive(Clone, Debug)]
pub struct ServiceDescriptor {
	/// Base URL every request path is appended to.
	pub base_url: Url,
	/// Refresh endpoint path, relative to the base URL.
	pub refresh_path: String,
	/// Sign-in entry path used for terminal redirects.
	pub login_path: String,
	/// Scheme prefixing the token inside the authorization header.
	pub auth_scheme: String,
	/// Key under which the token store keeps the access token.
	pub token_key: String,
}
impl ServiceDescriptor {
	/// Default scheme prefixing the access token.
	pub const DEFAULT_AUTH_SCHEME: &'static str = "Bearer";
	/// Default key under which stores keep the access token.
	pub const DEFAULT_TOKEN_KEY: &'static str = "access_token";

	/// Returns a builder seeded with the provided base URL.
	pub fn builder(base_url: Url) -> ServiceDescriptorBuilder {
		ServiceDescriptorBuilder::new(base_url)
	}

	/// Resolves a request path against the base URL.
	///
	/// The base URL's own path segment is preserved: a base of `/api` and a request path of
	/// `/users/me` resolve to `/api/users/me`.
	pub fn resolve(&self, path: &str) -> Result<Url, ConfigError> {
		let raw = format!(
			"{}/{}",
			self.base_url.as_str().trim_end_matches('/'),
			path.trim_start_matches('/'),
		);

		Url::parse(&raw)
			.map_err(|e| ConfigError::InvalidRequestPath { path: path.into(), source: e })
	}

	/// Formats the authorization header value for a token.
	pub fn authorization_value(&self, token: &AccessToken) -> String {
		format!("{} {}", self.auth_scheme, token.expose())
	}
}

/// Builder for [`ServiceDescriptor`] values.
#[derive(Debug)]
pub struct ServiceDescriptorBuilder {
	/// Base URL for the descriptor being constructed.
	pub base_url: Url,
	/// Refresh endpoint path (required).
	pub refresh_path: Option<String>,
	/// Sign-in entry path (required).
	pub login_path: Option<String>,
	/// Authorization scheme override.
	pub auth_scheme: String,
	/// Storage key override.
	pub token_key: String,
}
impl ServiceDescriptorBuilder {
	/// Creates a new builder seeded with the provided base URL.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			refresh_path: None,
			login_path: None,
			auth_scheme: ServiceDescriptor::DEFAULT_AUTH_SCHEME.into(),
			token_key: ServiceDescriptor::DEFAULT_TOKEN_KEY.into(),
		}
	}

	/// Sets the refresh endpoint path.
	pub fn refresh_endpoint(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = Some(path.into());

		self
	}

	/// Sets the sign-in entry path.
	pub fn login_entry(mut self, path: impl Into<String>) -> Self {
		self.login_path = Some(path.into());

		self
	}

	/// Overrides the authorization scheme (defaults to `Bearer`).
	pub fn auth_scheme(mut self, scheme: impl Into<String>) -> Self {
		self.auth_scheme = scheme.into();

		self
	}

	/// Overrides the storage key (defaults to `access_token`).
	pub fn token_key(mut self, key: impl Into<String>) -> Self {
		self.token_key = key.into();

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ServiceDescriptor, ServiceDescriptorError> {
		let refresh_path =
			self.refresh_path.ok_or(ServiceDescriptorError::MissingRefreshEndpoint)?;
		let login_path = self.login_path.ok_or(ServiceDescriptorError::MissingLoginEntry)?;

		validate_path("refresh endpoint", &refresh_path)?;
		validate_path("login entry", &login_path)?;

		if self.auth_scheme.is_empty() || self.auth_scheme.chars().any(char::is_whitespace) {
			return Err(ServiceDescriptorError::InvalidScheme);
		}
		if self.token_key.is_empty() {
			return Err(ServiceDescriptorError::EmptyTokenKey);
		}

		Ok(ServiceDescriptor {
			base_url: self.base_url,
			refresh_path,
			login_path,
			auth_scheme: self.auth_scheme,
			token_key: self.token_key,
		})
	}
}

fn validate_path(field: &'static str, value: &str) -> Result<(), ServiceDescriptorError> {
	if value.starts_with('/') {
		Ok(())
	} else {
		Err(ServiceDescriptorError::RelativePath { field, value: value.into() })
	}
}
