//! Rust’s turnkey bearer-session relay—transparent token injection, single-flight refresh
//! recovery, and queue-fair retries in one crate built for production.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod api;
pub mod auth;
pub mod error;
pub mod http;
pub mod navigate;
pub mod obs;
pub mod relay;
pub mod service;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		http::ReqwestTransport,
		navigate::Navigator,
		relay::Relay,
		service::ServiceDescriptor,
		store::{MemoryStore, TokenStore},
	};

	/// Relay type alias used by reqwest-backed integration tests.
	pub type ReqwestTestRelay = Relay<ReqwestTransport>;

	/// Navigator that records every redirect so tests can assert on the side-effect channel.
	#[derive(Debug, Default)]
	pub struct RecordingNavigator {
		location: Mutex<String>,
		visits: Mutex<Vec<String>>,
	}
	impl RecordingNavigator {
		/// Creates a navigator parked at the provided location.
		pub fn at(location: impl Into<String>) -> Self {
			Self { location: Mutex::new(location.into()), visits: Default::default() }
		}

		/// Returns every location the relay navigated to, in order.
		pub fn visits(&self) -> Vec<String> {
			self.visits.lock().clone()
		}
	}
	impl Navigator for RecordingNavigator {
		fn location(&self) -> String {
			self.location.lock().clone()
		}

		fn navigate(&self, path: &str) {
			*self.location.lock() = path.to_owned();

			self.visits.lock().push(path.to_owned());
		}
	}

	/// Builds a reqwest transport that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_transport() -> ReqwestTransport {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestTransport::with_client(client)
	}

	/// Constructs a [`Relay`] backed by an in-memory store, a recording navigator, and the
	/// reqwest transport used across integration tests.
	pub fn build_reqwest_test_relay(
		descriptor: ServiceDescriptor,
	) -> (ReqwestTestRelay, Arc<MemoryStore>, Arc<RecordingNavigator>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn TokenStore> = store_backend.clone();
		let navigator = Arc::new(RecordingNavigator::default());
		let relay = Relay::with_transport(store, descriptor, test_reqwest_transport())
			.with_navigator(navigator.clone());

		(relay, store_backend, navigator)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::OnceCell as AsyncOnceCell;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use httpmock as _;
