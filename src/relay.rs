//! The authenticated request relay and its refresh coordination protocol.

mod gate;
mod metrics;
mod send;
mod session;

pub use metrics::RelayMetrics;

// self
use crate::{
	_prelude::*,
	http::ApiTransport,
	navigate::{Navigator, NoopNavigator},
	relay::gate::RefreshGate,
	service::ServiceDescriptor,
	store::TokenStore,
};
#[cfg(feature = "reqwest")] use crate::{error::ConfigError, http::ReqwestTransport};

#[cfg(feature = "reqwest")]
/// Relay specialized for the crate's default reqwest transport stack.
pub type ReqwestRelay = Relay<ReqwestTransport>;

/// Coordinates authenticated requests against a single service descriptor.
///
/// The relay owns the transport, token store, navigator, and refresh gate so `send` can focus
/// on the interception protocol. The gate is per-instance state: independent relays never
/// share a refresh cycle, which keeps them testable in isolation.
#[derive(Clone)]
pub struct Relay<C>
where
	C: ?Sized + ApiTransport,
{
	/// Transport used for every outbound request, the refresh call included.
	pub transport: Arc<C>,
	/// Token store persisting the access token between sessions.
	pub store: Arc<dyn TokenStore>,
	/// Navigation channel driven on terminal authorization failure.
	pub navigator: Arc<dyn Navigator>,
	/// Service descriptor locating endpoints and naming the storage key.
	pub descriptor: ServiceDescriptor,
	/// Shared counters for refresh cycle outcomes.
	pub refresh_metrics: Arc<RelayMetrics>,
	pub(crate) gate: Arc<RefreshGate>,
}
impl<C> Relay<C>
where
	C: ?Sized + ApiTransport,
{
	/// Creates a relay that reuses the caller-provided transport.
	///
	/// The navigator defaults to [`NoopNavigator`]; install a real one with
	/// [`Relay::with_navigator`] when terminal failures should move the caller to the sign-in
	/// entry.
	pub fn with_transport(
		store: Arc<dyn TokenStore>,
		descriptor: ServiceDescriptor,
		transport: impl Into<Arc<C>>,
	) -> Self {
		Self {
			transport: transport.into(),
			store,
			navigator: Arc::new(NoopNavigator),
			descriptor,
			refresh_metrics: Default::default(),
			gate: Default::default(),
		}
	}

	/// Sets or replaces the navigator driven on terminal authorization failures.
	pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
		self.navigator = navigator;

		self
	}
}
#[cfg(feature = "reqwest")]
impl Relay<ReqwestTransport> {
	/// Creates a relay backed by a cookie-enabled reqwest transport.
	///
	/// The transport keeps a cookie jar so the refresh credential issued by the service
	/// accompanies refresh calls automatically.
	pub fn new(
		store: Arc<dyn TokenStore>,
		descriptor: ServiceDescriptor,
	) -> Result<Self, ConfigError> {
		Ok(Self::with_transport(store, descriptor, ReqwestTransport::new()?))
	}
}
impl<C> Debug for Relay<C>
where
	C: ?Sized + ApiTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Relay")
			.field("descriptor", &self.descriptor)
			.field("signed_out", &self.gate.is_signed_out())
			.finish()
	}
}
