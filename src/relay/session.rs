//! Session lifecycle operations: adopting tokens after sign-in, inspecting the current
//! session, and signing out.

// self
use crate::{_prelude::*, auth::AccessToken, http::ApiTransport, relay::Relay};

impl<C> Relay<C>
where
	C: ?Sized + ApiTransport,
{
	/// Persists the token issued by a successful sign-in and reopens the session.
	///
	/// Lifting the signed-out latch re-arms the refresh protocol after a terminal failure.
	pub async fn install_token(&self, token: AccessToken) -> Result<()> {
		self.store.save(&self.descriptor.token_key, token).await?;
		self.gate.lift_signed_out();

		Ok(())
	}

	/// Returns the currently stored token, if any.
	pub async fn current_token(&self) -> Result<Option<AccessToken>> {
		Ok(self.store.load(&self.descriptor.token_key).await?)
	}

	/// Discards the stored token (sign-out).
	///
	/// The navigator is not driven here; leaving is the caller's own decision, not a terminal
	/// failure.
	pub async fn clear_session(&self) -> Result<()> {
		self.store.clear(&self.descriptor.token_key).await?;

		Ok(())
	}

	/// Returns `true` after a terminal authorization failure until the next successful
	/// sign-in.
	pub fn is_signed_out(&self) -> bool {
		self.gate.is_signed_out()
	}
}
