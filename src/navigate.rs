//! Navigation side-effect channel driven on terminal authorization failure.

/// Moves the caller to the sign-in entry point when a session terminally fails.
///
/// Browser shells map this onto their history APIs; native or headless deployments usually
/// install [`NoopNavigator`] and react to [`AuthError`](crate::error::AuthError) values
/// instead. The relay consults [`Navigator::location`] first so a caller already parked on the
/// sign-in entry is never redirected again.
pub trait Navigator
where
	Self: Send + Sync,
{
	/// Returns the caller's current location path.
	fn location(&self) -> String;

	/// Moves the caller to the provided path.
	fn navigate(&self, path: &str);
}

/// Navigator that ignores every redirect request.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNavigator;
impl Navigator for NoopNavigator {
	fn location(&self) -> String {
		String::new()
	}

	fn navigate(&self, _: &str) {}
}
