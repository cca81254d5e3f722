//! The `send` operation: bearer injection, 401 interception, and the single-flight refresh
//! cycle shared by every concurrent caller.

// self
use crate::{
	_prelude::*,
	api::{ApiRequest, ApiResponse, Method, PreparedRequest},
	auth::AccessToken,
	error::{AuthError, RemoteError},
	http::ApiTransport,
	obs::{self, PhaseKind, PhaseOutcome, PhaseSpan},
	relay::{
		Relay,
		gate::{Admission, CycleOutcome},
	},
};

const UNAUTHORIZED: u16 = 401;

/// Refresh endpoint response envelope (`{ "data": { "accessToken": ... } }`).
#[derive(Debug, Deserialize)]
struct RefreshEnvelope {
	data: Option<RefreshGrant>,
}
#[derive(Debug, Deserialize)]
struct RefreshGrant {
	#[serde(rename = "accessToken")]
	access_token: Option<String>,
}

impl<C> Relay<C>
where
	C: ?Sized + ApiTransport,
{
	/// Sends one request with the stored token attached, transparently recovering from token
	/// expiry.
	///
	/// A 401 on a first attempt enters the refresh protocol: the first observer performs
	/// exactly one refresh call while every other observer suspends on the pending queue, and
	/// all of them retry with the rotated token once the cycle settles. Every other error
	/// status maps to [`RemoteError`], and transport failures bypass the protocol entirely. A
	/// 401 on a retried request surfaces [`AuthError::RetryExhausted`] without starting
	/// another cycle.
	pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
		const KIND: PhaseKind = PhaseKind::Send;

		let span = PhaseSpan::new(KIND, "send");

		obs::record_phase_outcome(KIND, PhaseOutcome::Attempt);

		let result = span
			.instrument(async move {
				let mut request = request;
				let mut token = self.store.load(&self.descriptor.token_key).await?;

				loop {
					let response = self.dispatch(&request, token.as_ref()).await?;

					if !response.is_error() {
						return Ok(response);
					}
					if response.status() != UNAUTHORIZED {
						return Err(RemoteError::from_response(&response).into());
					}
					if request.attempt() > 0 {
						self.conclude_session().await;

						return Err(AuthError::RetryExhausted.into());
					}
					if self.gate.is_signed_out() {
						return Err(AuthError::SignedOut.into());
					}

					token = Some(self.refreshed_token().await?);
					request = request.next_attempt();
				}
			})
			.await;

		match &result {
			Ok(_) => obs::record_phase_outcome(KIND, PhaseOutcome::Success),
			Err(_) => obs::record_phase_outcome(KIND, PhaseOutcome::Failure),
		}

		result
	}

	async fn dispatch(
		&self,
		request: &ApiRequest,
		token: Option<&AccessToken>,
	) -> Result<ApiResponse> {
		let prepared = self.prepare(request, token)?;

		Ok(self.transport.execute(prepared).await?)
	}

	fn prepare(
		&self,
		request: &ApiRequest,
		token: Option<&AccessToken>,
	) -> Result<PreparedRequest> {
		let url = self.descriptor.resolve(request.path())?;
		let mut headers = request.headers().to_vec();

		if let Some(token) = token {
			headers.push(("authorization".into(), self.descriptor.authorization_value(token)));
		}

		Ok(PreparedRequest {
			url,
			method: request.method(),
			headers,
			body: request.body().cloned(),
		})
	}

	/// Obtains the rotated token, either by leading a new cycle or by parking on the one
	/// already in flight.
	async fn refreshed_token(&self) -> Result<AccessToken> {
		match self.gate.admit() {
			Admission::Leader => self.lead_refresh_cycle().await,
			Admission::Waiter(cell) => {
				self.refresh_metrics.record_coalesced();

				match cell.wait().await {
					CycleOutcome::Refreshed(token) => Ok(token.clone()),
					CycleOutcome::Failed(error) => Err(error.clone().into()),
				}
			},
		}
	}

	async fn lead_refresh_cycle(&self) -> Result<AccessToken> {
		const KIND: PhaseKind = PhaseKind::Refresh;

		let span = PhaseSpan::new(KIND, "lead_refresh_cycle");

		obs::record_phase_outcome(KIND, PhaseOutcome::Attempt);
		self.refresh_metrics.record_attempt();

		let result = span
			.instrument(async move {
				match self.call_refresh_endpoint().await {
					Ok(token) => {
						// Persist before releasing the queue so every later load observes the
						// rotation.
						match self.store.save(&self.descriptor.token_key, token.clone()).await {
							Ok(()) => {
								self.gate.settle(CycleOutcome::Refreshed(token.clone()));
								self.refresh_metrics.record_success();

								Ok(token)
							},
							Err(error) => {
								let error = AuthError::RefreshRejected {
									status: None,
									message: format!(
										"rotated token could not be persisted ({error})"
									),
								};

								self.fail_session(error.clone()).await;

								Err(error.into())
							},
						}
					},
					Err(error) => {
						self.fail_session(error.clone()).await;

						Err(error.into())
					},
				}
			})
			.await;

		match &result {
			Ok(_) => obs::record_phase_outcome(KIND, PhaseOutcome::Success),
			Err(_) => obs::record_phase_outcome(KIND, PhaseOutcome::Failure),
		}

		result
	}

	/// Calls the refresh endpoint directly through the transport.
	///
	/// The call is exempt from interception: it carries no bearer token (the service reads the
	/// long-lived credential the transport sends on its own, e.g. an http-only cookie) and is
	/// never retried through the protocol.
	async fn call_refresh_endpoint(&self) -> Result<AccessToken, AuthError> {
		let request = ApiRequest::new(Method::Post, self.descriptor.refresh_path.clone());
		let prepared = self.prepare(&request, None).map_err(|error| {
			AuthError::RefreshRejected { status: None, message: error.to_string() }
		})?;
		let response = self.transport.execute(prepared).await.map_err(|error| {
			AuthError::RefreshRejected { status: None, message: error.to_string() }
		})?;

		if response.is_error() {
			return Err(AuthError::RefreshRejected {
				status: Some(response.status()),
				message: response
					.server_message()
					.unwrap_or_else(|| RemoteError::FALLBACK_MESSAGE.into()),
			});
		}

		let mut deserializer = serde_json::Deserializer::from_slice(response.body());
		let envelope: RefreshEnvelope = serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|error| AuthError::RefreshPayloadInvalid { message: error.to_string() })?;

		envelope
			.data
			.and_then(|grant| grant.access_token)
			.filter(|token| !token.is_empty())
			.map(AccessToken::new)
			.ok_or_else(|| AuthError::RefreshPayloadInvalid {
				message: "response did not include an access token".into(),
			})
	}

	/// Terminal failure of the active cycle: wipe credentials, release every waiter with the
	/// same error, latch the session signed out, and redirect once.
	async fn fail_session(&self, error: AuthError) {
		let _ = self.store.clear(&self.descriptor.token_key).await;

		self.gate.settle(CycleOutcome::Failed(error));
		self.refresh_metrics.record_failure();
		self.redirect_to_login();
	}

	/// Post-refresh 401: same credential wipe and guarded redirect, but there is no active
	/// cycle left to settle.
	async fn conclude_session(&self) {
		let _ = self.store.clear(&self.descriptor.token_key).await;

		self.redirect_to_login();
	}

	fn redirect_to_login(&self) {
		if !self.gate.latch_signed_out() {
			return;
		}

		let login = self.descriptor.login_path.as_str();

		if self.navigator.location().starts_with(login) {
			return;
		}

		self.navigator.navigate(login);
	}
}
