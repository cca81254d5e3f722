#![cfg(feature = "reqwest")]

//! Deterministic protocol coverage over a scripted transport.
//!
//! The transport yields once per call so concurrent sends interleave the way event-loop
//! callers do, which makes single-flight admission, queue order, and settlement observable
//! without real sockets.

// self
use bearer_relay::{
	_preludet::*,
	api::{ApiRequest, ApiResponse, PreparedRequest},
	auth::AccessToken,
	error::{AuthError, Error, TransportError},
	http::{ApiTransport, TransportFuture},
	relay::Relay,
	service::ServiceDescriptor,
	store::{MemoryStore, TokenStore},
};

const STALE_TOKEN: &str = "token-stale";
const FRESH_TOKEN: &str = "token-rotated";
const REFRESH_PATH: &str = "/users/refresh-token";

#[derive(Debug)]
struct FakeTransportError;
impl Display for FakeTransportError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("Connection refused.")
	}
}
impl StdError for FakeTransportError {}

/// What the scripted refresh endpoint answers.
#[derive(Clone, Copy)]
enum RefreshBehavior {
	/// 200 with a rotated token.
	Grant,
	/// 200 without an access token in the payload.
	GrantEmpty,
	/// Error status with a server message.
	Reject(u16),
	/// No response at all.
	Unreachable,
}

struct ScriptedTransport {
	refresh: RefreshBehavior,
	/// When set, protected paths answer 401 regardless of the presented token.
	always_unauthorized: bool,
	/// Dispatch log of `(path, authorization header)` pairs, in transport arrival order.
	log: Mutex<Vec<(String, Option<String>)>>,
}
impl ScriptedTransport {
	fn new(refresh: RefreshBehavior) -> Self {
		Self { refresh, always_unauthorized: false, log: Default::default() }
	}

	fn log(&self) -> Vec<(String, Option<String>)> {
		self.log.lock().clone()
	}

	fn refresh_calls(&self) -> usize {
		self.log.lock().iter().filter(|(path, _)| path == REFRESH_PATH).count()
	}
}
impl ApiTransport for ScriptedTransport {
	fn execute(&self, request: PreparedRequest) -> TransportFuture<'_> {
		let path = request.url.path().trim_start_matches("/api").to_owned();
		let authorization = request
			.headers
			.iter()
			.find(|(name, _)| name.eq_ignore_ascii_case("authorization"))
			.map(|(_, value)| value.clone());

		self.log.lock().push((path.clone(), authorization.clone()));

		Box::pin(async move {
			// Suspend once so concurrent callers interleave like real in-flight requests.
			tokio::task::yield_now().await;

			if path == REFRESH_PATH {
				return match self.refresh {
					RefreshBehavior::Grant => Ok(ApiResponse::new(
						200,
						None,
						serde_json::to_vec(&serde_json::json!({
							"message": "token refreshed",
							"statusCode": 200,
							"data": { "accessToken": FRESH_TOKEN },
						}))
						.expect("Refresh fixture should serialize."),
					)),
					RefreshBehavior::GrantEmpty => Ok(ApiResponse::new(
						200,
						None,
						serde_json::to_vec(&serde_json::json!({
							"message": "token refreshed",
							"statusCode": 200,
							"data": {},
						}))
						.expect("Refresh fixture should serialize."),
					)),
					RefreshBehavior::Reject(status) => Ok(ApiResponse::new(
						status,
						None,
						br#"{"message":"jwt expired"}"#.to_vec(),
					)),
					RefreshBehavior::Unreachable =>
						Err(TransportError::network(FakeTransportError)),
				};
			}

			let accepted = !self.always_unauthorized
				&& authorization.as_deref() == Some(&format!("Bearer {FRESH_TOKEN}"));

			if accepted {
				Ok(ApiResponse::new(200, None, br#"{"data":[]}"#.to_vec()))
			} else {
				Ok(ApiResponse::new(401, None, br#"{"message":"jwt expired"}"#.to_vec()))
			}
		})
	}
}

fn build_descriptor() -> ServiceDescriptor {
	ServiceDescriptor::builder(
		Url::parse("http://localhost:5000/api").expect("Base URL fixture should parse."),
	)
	.refresh_endpoint(REFRESH_PATH)
	.login_entry("/login")
	.build()
	.expect("Service descriptor should build successfully.")
}

fn build_relay(
	transport: ScriptedTransport,
) -> (Relay<ScriptedTransport>, Arc<ScriptedTransport>, Arc<RecordingNavigator>) {
	let transport = Arc::new(transport);
	let store: Arc<dyn TokenStore> = Arc::new(MemoryStore::default());
	let navigator = Arc::new(RecordingNavigator::default());
	let relay = Relay::with_transport(store, build_descriptor(), transport.clone())
		.with_navigator(navigator.clone());

	(relay, transport, navigator)
}

#[tokio::test]
async fn single_flight_coalesces_concurrent_callers() {
	let (relay, transport, navigator) = build_relay(ScriptedTransport::new(RefreshBehavior::Grant));

	relay
		.install_token(AccessToken::new(STALE_TOKEN))
		.await
		.expect("Stale token should install successfully.");

	let (alpha, bravo, charlie) = tokio::join!(
		relay.send(ApiRequest::get("/alpha")),
		relay.send(ApiRequest::get("/bravo")),
		relay.send(ApiRequest::get("/charlie")),
	);

	assert_eq!(alpha.expect("Alpha should succeed after the refresh.").status(), 200);
	assert_eq!(bravo.expect("Bravo should succeed after the refresh.").status(), 200);
	assert_eq!(charlie.expect("Charlie should succeed after the refresh.").status(), 200);
	assert_eq!(transport.refresh_calls(), 1, "Exactly one refresh call must be made.");

	let stale = format!("Bearer {STALE_TOKEN}");
	let fresh = format!("Bearer {FRESH_TOKEN}");
	let expected: Vec<(String, Option<String>)> = vec![
		("/alpha".into(), Some(stale.clone())),
		("/bravo".into(), Some(stale.clone())),
		("/charlie".into(), Some(stale)),
		(REFRESH_PATH.into(), None),
		("/alpha".into(), Some(fresh.clone())),
		("/bravo".into(), Some(fresh.clone())),
		("/charlie".into(), Some(fresh)),
	];

	assert_eq!(transport.log(), expected, "Retries must resume in arrival order.");

	let rotated = relay
		.current_token()
		.await
		.expect("Token load should succeed.")
		.expect("Rotated token should be persisted.");

	assert_eq!(rotated.expose(), FRESH_TOKEN);
	assert_eq!(relay.refresh_metrics.attempts(), 1);
	assert_eq!(relay.refresh_metrics.successes(), 1);
	assert_eq!(relay.refresh_metrics.failures(), 0);
	assert_eq!(relay.refresh_metrics.coalesced(), 2);
	assert!(navigator.visits().is_empty(), "A successful refresh must not redirect.");
}

#[tokio::test]
async fn waiters_fail_together_when_refresh_is_rejected() {
	let (relay, transport, navigator) =
		build_relay(ScriptedTransport::new(RefreshBehavior::Reject(401)));

	relay
		.install_token(AccessToken::new(STALE_TOKEN))
		.await
		.expect("Stale token should install successfully.");

	let (alpha, bravo, charlie) = tokio::join!(
		relay.send(ApiRequest::get("/alpha")),
		relay.send(ApiRequest::get("/bravo")),
		relay.send(ApiRequest::get("/charlie")),
	);

	for result in [alpha, bravo, charlie] {
		let error = result.expect_err("Every queued caller must fail with the refresh.");

		assert!(
			matches!(
				error,
				Error::Auth(AuthError::RefreshRejected { status: Some(401), .. }),
			),
			"Unexpected error variant: {error:?}.",
		);
	}

	assert_eq!(transport.refresh_calls(), 1, "A failing cycle must still run only once.");
	assert_eq!(relay.refresh_metrics.failures(), 1);
	assert_eq!(relay.refresh_metrics.coalesced(), 2);
	assert!(
		relay.current_token().await.expect("Token load should succeed.").is_none(),
		"Stored credentials must be wiped on refresh failure.",
	);
	assert_eq!(navigator.visits(), vec!["/login".to_owned()], "Redirect must fire exactly once.");
	assert!(relay.is_signed_out());

	// No further refresh is attempted until a new sign-in.
	let error = relay
		.send(ApiRequest::get("/alpha"))
		.await
		.expect_err("Sends while signed out must fail fast.");

	assert!(matches!(error, Error::Auth(AuthError::SignedOut)));
	assert_eq!(transport.refresh_calls(), 1);

	relay
		.install_token(AccessToken::new(FRESH_TOKEN))
		.await
		.expect("Recovered token should install successfully.");

	let response = relay
		.send(ApiRequest::get("/alpha"))
		.await
		.expect("Sends should work again after a new sign-in.");

	assert_eq!(response.status(), 200);
	assert_eq!(transport.refresh_calls(), 1, "The recovered session needs no refresh.");
}

#[tokio::test]
async fn refresh_transport_failure_is_terminal() {
	let (relay, transport, navigator) =
		build_relay(ScriptedTransport::new(RefreshBehavior::Unreachable));

	relay
		.install_token(AccessToken::new(STALE_TOKEN))
		.await
		.expect("Stale token should install successfully.");

	let error = relay
		.send(ApiRequest::get("/alpha"))
		.await
		.expect_err("A refresh without a response must end the session.");

	assert!(matches!(error, Error::Auth(AuthError::RefreshRejected { status: None, .. })));
	assert_eq!(transport.refresh_calls(), 1);
	assert!(relay.current_token().await.expect("Token load should succeed.").is_none());
	assert_eq!(navigator.visits(), vec!["/login".to_owned()]);
}

#[tokio::test]
async fn refresh_payload_without_token_is_terminal() {
	let (relay, transport, navigator) =
		build_relay(ScriptedTransport::new(RefreshBehavior::GrantEmpty));

	relay
		.install_token(AccessToken::new(STALE_TOKEN))
		.await
		.expect("Stale token should install successfully.");

	let error = relay
		.send(ApiRequest::get("/alpha"))
		.await
		.expect_err("A refresh without a token in the payload must end the session.");

	assert!(matches!(error, Error::Auth(AuthError::RefreshPayloadInvalid { .. })));
	assert_eq!(transport.refresh_calls(), 1);
	assert_eq!(navigator.visits(), vec!["/login".to_owned()]);
}

#[tokio::test]
async fn second_unauthorized_after_rotation_surfaces_terminal_error() {
	let mut transport = ScriptedTransport::new(RefreshBehavior::Grant);

	transport.always_unauthorized = true;

	let (relay, transport, navigator) = build_relay(transport);

	relay
		.install_token(AccessToken::new(STALE_TOKEN))
		.await
		.expect("Stale token should install successfully.");

	let error = relay
		.send(ApiRequest::get("/alpha"))
		.await
		.expect_err("A post-refresh 401 must surface a terminal error.");

	assert!(matches!(error, Error::Auth(AuthError::RetryExhausted)));
	assert_eq!(transport.refresh_calls(), 1, "A retried request must never start a second cycle.");

	let protected_dispatches =
		transport.log().iter().filter(|(path, _)| path == "/alpha").count();

	assert_eq!(protected_dispatches, 2, "The request is retried exactly once.");
	assert!(relay.current_token().await.expect("Token load should succeed.").is_none());
	assert_eq!(navigator.visits(), vec!["/login".to_owned()]);
	assert!(relay.is_signed_out());
}
