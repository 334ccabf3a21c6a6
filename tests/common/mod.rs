//! Shared fixtures for integration tests.

#![allow(dead_code)]

// std
use std::{
	collections::VecDeque,
	future::Future,
	io::{Error as IoError, ErrorKind},
	pin::Pin,
	sync::Arc,
	time::Duration,
};
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse, http::StatusCode};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
// self
use oauth2_dispatcher::{
	dispatcher::AuthorizationDispatcher,
	error::AuthorizationError,
	http::{ConnectionFactory, DefaultTransportErrorMapper},
	model::{RegistrationResponse, ServiceConfiguration, TokenResponse},
	url::Url,
};
#[cfg(feature = "reqwest")]
use oauth2_dispatcher::{dispatcher::ReqwestDispatcher, http::ReqwestHttpClient};

/// Dispatcher over the in-memory connection factory.
pub type FakeDispatcher = AuthorizationDispatcher<FakeConnections, DefaultTransportErrorMapper>;

/// Value delivered to token request callbacks.
pub type TokenOutcome = Result<TokenResponse, AuthorizationError>;
/// Value delivered to registration request callbacks.
pub type RegistrationOutcome = Result<RegistrationResponse, AuthorizationError>;

pub const CLIENT_ID: &str = "client-123";

pub fn url(value: &str) -> Url {
	Url::parse(value).expect("Fixture URL should parse.")
}

/// Configuration whose endpoints all live under `base`.
pub fn configuration(base: &str) -> ServiceConfiguration {
	ServiceConfiguration::builder()
		.authorization_endpoint(url(&format!("{base}/authorize")))
		.token_endpoint(url(&format!("{base}/token")))
		.registration_endpoint(url(&format!("{base}/register")))
		.key_set_endpoint(url(&format!("{base}/jwks")))
		.build()
		.expect("Fixture configuration should build.")
}

/// Callback that forwards its argument to the returned receiver.
pub fn capture<T>() -> (impl FnOnce(T) + Send + 'static, oneshot::Receiver<T>)
where
	T: 'static + Send,
{
	let (tx, rx) = oneshot::channel();

	(
		move |value| {
			let _ = tx.send(value);
		},
		rx,
	)
}

/// Waits for a captured callback value.
pub async fn delivered<T>(rx: oneshot::Receiver<T>) -> T {
	tokio::time::timeout(Duration::from_secs(10), rx)
		.await
		.expect("Callback should fire within the timeout.")
		.expect("Callback should fire exactly once.")
}

/// Reqwest client that trusts the self-signed certificate served by `httpmock`.
#[cfg(feature = "reqwest")]
pub fn test_reqwest_http_client() -> ReqwestHttpClient {
	let client = oauth2_dispatcher::reqwest::Client::builder()
		.redirect(oauth2_dispatcher::reqwest::redirect::Policy::none())
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()
		.expect("Failed to build insecure Reqwest client for tests.");

	ReqwestHttpClient::with_client(client)
}

#[cfg(feature = "reqwest")]
pub fn reqwest_dispatcher() -> ReqwestDispatcher {
	ReqwestDispatcher::builder(test_reqwest_http_client(), DefaultTransportErrorMapper)
		.build()
		.expect("Dispatcher should build inside a Tokio runtime.")
}

pub fn fake_dispatcher(connections: FakeConnections) -> FakeDispatcher {
	FakeDispatcher::builder(connections, DefaultTransportErrorMapper)
		.build()
		.expect("Dispatcher should build inside a Tokio runtime.")
}

/// Request observed by [`FakeConnections`].
#[derive(Clone, Debug)]
pub struct CapturedRequest {
	pub method: String,
	pub uri: String,
	pub headers: Vec<(String, String)>,
	pub body: String,
}
impl CapturedRequest {
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}

	pub fn form(&self) -> Vec<(String, String)> {
		oauth2_dispatcher::url::form_urlencoded::parse(self.body.as_bytes())
			.map(|(k, v)| (k.into_owned(), v.into_owned()))
			.collect()
	}
}

/// Scripted reply served by [`FakeConnections`].
#[derive(Clone, Debug)]
pub enum FakeReply {
	Json(u16, Value),
	Raw(u16, &'static str),
	Refused,
}

#[derive(Debug, Default)]
struct FakeState {
	replies: Mutex<VecDeque<FakeReply>>,
	captured: Mutex<Vec<CapturedRequest>>,
	opened: Mutex<Vec<Url>>,
}

/// In-memory connection factory that records requests and serves scripted replies.
#[derive(Clone, Debug, Default)]
pub struct FakeConnections {
	state: Arc<FakeState>,
}
impl FakeConnections {
	pub fn replying(replies: impl IntoIterator<Item = FakeReply>) -> Self {
		let connections = Self::default();

		connections.state.replies.lock().extend(replies);

		connections
	}

	pub fn captured(&self) -> Vec<CapturedRequest> {
		self.state.captured.lock().clone()
	}

	pub fn opened(&self) -> Vec<Url> {
		self.state.opened.lock().clone()
	}
}
impl ConnectionFactory for FakeConnections {
	type Channel = FakeChannel;
	type TransportError = IoError;

	fn open(&self, endpoint: &Url) -> Self::Channel {
		self.state.opened.lock().push(endpoint.clone());

		FakeChannel { state: self.state.clone() }
	}
}

#[derive(Clone, Debug)]
pub struct FakeChannel {
	state: Arc<FakeState>,
}
impl<'c> AsyncHttpClient<'c> for FakeChannel {
	type Error = HttpClientError<IoError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			let captured = CapturedRequest {
				method: request.method().to_string(),
				uri: request.uri().to_string(),
				headers: request
					.headers()
					.iter()
					.map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_owned()))
					.collect(),
				body: String::from_utf8_lossy(request.body()).into_owned(),
			};

			self.state.captured.lock().push(captured);

			let reply = self.state.replies.lock().pop_front().unwrap_or(FakeReply::Refused);
			let (status, body) = match reply {
				FakeReply::Json(status, value) => (status, value.to_string().into_bytes()),
				FakeReply::Raw(status, body) => (status, body.as_bytes().to_vec()),
				FakeReply::Refused =>
					return Err(HttpClientError::Io(IoError::new(
						ErrorKind::ConnectionRefused,
						"connection refused",
					))),
			};
			let mut response = HttpResponse::new(body);

			*response.status_mut() =
				StatusCode::from_u16(status).expect("Fixture status should be valid.");

			Ok(response)
		})
	}
}
