//! Demonstrates plugging a custom connection factory and transport error mapper into the
//! dispatcher.
//!
//! 1. Implement [`ConnectionFactory`] so every endpoint gets a scripted [`AsyncHttpClient`]
//!    channel.
//! 2. Provide a [`TransportErrorMapper`] that understands the transport's own error type.
//! 3. Build an [`AuthorizationDispatcher`] over both and run a registration followed by a token
//!    exchange with the issued credentials.

// std
use std::{
	error::Error as StdError,
	fmt::{Display, Formatter, Result as FmtResult},
	future::Future,
	pin::Pin,
};
// crates.io
use color_eyre::Result;
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
use serde_json::json;
use tokio::sync::oneshot;
use url::Url;
// self
use oauth2_dispatcher::{
	dispatcher::AuthorizationDispatcher,
	error::GeneralError,
	http::{ConnectionFactory, TransportErrorMapper},
	model::{RegistrationRequest, ServiceConfiguration, TokenRequest},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let configuration = ServiceConfiguration::builder()
		.authorization_endpoint(Url::parse("https://idp.example.com/authorize")?)
		.token_endpoint(Url::parse("https://idp.example.com/token")?)
		.registration_endpoint(Url::parse("https://idp.example.com/register")?)
		.build()?;
	let dispatcher: AuthorizationDispatcher<ScriptedConnections, ScriptedErrorMapper> =
		AuthorizationDispatcher::builder(ScriptedConnections, ScriptedErrorMapper).build()?;
	let (tx, rx) = oneshot::channel();

	dispatcher.perform_registration_request(
		RegistrationRequest::new(
			configuration.clone(),
			vec![Url::parse("com.example.app:/oauth2redirect")?],
		),
		move |result| {
			let _ = tx.send(result);
		},
	)?;

	let registration = rx.await??;

	println!("Registered client `{}`.", registration.client_id);

	let auth = registration.client_authentication();
	let (tx, rx) = oneshot::channel();

	dispatcher.perform_token_request(
		TokenRequest::for_refresh_token(configuration, &registration.client_id, "refresh-demo"),
		&auth,
		move |result| {
			let _ = tx.send(result);
		},
	)?;

	match rx.await? {
		Ok(response) => println!("Unexpected token response: {}.", response.token_type),
		Err(e) => println!("Token endpoint failure mapped by the dispatcher: {e} ({}).", e.code()),
	}

	dispatcher.dispose();

	Ok(())
}

#[derive(Clone, Debug)]
enum ScriptedTransportError {
	Unreachable { host: String },
}
impl Display for ScriptedTransportError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Unreachable { host } => write!(f, "{host} is unreachable"),
		}
	}
}
impl StdError for ScriptedTransportError {}

/// Serves a canned registration and refuses every other endpoint.
#[derive(Clone, Debug, Default)]
struct ScriptedConnections;
impl ConnectionFactory for ScriptedConnections {
	type Channel = ScriptedChannel;
	type TransportError = ScriptedTransportError;

	fn open(&self, endpoint: &Url) -> Self::Channel {
		ScriptedChannel { endpoint: endpoint.clone() }
	}
}

#[derive(Clone, Debug)]
struct ScriptedChannel {
	endpoint: Url,
}
impl<'c> AsyncHttpClient<'c> for ScriptedChannel {
	type Error = HttpClientError<ScriptedTransportError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, _request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			if self.endpoint.path() != "/register" {
				return Err(HttpClientError::Reqwest(Box::new(
					ScriptedTransportError::Unreachable {
						host: self.endpoint.host_str().unwrap_or_default().to_owned(),
					},
				)));
			}

			let body = json!({
				"client_id": "demo-client",
				"client_secret": "demo-secret",
				"client_secret_expires_at": 0,
				"token_endpoint_auth_method": "client_secret_basic",
			});

			Ok(HttpResponse::new(body.to_string().into_bytes()))
		})
	}
}

#[derive(Debug)]
struct ScriptedErrorMapper;
impl TransportErrorMapper<ScriptedTransportError> for ScriptedErrorMapper {
	fn map_transport_error(
		&self,
		endpoint: &'static str,
		error: HttpClientError<ScriptedTransportError>,
	) -> GeneralError {
		match error {
			HttpClientError::Reqwest(inner) => GeneralError::Network { endpoint, source: inner },
			other => GeneralError::network(endpoint, std::io::Error::other(other.to_string())),
		}
	}
}
