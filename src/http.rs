//! Connection primitives for requests sent to the authorization server.
//!
//! The module exposes [`ConnectionFactory`], the dispatcher's only dependency on an HTTP stack,
//! together with [`TransportErrorMapper`], which folds the transport's native errors into the
//! canonical [`GeneralError::Network`] entry. TLS, proxies, and timeouts are the factory's
//! business; the dispatcher only asks it for a channel bound to one endpoint.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError};
#[cfg(feature = "reqwest")] use oauth2::{HttpRequest, HttpResponse};
// self
use crate::{_prelude::*, error::GeneralError};

/// Yields request/response channels for authorization server endpoints.
///
/// Implementations must be `Send + Sync + 'static` so one factory can be shared across
/// concurrently running workers. The returned channel owns whatever state it needs, and its
/// request future must be `Send` so workers can be spawned onto a multi-threaded runtime.
pub trait ConnectionFactory
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] channel bound to a single endpoint.
	type Channel: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Opens a channel to `endpoint`.
	fn open(&self, endpoint: &Url) -> Self::Channel;
}

/// Maps transport failures into canonical [`GeneralError`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] raised while calling `endpoint`.
	fn map_transport_error(&self, endpoint: &'static str, error: HttpClientError<E>)
	-> GeneralError;
}

/// Default mapper: every transport failure is a network error wrapping the original cause.
#[derive(Clone, Debug, Default)]
pub struct DefaultTransportErrorMapper;
impl<E> TransportErrorMapper<E> for DefaultTransportErrorMapper
where
	E: 'static + Send + Sync + StdError,
{
	fn map_transport_error(&self, endpoint: &'static str, err: HttpClientError<E>) -> GeneralError {
		match err {
			HttpClientError::Reqwest(inner) => GeneralError::Network { endpoint, source: inner },
			HttpClientError::Http(inner) => GeneralError::network(endpoint, inner),
			HttpClientError::Io(inner) => GeneralError::network(endpoint, inner),
			HttpClientError::Other(message) => GeneralError::network(
				endpoint,
				std::io::Error::other(format!("HTTP client error: {message}.")),
			),
			_ => GeneralError::network(
				endpoint,
				std::io::Error::other("Unrecognized HTTP client error."),
			),
		}
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Token and registration endpoints return results directly, so configure any custom client to
/// disable redirect following.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl Default for ReqwestHttpClient {
	fn default() -> Self {
		let client = ReqwestClient::builder()
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.unwrap_or_default();

		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl ConnectionFactory for ReqwestHttpClient {
	type Channel = ReqwestChannel;
	type TransportError = ReqwestError;

	fn open(&self, endpoint: &Url) -> Self::Channel {
		ReqwestChannel { client: self.0.clone(), endpoint: endpoint.clone() }
	}
}

/// Channel returned by [`ReqwestHttpClient`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestChannel {
	client: ReqwestClient,
	endpoint: Url,
}
#[cfg(feature = "reqwest")]
impl ReqwestChannel {
	/// Endpoint this channel is bound to.
	pub fn endpoint(&self) -> &Url {
		&self.endpoint
	}
}
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for ReqwestChannel {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			let response =
				self.client.execute(request.try_into().map_err(Box::new)?).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}
