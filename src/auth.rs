//! Client authentication strategies applied to token endpoint requests.
//!
//! A strategy contributes extra HTTP headers and/or form parameters for a given client
//! identifier. Strategies never see or mutate the outgoing request; the dispatcher merges
//! their output into the wire form, with strategy values winning on key collisions.

pub mod secret;

pub use secret::*;

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
use url::form_urlencoded;
// self
use crate::_prelude::*;

/// Header used by `client_secret_basic`.
pub const AUTHORIZATION_HEADER: &str = "Authorization";
/// Form parameter used by `client_secret_post`.
pub const PARAM_CLIENT_SECRET: &str = "client_secret";

/// Extension hook for client authentication methods outside the built-in set
/// (e.g. `private_key_jwt`).
///
/// Implementations must be side-effect free and must not retain secrets beyond a single call.
pub trait ClientAuthenticator
where
	Self: Debug + Send + Sync,
{
	/// Extra headers to send with the token request.
	fn request_headers(&self, client_id: &str) -> Option<BTreeMap<String, String>>;

	/// Extra form parameters to merge into the token request body.
	fn request_parameters(&self, client_id: &str) -> Option<BTreeMap<String, String>>;
}

/// Client authentication applied to token endpoint calls.
#[derive(Clone, Debug, Default)]
pub enum ClientAuthentication {
	/// Public client; nothing is added.
	#[default]
	None,
	/// `client_secret_basic`: HTTP Basic header built from the client id and secret.
	ClientSecretBasic(ClientSecret),
	/// `client_secret_post`: the secret travels as a `client_secret` form parameter.
	ClientSecretPost(ClientSecret),
	/// Caller-supplied method.
	Custom(Arc<dyn ClientAuthenticator>),
}
impl ClientAuthentication {
	/// Builds a `client_secret_basic` strategy.
	pub fn basic(secret: impl Into<ClientSecret>) -> Self {
		Self::ClientSecretBasic(secret.into())
	}

	/// Builds a `client_secret_post` strategy.
	pub fn post(secret: impl Into<ClientSecret>) -> Self {
		Self::ClientSecretPost(secret.into())
	}

	/// Wraps a caller-supplied strategy.
	pub fn custom(authenticator: impl 'static + ClientAuthenticator) -> Self {
		Self::Custom(Arc::new(authenticator))
	}

	/// Returns the RFC 7591 `token_endpoint_auth_method` name, when one applies.
	pub fn method_name(&self) -> Option<&'static str> {
		match self {
			Self::None => Some("none"),
			Self::ClientSecretBasic(_) => Some("client_secret_basic"),
			Self::ClientSecretPost(_) => Some("client_secret_post"),
			Self::Custom(_) => None,
		}
	}

	/// Extra headers to send with the token request.
	pub fn request_headers(&self, client_id: &str) -> Option<BTreeMap<String, String>> {
		match self {
			Self::None | Self::ClientSecretPost(_) => None,
			Self::ClientSecretBasic(secret) => {
				// RFC 6749 §2.3.1: both halves are form-encoded before base64.
				let credentials =
					format!("{}:{}", form_encode(client_id), form_encode(secret.expose()));
				let value = format!("Basic {}", STANDARD.encode(credentials));

				Some(BTreeMap::from([(AUTHORIZATION_HEADER.to_owned(), value)]))
			},
			Self::Custom(authenticator) => authenticator.request_headers(client_id),
		}
	}

	/// Extra form parameters to merge into the token request body.
	pub fn request_parameters(&self, client_id: &str) -> Option<BTreeMap<String, String>> {
		match self {
			Self::None | Self::ClientSecretBasic(_) => None,
			Self::ClientSecretPost(secret) => Some(BTreeMap::from([(
				PARAM_CLIENT_SECRET.to_owned(),
				secret.expose().to_owned(),
			)])),
			Self::Custom(authenticator) => authenticator.request_parameters(client_id),
		}
	}
}

fn form_encode(value: &str) -> String {
	form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn none_adds_nothing() {
		let auth = ClientAuthentication::None;

		assert!(auth.request_headers("client").is_none());
		assert!(auth.request_parameters("client").is_none());
	}

	#[test]
	fn basic_encodes_credentials_into_header() {
		let auth = ClientAuthentication::basic("s3cret");
		let headers = auth.request_headers("client").expect("Basic auth should add a header.");

		assert_eq!(
			headers.get(AUTHORIZATION_HEADER).map(String::as_str),
			Some("Basic Y2xpZW50OnMzY3JldA==")
		);
		assert!(auth.request_parameters("client").is_none());
	}

	#[test]
	fn basic_form_encodes_reserved_characters() {
		let auth = ClientAuthentication::basic("p@ss:word");
		let headers = auth.request_headers("my client").expect("Basic auth should add a header.");

		assert_eq!(
			headers.get(AUTHORIZATION_HEADER).map(String::as_str),
			Some("Basic bXkrY2xpZW50OnAlNDBzcyUzQXdvcmQ=")
		);
	}

	#[test]
	fn post_adds_secret_parameter_only() {
		let auth = ClientAuthentication::post("s3cret");
		let params = auth.request_parameters("client").expect("Post auth should add parameters.");

		assert_eq!(params.len(), 1);
		assert_eq!(params.get(PARAM_CLIENT_SECRET).map(String::as_str), Some("s3cret"));
		assert!(auth.request_headers("client").is_none());
	}

	#[test]
	fn custom_strategy_is_consulted() {
		#[derive(Debug)]
		struct ApiKey;
		impl ClientAuthenticator for ApiKey {
			fn request_headers(&self, client_id: &str) -> Option<BTreeMap<String, String>> {
				Some(BTreeMap::from([("X-Api-Key".into(), format!("key-for-{client_id}"))]))
			}

			fn request_parameters(&self, _client_id: &str) -> Option<BTreeMap<String, String>> {
				None
			}
		}

		let auth = ClientAuthentication::custom(ApiKey);

		assert_eq!(auth.method_name(), None);
		assert_eq!(
			auth.request_headers("abc").and_then(|h| h.get("X-Api-Key").cloned()),
			Some("key-for-abc".into())
		);
	}

	#[test]
	fn debug_output_redacts_secrets() {
		let rendered = format!("{:?}", ClientAuthentication::post("s3cret"));

		assert!(!rendered.contains("s3cret"));
	}
}
