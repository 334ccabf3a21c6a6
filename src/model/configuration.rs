//! Authorization server endpoint configuration.

// self
use crate::{_prelude::*, error::ConfigError};

/// Endpoints of a single authorization server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfiguration {
	/// Authorization endpoint presented to the user agent.
	pub authorization_endpoint: Url,
	/// Token endpoint used for code and refresh exchanges.
	pub token_endpoint: Url,
	/// Dynamic client registration endpoint, when supported.
	#[serde(default)]
	pub registration_endpoint: Option<Url>,
	/// JSON Web Key Set endpoint used to validate ID tokens.
	#[serde(default)]
	pub key_set_endpoint: Option<Url>,
}
impl ServiceConfiguration {
	/// Creates a new builder.
	pub fn builder() -> ServiceConfigurationBuilder {
		ServiceConfigurationBuilder::default()
	}

	/// Derives the configuration from an OpenID Connect discovery document.
	pub fn from_discovery(document: &DiscoveryDocument) -> Result<Self, ConfigError> {
		let mut builder = Self::builder()
			.authorization_endpoint(document.authorization_endpoint.clone())
			.token_endpoint(document.token_endpoint.clone())
			.key_set_endpoint(document.jwks_uri.clone());

		if let Some(registration) = &document.registration_endpoint {
			builder = builder.registration_endpoint(registration.clone());
		}

		builder.build()
	}

	/// Returns the registration endpoint or a configuration error.
	pub fn require_registration_endpoint(&self) -> Result<&Url, ConfigError> {
		self.registration_endpoint
			.as_ref()
			.ok_or(ConfigError::MissingEndpoint { endpoint: "registration" })
	}

	/// Returns the key-set endpoint or a configuration error.
	pub fn require_key_set_endpoint(&self) -> Result<&Url, ConfigError> {
		self.key_set_endpoint.as_ref().ok_or(ConfigError::MissingEndpoint { endpoint: "key set" })
	}
}

/// Builder for [`ServiceConfiguration`].
#[derive(Clone, Debug, Default)]
pub struct ServiceConfigurationBuilder {
	authorization_endpoint: Option<Url>,
	token_endpoint: Option<Url>,
	registration_endpoint: Option<Url>,
	key_set_endpoint: Option<Url>,
}
impl ServiceConfigurationBuilder {
	/// Sets the authorization endpoint.
	pub fn authorization_endpoint(mut self, url: Url) -> Self {
		self.authorization_endpoint = Some(url);

		self
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the registration endpoint.
	pub fn registration_endpoint(mut self, url: Url) -> Self {
		self.registration_endpoint = Some(url);

		self
	}

	/// Sets the key-set (JWKS) endpoint.
	pub fn key_set_endpoint(mut self, url: Url) -> Self {
		self.key_set_endpoint = Some(url);

		self
	}

	/// Validates and builds the configuration.
	pub fn build(self) -> Result<ServiceConfiguration, ConfigError> {
		let authorization_endpoint = self
			.authorization_endpoint
			.ok_or(ConfigError::MissingEndpoint { endpoint: "authorization" })?;
		let token_endpoint =
			self.token_endpoint.ok_or(ConfigError::MissingEndpoint { endpoint: "token" })?;

		validate_endpoint("authorization", &authorization_endpoint)?;
		validate_endpoint("token", &token_endpoint)?;

		if let Some(url) = &self.registration_endpoint {
			validate_endpoint("registration", url)?;
		}
		if let Some(url) = &self.key_set_endpoint {
			validate_endpoint("key set", url)?;
		}

		Ok(ServiceConfiguration {
			authorization_endpoint,
			token_endpoint,
			registration_endpoint: self.registration_endpoint,
			key_set_endpoint: self.key_set_endpoint,
		})
	}
}

/// Subset of an OpenID Connect discovery document (OpenID Connect Discovery 1.0 §3).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryDocument {
	/// Issuer identifier.
	pub issuer: Url,
	/// Authorization endpoint.
	pub authorization_endpoint: Url,
	/// Token endpoint.
	pub token_endpoint: Url,
	/// JSON Web Key Set endpoint.
	pub jwks_uri: Url,
	/// Dynamic client registration endpoint.
	#[serde(default)]
	pub registration_endpoint: Option<Url>,
	/// UserInfo endpoint.
	#[serde(default)]
	pub userinfo_endpoint: Option<Url>,
	/// Supported `response_type` values.
	#[serde(default)]
	pub response_types_supported: Vec<String>,
	/// Supported ID-token signing algorithms.
	#[serde(default)]
	pub id_token_signing_alg_values_supported: Vec<String>,
	/// Fields not modeled above.
	#[serde(flatten)]
	pub additional: BTreeMap<String, Value>,
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ConfigError> {
	match url.scheme() {
		"https" | "http" => Ok(()),
		_ => Err(ConfigError::UnsupportedScheme { endpoint: name, url: url.to_string() }),
	}
}
