//! Token endpoint request and response models.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::ConfigError,
	executor::ResponseDocument,
	model::{AuthorizationRequest, ServiceConfiguration},
};

/// OAuth 2.0 grant types understood by [`TokenRequest`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
	/// Authorization Code grant.
	AuthorizationCode,
	/// Refresh Token grant.
	RefreshToken,
	/// Client Credentials grant.
	ClientCredentials,
}
impl GrantType {
	/// Returns the RFC 6749 identifier for the grant type.
	pub fn as_str(self) -> &'static str {
		match self {
			GrantType::AuthorizationCode => "authorization_code",
			GrantType::RefreshToken => "refresh_token",
			GrantType::ClientCredentials => "client_credentials",
		}
	}
}
impl Display for GrantType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Immutable token endpoint request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRequest {
	/// Authorization server endpoints.
	pub configuration: ServiceConfiguration,
	/// Client identifier.
	pub client_id: String,
	/// Grant being exchanged.
	pub grant_type: GrantType,
	/// Authorization code for the code grant.
	pub authorization_code: Option<String>,
	/// Redirect URI used in the originating authorization request.
	pub redirect_uri: Option<Url>,
	/// Refresh token for the refresh grant.
	pub refresh_token: Option<TokenSecret>,
	/// Space-delimited scope string.
	pub scope: Option<String>,
	/// PKCE code verifier.
	pub code_verifier: Option<String>,
	/// Nonce expected in the issued ID token. Never sent on the wire.
	pub nonce: Option<String>,
	/// Extra form parameters.
	pub additional_parameters: BTreeMap<String, String>,
}
impl TokenRequest {
	/// Creates a builder for an arbitrary grant.
	pub fn builder(
		configuration: ServiceConfiguration,
		client_id: impl Into<String>,
		grant_type: GrantType,
	) -> TokenRequestBuilder {
		TokenRequestBuilder {
			request: TokenRequest {
				configuration,
				client_id: client_id.into(),
				grant_type,
				authorization_code: None,
				redirect_uri: None,
				refresh_token: None,
				scope: None,
				code_verifier: None,
				nonce: None,
				additional_parameters: BTreeMap::new(),
			},
		}
	}

	/// Builds the code exchange for a completed authorization request.
	///
	/// The client id, redirect URI, PKCE verifier, and expected nonce are carried over from
	/// `authorization`.
	pub fn for_authorization_code(
		authorization: &AuthorizationRequest,
		code: impl Into<String>,
	) -> Self {
		let mut builder = Self::builder(
			authorization.configuration.clone(),
			authorization.client_id.clone(),
			GrantType::AuthorizationCode,
		)
		.authorization_code(code)
		.redirect_uri(authorization.redirect_uri.clone());

		builder.request.code_verifier = authorization.pkce.as_ref().map(|p| p.verifier.clone());
		builder.request.nonce = authorization.nonce.clone();

		builder.request
	}

	/// Builds a refresh-token exchange.
	pub fn for_refresh_token(
		configuration: ServiceConfiguration,
		client_id: impl Into<String>,
		refresh_token: impl Into<TokenSecret>,
	) -> Self {
		let mut builder = Self::builder(configuration, client_id, GrantType::RefreshToken);

		builder.request.refresh_token = Some(refresh_token.into());

		builder.request
	}

	/// Returns the wire form of the request (form field name → value).
	///
	/// Additional parameters never override the fields owned by the request.
	pub fn request_parameters(&self) -> BTreeMap<String, String> {
		let mut params = BTreeMap::new();

		params.insert("grant_type".to_owned(), self.grant_type.as_str().to_owned());
		params.insert("client_id".to_owned(), self.client_id.clone());

		let optional = [
			("code", self.authorization_code.as_deref()),
			("redirect_uri", self.redirect_uri.as_ref().map(Url::as_str)),
			("refresh_token", self.refresh_token.as_ref().map(TokenSecret::expose)),
			("scope", self.scope.as_deref()),
			("code_verifier", self.code_verifier.as_deref()),
		];

		for (key, value) in optional {
			if let Some(value) = value {
				params.insert(key.to_owned(), value.to_owned());
			}
		}
		for (key, value) in &self.additional_parameters {
			params.entry(key.clone()).or_insert_with(|| value.clone());
		}

		params
	}
}
impl Debug for TokenRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRequest")
			.field("token_endpoint", &self.configuration.token_endpoint.as_str())
			.field("client_id", &self.client_id)
			.field("grant_type", &self.grant_type)
			.field("authorization_code", &self.authorization_code.as_ref().map(|_| "<redacted>"))
			.field("redirect_uri", &self.redirect_uri)
			.field("refresh_token", &self.refresh_token)
			.field("scope", &self.scope)
			.field("code_verifier", &self.code_verifier.as_ref().map(|_| "<redacted>"))
			.field("nonce", &self.nonce)
			.finish()
	}
}

/// Builder for [`TokenRequest`].
#[derive(Clone, Debug)]
pub struct TokenRequestBuilder {
	request: TokenRequest,
}
impl TokenRequestBuilder {
	/// Sets the authorization code.
	pub fn authorization_code(mut self, code: impl Into<String>) -> Self {
		self.request.authorization_code = Some(code.into());

		self
	}

	/// Sets the redirect URI.
	pub fn redirect_uri(mut self, uri: Url) -> Self {
		self.request.redirect_uri = Some(uri);

		self
	}

	/// Sets the refresh token.
	pub fn refresh_token(mut self, token: impl Into<TokenSecret>) -> Self {
		self.request.refresh_token = Some(token.into());

		self
	}

	/// Sets the scopes, joined with single spaces.
	pub fn scopes<I, S>(mut self, scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let joined = scopes.into_iter().map(|s| s.as_ref().to_owned()).collect::<Vec<_>>();

		self.request.scope = if joined.is_empty() { None } else { Some(joined.join(" ")) };

		self
	}

	/// Sets the PKCE code verifier.
	pub fn code_verifier(mut self, verifier: impl Into<String>) -> Self {
		self.request.code_verifier = Some(verifier.into());

		self
	}

	/// Sets the nonce expected in the ID token.
	pub fn nonce(mut self, nonce: impl Into<String>) -> Self {
		self.request.nonce = Some(nonce.into());

		self
	}

	/// Adds an extra form parameter.
	pub fn additional_parameter(
		mut self,
		key: impl Into<String>,
		value: impl Into<String>,
	) -> Self {
		self.request.additional_parameters.insert(key.into(), value.into());

		self
	}

	/// Validates grant-specific requirements and builds the request.
	pub fn build(self) -> Result<TokenRequest, ConfigError> {
		let request = self.request;

		match request.grant_type {
			GrantType::AuthorizationCode => {
				if request.authorization_code.is_none() {
					return Err(ConfigError::MissingField { field: "code" });
				}
				if request.redirect_uri.is_none() {
					return Err(ConfigError::MissingField { field: "redirect_uri" });
				}
			},
			GrantType::RefreshToken =>
				if request.refresh_token.is_none() {
					return Err(ConfigError::MissingField { field: "refresh_token" });
				},
			GrantType::ClientCredentials => {},
		}

		Ok(request)
	}
}

#[derive(Deserialize)]
struct TokenResponseDocument {
	token_type: String,
	#[serde(default)]
	access_token: Option<TokenSecret>,
	#[serde(default)]
	expires_in: Option<i64>,
	#[serde(default)]
	expires_at: Option<i64>,
	#[serde(default)]
	refresh_token: Option<TokenSecret>,
	#[serde(default)]
	id_token: Option<String>,
	#[serde(default)]
	scope: Option<String>,
	#[serde(flatten)]
	additional: BTreeMap<String, Value>,
}

/// Token endpoint response paired with the request that produced it.
#[derive(Clone, Debug)]
pub struct TokenResponse {
	/// Echo of the originating request.
	pub request: TokenRequest,
	/// `token_type`, e.g. `Bearer`.
	pub token_type: String,
	/// Issued access token.
	pub access_token: Option<TokenSecret>,
	/// Absolute access-token expiry.
	///
	/// Derived from `expires_in` relative to receipt time, or taken from an epoch-seconds
	/// `expires_at` when the server sends no `expires_in`.
	pub access_token_expires_at: Option<OffsetDateTime>,
	/// Issued refresh token.
	pub refresh_token: Option<TokenSecret>,
	/// Issued OpenID Connect ID token (compact JWS).
	pub id_token: Option<String>,
	/// Granted scope.
	pub scope: Option<String>,
	/// Fields not modeled above.
	pub additional_parameters: BTreeMap<String, Value>,
}
impl TokenResponse {
	/// Builds a response from the parsed token endpoint document.
	pub fn from_response_document(
		request: TokenRequest,
		document: &ResponseDocument,
	) -> Result<Self, serde_path_to_error::Error<serde_json::Error>> {
		Self::from_response_document_at(request, document, OffsetDateTime::now_utc())
	}

	/// Same as [`TokenResponse::from_response_document`] with an explicit clock.
	pub fn from_response_document_at(
		request: TokenRequest,
		document: &ResponseDocument,
		now: OffsetDateTime,
	) -> Result<Self, serde_path_to_error::Error<serde_json::Error>> {
		let parsed: TokenResponseDocument =
			serde_path_to_error::deserialize(Value::Object(document.clone()))?;
		let access_token_expires_at = match (parsed.expires_in, parsed.expires_at) {
			(Some(secs), _) => now.checked_add(Duration::seconds(secs)),
			(None, Some(at)) => OffsetDateTime::from_unix_timestamp(at).ok(),
			(None, None) => None,
		};

		Ok(Self {
			request,
			token_type: parsed.token_type,
			access_token: parsed.access_token,
			access_token_expires_at,
			refresh_token: parsed.refresh_token,
			id_token: parsed.id_token,
			scope: parsed.scope,
			additional_parameters: parsed.additional,
		})
	}

	/// Returns `true` when the access token has an expiry at or before `now`.
	pub fn is_access_token_expired_at(&self, now: OffsetDateTime) -> bool {
		self.access_token_expires_at.is_some_and(|expires_at| expires_at <= now)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::model::RESPONSE_TYPE_CODE;

	fn configuration() -> ServiceConfiguration {
		ServiceConfiguration::builder()
			.authorization_endpoint(
				Url::parse("https://example.com/authorize").expect("Fixture should parse."),
			)
			.token_endpoint(Url::parse("https://example.com/token").expect("Fixture should parse."))
			.build()
			.expect("Fixture configuration should build.")
	}

	fn document(value: Value) -> ResponseDocument {
		match value {
			Value::Object(map) => map,
			other => panic!("Fixture must be a JSON object, got {other}."),
		}
	}

	#[test]
	fn code_exchange_carries_authorization_context() {
		let redirect = Url::parse("com.example.app:/cb").expect("Redirect fixture should parse.");
		let authorization =
			AuthorizationRequest::builder(configuration(), "client-1", RESPONSE_TYPE_CODE, redirect)
				.nonce(Some("nonce-1".into()))
				.code_verifier(Some("verifier-1".into()))
				.build();
		let request = TokenRequest::for_authorization_code(&authorization, "code-1");
		let params = request.request_parameters();

		assert_eq!(params.get("grant_type").map(String::as_str), Some("authorization_code"));
		assert_eq!(params.get("code").map(String::as_str), Some("code-1"));
		assert_eq!(params.get("client_id").map(String::as_str), Some("client-1"));
		assert_eq!(params.get("redirect_uri").map(String::as_str), Some("com.example.app:/cb"));
		assert_eq!(params.get("code_verifier").map(String::as_str), Some("verifier-1"));
		assert!(!params.contains_key("nonce"));
		assert_eq!(request.nonce.as_deref(), Some("nonce-1"));
	}

	#[test]
	fn builder_enforces_grant_requirements() {
		let err = TokenRequest::builder(configuration(), "client-1", GrantType::AuthorizationCode)
			.authorization_code("abc")
			.build()
			.expect_err("Code exchange requires a redirect URI.");

		assert_eq!(err, ConfigError::MissingField { field: "redirect_uri" });

		let err = TokenRequest::builder(configuration(), "client-1", GrantType::RefreshToken)
			.build()
			.expect_err("Refresh exchange requires a refresh token.");

		assert_eq!(err, ConfigError::MissingField { field: "refresh_token" });
	}

	#[test]
	fn additional_parameters_do_not_override_owned_fields() {
		let request = TokenRequest::builder(configuration(), "client-1", GrantType::ClientCredentials)
			.additional_parameter("grant_type", "password")
			.additional_parameter("audience", "api")
			.build()
			.expect("Client credentials request should build.");
		let params = request.request_parameters();

		assert_eq!(params.get("grant_type").map(String::as_str), Some("client_credentials"));
		assert_eq!(params.get("audience").map(String::as_str), Some("api"));
	}

	#[test]
	fn response_document_populates_fields() {
		let now = OffsetDateTime::UNIX_EPOCH + Duration::days(20_000);
		let request = TokenRequest::for_refresh_token(configuration(), "client-1", "rt-1");
		let response = TokenResponse::from_response_document_at(
			request,
			&document(json!({
				"access_token": "at-1",
				"token_type": "Bearer",
				"expires_in": 3600,
				"id_token": "a.b.c",
				"scope": "openid",
				"custom": true,
			})),
			now,
		)
		.expect("Token response should parse.");

		assert_eq!(response.token_type, "Bearer");
		assert_eq!(response.access_token.as_ref().map(TokenSecret::expose), Some("at-1"));
		assert_eq!(response.access_token_expires_at, Some(now + Duration::hours(1)));
		assert_eq!(response.id_token.as_deref(), Some("a.b.c"));
		assert_eq!(response.additional_parameters.get("custom"), Some(&Value::Bool(true)));
		assert!(!response.is_access_token_expired_at(now));
		assert!(response.is_access_token_expired_at(now + Duration::hours(1)));
	}

	#[test]
	fn absolute_expiry_applies_without_relative_lifetime() {
		let now = OffsetDateTime::UNIX_EPOCH + Duration::days(20_000);
		let expires_at = now.unix_timestamp() + 120;
		let request = TokenRequest::for_refresh_token(configuration(), "client-1", "rt-1");
		let response = TokenResponse::from_response_document_at(
			request.clone(),
			&document(json!({ "token_type": "Bearer", "expires_at": expires_at })),
			now,
		)
		.expect("Token response should parse.");

		assert_eq!(response.access_token_expires_at, Some(now + Duration::minutes(2)));
		assert!(!response.additional_parameters.contains_key("expires_at"));

		let response = TokenResponse::from_response_document_at(
			request,
			&document(json!({ "token_type": "Bearer", "expires_in": 60, "expires_at": expires_at })),
			now,
		)
		.expect("Token response should parse.");

		assert_eq!(response.access_token_expires_at, Some(now + Duration::minutes(1)));
	}

	#[test]
	fn response_document_requires_token_type() {
		let request = TokenRequest::for_refresh_token(configuration(), "client-1", "rt-1");
		let err = TokenResponse::from_response_document(
			request,
			&document(json!({ "access_token": "at-1" })),
		)
		.expect_err("token_type is required.");

		assert!(err.to_string().contains("token_type"));
	}
}
