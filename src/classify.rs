//! OAuth 2.0 / OpenID Connect error vocabularies and payload classification.
//!
//! Each endpoint family recognizes its own set of `error` codes (RFC 6749 §4.1.2.1, §5.2 and
//! RFC 7591 §3.2.2). A code outside the endpoint's vocabulary is still classified, as
//! [`OAuthErrorCode::Other`], so classification itself never fails.

// self
use crate::{
	_prelude::*,
	error::{AuthorizationError, GeneralError, OAuthError},
	executor::ResponseDocument,
};

/// Wire field carrying the OAuth error code.
pub const PARAM_ERROR: &str = "error";
/// Wire field carrying the optional human-readable description.
pub const PARAM_ERROR_DESCRIPTION: &str = "error_description";
/// Wire field carrying the optional error information URI.
pub const PARAM_ERROR_URI: &str = "error_uri";

/// Endpoint families with distinct error vocabularies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OAuthEndpoint {
	/// Authorization endpoint (errors arrive on the redirect URI).
	Authorization,
	/// Token endpoint.
	Token,
	/// Dynamic client registration endpoint.
	Registration,
}
impl OAuthEndpoint {
	/// Returns a stable label for the endpoint.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Authorization => "authorization",
			Self::Token => "token",
			Self::Registration => "registration",
		}
	}

	/// Looks up `error` in this endpoint's vocabulary.
	pub fn classify(self, error: &str) -> OAuthErrorCode {
		use OAuthErrorCode::*;

		let known: &[OAuthErrorCode] = match self {
			Self::Authorization => &[
				InvalidRequest,
				UnauthorizedClient,
				AccessDenied,
				UnsupportedResponseType,
				InvalidScope,
				ServerError,
				TemporarilyUnavailable,
			],
			Self::Token => &[
				InvalidRequest,
				InvalidClient,
				InvalidGrant,
				UnauthorizedClient,
				UnsupportedGrantType,
				InvalidScope,
			],
			Self::Registration => &[InvalidRequest, InvalidRedirectUri, InvalidClientMetadata],
		};

		known.iter().copied().find(|code| code.as_str() == error).unwrap_or(Other)
	}
}
impl Display for OAuthEndpoint {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Canonical OAuth error codes across all endpoint vocabularies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OAuthErrorCode {
	/// `invalid_request`.
	InvalidRequest,
	/// `unauthorized_client`.
	UnauthorizedClient,
	/// `access_denied`.
	AccessDenied,
	/// `unsupported_response_type`.
	UnsupportedResponseType,
	/// `invalid_scope`.
	InvalidScope,
	/// `server_error`.
	ServerError,
	/// `temporarily_unavailable`.
	TemporarilyUnavailable,
	/// `invalid_client`.
	InvalidClient,
	/// `invalid_grant`.
	InvalidGrant,
	/// `unsupported_grant_type`.
	UnsupportedGrantType,
	/// `invalid_redirect_uri`.
	InvalidRedirectUri,
	/// `invalid_client_metadata`.
	InvalidClientMetadata,
	/// Any code not recognized by the endpoint's vocabulary.
	Other,
}
impl OAuthErrorCode {
	/// Returns the wire representation (`other` for unrecognized codes).
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::InvalidRequest => "invalid_request",
			Self::UnauthorizedClient => "unauthorized_client",
			Self::AccessDenied => "access_denied",
			Self::UnsupportedResponseType => "unsupported_response_type",
			Self::InvalidScope => "invalid_scope",
			Self::ServerError => "server_error",
			Self::TemporarilyUnavailable => "temporarily_unavailable",
			Self::InvalidClient => "invalid_client",
			Self::InvalidGrant => "invalid_grant",
			Self::UnsupportedGrantType => "unsupported_grant_type",
			Self::InvalidRedirectUri => "invalid_redirect_uri",
			Self::InvalidClientMetadata => "invalid_client_metadata",
			Self::Other => "other",
		}
	}
}
impl Display for OAuthErrorCode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

#[derive(Deserialize)]
struct ErrorPayload {
	error: String,
	error_description: Option<String>,
	error_uri: Option<String>,
}

/// Builds an [`OAuthError`] from its wire fields.
///
/// An `error_uri` that does not parse as an absolute URL is dropped rather than rejected.
pub fn oauth_error(
	endpoint: OAuthEndpoint,
	error: impl Into<String>,
	description: Option<String>,
	uri: Option<&str>,
) -> OAuthError {
	let error = error.into();

	OAuthError {
		endpoint,
		code: endpoint.classify(&error),
		error,
		description,
		uri: uri.and_then(|value| Url::parse(value).ok()),
	}
}

/// Classifies a response document that carries an `error` field.
///
/// Returns `None` when the document has no `error` field. When the field is present but the
/// payload is not shaped like an OAuth error (non-string values), the document is reported as a
/// malformed response.
pub fn from_document(
	endpoint: OAuthEndpoint,
	document: &ResponseDocument,
	status: Option<u16>,
) -> Option<AuthorizationError> {
	if !document.contains_key(PARAM_ERROR) {
		return None;
	}

	let value = Value::Object(document.clone());
	let classified = match serde_path_to_error::deserialize::<_, ErrorPayload>(value) {
		Ok(payload) => oauth_error(
			endpoint,
			payload.error,
			payload.error_description,
			payload.error_uri.as_deref(),
		)
		.into(),
		Err(source) =>
			GeneralError::MalformedResponse { endpoint: endpoint.as_str(), source, status }.into(),
	};

	Some(classified)
}

/// Extracts an authorization-endpoint error from a launcher completion URI.
///
/// Returns `None` when the URI carries no `error` query parameter.
pub fn from_redirect_uri(uri: &Url) -> Option<OAuthError> {
	let mut error = None;
	let mut description = None;
	let mut error_uri = None;

	for (key, value) in uri.query_pairs() {
		match key.as_ref() {
			PARAM_ERROR => error = Some(value.into_owned()),
			PARAM_ERROR_DESCRIPTION => description = Some(value.into_owned()),
			PARAM_ERROR_URI => error_uri = Some(value.into_owned()),
			_ => {},
		}
	}

	error.map(|error| {
		oauth_error(OAuthEndpoint::Authorization, error, description, error_uri.as_deref())
	})
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::ErrorCategory;

	fn document(value: Value) -> ResponseDocument {
		match value {
			Value::Object(map) => map,
			other => panic!("Fixture must be a JSON object, got {other}."),
		}
	}

	#[test]
	fn vocabularies_are_endpoint_specific() {
		assert_eq!(OAuthEndpoint::Token.classify("invalid_grant"), OAuthErrorCode::InvalidGrant);
		assert_eq!(OAuthEndpoint::Registration.classify("invalid_grant"), OAuthErrorCode::Other);
		assert_eq!(
			OAuthEndpoint::Registration.classify("invalid_client_metadata"),
			OAuthErrorCode::InvalidClientMetadata
		);
		assert_eq!(OAuthEndpoint::Token.classify("access_denied"), OAuthErrorCode::Other);
		assert_eq!(
			OAuthEndpoint::Authorization.classify("access_denied"),
			OAuthErrorCode::AccessDenied
		);
		assert_eq!(OAuthEndpoint::Token.classify("INVALID_GRANT"), OAuthErrorCode::Other);
	}

	#[test]
	fn document_without_error_is_not_classified() {
		let doc = document(json!({ "access_token": "abc", "token_type": "Bearer" }));

		assert!(from_document(OAuthEndpoint::Token, &doc, Some(200)).is_none());
	}

	#[test]
	fn document_error_fields_are_extracted() {
		let doc = document(json!({
			"error": "invalid_client",
			"error_description": "bad secret",
			"error_uri": "https://example.com/errors/invalid_client",
		}));
		let err = from_document(OAuthEndpoint::Token, &doc, Some(401))
			.expect("Error documents should be classified.");

		match err {
			AuthorizationError::OAuth(oauth) => {
				assert_eq!(oauth.code, OAuthErrorCode::InvalidClient);
				assert_eq!(oauth.error, "invalid_client");
				assert_eq!(oauth.description.as_deref(), Some("bad secret"));
				assert_eq!(
					oauth.uri.as_ref().map(Url::as_str),
					Some("https://example.com/errors/invalid_client")
				);
			},
			other => panic!("Unexpected classification: {other:?}."),
		}
	}

	#[test]
	fn unknown_codes_keep_the_raw_value() {
		let doc = document(json!({ "error": "slow_down" }));
		let err = from_document(OAuthEndpoint::Token, &doc, Some(400))
			.expect("Error documents should be classified.");

		assert_eq!(err.category(), ErrorCategory::OAuth);
		assert_eq!(err.code(), "other");

		let AuthorizationError::OAuth(oauth) = err else {
			panic!("Expected an OAuth error.");
		};

		assert_eq!(oauth.error, "slow_down");
	}

	#[test]
	fn malformed_error_payload_falls_back_to_malformed_response() {
		let doc = document(json!({ "error": 42 }));
		let err = from_document(OAuthEndpoint::Registration, &doc, Some(400))
			.expect("Error documents should be classified.");

		assert!(matches!(
			err,
			AuthorizationError::General(GeneralError::MalformedResponse { status: Some(400), .. })
		));
	}

	#[test]
	fn redirect_uri_errors_use_the_authorization_vocabulary() {
		let uri = Url::parse(
			"com.example.app:/callback?error=access_denied&error_description=user%20said%20no&state=xyz",
		)
		.expect("Redirect fixture should parse.");
		let err = from_redirect_uri(&uri).expect("Redirect should carry an error.");

		assert_eq!(err.endpoint, OAuthEndpoint::Authorization);
		assert_eq!(err.code, OAuthErrorCode::AccessDenied);
		assert_eq!(err.description.as_deref(), Some("user said no"));
		assert!(
			from_redirect_uri(
				&Url::parse("com.example.app:/callback?code=abc").expect("Fixture should parse.")
			)
			.is_none()
		);
	}
}
