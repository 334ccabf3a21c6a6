//! Canonical error types shared by every dispatcher operation.
//!
//! Two families exist. [`AuthorizationError`] describes what went wrong with a remote exchange
//! (transport, parsing, protocol) and is only ever delivered through a completion callback.
//! [`Error`] describes caller misuse or local state problems (disposed dispatcher, missing
//! launcher, missing endpoint) and is returned synchronously from the entry point.

// self
use crate::{
	_prelude::*,
	classify::{OAuthEndpoint, OAuthErrorCode},
	model::RegistrationResponseError,
};

/// Dispatcher-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Boxed error returned by pluggable collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Synchronous failures raised at call time.
///
/// These never travel through a completion callback; they indicate programmer misuse rather than
/// a remote condition.
#[derive(Debug, ThisError)]
pub enum Error {
	/// The dispatcher has been disposed and rendered inoperable.
	#[error("Dispatcher has been disposed and rendered inoperable.")]
	Disposed,
	/// No external launcher is available to present the authorization request.
	#[error("No suitable launcher is available to present the authorization request.")]
	NoLauncher,
	/// The external launcher refused to present the authorization request.
	#[error("Launcher failed to present the authorization request.")]
	Launch {
		/// Launcher-specific failure.
		#[source]
		source: BoxError,
	},
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
}

/// Configuration and validation failures raised while building dispatchers or models.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum ConfigError {
	/// A required endpoint is not configured.
	#[error("Service configuration has no {endpoint} endpoint.")]
	MissingEndpoint {
		/// Endpoint label.
		endpoint: &'static str,
	},
	/// Endpoint does not use an HTTP scheme.
	#[error("The {endpoint} endpoint must use http or https: {url}.")]
	UnsupportedScheme {
		/// Endpoint label.
		endpoint: &'static str,
		/// Offending URL.
		url: String,
	},
	/// A builder was finalized without a required field.
	#[error("Missing required field `{field}`.")]
	MissingField {
		/// Field name.
		field: &'static str,
	},
	/// No Tokio runtime was supplied and none is running on the current thread.
	#[error("No Tokio runtime is available to run dispatcher workers.")]
	NoRuntime,
}

/// High-level classification of an [`AuthorizationError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
	/// Request construction, transport, parsing, or response-shape failure.
	General,
	/// The server returned an OAuth 2.0 / OpenID Connect `error` payload.
	OAuth,
}

/// Canonical error delivered through completion callbacks.
#[derive(Debug, ThisError)]
pub enum AuthorizationError {
	/// Request construction, transport, parsing, or response-shape failure.
	#[error(transparent)]
	General(#[from] GeneralError),
	/// Protocol error reported by the authorization server.
	#[error(transparent)]
	OAuth(#[from] OAuthError),
}
impl AuthorizationError {
	/// Returns the error category.
	pub fn category(&self) -> ErrorCategory {
		match self {
			Self::General(_) => ErrorCategory::General,
			Self::OAuth(_) => ErrorCategory::OAuth,
		}
	}

	/// Returns the stable short code for this error.
	pub fn code(&self) -> &str {
		match self {
			Self::General(e) => e.code(),
			Self::OAuth(e) => e.code.as_str(),
		}
	}

	/// Human-readable description supplied by the server, if any.
	pub fn description(&self) -> Option<&str> {
		match self {
			Self::General(_) => None,
			Self::OAuth(e) => e.description.as_deref(),
		}
	}

	/// Error information URI supplied by the server, if any.
	pub fn uri(&self) -> Option<&Url> {
		match self {
			Self::General(_) => None,
			Self::OAuth(e) => e.uri.as_ref(),
		}
	}

	/// Returns `true` for transport failures that callers may retry.
	pub fn is_network(&self) -> bool {
		matches!(self, Self::General(GeneralError::Network { .. }))
	}
}

/// Failures that are not defined by the OAuth protocol itself.
#[derive(Debug, ThisError)]
pub enum GeneralError {
	/// Connection or I/O failure while talking to the server.
	#[error("Network error occurred while calling the {endpoint} endpoint.")]
	Network {
		/// Endpoint label.
		endpoint: &'static str,
		/// Underlying transport failure.
		#[source]
		source: BoxError,
	},
	/// Outbound request could not be assembled, e.g. a header value rejected by the HTTP layer.
	///
	/// Nothing reached the wire, so retrying the same inputs fails the same way.
	#[error("Request to the {endpoint} endpoint could not be built.")]
	InvalidRequest {
		/// Endpoint label.
		endpoint: &'static str,
		/// Request construction failure.
		#[source]
		source: oauth2::http::Error,
	},
	/// Response body could not be parsed as the expected JSON structure.
	#[error("The {endpoint} endpoint returned a malformed response.")]
	MalformedResponse {
		/// Endpoint label.
		endpoint: &'static str,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Registration response parsed but violates the required registration shape.
	#[error("Registration endpoint returned an invalid registration response.")]
	InvalidRegistrationResponse(#[source] RegistrationResponseError),
}
impl GeneralError {
	/// Code of [`GeneralError::Network`].
	pub const NETWORK: &str = "network_error";
	/// Code of [`GeneralError::InvalidRequest`].
	pub const INVALID_REQUEST: &str = "request_build_error";
	/// Code of [`GeneralError::MalformedResponse`].
	pub const MALFORMED_RESPONSE: &str = "malformed_response";
	/// Code of [`GeneralError::InvalidRegistrationResponse`].
	pub const INVALID_REGISTRATION_RESPONSE: &str = "invalid_registration_response";

	/// Wraps a transport failure raised while calling `endpoint`.
	pub fn network(
		endpoint: &'static str,
		source: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { endpoint, source: Box::new(source) }
	}

	/// Returns the stable short code for this error.
	pub fn code(&self) -> &'static str {
		match self {
			Self::Network { .. } => Self::NETWORK,
			Self::InvalidRequest { .. } => Self::INVALID_REQUEST,
			Self::MalformedResponse { .. } => Self::MALFORMED_RESPONSE,
			Self::InvalidRegistrationResponse(_) => Self::INVALID_REGISTRATION_RESPONSE,
		}
	}
}

/// OAuth protocol error returned by the authorization server.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("The {endpoint} endpoint returned OAuth error `{error}`{}.", describe(.description))]
pub struct OAuthError {
	/// Endpoint whose vocabulary classified the error.
	pub endpoint: OAuthEndpoint,
	/// Canonical code recognized from the vocabulary.
	pub code: OAuthErrorCode,
	/// Raw `error` value as sent by the server.
	pub error: String,
	/// Optional `error_description`.
	pub description: Option<String>,
	/// Optional `error_uri`.
	pub uri: Option<Url>,
}

fn describe(description: &Option<String>) -> String {
	description.as_deref().map(|d| format!(": {d}")).unwrap_or_default()
}
