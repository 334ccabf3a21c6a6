//! Dynamic client registration (RFC 7591) request and response models.

// self
use crate::{
	_prelude::*,
	auth::{ClientAuthentication, ClientSecret, TokenSecret},
	executor::ResponseDocument,
	model::ServiceConfiguration,
};

/// `application_type` used by native clients.
pub const APPLICATION_TYPE_NATIVE: &str = "native";

/// Registration response violates the required RFC 7591 shape.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RegistrationResponseError {
	/// A required field is absent.
	#[error("Registration response is missing required field `{field}`.")]
	MissingArgument {
		/// Field name.
		field: &'static str,
	},
}

/// Failure while turning a registration document into a [`RegistrationResponse`].
#[derive(Debug, ThisError)]
pub enum RegistrationParseError {
	/// Document fields have the wrong JSON types.
	#[error(transparent)]
	Malformed(#[from] serde_path_to_error::Error<serde_json::Error>),
	/// Document is well-formed but misses required fields.
	#[error(transparent)]
	Invalid(#[from] RegistrationResponseError),
}

/// Immutable dynamic client registration request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRequest {
	/// Authorization server endpoints.
	pub configuration: ServiceConfiguration,
	/// Redirect URIs to register.
	pub redirect_uris: Vec<Url>,
	/// `application_type`.
	pub application_type: String,
	/// `response_types`.
	pub response_types: Option<Vec<String>>,
	/// `grant_types`.
	pub grant_types: Option<Vec<String>>,
	/// `subject_type`.
	pub subject_type: Option<String>,
	/// Requested `token_endpoint_auth_method`.
	pub token_endpoint_auth_method: Option<String>,
	/// Extra metadata fields.
	pub additional_parameters: BTreeMap<String, Value>,
}
impl RegistrationRequest {
	/// Creates a native-client request for the provided redirect URIs.
	pub fn new(configuration: ServiceConfiguration, redirect_uris: Vec<Url>) -> Self {
		Self {
			configuration,
			redirect_uris,
			application_type: APPLICATION_TYPE_NATIVE.to_owned(),
			response_types: None,
			grant_types: None,
			subject_type: None,
			token_endpoint_auth_method: None,
			additional_parameters: BTreeMap::new(),
		}
	}

	/// Sets `response_types`.
	pub fn with_response_types<I, S>(mut self, types: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.response_types = Some(types.into_iter().map(Into::into).collect());

		self
	}

	/// Sets `grant_types`.
	pub fn with_grant_types<I, S>(mut self, types: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.grant_types = Some(types.into_iter().map(Into::into).collect());

		self
	}

	/// Sets `subject_type`.
	pub fn with_subject_type(mut self, subject_type: impl Into<String>) -> Self {
		self.subject_type = Some(subject_type.into());

		self
	}

	/// Sets `token_endpoint_auth_method`.
	pub fn with_token_endpoint_auth_method(mut self, method: impl Into<String>) -> Self {
		self.token_endpoint_auth_method = Some(method.into());

		self
	}

	/// Adds an extra metadata field. Fields owned by the request win on collision.
	pub fn with_additional_parameter(mut self, key: impl Into<String>, value: Value) -> Self {
		self.additional_parameters.insert(key.into(), value);

		self
	}

	/// Serializes the request into its JSON wire document.
	pub fn to_document(&self) -> Value {
		let mut document = Map::new();

		document.insert(
			"redirect_uris".into(),
			Value::Array(
				self.redirect_uris.iter().map(|uri| Value::String(uri.to_string())).collect(),
			),
		);
		document.insert("application_type".into(), Value::String(self.application_type.clone()));

		if let Some(types) = &self.response_types {
			document.insert("response_types".into(), json!(types));
		}
		if let Some(types) = &self.grant_types {
			document.insert("grant_types".into(), json!(types));
		}
		if let Some(subject_type) = &self.subject_type {
			document.insert("subject_type".into(), Value::String(subject_type.clone()));
		}
		if let Some(method) = &self.token_endpoint_auth_method {
			document.insert("token_endpoint_auth_method".into(), Value::String(method.clone()));
		}

		for (key, value) in &self.additional_parameters {
			document.entry(key.clone()).or_insert_with(|| value.clone());
		}

		Value::Object(document)
	}
}

#[derive(Deserialize)]
struct RegistrationResponseDocument {
	#[serde(default)]
	client_id: Option<String>,
	#[serde(default)]
	client_id_issued_at: Option<i64>,
	#[serde(default)]
	client_secret: Option<ClientSecret>,
	#[serde(default)]
	client_secret_expires_at: Option<i64>,
	#[serde(default)]
	registration_access_token: Option<TokenSecret>,
	#[serde(default)]
	registration_client_uri: Option<Url>,
	#[serde(default)]
	token_endpoint_auth_method: Option<String>,
	#[serde(flatten)]
	additional: BTreeMap<String, Value>,
}

/// Registration endpoint response paired with the request that produced it.
#[derive(Clone, Debug)]
pub struct RegistrationResponse {
	/// Echo of the originating request.
	pub request: RegistrationRequest,
	/// Issued client identifier.
	pub client_id: String,
	/// Issue time of the client identifier (seconds since epoch).
	pub client_id_issued_at: Option<i64>,
	/// Issued client secret.
	pub client_secret: Option<ClientSecret>,
	/// Secret expiry (seconds since epoch, `0` for never).
	pub client_secret_expires_at: Option<i64>,
	/// Token for the client configuration endpoint.
	pub registration_access_token: Option<TokenSecret>,
	/// Client configuration endpoint.
	pub registration_client_uri: Option<Url>,
	/// Authentication method assigned by the server.
	pub token_endpoint_auth_method: Option<String>,
	/// Fields not modeled above.
	pub additional_parameters: BTreeMap<String, Value>,
}
impl RegistrationResponse {
	/// Builds a response from the parsed registration endpoint document.
	///
	/// Type mismatches are reported as [`RegistrationParseError::Malformed`]; missing required
	/// fields as [`RegistrationParseError::Invalid`].
	pub fn from_response_document(
		request: RegistrationRequest,
		document: &ResponseDocument,
	) -> Result<Self, RegistrationParseError> {
		let parsed: RegistrationResponseDocument =
			serde_path_to_error::deserialize(Value::Object(document.clone()))?;
		let client_id =
			parsed.client_id.ok_or(RegistrationResponseError::MissingArgument { field: "client_id" })?;

		if parsed.client_secret.is_some() && parsed.client_secret_expires_at.is_none() {
			return Err(RegistrationResponseError::MissingArgument {
				field: "client_secret_expires_at",
			}
			.into());
		}

		match (&parsed.registration_access_token, &parsed.registration_client_uri) {
			(Some(_), None) =>
				return Err(RegistrationResponseError::MissingArgument {
					field: "registration_client_uri",
				}
				.into()),
			(None, Some(_)) =>
				return Err(RegistrationResponseError::MissingArgument {
					field: "registration_access_token",
				}
				.into()),
			_ => {},
		}

		Ok(Self {
			request,
			client_id,
			client_id_issued_at: parsed.client_id_issued_at,
			client_secret: parsed.client_secret,
			client_secret_expires_at: parsed.client_secret_expires_at,
			registration_access_token: parsed.registration_access_token,
			registration_client_uri: parsed.registration_client_uri,
			token_endpoint_auth_method: parsed.token_endpoint_auth_method,
			additional_parameters: parsed.additional,
		})
	}

	/// Client authentication matching the assigned `token_endpoint_auth_method`.
	///
	/// Servers that omit the method default to `client_secret_basic` (RFC 7591 §2).
	pub fn client_authentication(&self) -> ClientAuthentication {
		let Some(secret) = self.client_secret.clone() else {
			return ClientAuthentication::None;
		};

		match self.token_endpoint_auth_method.as_deref() {
			Some("client_secret_post") => ClientAuthentication::ClientSecretPost(secret),
			Some("none") => ClientAuthentication::None,
			_ => ClientAuthentication::ClientSecretBasic(secret),
		}
	}
}
