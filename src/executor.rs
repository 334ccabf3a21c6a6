//! Single request/response cycles against authorization server endpoints.
//!
//! Every exchange follows the same shape: open a channel through the [`ConnectionFactory`], send
//! one request, read the body whatever the HTTP status, and parse it as a JSON object. Servers
//! report OAuth errors in non-2xx bodies, so the status never short-circuits parsing.

// crates.io
use oauth2::{
	AsyncHttpClient,
	http::{
		Method, Request,
		header::{ACCEPT, CONTENT_TYPE},
	},
};
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	auth::ClientAuthentication,
	classify::{self, OAuthEndpoint},
	error::{AuthorizationError, GeneralError},
	http::{ConnectionFactory, TransportErrorMapper},
	model::{
		RegistrationParseError, RegistrationRequest, RegistrationResponse, TokenRequest,
		TokenResponse,
	},
};

/// Parsed JSON object returned by an endpoint.
pub type ResponseDocument = Map<String, Value>;

const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";
const CONTENT_TYPE_JSON: &str = "application/json";

/// Body of an outbound request.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestBody {
	/// No body (GET).
	Empty,
	/// `application/x-www-form-urlencoded` fields.
	Form(BTreeMap<String, String>),
	/// JSON document.
	Json(Value),
}

/// Fully resolved outbound request.
#[derive(Clone, Debug, PartialEq)]
pub struct OutboundRequest {
	/// Endpoint label used in errors and spans.
	pub label: &'static str,
	/// HTTP method.
	pub method: Method,
	/// Target endpoint.
	pub endpoint: Url,
	/// Extra headers.
	pub headers: BTreeMap<String, String>,
	/// Request body.
	pub body: RequestBody,
}

/// Status and parsed body of a completed exchange.
#[derive(Clone, Debug)]
pub struct ParsedResponse {
	/// HTTP status code.
	pub status: u16,
	/// Parsed JSON object.
	pub document: ResponseDocument,
}

/// Builds the token endpoint form and headers for `request` authenticated with `auth`.
///
/// The strategy's parameters are merged over the request's own parameters, so strategy values
/// win on key collisions.
pub fn token_wire_form(
	request: &TokenRequest,
	auth: &ClientAuthentication,
) -> (BTreeMap<String, String>, BTreeMap<String, String>) {
	merge_client_authentication(request.request_parameters(), auth, &request.client_id)
}

/// Merges a client authentication strategy into an outgoing form.
///
/// Returns `(headers, form)`.
pub fn merge_client_authentication(
	mut form: BTreeMap<String, String>,
	auth: &ClientAuthentication,
	client_id: &str,
) -> (BTreeMap<String, String>, BTreeMap<String, String>) {
	let headers = auth.request_headers(client_id).unwrap_or_default();

	if let Some(params) = auth.request_parameters(client_id) {
		form.extend(params);
	}

	(headers, form)
}

/// Executes requests through a [`ConnectionFactory`] and classifies failures.
pub struct RequestExecutor<C, M>
where
	C: ?Sized + ConnectionFactory,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	connections: Arc<C>,
	mapper: Arc<M>,
}
impl<C, M> RequestExecutor<C, M>
where
	C: ?Sized + ConnectionFactory,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates an executor over the provided factory and mapper.
	pub fn new(connections: impl Into<Arc<C>>, mapper: impl Into<Arc<M>>) -> Self {
		Self { connections: connections.into(), mapper: mapper.into() }
	}

	/// Runs one request/response cycle and parses the body as a JSON object.
	pub async fn execute(
		&self,
		request: OutboundRequest,
	) -> Result<ParsedResponse, AuthorizationError> {
		let OutboundRequest { label, method, endpoint, headers, body } = request;
		let mut builder = Request::builder()
			.method(method)
			.uri(endpoint.as_str())
			.header(ACCEPT, CONTENT_TYPE_JSON);
		let payload = match body {
			RequestBody::Empty => Vec::new(),
			RequestBody::Form(form) => {
				builder = builder.header(CONTENT_TYPE, CONTENT_TYPE_FORM);

				form_urlencoded::Serializer::new(String::new())
					.extend_pairs(form.iter())
					.finish()
					.into_bytes()
			},
			RequestBody::Json(document) => {
				builder = builder.header(CONTENT_TYPE, CONTENT_TYPE_JSON);

				document.to_string().into_bytes()
			},
		};

		for (name, value) in &headers {
			builder = builder.header(name.as_str(), value.as_str());
		}

		let http_request = builder
			.body(payload)
			.map_err(|source| GeneralError::InvalidRequest { endpoint: label, source })?;
		let channel = self.connections.open(&endpoint);
		let response = channel
			.call(http_request)
			.await
			.map_err(|e| self.mapper.map_transport_error(label, e))?;
		let status = response.status().as_u16();
		let document = serde_path_to_error::deserialize::<_, ResponseDocument>(
			&mut serde_json::Deserializer::from_slice(response.body()),
		)
		.map_err(|source| GeneralError::MalformedResponse {
			endpoint: label,
			source,
			status: Some(status),
		})?;

		Ok(ParsedResponse { status, document })
	}

	/// Exchanges a grant at the token endpoint.
	pub async fn exchange_token(
		&self,
		request: TokenRequest,
		auth: &ClientAuthentication,
	) -> Result<TokenResponse, AuthorizationError> {
		const ENDPOINT: OAuthEndpoint = OAuthEndpoint::Token;

		let (headers, form) = token_wire_form(&request, auth);
		let parsed = self
			.execute(OutboundRequest {
				label: ENDPOINT.as_str(),
				method: Method::POST,
				endpoint: request.configuration.token_endpoint.clone(),
				headers,
				body: RequestBody::Form(form),
			})
			.await?;

		if let Some(err) = classify::from_document(ENDPOINT, &parsed.document, Some(parsed.status))
		{
			return Err(err);
		}

		TokenResponse::from_response_document(request, &parsed.document).map_err(|source| {
			GeneralError::MalformedResponse {
				endpoint: ENDPOINT.as_str(),
				source,
				status: Some(parsed.status),
			}
			.into()
		})
	}

	/// Registers a client at the registration endpoint.
	///
	/// `endpoint` must be the request configuration's registration endpoint.
	pub async fn register_client(
		&self,
		request: RegistrationRequest,
		endpoint: Url,
	) -> Result<RegistrationResponse, AuthorizationError> {
		const ENDPOINT: OAuthEndpoint = OAuthEndpoint::Registration;

		let parsed = self
			.execute(OutboundRequest {
				label: ENDPOINT.as_str(),
				method: Method::POST,
				endpoint,
				headers: BTreeMap::new(),
				body: RequestBody::Json(request.to_document()),
			})
			.await?;

		if let Some(err) = classify::from_document(ENDPOINT, &parsed.document, Some(parsed.status))
		{
			return Err(err);
		}

		RegistrationResponse::from_response_document(request, &parsed.document).map_err(|err| {
			match err {
				RegistrationParseError::Malformed(source) => GeneralError::MalformedResponse {
					endpoint: ENDPOINT.as_str(),
					source,
					status: Some(parsed.status),
				},
				RegistrationParseError::Invalid(invalid) =>
					GeneralError::InvalidRegistrationResponse(invalid),
			}
			.into()
		})
	}

	/// Fetches the JSON Web Key Set document.
	///
	/// The key-set endpoint is public, so no client credentials are attached.
	pub async fn fetch_key_set(
		&self,
		endpoint: Url,
	) -> Result<ResponseDocument, AuthorizationError> {
		self.execute(OutboundRequest {
			label: "key set",
			method: Method::GET,
			endpoint,
			headers: BTreeMap::new(),
			body: RequestBody::Empty,
		})
		.await
		.map(|parsed| parsed.document)
	}
}
