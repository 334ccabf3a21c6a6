//! Authorization request model and PKCE helpers.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, model::ServiceConfiguration};

const STATE_LEN: usize = 32;
const NONCE_LEN: usize = 32;
const PKCE_VERIFIER_LEN: usize = 64;

/// `response_type` for the authorization code flow.
pub const RESPONSE_TYPE_CODE: &str = "code";

/// Parameter names owned by [`AuthorizationRequest`]; additional parameters cannot override them.
pub const BUILT_IN_PARAMS: [&str; 12] = [
	"client_id",
	"code_challenge",
	"code_challenge_method",
	"display",
	"login_hint",
	"nonce",
	"prompt",
	"redirect_uri",
	"response_mode",
	"response_type",
	"scope",
	"state",
];

/// Supported PKCE challenge methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PkceCodeChallengeMethod {
	/// SHA-256 based PKCE (RFC 7636 S256).
	S256,
}
impl PkceCodeChallengeMethod {
	/// Returns the RFC 7636 identifier for the challenge method.
	pub fn as_str(self) -> &'static str {
		match self {
			PkceCodeChallengeMethod::S256 => "S256",
		}
	}
}

/// PKCE verifier with its derived challenge.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PkcePair {
	/// Secret verifier sent with the token request.
	pub verifier: String,
	/// Challenge sent with the authorization request.
	pub challenge: String,
	/// Challenge derivation method.
	pub method: PkceCodeChallengeMethod,
}
impl PkcePair {
	/// Generates a fresh random verifier.
	pub fn generate() -> Self {
		Self::from_verifier(random_string(PKCE_VERIFIER_LEN))
	}

	/// Derives the S256 challenge for an existing verifier.
	pub fn from_verifier(verifier: impl Into<String>) -> Self {
		let verifier = verifier.into();
		let challenge = compute_pkce_challenge(&verifier);

		Self { verifier, challenge, method: PkceCodeChallengeMethod::S256 }
	}
}
impl Debug for PkcePair {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PkcePair")
			.field("verifier", &"<redacted>")
			.field("challenge", &self.challenge)
			.field("method", &self.method)
			.finish()
	}
}

/// Immutable authorization request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
	/// Authorization server endpoints.
	pub configuration: ServiceConfiguration,
	/// Client identifier.
	pub client_id: String,
	/// Requested `response_type`.
	pub response_type: String,
	/// Redirect URI the server returns to.
	pub redirect_uri: Url,
	/// Space-delimited scope string.
	pub scope: Option<String>,
	/// Opaque `state` value round-tripped through the redirect.
	pub state: Option<String>,
	/// OpenID Connect `nonce` echoed in the ID token.
	pub nonce: Option<String>,
	/// `login_hint`.
	pub login_hint: Option<String>,
	/// `prompt`.
	pub prompt: Option<String>,
	/// `display`.
	pub display: Option<String>,
	/// `response_mode`.
	pub response_mode: Option<String>,
	/// PKCE parameters.
	pub pkce: Option<PkcePair>,
	/// Extra query parameters.
	pub additional_parameters: BTreeMap<String, String>,
}
impl AuthorizationRequest {
	/// Creates a builder with a random `state`, a random `nonce`, and a PKCE verifier.
	pub fn builder(
		configuration: ServiceConfiguration,
		client_id: impl Into<String>,
		response_type: impl Into<String>,
		redirect_uri: Url,
	) -> AuthorizationRequestBuilder {
		AuthorizationRequestBuilder {
			request: AuthorizationRequest {
				configuration,
				client_id: client_id.into(),
				response_type: response_type.into(),
				redirect_uri,
				scope: None,
				state: Some(random_string(STATE_LEN)),
				nonce: Some(random_string(NONCE_LEN)),
				login_hint: None,
				prompt: None,
				display: None,
				response_mode: None,
				pkce: Some(PkcePair::generate()),
				additional_parameters: BTreeMap::new(),
			},
		}
	}

	/// Encodes the request as a URI on the authorization endpoint.
	///
	/// Parameters appear in a fixed order, so equal requests always produce equal URIs.
	pub fn to_uri(&self) -> Url {
		let mut url = self.configuration.authorization_endpoint.clone();
		let mut pairs = url.query_pairs_mut();

		pairs.append_pair("redirect_uri", self.redirect_uri.as_str());
		pairs.append_pair("client_id", &self.client_id);
		pairs.append_pair("response_type", &self.response_type);

		let optional = [
			("state", &self.state),
			("nonce", &self.nonce),
			("login_hint", &self.login_hint),
			("prompt", &self.prompt),
			("display", &self.display),
			("response_mode", &self.response_mode),
			("scope", &self.scope),
		];

		for (key, value) in optional {
			if let Some(value) = value {
				pairs.append_pair(key, value);
			}
		}
		if let Some(pkce) = &self.pkce {
			pairs.append_pair("code_challenge", &pkce.challenge);
			pairs.append_pair("code_challenge_method", pkce.method.as_str());
		}

		for (key, value) in &self.additional_parameters {
			if !BUILT_IN_PARAMS.contains(&key.as_str()) {
				pairs.append_pair(key, value);
			}
		}

		drop(pairs);

		url
	}

	/// Validates the `state` returned on the redirect.
	pub fn state_matches(&self, returned_state: Option<&str>) -> bool {
		self.state.as_deref() == returned_state
	}
}

/// Builder for [`AuthorizationRequest`].
#[derive(Clone, Debug)]
pub struct AuthorizationRequestBuilder {
	request: AuthorizationRequest,
}
impl AuthorizationRequestBuilder {
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

	/// Overrides (or clears) the `state` value.
	pub fn state(mut self, state: Option<String>) -> Self {
		self.request.state = state;

		self
	}

	/// Overrides (or clears) the `nonce` value.
	pub fn nonce(mut self, nonce: Option<String>) -> Self {
		self.request.nonce = nonce;

		self
	}

	/// Sets `login_hint`.
	pub fn login_hint(mut self, hint: impl Into<String>) -> Self {
		self.request.login_hint = Some(hint.into());

		self
	}

	/// Sets `prompt`.
	pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
		self.request.prompt = Some(prompt.into());

		self
	}

	/// Sets `display`.
	pub fn display(mut self, display: impl Into<String>) -> Self {
		self.request.display = Some(display.into());

		self
	}

	/// Sets `response_mode`.
	pub fn response_mode(mut self, mode: impl Into<String>) -> Self {
		self.request.response_mode = Some(mode.into());

		self
	}

	/// Uses the provided PKCE verifier, or disables PKCE with `None`.
	pub fn code_verifier(mut self, verifier: Option<String>) -> Self {
		self.request.pkce = verifier.map(PkcePair::from_verifier);

		self
	}

	/// Adds an extra query parameter. Built-in parameter names are ignored when encoding.
	pub fn additional_parameter(
		mut self,
		key: impl Into<String>,
		value: impl Into<String>,
	) -> Self {
		self.request.additional_parameters.insert(key.into(), value.into());

		self
	}

	/// Finalizes the request.
	pub fn build(self) -> AuthorizationRequest {
		self.request
	}
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

fn compute_pkce_challenge(verifier: &str) -> String {
	let mut hasher = Sha256::new();

	hasher.update(verifier.as_bytes());

	URL_SAFE_NO_PAD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn configuration() -> ServiceConfiguration {
		ServiceConfiguration::builder()
			.authorization_endpoint(
				Url::parse("https://example.com/authorize").expect("Fixture should parse."),
			)
			.token_endpoint(Url::parse("https://example.com/token").expect("Fixture should parse."))
			.build()
			.expect("Fixture configuration should build.")
	}

	fn redirect() -> Url {
		Url::parse("com.example.app:/oauth2redirect").expect("Redirect fixture should parse.")
	}

	#[test]
	fn pkce_challenge_matches_rfc_7636_vector() {
		let pair = PkcePair::from_verifier("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");

		assert_eq!(pair.challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
		assert_eq!(pair.method.as_str(), "S256");
	}

	#[test]
	fn uri_encodes_parameters_deterministically() {
		let request =
			AuthorizationRequest::builder(configuration(), "client-1", RESPONSE_TYPE_CODE, redirect())
				.state(Some("xyz".into()))
				.nonce(Some("n-1".into()))
				.code_verifier(None)
				.scopes(["openid", "email"])
				.additional_parameter("audience", "api")
				.additional_parameter("client_id", "ignored")
				.build();
		let uri = request.to_uri();

		assert_eq!(
			uri.as_str(),
			"https://example.com/authorize?redirect_uri=com.example.app%3A%2Foauth2redirect\
			 &client_id=client-1&response_type=code&state=xyz&nonce=n-1&scope=openid+email\
			 &audience=api"
		);
		assert_eq!(uri, request.to_uri());
	}

	#[test]
	fn builder_generates_state_nonce_and_pkce() {
		let request =
			AuthorizationRequest::builder(configuration(), "client-1", RESPONSE_TYPE_CODE, redirect())
				.build();
		let pkce = request.pkce.as_ref().expect("PKCE should be enabled by default.");

		assert_eq!(request.state.as_ref().map(String::len), Some(STATE_LEN));
		assert_eq!(request.nonce.as_ref().map(String::len), Some(NONCE_LEN));
		assert_eq!(pkce.verifier.len(), PKCE_VERIFIER_LEN);
		assert!(
			request
				.to_uri()
				.query_pairs()
				.any(|(k, v)| k == "code_challenge" && v == pkce.challenge)
		);
		assert!(request.state_matches(request.state.as_deref()));
		assert!(!request.state_matches(Some("other")));
	}

	#[test]
	fn debug_output_redacts_verifier() {
		let pair = PkcePair::from_verifier("very-secret-verifier");

		assert!(!format!("{pair:?}").contains("very-secret-verifier"));
	}
}
