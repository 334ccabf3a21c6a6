//! ID token checks against a fetched JSON Web Key Set.
//!
//! Validation is a yes/no answer. The token's header and payload are decoded, a key whose `alg`
//! matches the header is selected from the key set, and the key id, audience, expiry, and nonce
//! are compared. The signature segment is not verified; callers that need cryptographic
//! assurance must verify it with a JOSE library before trusting any claim.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*, error::AuthorizationError, executor::ResponseDocument, model::TokenResponse,
};

/// Result delivered by token validation.
///
/// `error` is only set when the key set could not be fetched or parsed; an invalid token alone is
/// reported through `is_valid`.
#[derive(Debug)]
pub struct ValidationOutcome {
	/// Whether every check passed.
	pub is_valid: bool,
	/// Failure raised while fetching the key set.
	pub error: Option<AuthorizationError>,
}
impl ValidationOutcome {
	/// Outcome of a completed check.
	pub fn checked(is_valid: bool) -> Self {
		Self { is_valid, error: None }
	}

	/// Outcome of a key-set fetch failure.
	pub fn failed(error: AuthorizationError) -> Self {
		Self { is_valid: false, error: Some(error) }
	}
}

/// One entry of a JSON Web Key Set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonWebKey {
	/// Key id.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub kid: Option<String>,
	/// Algorithm the key is intended for.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub alg: Option<String>,
	/// Key type.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub kty: Option<String>,
	/// Key material and remaining members.
	#[serde(flatten)]
	pub parameters: BTreeMap<String, Value>,
}

/// JSON Web Key Set document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySet {
	/// Published keys.
	#[serde(default)]
	pub keys: Vec<JsonWebKey>,
	/// Error reported by the key-set endpoint instead of keys.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}
impl KeySet {
	/// Parses a fetched key-set document.
	pub fn from_document(
		document: &ResponseDocument,
	) -> Result<Self, serde_path_to_error::Error<serde_json::Error>> {
		serde_path_to_error::deserialize(Value::Object(document.clone()))
	}

	/// First key whose `alg` contains `alg`.
	///
	/// Keys without an `alg` member never match.
	pub fn key_for_alg(&self, alg: &str) -> Option<&JsonWebKey> {
		self.keys
			.iter()
			.find(|key| key.alg.as_deref().is_some_and(|key_alg| key_alg.contains(alg)))
	}
}

#[derive(Debug, Deserialize)]
struct IdTokenHeader {
	alg: String,
	#[serde(default)]
	kid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
	#[serde(default)]
	aud: Option<String>,
	#[serde(default)]
	exp: Option<EpochSeconds>,
	#[serde(default)]
	nonce: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EpochSeconds {
	Integer(i64),
	Float(f64),
	Text(String),
}
impl EpochSeconds {
	fn get(&self) -> Option<i64> {
		match self {
			Self::Integer(secs) => Some(*secs),
			Self::Float(secs) if secs.is_finite() => Some(secs.trunc() as i64),
			Self::Float(_) => None,
			Self::Text(text) => text.trim().parse().ok(),
		}
	}
}

#[derive(Debug, ThisError)]
enum Rejection {
	#[error("Key-set endpoint reported `{0}`.")]
	KeySetError(String),
	#[error("Key set could not be parsed.")]
	KeySet,
	#[error("Token response carries no ID token.")]
	MissingIdToken,
	#[error("ID token is not a three-part compact serialization.")]
	Shape,
	#[error("ID token {0} segment could not be decoded.")]
	Segment(&'static str),
	#[error("No key matches algorithm `{0}`.")]
	NoKeyForAlg(String),
	#[error("Key id does not match the token header.")]
	KeyId,
	#[error("Audience does not match the client id.")]
	Audience,
	#[error("Token is expired or carries no expiry.")]
	Expired,
	#[error("Nonce does not match the authorization request.")]
	Nonce,
}

/// Checks the ID token of `response` against `key_set` at the current time.
///
/// The expected audience is the request's client id and the expected nonce is the one carried by
/// the originating token request.
pub fn validate_token_response(key_set: &ResponseDocument, response: &TokenResponse) -> bool {
	validate_token_response_at(key_set, response, OffsetDateTime::now_utc())
}

/// Same as [`validate_token_response`] with an explicit clock.
pub fn validate_token_response_at(
	key_set: &ResponseDocument,
	response: &TokenResponse,
	now: OffsetDateTime,
) -> bool {
	let result = response.id_token.as_deref().ok_or(Rejection::MissingIdToken).and_then(|token| {
		inspect(
			key_set,
			token,
			&response.request.client_id,
			response.request.nonce.as_deref(),
			now,
		)
	});

	settle(result)
}

/// Checks a compact-serialized ID token against `key_set`.
///
/// Returns `false` on any decoding failure or failed comparison.
pub fn validate_id_token_at(
	key_set: &ResponseDocument,
	id_token: &str,
	client_id: &str,
	expected_nonce: Option<&str>,
	now: OffsetDateTime,
) -> bool {
	settle(inspect(key_set, id_token, client_id, expected_nonce, now))
}

fn settle(result: Result<(), Rejection>) -> bool {
	match result {
		Ok(()) => true,
		Err(_rejection) => {
			#[cfg(feature = "tracing")]
			tracing::debug!(reason = %_rejection, "ID token rejected.");

			false
		},
	}
}

fn inspect(
	key_set: &ResponseDocument,
	id_token: &str,
	client_id: &str,
	expected_nonce: Option<&str>,
	now: OffsetDateTime,
) -> Result<(), Rejection> {
	let key_set = KeySet::from_document(key_set).map_err(|_| Rejection::KeySet)?;

	if let Some(error) = key_set.error.as_deref().filter(|e| !e.is_empty()) {
		return Err(Rejection::KeySetError(error.to_owned()));
	}

	let mut segments = id_token.split('.');
	let (Some(header), Some(payload), Some(_signature), None) =
		(segments.next(), segments.next(), segments.next(), segments.next())
	else {
		return Err(Rejection::Shape);
	};
	let header: IdTokenHeader = decode_segment(header).ok_or(Rejection::Segment("header"))?;
	let claims: IdTokenClaims = decode_segment(payload).ok_or(Rejection::Segment("payload"))?;
	let key = key_set
		.key_for_alg(&header.alg)
		.ok_or_else(|| Rejection::NoKeyForAlg(header.alg.clone()))?;

	match (&key.kid, &header.kid) {
		(Some(key_kid), Some(header_kid)) if key_kid == header_kid => {},
		_ => return Err(Rejection::KeyId),
	}

	if claims.aud.as_deref() != Some(client_id) {
		return Err(Rejection::Audience);
	}

	match claims.exp.as_ref().and_then(EpochSeconds::get) {
		Some(exp) if exp > now.unix_timestamp() => {},
		_ => return Err(Rejection::Expired),
	}

	match (claims.nonce.as_deref(), expected_nonce) {
		(Some(nonce), Some(expected)) if nonce == expected => Ok(()),
		_ => Err(Rejection::Nonce),
	}
}

fn decode_segment<T>(segment: &str) -> Option<T>
where
	T: DeserializeOwned,
{
	let bytes = URL_SAFE_NO_PAD.decode(segment).ok()?;

	serde_json::from_slice(&bytes).ok()
}
