//! Walks through the authorization code flow against a real authorization server.
//!
//! Set `OAUTH2_ISSUER` to a server base URL exposing `/authorize` and `/token`, then paste the
//! redirect URI your browser lands on when prompted.

// std
use std::io::{self, BufRead, Write};
// crates.io
use color_eyre::{Result, eyre::eyre};
use tokio::sync::oneshot;
use url::Url;
// self
use oauth2_dispatcher::{
	auth::ClientAuthentication,
	classify,
	dispatcher::ReqwestDispatcher,
	model::{AuthorizationRequest, RESPONSE_TYPE_CODE, ServiceConfiguration, TokenRequest},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let issuer = std::env::var("OAUTH2_ISSUER").unwrap_or_else(|_| "http://127.0.0.1:8080".into());
	let client_id = std::env::var("OAUTH2_CLIENT_ID").unwrap_or_else(|_| "demo-client".into());
	let configuration = ServiceConfiguration::builder()
		.authorization_endpoint(Url::parse(&format!("{issuer}/authorize"))?)
		.token_endpoint(Url::parse(&format!("{issuer}/token"))?)
		.build()?;
	let request = AuthorizationRequest::builder(
		configuration,
		&client_id,
		RESPONSE_TYPE_CODE,
		Url::parse("http://127.0.0.1:8765/callback")?,
	)
	.scopes(["openid", "profile"])
	.build();
	let dispatcher = ReqwestDispatcher::new()?;

	println!("Open this URL in a browser:\n{}", dispatcher.prepare_authorization_request(&request)?);
	print!("Redirect URI: ");
	io::stdout().flush()?;

	let mut line = String::new();

	io::stdin().lock().read_line(&mut line)?;

	let redirect = Url::parse(line.trim())?;

	if let Some(err) = classify::from_redirect_uri(&redirect) {
		return Err(eyre!("Authorization failed: {err}"));
	}

	let state = redirect.query_pairs().find(|(k, _)| k == "state").map(|(_, v)| v.into_owned());

	if !request.state_matches(state.as_deref()) {
		return Err(eyre!("State mismatch; discarding the response."));
	}

	let code = redirect
		.query_pairs()
		.find(|(k, _)| k == "code")
		.map(|(_, v)| v.into_owned())
		.ok_or_else(|| eyre!("Redirect URI carries no authorization code."))?;
	let (tx, rx) = oneshot::channel();

	dispatcher.perform_token_request(
		TokenRequest::for_authorization_code(&request, code),
		&ClientAuthentication::None,
		move |result| {
			let _ = tx.send(result);
		},
	)?;

	match rx.await? {
		Ok(response) => println!(
			"Received a {} token; ID token present: {}.",
			response.token_type,
			response.id_token.is_some()
		),
		Err(e) => println!("Token exchange failed with `{}`: {e}.", e.code()),
	}

	Ok(())
}
