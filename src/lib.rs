//! Async OAuth 2.0 / OpenID Connect request dispatcher: token exchange, dynamic client
//! registration, and ID token checks, with every wire failure folded into one error taxonomy.
//!
//! Start with [`dispatcher::AuthorizationDispatcher`]. Requests are modeled in [`model`], client
//! authentication strategies live in [`auth`], and all asynchronous failures arrive as
//! [`error::AuthorizationError`].

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod classify;
pub mod delivery;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod http;
pub mod launcher;
pub mod model;
pub mod obs;
pub mod validate;

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::{Map, Value, json};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
