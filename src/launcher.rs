//! External launcher contract for the browser step of the authorization flow.
//!
//! The dispatcher never renders anything itself. It resolves the authorization request URI and
//! hands it to an [`AuthorizationLauncher`] together with the targets that should receive the
//! eventual redirect or cancellation.

// std
use std::ops::Deref;
// self
use crate::{_prelude::*, error::BoxError};

const TARGET_MAX_LEN: usize = 256;

/// Error returned when a [`LaunchTarget`] fails validation.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum LaunchTargetError {
	/// The target was empty.
	#[error("Launch target cannot be empty.")]
	Empty,
	/// The target contains whitespace characters.
	#[error("Launch target contains whitespace.")]
	ContainsWhitespace,
	/// The target exceeded the allowed length.
	#[error("Launch target exceeds {max} bytes.")]
	TooLong {
		/// Maximum permitted length.
		max: usize,
	},
}

/// Opaque identifier of where the launcher delivers a completion or cancellation.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LaunchTarget(String);
impl LaunchTarget {
	/// Creates a target after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, LaunchTargetError> {
		let view = value.as_ref();

		validate_view(view)?;

		Ok(Self(view.to_owned()))
	}
}
impl Deref for LaunchTarget {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for LaunchTarget {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl From<LaunchTarget> for String {
	fn from(value: LaunchTarget) -> Self {
		value.0
	}
}
impl TryFrom<String> for LaunchTarget {
	type Error = LaunchTargetError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate_view(&value)?;

		Ok(Self(value))
	}
}
impl Debug for LaunchTarget {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "LaunchTarget({})", self.0)
	}
}
impl Display for LaunchTarget {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl FromStr for LaunchTarget {
	type Err = LaunchTargetError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

fn validate_view(view: &str) -> Result<(), LaunchTargetError> {
	if view.is_empty() {
		return Err(LaunchTargetError::Empty);
	}
	if view.chars().any(char::is_whitespace) {
		return Err(LaunchTargetError::ContainsWhitespace);
	}
	if view.len() > TARGET_MAX_LEN {
		return Err(LaunchTargetError::TooLong { max: TARGET_MAX_LEN });
	}

	Ok(())
}

/// Title bar treatment requested from the launcher.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TitleVisibility {
	/// Launcher default.
	#[default]
	Default,
	/// Hide the page title.
	Hidden,
}

/// Presentation options forwarded to the launcher.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LaunchConfig {
	/// Toolbar color hint, e.g. `#336699`.
	pub toolbar_color: Option<String>,
	/// Whether the launcher may hide the URL bar while scrolling.
	pub url_bar_hiding: bool,
	/// Launcher-specific hints.
	pub hints: BTreeMap<String, String>,
}
impl LaunchConfig {
	/// Sets the toolbar color hint.
	pub fn with_toolbar_color(mut self, color: impl Into<String>) -> Self {
		self.toolbar_color = Some(color.into());

		self
	}

	/// Allows the launcher to hide the URL bar.
	pub fn with_url_bar_hiding(mut self, enabled: bool) -> Self {
		self.url_bar_hiding = enabled;

		self
	}

	/// Adds a launcher-specific hint.
	pub fn with_hint(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.hints.insert(key.into(), value.into());

		self
	}
}

/// Everything a launcher needs to present one authorization request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorizationLaunch {
	/// Fully encoded authorization request URI.
	pub request_uri: Url,
	/// Title bar treatment.
	pub title_visibility: TitleVisibility,
	/// Where the authorization response is delivered.
	pub completion: LaunchTarget,
	/// Where a user cancellation is delivered, if anywhere.
	pub cancellation: Option<LaunchTarget>,
	/// Presentation options.
	pub config: LaunchConfig,
}

/// Collaborator that presents the authorization request to the user.
///
/// A launcher is bound once when it is installed on a dispatcher and unbound once when the
/// dispatcher is disposed. `launch` must return promptly; the user interaction completes later
/// through the launch targets.
pub trait AuthorizationLauncher
where
	Self: 'static + Send + Sync,
{
	/// Whether a capable launcher is available right now.
	fn is_available(&self) -> bool {
		true
	}

	/// Acquires any resources that speed up later launches.
	fn bind(&self) {}

	/// Releases resources acquired by [`AuthorizationLauncher::bind`].
	fn unbind(&self) {}

	/// Presents `launch` to the user.
	fn launch(&self, launch: AuthorizationLaunch) -> Result<(), BoxError>;
}
