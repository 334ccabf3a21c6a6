//! Optional observability helpers for dispatched operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `oauth2_dispatcher.operation` with the
//!   `operation` and `stage` fields, plus debug events for every failure delivered to a callback.
//! - Enable `metrics` to increment the `oauth2_dispatcher_operation_total` counter for every
//!   attempt/success/failure, labeled by `operation` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operation kinds performed by the dispatcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
	/// Authorization request handed to the launcher.
	Authorization,
	/// Token endpoint exchange.
	Token,
	/// Dynamic client registration.
	Registration,
	/// ID token validation against the key set.
	TokenValidation,
}
impl OperationKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationKind::Authorization => "authorization",
			OperationKind::Token => "token",
			OperationKind::Registration => "registration",
			OperationKind::TokenValidation => "token_validation",
		}
	}
}
impl Display for OperationKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationOutcome {
	/// Operation accepted by the dispatcher.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure delivered to the caller.
	Failure,
}
impl OperationOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationOutcome::Attempt => "attempt",
			OperationOutcome::Success => "success",
			OperationOutcome::Failure => "failure",
		}
	}
}
impl Display for OperationOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
