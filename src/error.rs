//! Courier-level error types shared across descriptors, transports, and operations.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical courier error exposed by public APIs.
///
/// Only fail-fast configuration problems reach callers as `Err`. Attempt-level failures are
/// absorbed by the invocation engine and surface as [`Outcome`](crate::engine::Outcome) variants
/// instead, so callers never need to match on transport errors to use this layer correctly.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration or validation problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
}

/// Configuration and validation failures raised before any network attempt.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// An operation field that must be non-empty was empty.
	#[error("Operation {field} cannot be empty.")]
	EmptyField {
		/// Name of the offending field.
		field: &'static str,
	},
	/// An operation field that must be non-zero was zero.
	#[error("Operation {field} must be non-zero.")]
	ZeroField {
		/// Name of the offending field.
		field: &'static str,
	},
	/// Request payload could not be serialized to JSON.
	#[error("Request payload could not be encoded.")]
	PayloadEncode {
		/// Structured serialization failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Service base address cannot be extended with the operation path.
	#[error("Service base address cannot be joined with the operation path.")]
	InvalidBaseAddress {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
}

/// Failure classification for a single transport attempt.
///
/// Values of this type never escape the engine's retry loop; the distinction between
/// [`Cancelled`](AttemptError::Cancelled) and everything else only controls whether the attempt
/// is reported at debug or warning severity before the next attempt begins.
#[derive(Debug, ThisError)]
pub enum AttemptError {
	/// The attempt was aborted by a timeout or an external cancellation signal.
	#[error("Request was cancelled before the service responded.")]
	Cancelled,
	/// The underlying transport failed (DNS, TCP, TLS, protocol).
	#[error("Transport failed while calling the service.")]
	Transport {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The service answered with a non-success HTTP status.
	#[error("Service answered HTTP {status} instead of a success status.")]
	Status {
		/// HTTP status code returned by the service.
		status: u16,
	},
	/// The service answered with a body that could not be decoded.
	#[error("Service returned a response body that could not be decoded.")]
	Decode {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl AttemptError {
	/// Wraps a transport-specific network error.
	pub fn transport(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Transport { source: Box::new(src) }
	}

	/// Returns `true` when the attempt was aborted rather than rejected.
	pub const fn is_cancellation(&self) -> bool {
		matches!(self, Self::Cancelled)
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for AttemptError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Cancelled } else { Self::transport(e) }
	}
}
