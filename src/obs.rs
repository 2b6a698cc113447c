//! Optional observability helpers for courier invocations.
//!
//! # Feature Flags
//!
//! - Enable `metrics` to increment the `webapi_courier_call_total` counter for every
//!   attempt/success/unavailable/exhausted resolution, labeled by `endpoint` + `outcome`.
//! - Enable `tracing` to route the engine's [`Diagnostics`](crate::diag::Diagnostics) events
//!   through the `tracing` ecosystem via [`TracingDiagnostics`](crate::diag::TracingDiagnostics).

// self
use crate::_prelude::*;

/// Invocation outcome labels recorded per call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallOutcome {
	/// Entry to the engine.
	Attempt,
	/// Precondition gate failed before any attempt.
	Unavailable,
	/// A response was decoded successfully.
	Success,
	/// The full retry budget was consumed without success.
	Exhausted,
}
impl CallOutcome {
	/// Returns a stable label suitable for metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallOutcome::Attempt => "attempt",
			CallOutcome::Unavailable => "unavailable",
			CallOutcome::Success => "success",
			CallOutcome::Exhausted => "exhausted",
		}
	}
}
impl Display for CallOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Records a call outcome via the global metrics recorder (when enabled).
pub fn record_call_outcome(endpoint: &str, outcome: CallOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"webapi_courier_call_total",
			"endpoint" => endpoint.to_owned(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (endpoint, outcome);
	}
}
