//! Diagnostics sink contracts used by the invocation engine.
//!
//! The sink is fire-and-forget: implementations must never block the caller and never affect
//! control flow. The engine routes expected events (per-attempt traces, cancellations) to
//! [`debug`](Diagnostics::debug) and unexpected ones (attempt failures, exhaustion summaries) to
//! [`warn`](Diagnostics::warn).

/// Fire-and-forget diagnostics sink consumed by the engine.
pub trait Diagnostics: Send + Sync {
	/// Records an expected, low-severity event.
	fn debug(&self, message: &str);

	/// Records an unexpected event worth operator attention.
	fn warn(&self, message: &str);
}

/// Sink forwarding to the `tracing` ecosystem when the feature is enabled, and discarding
/// events otherwise.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingDiagnostics;
impl Diagnostics for TracingDiagnostics {
	fn debug(&self, message: &str) {
		#[cfg(feature = "tracing")]
		{
			tracing::debug!(target: "webapi_courier", "{message}");
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = message;
		}
	}

	fn warn(&self, message: &str) {
		#[cfg(feature = "tracing")]
		{
			tracing::warn!(target: "webapi_courier", "{message}");
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = message;
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn tracing_sink_noop_without_feature() {
		let sink = TracingDiagnostics;

		sink.debug("debug event");
		sink.warn("warn event");
	}
}
