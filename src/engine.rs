//! The invocation engine: precondition gate, bounded retry loop, rate-limited dispatch.
//!
//! [`Invoker::perform`] implements one deterministic control-flow contract for every remote
//! operation: verify the session, then attempt the call up to the policy's budget, pacing each
//! attempt through the shared [`RequestLimiter`] and absorbing every attempt failure. The caller
//! always receives a terminal [`Outcome`]; it never observes a hang or a raw attempt error.

// std
use std::num::NonZeroU8;
// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	descriptor::OperationDescriptor,
	diag::{Diagnostics, TracingDiagnostics},
	error::AttemptError,
	limiter::{self, HostKey, RequestLimiter},
	obs::{self, CallOutcome},
	session::SessionState,
	transport::{PreparedCall, ServiceClient},
};

/// Query argument the engine injects the session credential under.
pub const ACCESS_TOKEN_ARG: &str = "access_token";

/// Bounded retry configuration applied uniformly regardless of failure cause.
///
/// There is no exponential backoff and no jitter: the shared limiter is the primary pacing
/// mechanism and the fixed inter-attempt delay is a secondary guard against retry storms. The
/// policy is stateless and safe to share across concurrent invocations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Maximum number of transport attempts per invocation.
	pub max_attempts: NonZeroU8,
	/// Fixed pause inserted before every attempt after the first.
	pub inter_attempt_delay: Duration,
}
impl RetryPolicy {
	/// Default attempt budget.
	pub const DEFAULT_MAX_ATTEMPTS: NonZeroU8 = match NonZeroU8::new(5) {
		Some(value) => value,
		None => unreachable!(),
	};

	/// Creates a policy with the given attempt budget and no inter-attempt delay.
	pub const fn new(max_attempts: NonZeroU8) -> Self {
		Self { max_attempts, inter_attempt_delay: Duration::ZERO }
	}

	/// Overrides the inter-attempt delay.
	pub const fn with_delay(mut self, delay: Duration) -> Self {
		self.inter_attempt_delay = delay;

		self
	}

	/// Returns `true` when the engine should pause before the zero-based attempt index.
	pub const fn should_delay_before(&self, attempt: u8) -> bool {
		attempt > 0 && !self.inter_attempt_delay.is_zero()
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self::new(Self::DEFAULT_MAX_ATTEMPTS)
	}
}

/// Terminal result of one invocation.
///
/// `Exhausted` deliberately carries no detail: the engine does not classify why attempts failed
/// beyond the cancellation/other split used for log severity, because the remote service's
/// application-level rejection reasons are opaque to this layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome<R> {
	/// The precondition gate failed; no attempt was made and nothing was logged.
	Unavailable,
	/// A fully-formed response decoded from the first successful attempt.
	Success(R),
	/// Every configured attempt failed.
	Exhausted,
}
impl<R> Outcome<R> {
	/// Returns the response payload, if the invocation succeeded.
	pub fn into_success(self) -> Option<R> {
		match self {
			Outcome::Success(response) => Some(response),
			_ => None,
		}
	}

	/// Returns `true` for [`Outcome::Success`].
	pub const fn is_success(&self) -> bool {
		matches!(self, Outcome::Success(_))
	}

	/// Returns `true` for [`Outcome::Unavailable`].
	pub const fn is_unavailable(&self) -> bool {
		matches!(self, Outcome::Unavailable)
	}

	/// Returns `true` for [`Outcome::Exhausted`].
	pub const fn is_exhausted(&self) -> bool {
		matches!(self, Outcome::Exhausted)
	}

	const fn as_label(&self) -> CallOutcome {
		match self {
			Outcome::Unavailable => CallOutcome::Unavailable,
			Outcome::Success(_) => CallOutcome::Success,
			Outcome::Exhausted => CallOutcome::Exhausted,
		}
	}
}

/// Invocation configuration surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvokerConfig {
	/// Retry policy shared by every operation.
	pub policy: RetryPolicy,
	/// Per-attempt transport deadline.
	pub timeout: Duration,
	/// Emits a per-attempt debug trace of method + URL when set.
	pub verbose_debug: bool,
}
impl InvokerConfig {
	/// Default per-attempt deadline.
	pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
	/// Environment variable consulted by [`InvokerConfig::from_env`].
	pub const VERBOSE_DEBUG_ENV: &'static str = "WEBAPI_COURIER_DEBUG";

	/// Builds the default configuration with the verbose-debug flag read from the environment.
	///
	/// Any value other than `0` under [`Self::VERBOSE_DEBUG_ENV`] enables per-attempt traces.
	pub fn from_env() -> Self {
		let verbose_debug =
			std::env::var_os(Self::VERBOSE_DEBUG_ENV).is_some_and(|value| value != "0");

		Self { verbose_debug, ..Self::default() }
	}

	/// Overrides the retry policy.
	pub const fn with_policy(mut self, policy: RetryPolicy) -> Self {
		self.policy = policy;

		self
	}

	/// Overrides the per-attempt deadline.
	pub const fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Overrides the verbose-debug flag.
	pub const fn with_verbose_debug(mut self, verbose_debug: bool) -> Self {
		self.verbose_debug = verbose_debug;

		self
	}
}
impl Default for InvokerConfig {
	fn default() -> Self {
		Self { policy: RetryPolicy::default(), timeout: Self::DEFAULT_TIMEOUT, verbose_debug: false }
	}
}

/// Orchestrates authenticated operations against a single service base address.
///
/// The invoker owns `Arc` handles to its collaborators so concurrent invocations can share one
/// engine; it holds no per-call state itself. Each invocation is a single cooperative task whose
/// only suspension points are the inter-attempt delay and the rate-limited transport call.
pub struct Invoker<C>
where
	C: ?Sized + ServiceClient,
{
	/// Transport used for every attempt.
	pub client: Arc<C>,
	/// Session provider consulted by the precondition gate.
	pub session: Arc<dyn SessionState>,
	/// Shared pacing mechanism keyed by the service host.
	pub limiter: Arc<dyn RequestLimiter>,
	/// Diagnostics sink receiving per-attempt traces and failure reports.
	pub diagnostics: Arc<dyn Diagnostics>,
	base: Url,
	host_key: HostKey,
	config: InvokerConfig,
}
impl<C> Invoker<C>
where
	C: ?Sized + ServiceClient,
{
	/// Creates an invoker reusing caller-provided collaborators.
	///
	/// The base address is normalized to end with a trailing slash so operation paths extend it
	/// instead of replacing its last segment.
	pub fn with_client(
		mut base: Url,
		client: impl Into<Arc<C>>,
		session: Arc<dyn SessionState>,
		limiter: Arc<dyn RequestLimiter>,
	) -> Self {
		if !base.path().ends_with('/') {
			let path = format!("{}/", base.path());

			base.set_path(&path);
		}

		let host_key = HostKey::from_url(&base);

		Self {
			client: client.into(),
			session,
			limiter,
			diagnostics: Arc::new(TracingDiagnostics),
			base,
			host_key,
			config: InvokerConfig::default(),
		}
	}

	/// Sets or replaces the invocation configuration.
	pub fn with_config(mut self, config: InvokerConfig) -> Self {
		self.config = config;

		self
	}

	/// Sets or replaces the diagnostics sink.
	pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
		self.diagnostics = diagnostics;

		self
	}

	/// Service base address every operation path is resolved against.
	pub fn base(&self) -> &Url {
		&self.base
	}

	/// Current invocation configuration.
	pub fn config(&self) -> &InvokerConfig {
		&self.config
	}

	/// Performs one remote operation under the full invocation contract.
	///
	/// Returns `Err` only for fail-fast configuration problems (an unresolvable base address);
	/// every network-level failure is absorbed into the returned [`Outcome`]. The precondition
	/// gate runs first: a session that is not ready or has no credential resolves to
	/// [`Outcome::Unavailable`] with zero attempts consumed and nothing logged.
	pub async fn perform<R>(&self, descriptor: &OperationDescriptor) -> Result<Outcome<R>>
	where
		R: DeserializeOwned,
	{
		obs::record_call_outcome(descriptor.endpoint(), CallOutcome::Attempt);

		let outcome = self.perform_inner(descriptor).await?;

		obs::record_call_outcome(descriptor.endpoint(), outcome.as_label());

		Ok(outcome)
	}

	async fn perform_inner<R>(&self, descriptor: &OperationDescriptor) -> Result<Outcome<R>>
	where
		R: DeserializeOwned,
	{
		if !self.session.is_ready() {
			return Ok(Outcome::Unavailable);
		}

		let Some(token) = self.session.access_token() else {
			return Ok(Outcome::Unavailable);
		};

		if token.is_empty() {
			return Ok(Outcome::Unavailable);
		}

		let descriptor = descriptor.with_aux_arg(ACCESS_TOKEN_ARG, token.expose());
		let policy = self.config.policy;

		// Resolved once; the only fallible step that may reach the caller as `Err`.
		let template = PreparedCall::new(&self.base, &descriptor, self.config.timeout)?;

		for attempt in 0..policy.max_attempts.get() {
			if policy.should_delay_before(attempt) {
				tokio::time::sleep(policy.inter_attempt_delay).await;
			}
			if self.config.verbose_debug {
				self.diagnostics
					.debug(&format!("{} {}", template.method, template.url));
			}

			let call = template.clone();
			let result = async {
				let body = limiter::run_under_limit(
					self.limiter.as_ref(),
					&self.host_key,
					self.client.invoke(call),
				)
				.await?;

				decode::<R>(&body)
			}
			.await;

			match result {
				Ok(response) => return Ok(Outcome::Success(response)),
				Err(err) if err.is_cancellation() => {
					self.diagnostics.debug(&format!(
						"Attempt against {} was cancelled: {err}",
						descriptor.endpoint()
					));
				},
				Err(err) => {
					self.diagnostics.warn(&format!(
						"Attempt against {} failed: {}",
						descriptor.endpoint(),
						describe(&err)
					));
				},
			}
		}

		self.diagnostics.warn(&format!(
			"Request to {} failed after {} attempts.",
			descriptor.endpoint(),
			policy.max_attempts
		));

		Ok(Outcome::Exhausted)
	}
}
// Not derived; `Arc` fields clone without requiring `C: Clone`.
impl<C> Clone for Invoker<C>
where
	C: ?Sized + ServiceClient,
{
	fn clone(&self) -> Self {
		Self {
			client: self.client.clone(),
			session: self.session.clone(),
			limiter: self.limiter.clone(),
			diagnostics: self.diagnostics.clone(),
			base: self.base.clone(),
			host_key: self.host_key.clone(),
			config: self.config.clone(),
		}
	}
}
impl<C> Debug for Invoker<C>
where
	C: ?Sized + ServiceClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Invoker")
			.field("base", &self.base.as_str())
			.field("host_key", &self.host_key)
			.field("config", &self.config)
			.finish()
	}
}

fn decode<R>(body: &[u8]) -> Result<R, AttemptError>
where
	R: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| AttemptError::Decode { source })
}

fn describe(err: &AttemptError) -> String {
	match err.source() {
		Some(source) => format!("{err} ({source})"),
		None => err.to_string(),
	}
}
