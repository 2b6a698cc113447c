//! Rate limiting contracts and the default fixed-interval paced limiter.
//!
//! The limiter is the only state shared across invocations. It is injected as a trait object so
//! tests can substitute a deterministic fake, and it is keyed by [`HostKey`] (scheme + host +
//! port of the service base address) so concurrent callers invoking different operations against
//! the same remote host still share one budget.

// std
use std::{any::Any, collections::HashMap, time::Instant};
// crates.io
use async_lock::{Mutex as AsyncMutex, Semaphore};
use parking_lot::Mutex;
// self
use crate::_prelude::*;

/// Boxed future returned by [`RequestLimiter::begin`].
pub type PermitFuture<'a> = Pin<Box<dyn Future<Output = LimiterPermit> + 'a + Send>>;

/// Cross-caller pacing contract keyed by target host.
///
/// Implementations pace the start of concurrent calls sharing a key; they never fail, never
/// inspect the guarded operation, and add no failure modes of their own. Pacing state must be
/// updated atomically with respect to concurrent callers.
pub trait RequestLimiter: Send + Sync {
	/// Waits until the next call for `key` may start.
	///
	/// The returned permit must stay alive for the duration of the guarded call so in-flight
	/// budgets remain enforceable.
	fn begin<'a>(&'a self, key: &'a HostKey) -> PermitFuture<'a>;
}

/// Runs `op` under the limiter's budget for `key`, propagating its output unchanged.
pub async fn run_under_limit<T, F>(limiter: &dyn RequestLimiter, key: &HostKey, op: F) -> T
where
	F: Future<Output = T>,
{
	let _permit = limiter.begin(key).await;

	op.await
}

/// Opaque in-flight permit; dropping it returns the slot to the limiter.
pub struct LimiterPermit {
	_guard: Option<Box<dyn Any + Send>>,
}
impl LimiterPermit {
	/// Permit that tracks nothing, for limiters without an in-flight budget.
	pub fn unrestricted() -> Self {
		Self { _guard: None }
	}

	/// Permit tied to an implementation-specific guard released on drop.
	pub fn with_guard(guard: impl Any + Send) -> Self {
		Self { _guard: Some(Box::new(guard)) }
	}
}
impl Debug for LimiterPermit {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("LimiterPermit(..)")
	}
}

/// Identifier grouping calls that share one remote budget.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HostKey(String);
impl HostKey {
	/// Wraps a caller-chosen key string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Derives the key for a service base address: scheme, host, and explicit port.
	pub fn from_url(url: &Url) -> Self {
		let mut key = format!("{}://{}", url.scheme(), url.host_str().unwrap_or_default());

		if let Some(port) = url.port() {
			key.push(':');
			key.push_str(&port.to_string());
		}

		Self(key)
	}
}
impl AsRef<str> for HostKey {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Debug for HostKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "HostKey({})", self.0)
	}
}
impl Display for HostKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Limiter that admits every call immediately.
///
/// Useful for tests and single-shot tools where the remote budget does not matter.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnrestrictedLimiter;
impl RequestLimiter for UnrestrictedLimiter {
	fn begin<'a>(&'a self, _key: &'a HostKey) -> PermitFuture<'a> {
		Box::pin(async { LimiterPermit::unrestricted() })
	}
}

/// Default limiter spacing call starts by a fixed interval per key and bounding the number of
/// in-flight calls per key.
///
/// Spacing is enforced on call starts only; it does not provide mutual exclusion beyond the
/// in-flight bound, so several calls may overlap as long as their starts were paced.
pub struct PacedLimiter {
	interval: Duration,
	max_in_flight: usize,
	states: Mutex<HashMap<HostKey, Arc<KeyState>>>,
}

struct KeyState {
	/// Earliest instant the next call for this key may start.
	schedule: AsyncMutex<Instant>,
	slots: Arc<Semaphore>,
}

impl PacedLimiter {
	/// Default spacing between call starts sharing one key.
	pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(300);
	/// Default in-flight bound per key.
	pub const DEFAULT_MAX_IN_FLIGHT: usize = 1;

	/// Creates a limiter with the given start spacing and in-flight bound (clamped to at
	/// least one slot).
	pub fn new(interval: Duration, max_in_flight: usize) -> Self {
		Self { interval, max_in_flight: max_in_flight.max(1), states: Mutex::new(HashMap::new()) }
	}

	fn state_for(&self, key: &HostKey) -> Arc<KeyState> {
		let mut states = self.states.lock();

		states
			.entry(key.clone())
			.or_insert_with(|| {
				Arc::new(KeyState {
					schedule: AsyncMutex::new(Instant::now()),
					slots: Arc::new(Semaphore::new(self.max_in_flight)),
				})
			})
			.clone()
	}
}
impl Default for PacedLimiter {
	fn default() -> Self {
		Self::new(Self::DEFAULT_INTERVAL, Self::DEFAULT_MAX_IN_FLIGHT)
	}
}
impl Debug for PacedLimiter {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PacedLimiter")
			.field("interval", &self.interval)
			.field("max_in_flight", &self.max_in_flight)
			.finish()
	}
}
impl RequestLimiter for PacedLimiter {
	fn begin<'a>(&'a self, key: &'a HostKey) -> PermitFuture<'a> {
		let state = self.state_for(key);
		let interval = self.interval;

		Box::pin(async move {
			let wait = {
				let mut next = state.schedule.lock().await;
				let now = Instant::now();
				let wait = next.saturating_duration_since(now);

				*next = now.max(*next) + interval;

				wait
			};

			if !wait.is_zero() {
				tokio::time::sleep(wait).await;
			}

			let guard = state.slots.acquire_arc().await;

			LimiterPermit::with_guard(guard)
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;

	#[test]
	fn host_key_includes_scheme_and_explicit_port() {
		let default_port =
			Url::parse("https://api.example.com/path").expect("URL fixture should parse.");
		let explicit_port =
			Url::parse("http://127.0.0.1:8080/").expect("URL fixture should parse.");

		assert_eq!(HostKey::from_url(&default_port).as_ref(), "https://api.example.com");
		assert_eq!(HostKey::from_url(&explicit_port).as_ref(), "http://127.0.0.1:8080");
	}

	#[test]
	fn permit_releases_guard_on_drop() {
		struct CountingGuard(Arc<AtomicUsize>);
		impl Drop for CountingGuard {
			fn drop(&mut self) {
				self.0.fetch_add(1, Ordering::SeqCst);
			}
		}

		let drops = Arc::new(AtomicUsize::new(0));
		let permit = LimiterPermit::with_guard(CountingGuard(drops.clone()));

		assert_eq!(drops.load(Ordering::SeqCst), 0);

		drop(permit);

		assert_eq!(drops.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn run_under_limit_propagates_output_unchanged() {
		let limiter = UnrestrictedLimiter;
		let key = HostKey::new("https://api.example.com");
		let value: Result<u8, &str> = run_under_limit(&limiter, &key, async { Err("boom") }).await;

		assert_eq!(value, Err("boom"));
	}

	#[tokio::test]
	async fn paced_limiter_keeps_separate_state_per_key() {
		let limiter = PacedLimiter::new(Duration::from_secs(60), 1);
		let key_a = HostKey::new("https://a.example.com");
		let key_b = HostKey::new("https://b.example.com");

		// First call per key never waits, even with a long interval.
		let _permit_a = limiter.begin(&key_a).await;
		let _permit_b = limiter.begin(&key_b).await;
	}
}
