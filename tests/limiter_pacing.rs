// std
use std::{
	sync::{
		Arc, Mutex,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};
// self
use webapi_courier::{
	descriptor::OperationDescriptor,
	engine::{Invoker, Outcome},
	limiter::{HostKey, PacedLimiter, run_under_limit},
	session::StaticSession,
	transport::{InvokeFuture, PreparedCall, ServiceClient},
	url::Url,
};

/// Tracks how many guarded operations overlap at any moment.
#[derive(Default)]
struct OverlapGauge {
	current: AtomicUsize,
	peak: AtomicUsize,
}
impl OverlapGauge {
	fn enter(&self) {
		let current = self.current.fetch_add(1, Ordering::SeqCst) + 1;

		self.peak.fetch_max(current, Ordering::SeqCst);
	}

	fn exit(&self) {
		self.current.fetch_sub(1, Ordering::SeqCst);
	}

	fn peak(&self) -> usize {
		self.peak.load(Ordering::SeqCst)
	}
}

struct SlowClient {
	gauge: Arc<OverlapGauge>,
	hold: Duration,
}
impl ServiceClient for SlowClient {
	fn invoke<'a>(&'a self, _call: PreparedCall<'a>) -> InvokeFuture<'a> {
		let gauge = self.gauge.clone();
		let hold = self.hold;

		Box::pin(async move {
			gauge.enter();
			tokio::time::sleep(hold).await;
			gauge.exit();

			Ok(b"\"OK\"".to_vec())
		})
	}
}

#[tokio::test(start_paused = true)]
async fn overlap_never_exceeds_the_in_flight_budget() {
	let limiter = Arc::new(PacedLimiter::new(Duration::ZERO, 2));
	let gauge = Arc::new(OverlapGauge::default());
	let key = HostKey::new("https://api.example.com");
	let mut tasks = Vec::new();

	for _ in 0..8 {
		let limiter = limiter.clone();
		let gauge = gauge.clone();
		let key = key.clone();

		tasks.push(tokio::spawn(async move {
			run_under_limit(limiter.as_ref(), &key, async {
				gauge.enter();
				tokio::time::sleep(Duration::from_millis(25)).await;
				gauge.exit();
			})
			.await;
		}));
	}

	for task in tasks {
		task.await.expect("Guarded task should not panic.");
	}

	assert!(gauge.peak() <= 2, "In-flight budget exceeded: peak overlap {}.", gauge.peak());
	assert!(gauge.peak() > 0);
}

#[tokio::test(start_paused = true)]
async fn call_starts_are_spaced_by_the_configured_interval() {
	let interval = Duration::from_millis(100);
	let limiter = Arc::new(PacedLimiter::new(interval, 4));
	let key = HostKey::new("https://api.example.com");
	let starts = Arc::new(Mutex::new(Vec::new()));
	let mut tasks = Vec::new();

	for _ in 0..3 {
		let limiter = limiter.clone();
		let key = key.clone();
		let starts = starts.clone();

		tasks.push(tokio::spawn(async move {
			run_under_limit(limiter.as_ref(), &key, async {
				starts
					.lock()
					.expect("Start log lock should not be poisoned.")
					.push(tokio::time::Instant::now());
			})
			.await;
		}));
	}

	for task in tasks {
		task.await.expect("Paced task should not panic.");
	}

	let mut starts = starts.lock().expect("Start log lock should not be poisoned.").clone();

	starts.sort();

	for pair in starts.windows(2) {
		assert!(
			pair[1] - pair[0] >= interval,
			"Consecutive starts must be at least one interval apart."
		);
	}
}

#[tokio::test]
async fn distinct_keys_do_not_share_a_budget() {
	let limiter = PacedLimiter::new(Duration::from_secs(60), 1);
	let key_a = HostKey::new("https://a.example.com");
	let key_b = HostKey::new("https://b.example.com");

	// Neither key has been used, so both first calls complete without waiting out the
	// sixty-second interval.
	run_under_limit(&limiter, &key_a, async {}).await;
	run_under_limit(&limiter, &key_b, async {}).await;
}

#[tokio::test(start_paused = true)]
async fn concurrent_invocations_share_the_engine_wide_budget() {
	let gauge = Arc::new(OverlapGauge::default());
	let client = SlowClient { gauge: gauge.clone(), hold: Duration::from_millis(20) };
	let base = Url::parse("https://api.example.com").expect("Base URL fixture should parse.");
	let invoker = Invoker::with_client(
		base,
		client,
		Arc::new(StaticSession::ready("token-1")),
		Arc::new(PacedLimiter::new(Duration::ZERO, 2)),
	);
	let mut tasks = Vec::new();

	for index in 0..6 {
		let invoker = invoker.clone();
		// Different operations against the same host still share one budget.
		let endpoint = if index % 2 == 0 { "AddAuthenticator" } else { "FinalizeAddAuthenticator" };
		let descriptor = OperationDescriptor::builder("ITwoFactorService", endpoint)
			.build()
			.expect("Descriptor fixture should build successfully.");

		tasks.push(tokio::spawn(async move {
			invoker.perform::<String>(&descriptor).await
		}));
	}

	for task in tasks {
		let outcome = task
			.await
			.expect("Invocation task should not panic.")
			.expect("Invocation should not surface an error.");

		assert_eq!(outcome, Outcome::Success("OK".into()));
	}

	assert!(gauge.peak() <= 2, "Transport overlap exceeded the limiter budget.");
}
