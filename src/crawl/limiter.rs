use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Duration, Instant};

/// Consecutive failures before the backoff multiplier doubles
const BACKOFF_FAILURE_THRESHOLD: u32 = 3;

/// Ceiling on the backoff multiplier
const MAX_BACKOFF_MULTIPLIER: u32 = 8;

struct GateState {
    next_free: Instant,
    interval: Duration,
    consecutive_failures: u32,
    backoff_multiplier: u32,
}

/// Per-domain minimum-interval rate limiter with failure backoff
///
/// Each domain gets its own gate; waiters on the same domain are served in
/// arrival order (the tokio mutex queues them fairly), while requests to
/// distinct domains never block each other.
///
/// After [`BACKOFF_FAILURE_THRESHOLD`] consecutive failures against a domain
/// the effective interval doubles, up to 8x; any success resets it.
pub struct RateLimiter {
    gates: StdMutex<HashMap<String, Arc<Mutex<GateState>>>>,
    default_interval: Duration,
    overrides: HashMap<String, Duration>,
}

impl RateLimiter {
    pub fn new(default_interval_ms: u64) -> Self {
        Self {
            gates: StdMutex::new(HashMap::new()),
            default_interval: Duration::from_millis(default_interval_ms),
            overrides: HashMap::new(),
        }
    }

    /// Sets a per-domain interval override, from a payer profile
    pub fn set_override(&mut self, domain: &str, interval_ms: u64) {
        self.overrides
            .insert(domain.to_string(), Duration::from_millis(interval_ms));
    }

    fn gate(&self, domain: &str) -> Arc<Mutex<GateState>> {
        let mut gates = self.gates.lock().unwrap_or_else(|e| e.into_inner());
        gates
            .entry(domain.to_string())
            .or_insert_with(|| {
                let interval = self
                    .overrides
                    .get(domain)
                    .copied()
                    .unwrap_or(self.default_interval);
                Arc::new(Mutex::new(GateState {
                    next_free: Instant::now(),
                    interval,
                    consecutive_failures: 0,
                    backoff_multiplier: 1,
                }))
            })
            .clone()
    }

    /// Waits until a request to `domain` is permitted
    ///
    /// Holding the gate lock while sleeping is what serializes same-domain
    /// callers; the sleep covers exactly the remaining interval.
    pub async fn acquire(&self, domain: &str) {
        let gate = self.gate(domain);
        let mut state = gate.lock().await;

        let now = Instant::now();
        if state.next_free > now {
            let wake = state.next_free;
            sleep_until(wake).await;
        }

        let effective = state.interval * state.backoff_multiplier;
        state.next_free = Instant::now() + effective;
    }

    /// Records a request outcome for backoff bookkeeping
    pub async fn record_outcome(&self, domain: &str, success: bool) {
        let gate = self.gate(domain);
        let mut state = gate.lock().await;

        if success {
            state.consecutive_failures = 0;
            state.backoff_multiplier = 1;
            return;
        }

        state.consecutive_failures += 1;
        if state.consecutive_failures >= BACKOFF_FAILURE_THRESHOLD
            && state.backoff_multiplier < MAX_BACKOFF_MULTIPLIER
        {
            state.backoff_multiplier *= 2;
            state.consecutive_failures = 0;
            tracing::warn!(
                domain = %domain,
                multiplier = state.backoff_multiplier,
                "Repeated failures, backing off domain"
            );
        }
    }
}
