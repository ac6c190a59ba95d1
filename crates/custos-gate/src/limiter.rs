//! Fixed-window rate limiting keyed by client address and endpoint class.
//!
//! Counters are process-local and ephemeral: lost on restart, which is
//! acceptable for best-effort throttling. State is constructor-owned (no
//! globals) with an injectable clock so windows can be tested without
//! sleeping.
//!
//! Each key has its own mutex: the reset-then-count sequence for one key is
//! atomic with respect to concurrent callers of that key, and distinct keys
//! never contend beyond a brief read lock on the key map.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use custos_core::Clock;

/// The fixed window every class counts over.
pub const WINDOW: Duration = Duration::from_secs(60);

/// Keys kept before stale windows are evicted.
const DEFAULT_MAX_KEYS: usize = 65_536;

/// Endpoint classes with their per-client-address budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitClass {
    /// Authentication endpoints: 10 requests/minute.
    Auth,
    /// Disclosure-request and download endpoints: 60 requests/minute.
    Disclosure,
}

impl LimitClass {
    /// Requests allowed per window.
    pub fn limit(&self) -> u32 {
        match self {
            LimitClass::Auth => 10,
            LimitClass::Disclosure => 60,
        }
    }

    /// Counter key for a client address.
    pub fn key(&self, client_addr: &str) -> String {
        match self {
            LimitClass::Auth => format!("auth:{client_addr}"),
            LimitClass::Disclosure => format!("disc:{client_addr}"),
        }
    }
}

struct CounterWindow {
    window_start: i64,
    count: u32,
}

/// Fixed-window request limiter.
pub struct RateLimiter {
    windows: RwLock<HashMap<String, Arc<Mutex<CounterWindow>>>>,
    clock: Arc<dyn Clock>,
    max_keys: usize,
}

impl RateLimiter {
    /// Create a limiter with the default key capacity.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_max_keys(clock, DEFAULT_MAX_KEYS)
    }

    /// Create a limiter that evicts stale windows past `max_keys` entries.
    pub fn with_max_keys(clock: Arc<dyn Clock>, max_keys: usize) -> Self {
        Self {
            windows: RwLock::new(HashMap::new()),
            clock,
            max_keys,
        }
    }

    /// Count a request against `key`.
    ///
    /// Resets the window when `window` has elapsed since its start, then
    /// admits the request iff the count is below `limit`. A denial has no
    /// side effect.
    pub fn allow(&self, key: &str, limit: u32, window: Duration) -> bool {
        if limit == 0 {
            return true;
        }

        let now = self.clock.now_millis();
        let counter = self.counter_for(key, now);
        let mut win = match counter.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if now - win.window_start >= window.as_millis() as i64 {
            win.window_start = now;
            win.count = 0;
        }
        if win.count < limit {
            win.count += 1;
            true
        } else {
            false
        }
    }

    /// Count a request from `client_addr` against an endpoint class.
    pub fn allow_class(&self, class: LimitClass, client_addr: &str) -> bool {
        self.allow(&class.key(client_addr), class.limit(), WINDOW)
    }

    fn counter_for(&self, key: &str, now: i64) -> Arc<Mutex<CounterWindow>> {
        {
            let map = match self.windows.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Some(counter) = map.get(key) {
                return Arc::clone(counter);
            }
        }

        let mut map = match self.windows.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        // Over capacity: drop counters whose window ended more than one
        // full window ago. Callers holding a clone keep counting on the
        // evicted window, which best-effort limiting tolerates.
        if map.len() >= self.max_keys {
            let stale_before = now - 2 * WINDOW.as_millis() as i64;
            map.retain(|_, counter| match counter.lock() {
                Ok(win) => win.window_start >= stale_before,
                Err(_) => false,
            });
        }

        Arc::clone(map.entry(key.to_string()).or_insert_with(|| {
            Arc::new(Mutex::new(CounterWindow {
                window_start: now,
                count: 0,
            }))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use custos_core::ManualClock;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn limiter_at(now: i64) -> (RateLimiter, ManualClock) {
        let clock = ManualClock::at(now);
        (RateLimiter::new(Arc::new(clock.clone())), clock)
    }

    #[test]
    fn test_exactly_n_requests_per_window() {
        let (limiter, _) = limiter_at(0);

        for _ in 0..10 {
            assert!(limiter.allow("k", 10, WINDOW));
        }
        assert!(!limiter.allow("k", 10, WINDOW));
        assert!(!limiter.allow("k", 10, WINDOW));
    }

    #[test]
    fn test_window_rollover_readmits() {
        let (limiter, clock) = limiter_at(0);

        assert!(limiter.allow("k", 1, WINDOW));
        assert!(!limiter.allow("k", 1, WINDOW));

        clock.advance(WINDOW.as_millis() as i64 - 1);
        assert!(!limiter.allow("k", 1, WINDOW));

        clock.advance(1);
        assert!(limiter.allow("k", 1, WINDOW));
        assert!(!limiter.allow("k", 1, WINDOW));
    }

    #[test]
    fn test_keys_are_independent() {
        let (limiter, _) = limiter_at(0);

        assert!(limiter.allow("a", 1, WINDOW));
        assert!(!limiter.allow("a", 1, WINDOW));
        assert!(limiter.allow("b", 1, WINDOW));
    }

    #[test]
    fn test_zero_limit_always_allows() {
        let (limiter, _) = limiter_at(0);
        assert!(limiter.allow("k", 0, WINDOW));
    }

    #[test]
    fn test_class_budgets() {
        let (limiter, _) = limiter_at(0);

        for _ in 0..10 {
            assert!(limiter.allow_class(LimitClass::Auth, "10.0.0.1"));
        }
        assert!(!limiter.allow_class(LimitClass::Auth, "10.0.0.1"));

        // Different class, same address: separate counter.
        assert!(limiter.allow_class(LimitClass::Disclosure, "10.0.0.1"));
        // Same class, different address: separate counter.
        assert!(limiter.allow_class(LimitClass::Auth, "10.0.0.2"));
    }

    #[test]
    fn test_concurrent_callers_never_exceed_limit() {
        let (limiter, _) = limiter_at(0);
        let limiter = Arc::new(limiter);
        let admitted = Arc::new(AtomicU32::new(0));

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                let admitted = Arc::clone(&admitted);
                std::thread::spawn(move || {
                    if limiter.allow("shared", 10, WINDOW) {
                        admitted.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(admitted.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_stale_windows_are_evicted() {
        let clock = ManualClock::at(0);
        let limiter = RateLimiter::with_max_keys(Arc::new(clock.clone()), 2);

        assert!(limiter.allow("old-1", 5, WINDOW));
        assert!(limiter.allow("old-2", 5, WINDOW));

        // Far past both windows; inserting a third key triggers eviction.
        clock.advance(10 * WINDOW.as_millis() as i64);
        assert!(limiter.allow("fresh", 5, WINDOW));

        let map = limiter.windows.read().unwrap();
        assert!(map.contains_key("fresh"));
        assert!(!map.contains_key("old-1"));
        assert!(!map.contains_key("old-2"));
    }
}
