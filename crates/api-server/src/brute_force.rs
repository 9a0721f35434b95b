use dashmap::DashMap;
use std::time::{Duration, Instant};

/// How many wrong PINs are tolerated, over what window, and for how long a
/// client is shut out afterwards.
#[derive(Debug, Clone, Copy)]
pub struct LockoutPolicy {
    pub max_failures: u32,
    pub window: Duration,
    pub lockout: Duration,
}

/// Wrong-PIN attempts of one client inside the current window.
#[derive(Debug)]
struct PinAttempts {
    failures: u32,
    window_start: Instant,
    locked_until: Option<Instant>,
}

impl PinAttempts {
    fn new(now: Instant) -> Self {
        Self {
            failures: 0,
            window_start: now,
            locked_until: None,
        }
    }

    fn is_locked(&self, now: Instant) -> bool {
        self.locked_until.is_some_and(|until| now < until)
    }

    /// Count one wrong PIN. Returns true when this attempt starts a lockout.
    fn register_failure(&mut self, now: Instant, policy: &LockoutPolicy) -> bool {
        if !self.is_locked(now) && now.duration_since(self.window_start) > policy.window {
            *self = Self::new(now);
        }
        self.failures += 1;

        let starts_lockout = self.failures >= policy.max_failures && !self.is_locked(now);
        if starts_lockout {
            self.locked_until = Some(now + policy.lockout);
        }
        starts_lockout
    }

    /// Nothing left to enforce: outside the window and not locked.
    fn is_stale(&self, now: Instant, policy: &LockoutPolicy) -> bool {
        !self.is_locked(now) && now.duration_since(self.window_start) > policy.window
    }
}

/// Per-client tracker of wrong admin PINs with automatic lockout.
///
/// A four-digit PIN is trivially enumerable without this.
pub struct PinGuard {
    attempts: DashMap<String, PinAttempts>,
    policy: LockoutPolicy,
}

impl PinGuard {
    pub fn new(max_failures: u32, window: Duration, lockout: Duration) -> Self {
        tracing::info!(
            "PIN guard: max {} failures in {}s window, {}s lockout",
            max_failures,
            window.as_secs(),
            lockout.as_secs()
        );

        Self {
            attempts: DashMap::new(),
            policy: LockoutPolicy {
                max_failures: max_failures.max(1),
                window,
                lockout,
            },
        }
    }

    pub fn policy(&self) -> LockoutPolicy {
        self.policy
    }

    /// Record a wrong PIN for `client`.
    pub fn record_failure(&self, client: &str) {
        let now = Instant::now();
        let mut attempts = self
            .attempts
            .entry(client.to_string())
            .or_insert_with(|| PinAttempts::new(now));

        if attempts.register_failure(now, &self.policy) {
            tracing::warn!(
                "Locking out {} for {}s after {} wrong PINs",
                client,
                self.policy.lockout.as_secs(),
                attempts.failures
            );
        }
    }

    pub fn is_locked(&self, client: &str) -> bool {
        self.attempts
            .get(client)
            .is_some_and(|attempts| attempts.is_locked(Instant::now()))
    }

    pub fn record_success(&self, client: &str) {
        self.attempts.remove(client);
    }

    /// Forget clients with nothing left to enforce.
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.attempts
            .retain(|_, attempts| !attempts.is_stale(now, &self.policy));
    }

    pub fn tracked_clients(&self) -> usize {
        self.attempts.len()
    }
}
