/// Per-IP rate limiting for the credential endpoints.
///
/// Fixed-window counters in process memory. Good enough to blunt
/// credential stuffing and refresh hammering on a single instance;
/// anything distributed needs a shared store and is out of scope here.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<String, (u32, Instant)>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Record a hit for `key`; returns false once the window is full.
    pub fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap();

        let entry = windows.entry(key.to_string()).or_insert((0, now));
        if now.duration_since(entry.1) > self.window {
            *entry = (0, now);
        }

        entry.0 += 1;
        entry.0 <= self.max_requests
    }
}

/// Limiters shared across workers, one window per endpoint class.
pub struct AuthRateLimits {
    pub login: RateLimiter,
    pub refresh: RateLimiter,
}

impl Default for AuthRateLimits {
    fn default() -> Self {
        Self {
            login: RateLimiter::new(30, Duration::from_secs(60)),
            refresh: RateLimiter::new(60, Duration::from_secs(60)),
        }
    }
}
