use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Actions that are throttled independently of each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateAction {
    Login,
    ReviewCreate,
    MessageSend,
    QuestionCreate,
}

#[derive(Debug, Clone, Copy)]
pub struct RatePolicy {
    pub limit: u32,
    pub window: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allow,
    Deny { retry_after: Duration },
}

struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window counter per (identifier, action). The identifier is a
/// client IP or user id; state is in-process, single-deployment.
pub struct RateLimiter {
    policies: HashMap<RateAction, RatePolicy>,
    windows: Mutex<HashMap<(String, RateAction), Window>>,
}

impl RateLimiter {
    pub fn new(policies: HashMap<RateAction, RatePolicy>) -> Self {
        Self {
            policies,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_defaults() -> Self {
        let mut policies = HashMap::new();
        policies.insert(
            RateAction::Login,
            RatePolicy {
                limit: 5,
                window: Duration::from_secs(60),
            },
        );
        policies.insert(
            RateAction::ReviewCreate,
            RatePolicy {
                limit: 10,
                window: Duration::from_secs(3600),
            },
        );
        policies.insert(
            RateAction::MessageSend,
            RatePolicy {
                limit: 30,
                window: Duration::from_secs(60),
            },
        );
        policies.insert(
            RateAction::QuestionCreate,
            RatePolicy {
                limit: 10,
                window: Duration::from_secs(3600),
            },
        );

        Self::new(policies)
    }

    pub fn check(&self, identifier: &str, action: RateAction) -> RateDecision {
        self.check_at(identifier, action, Instant::now())
    }

    // `now` is a parameter so window expiry is testable without sleeping.
    fn check_at(&self, identifier: &str, action: RateAction, now: Instant) -> RateDecision {
        let policy = match self.policies.get(&action) {
            Some(p) => *p,
            None => return RateDecision::Allow,
        };

        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // Drop every expired window, not just the one being checked, so the
        // map stays bounded by the identifiers active within one window.
        windows.retain(|(_, action), w| match self.policies.get(action) {
            Some(p) => now.duration_since(w.started) < p.window,
            None => false,
        });

        let key = (identifier.to_string(), action);
        let window = windows.entry(key).or_insert(Window {
            started: now,
            count: 0,
        });

        if window.count >= policy.limit {
            let elapsed = now.duration_since(window.started);
            return RateDecision::Deny {
                retry_after: policy.window - elapsed,
            };
        }

        window.count += 1;
        RateDecision::Allow
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(limit: u32, window_secs: u64) -> RateLimiter {
        let mut policies = HashMap::new();
        policies.insert(
            RateAction::Login,
            RatePolicy {
                limit,
                window: Duration::from_secs(window_secs),
            },
        );
        RateLimiter::new(policies)
    }

    #[test]
    fn sixth_request_in_window_is_denied_with_remainder() {
        let rl = limiter(5, 60);
        let start = Instant::now();

        for _ in 0..5 {
            assert_eq!(rl.check_at("1.2.3.4", RateAction::Login, start), RateDecision::Allow);
        }

        let at = start + Duration::from_secs(10);
        match rl.check_at("1.2.3.4", RateAction::Login, at) {
            RateDecision::Deny { retry_after } => {
                assert_eq!(retry_after, Duration::from_secs(50));
            }
            RateDecision::Allow => panic!("sixth request should be denied"),
        }
    }

    #[test]
    fn window_expiry_resets_the_counter() {
        let rl = limiter(5, 60);
        let start = Instant::now();

        for _ in 0..5 {
            assert_eq!(rl.check_at("u-1", RateAction::Login, start), RateDecision::Allow);
        }

        let later = start + Duration::from_secs(61);
        assert_eq!(rl.check_at("u-1", RateAction::Login, later), RateDecision::Allow);
    }

    #[test]
    fn identifiers_are_throttled_independently() {
        let rl = limiter(1, 60);
        let now = Instant::now();

        assert_eq!(rl.check_at("a", RateAction::Login, now), RateDecision::Allow);
        assert_eq!(rl.check_at("b", RateAction::Login, now), RateDecision::Allow);
        assert!(matches!(
            rl.check_at("a", RateAction::Login, now),
            RateDecision::Deny { .. }
        ));
    }

    #[test]
    fn expired_windows_are_evicted() {
        let rl = limiter(1, 60);
        let start = Instant::now();

        for i in 0..100 {
            rl.check_at(&format!("ip-{i}"), RateAction::Login, start);
        }
        assert_eq!(rl.windows.lock().unwrap().len(), 100);

        let later = start + Duration::from_secs(61);
        rl.check_at("ip-new", RateAction::Login, later);
        assert_eq!(rl.windows.lock().unwrap().len(), 1);
    }

    #[test]
    fn unconfigured_actions_pass_through() {
        let rl = limiter(1, 60);

        for _ in 0..10 {
            assert_eq!(
                rl.check("x", RateAction::MessageSend),
                RateDecision::Allow
            );
        }
    }
}
