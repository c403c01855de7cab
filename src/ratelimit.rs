use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Admission verdict for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Rejected { retry_after_secs: u64 },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed)
    }
}

/// Per-identifier sliding-window admission control.
///
/// Keeps an ordered queue of admission times per identifier and counts the
/// ones inside the trailing window. Check-and-append happens under a single
/// lock, so two concurrent requests cannot both take the last slot. State is
/// process-local and lost on restart.
pub struct SlidingWindowLimiter {
    max_requests: usize,
    window: Duration,
    entries: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl SlidingWindowLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn admit(&self, identifier: &str) -> Admission {
        self.admit_at(identifier, Instant::now())
    }

    fn admit_at(&self, identifier: &str, now: Instant) -> Admission {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        let timestamps = entries.entry(identifier.to_string()).or_default();

        // Timestamps are appended in order, so pruning is a prefix trim.
        while let Some(oldest) = timestamps.front() {
            if now.duration_since(*oldest) >= self.window {
                timestamps.pop_front();
            } else {
                break;
            }
        }

        if timestamps.len() >= self.max_requests {
            let oldest = *timestamps.front().unwrap_or(&now);
            let remaining = (oldest + self.window).saturating_duration_since(now);
            let mut retry_after_secs = remaining.as_secs();
            if remaining.subsec_nanos() > 0 {
                retry_after_secs += 1;
            }
            return Admission::Rejected {
                retry_after_secs: retry_after_secs.max(1),
            };
        }

        timestamps.push_back(now);
        Admission::Allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max: usize, window_secs: u64) -> SlidingWindowLimiter {
        SlidingWindowLimiter::new(max, Duration::from_secs(window_secs))
    }

    #[test]
    fn admits_up_to_limit_then_rejects() {
        let l = limiter(10, 60);
        let start = Instant::now();
        for i in 0..10 {
            assert!(
                l.admit_at("u1", start + Duration::from_secs(i)).is_allowed(),
                "request {i} should be admitted"
            );
        }
        match l.admit_at("u1", start + Duration::from_secs(10)) {
            Admission::Rejected { retry_after_secs } => {
                assert!(retry_after_secs >= 1);
                // oldest was at t=0, window is 60s, so the slot frees at t=60
                assert_eq!(retry_after_secs, 50);
            }
            Admission::Allowed => panic!("11th request should be rejected"),
        }
    }

    #[test]
    fn admits_again_after_window_passes() {
        let l = limiter(2, 60);
        let start = Instant::now();
        assert!(l.admit_at("u1", start).is_allowed());
        assert!(l.admit_at("u1", start + Duration::from_secs(1)).is_allowed());
        assert!(!l.admit_at("u1", start + Duration::from_secs(2)).is_allowed());
        // first admission exits the window at start + 60
        assert!(l.admit_at("u1", start + Duration::from_secs(60)).is_allowed());
    }

    #[test]
    fn retry_after_is_floored_at_one_second() {
        let l = limiter(1, 60);
        let start = Instant::now();
        assert!(l.admit_at("u1", start).is_allowed());
        let verdict = l.admit_at("u1", start + Duration::from_millis(59_500));
        match verdict {
            Admission::Rejected { retry_after_secs } => assert_eq!(retry_after_secs, 1),
            Admission::Allowed => panic!("should be rejected inside the window"),
        }
    }

    #[test]
    fn identifiers_are_independent() {
        let l = limiter(1, 60);
        let start = Instant::now();
        assert!(l.admit_at("u1", start).is_allowed());
        assert!(l.admit_at("u2", start).is_allowed());
        assert!(!l.admit_at("u1", start + Duration::from_secs(1)).is_allowed());
    }

    #[test]
    fn pruning_is_a_prefix_trim() {
        let l = limiter(3, 60);
        let start = Instant::now();
        assert!(l.admit_at("u1", start).is_allowed());
        assert!(l.admit_at("u1", start + Duration::from_secs(30)).is_allowed());
        assert!(l.admit_at("u1", start + Duration::from_secs(59)).is_allowed());
        // at t=61 only the first timestamp has left the window
        assert!(l.admit_at("u1", start + Duration::from_secs(61)).is_allowed());
        assert!(!l.admit_at("u1", start + Duration::from_secs(62)).is_allowed());
    }
}
