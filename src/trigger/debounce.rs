//! Keyed minimum-interval debounce.
//!
//! One policy instance guards every discrete event. Keys are
//! `(EventKind, barcode)`, so two distinct items never suppress each other
//! while a repeat of the same event for the same item inside the interval
//! is dropped.

use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Clone)]
pub struct DebouncePolicy<K> {
    min_interval_secs: f64,
    last_fired: HashMap<K, f64>,
}

impl<K: Eq + Hash + Clone> DebouncePolicy<K> {
    #[allow(clippy::cast_precision_loss)]
    pub fn new(min_interval_ms: u64) -> Self {
        Self {
            min_interval_secs: min_interval_ms as f64 / 1000.0,
            last_fired: HashMap::new(),
        }
    }

    /// True when `key` has not fired within the interval before `now`.
    pub fn can_fire(&self, key: &K, now: f64) -> bool {
        match self.last_fired.get(key) {
            None => true,
            Some(last) => now - last >= self.min_interval_secs,
        }
    }

    /// Record that `key` fired at `now`.
    pub fn record(&mut self, key: K, now: f64) {
        self.last_fired.insert(key, now);
    }

    /// Check and record in one step. Returns whether the event may fire.
    pub fn try_fire(&mut self, key: K, now: f64) -> bool {
        if !self.can_fire(&key, now) {
            return false;
        }
        self.record(key, now);
        true
    }

    /// Forget keys whose interval has fully elapsed.
    pub fn prune(&mut self, now: f64) {
        let window = self.min_interval_secs;
        self.last_fired.retain(|_, last| now - *last < window);
    }

    pub fn tracked(&self) -> usize {
        self.last_fired.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_first_firing() {
        let policy: DebouncePolicy<&str> = DebouncePolicy::new(200);
        assert!(policy.can_fire(&"A", 0.0));
    }

    #[test]
    fn suppresses_repeat_within_interval() {
        let mut policy = DebouncePolicy::new(200);
        assert!(policy.try_fire("A", 10.0));
        assert!(!policy.try_fire("A", 10.1));
        assert!(!policy.try_fire("A", 10.199));
        assert!(policy.try_fire("A", 10.25));
    }

    #[test]
    fn distinct_keys_fire_independently() {
        let mut policy = DebouncePolicy::new(200);
        assert!(policy.try_fire("A", 10.0));
        assert!(policy.try_fire("B", 10.05));
    }

    #[test]
    fn zero_interval_never_suppresses() {
        let mut policy = DebouncePolicy::new(0);
        assert!(policy.try_fire("A", 1.0));
        assert!(policy.try_fire("A", 1.0));
    }

    #[test]
    fn prune_drops_expired_keys() {
        let mut policy = DebouncePolicy::new(200);
        policy.record("A", 1.0);
        policy.record("B", 1.15);
        policy.prune(1.3);
        assert_eq!(policy.tracked(), 1);
        assert!(!policy.can_fire(&"B", 1.3));
    }
}
