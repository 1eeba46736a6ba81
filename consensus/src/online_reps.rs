//! Online representative tracking.
//!
//! The election thresholds are fractions of S, the voting weight of
//! representatives seen voting recently. Each observation stamps the
//! representative with its current ledger weight; entries fall out of the
//! sum once they leave the window.

use std::collections::HashMap;

use kestrel_types::{Account, Amount, Timestamp};

pub struct OnlineReps {
    window_secs: u64,
    seen: HashMap<Account, (Timestamp, Amount)>,
}

impl OnlineReps {
    /// Default online window: five minutes.
    pub const DEFAULT_WINDOW_SECS: u64 = 300;

    pub fn new(window_secs: u64) -> Self {
        Self {
            window_secs,
            seen: HashMap::new(),
        }
    }

    /// Record that `rep` voted just now with the given ledger weight.
    pub fn observe(&mut self, rep: Account, weight: Amount, now: Timestamp) {
        self.seen.insert(rep, (now, weight));
    }

    /// Total weight of representatives inside the window. Expired entries
    /// are dropped as a side effect.
    pub fn online_weight(&mut self, now: Timestamp) -> Amount {
        let window = self.window_secs;
        self.seen
            .retain(|_, (seen_at, _)| !seen_at.has_expired(window, now));
        let mut total = Amount::ZERO;
        for (_, weight) in self.seen.values() {
            total = total.checked_add(*weight).unwrap_or(Amount::MAX);
        }
        total
    }

    pub fn online_count(&self) -> usize {
        self.seen.len()
    }
}

impl Default for OnlineReps {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WINDOW_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rep(tag: u8) -> Account {
        Account::from_bytes([tag; 32])
    }

    fn ts(secs: u64) -> Timestamp {
        Timestamp::new(secs)
    }

    #[test]
    fn weights_accumulate_within_window() {
        let mut reps = OnlineReps::new(300);
        reps.observe(rep(1), Amount::raw(100), ts(0));
        reps.observe(rep(2), Amount::raw(200), ts(10));
        assert_eq!(reps.online_weight(ts(20)), Amount::raw(300));
        assert_eq!(reps.online_count(), 2);
    }

    #[test]
    fn expired_reps_leave_the_sum() {
        let mut reps = OnlineReps::new(300);
        reps.observe(rep(1), Amount::raw(100), ts(0));
        reps.observe(rep(2), Amount::raw(200), ts(250));
        assert_eq!(reps.online_weight(ts(301)), Amount::raw(200));
        assert_eq!(reps.online_count(), 1);
    }

    #[test]
    fn re_observation_refreshes_and_reweights() {
        let mut reps = OnlineReps::new(300);
        reps.observe(rep(1), Amount::raw(100), ts(0));
        reps.observe(rep(1), Amount::raw(150), ts(200));
        assert_eq!(reps.online_weight(ts(400)), Amount::raw(150));
    }
}
