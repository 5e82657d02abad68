//! Bounded pool of high-quality decode slots
//!
//! A capacity-limited priority cache. The value of a slot is the share of the
//! viewport its stream currently occupies, updated on every evaluation rather
//! than fixed at insertion.

use std::collections::HashMap;

use crate::stream::StreamKey;

/// Outcome of asking the pool for a slot
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// The candidate holds a slot (newly granted or refreshed)
    Granted,
    /// The candidate took the slot of this smaller incumbent
    Evicted(StreamKey),
    /// Pool full and no incumbent is smaller than the candidate
    Denied,
}

/// Fixed-capacity set of high-quality slots, keyed by stream
#[derive(Debug)]
pub struct HighQualityPool {
    capacity: usize,
    ratios: HashMap<StreamKey, f64>,
}

impl HighQualityPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            ratios: HashMap::new(),
        }
    }

    /// Try to give `key` a slot at `area_ratio`
    ///
    /// Greedy single eviction: with the pool full, only the incumbent with the
    /// smallest ratio is considered, and only if strictly smaller.
    pub fn admit(&mut self, key: &StreamKey, area_ratio: f64) -> Admission {
        if let Some(ratio) = self.ratios.get_mut(key) {
            *ratio = area_ratio;
            return Admission::Granted;
        }

        if self.ratios.len() < self.capacity {
            self.ratios.insert(key.clone(), area_ratio);
            return Admission::Granted;
        }

        let smallest = self
            .ratios
            .iter()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(k, r)| (k.clone(), *r));

        match smallest {
            Some((victim, ratio)) if ratio < area_ratio => {
                self.ratios.remove(&victim);
                self.ratios.insert(key.clone(), area_ratio);
                Admission::Evicted(victim)
            }
            _ => Admission::Denied,
        }
    }

    /// Free the slot held by `key`, returning whether it held one
    pub fn release(&mut self, key: &StreamKey) -> bool {
        self.ratios.remove(key).is_some()
    }

    pub fn is_full(&self) -> bool {
        self.ratios.len() >= self.capacity
    }

    pub fn holds(&self, key: &StreamKey) -> bool {
        self.ratios.contains_key(key)
    }

    /// Recorded area ratio of the slot held by `key`
    pub fn ratio(&self, key: &StreamKey) -> Option<f64> {
        self.ratios.get(key).copied()
    }

    /// Slot holders in key order
    pub fn holders(&self) -> Vec<StreamKey> {
        let mut keys: Vec<StreamKey> = self.ratios.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn clear(&mut self) {
        self.ratios.clear();
    }
}
