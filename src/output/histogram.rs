//! Fixed-binning 1-D histogram with additive merge.

use serde::{Deserialize, Serialize};

/// Uniform-binning histogram. `counts` holds the underflow bin at index 0
/// and the overflow bin at index `bins + 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram1D {
    pub bins: usize,
    pub low: f64,
    pub high: f64,
    pub counts: Vec<f64>,
    pub entries: u64,
}

impl Histogram1D {
    pub fn new(bins: usize, low: f64, high: f64) -> Self {
        let bins = bins.max(1);
        Self {
            bins,
            low,
            high,
            counts: vec![0.0; bins + 2],
            entries: 0,
        }
    }

    /// Index into `counts` for `x`.
    pub fn find_bin(&self, x: f64) -> usize {
        if x.is_nan() || x < self.low {
            0
        } else if x >= self.high {
            self.bins + 1
        } else {
            let width = (self.high - self.low) / self.bins as f64;
            let bin = ((x - self.low) / width) as usize;
            bin.min(self.bins - 1) + 1
        }
    }

    pub fn fill(&mut self, x: f64, weight: f64) {
        let bin = self.find_bin(x);
        self.counts[bin] += weight;
        self.entries += 1;
    }

    /// Sum of in-range bin contents.
    pub fn integral(&self) -> f64 {
        self.counts[1..=self.bins].iter().sum()
    }

    pub fn is_compatible(&self, other: &Histogram1D) -> bool {
        self.bins == other.bins
            && self.low == other.low
            && self.high == other.high
            && self.counts.len() == other.counts.len()
    }

    /// At least one bin and a `counts` vector with both flow bins.
    pub fn is_well_formed(&self) -> bool {
        self.bins > 0 && self.counts.len() == self.bins + 2
    }

    /// Add `other` bin by bin. Returns `false` (leaving `self` untouched)
    /// when the binnings differ.
    pub fn add(&mut self, other: &Histogram1D) -> bool {
        if !self.is_compatible(other) {
            return false;
        }
        for (a, b) in self.counts.iter_mut().zip(&other.counts) {
            *a += b;
        }
        self.entries += other.entries;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fill_and_flow_bins() {
        let mut h = Histogram1D::new(10, 0.0, 10.0);
        h.fill(-1.0, 1.0);
        h.fill(0.0, 1.0);
        h.fill(9.999, 2.0);
        h.fill(10.0, 1.0);
        assert_eq!(h.counts[0], 1.0);
        assert_eq!(h.counts[1], 1.0);
        assert_eq!(h.counts[10], 2.0);
        assert_eq!(h.counts[11], 1.0);
        assert_eq!(h.integral(), 3.0);
        assert_eq!(h.entries, 4);
    }

    #[test]
    fn test_add_rejects_other_binning() {
        let mut a = Histogram1D::new(10, 0.0, 10.0);
        let b = Histogram1D::new(20, 0.0, 10.0);
        a.fill(1.0, 1.0);
        assert!(!a.add(&b));
        assert_eq!(a.entries, 1);
    }

    #[test]
    fn test_well_formed() {
        assert!(Histogram1D::new(0, 0.0, 1.0).is_well_formed());

        let mut h = Histogram1D::new(4, 0.0, 4.0);
        h.counts.pop();
        assert!(!h.is_well_formed());

        h.bins = 0;
        h.counts = vec![0.0; 2];
        assert!(!h.is_well_formed());
    }

    proptest! {
        #[test]
        fn prop_add_is_commutative(
            xs in prop::collection::vec(-5.0f64..15.0, 0..50),
            ys in prop::collection::vec(-5.0f64..15.0, 0..50),
        ) {
            let mut a = Histogram1D::new(10, 0.0, 10.0);
            let mut b = Histogram1D::new(10, 0.0, 10.0);
            for x in &xs { a.fill(*x, 1.0); }
            for y in &ys { b.fill(*y, 1.0); }

            let mut ab = a.clone();
            prop_assert!(ab.add(&b));
            let mut ba = b.clone();
            prop_assert!(ba.add(&a));
            prop_assert_eq!(ab, ba);
        }
    }
}
