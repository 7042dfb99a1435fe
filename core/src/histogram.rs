//! Equal-width binning of raw distributions.
//!
//! Bins are half-open `[lo, hi)` except the last, which is closed, so the
//! maximum value always lands in the final bin. Non-finite values are
//! never counted and never widen the range.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Edges spanning the data range. A degenerate range is widened by
    /// half a unit on each side.
    pub fn edges_for(values: &[f64], bins: usize) -> Vec<f64> {
        let bins = bins.max(1);
        let (mut lo, mut hi) = values
            .iter()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
        if !lo.is_finite() || !hi.is_finite() {
            lo = 0.0;
            hi = 1.0;
        } else if lo == hi {
            lo -= 0.5;
            hi += 0.5;
        }
        let width = (hi - lo) / bins as f64;
        (0..=bins)
            .map(|i| if i == bins { hi } else { lo + width * i as f64 })
            .collect()
    }

    pub fn from_values(values: &[f64], bins: usize) -> Self {
        Self::with_edges(values, Self::edges_for(values, bins))
    }

    /// Bin `values` into caller-supplied ascending edges. Values outside
    /// the edges are dropped.
    pub fn with_edges(values: &[f64], edges: Vec<f64>) -> Self {
        let n_bins = edges.len().saturating_sub(1);
        let mut counts = vec![0usize; n_bins];
        if n_bins == 0 {
            return Self { edges, counts };
        }
        let lo = edges[0];
        let hi = edges[n_bins];
        for &v in values {
            if !v.is_finite() || v < lo || v > hi {
                continue;
            }
            // partition_point gives the first edge strictly greater than v.
            let idx = edges.partition_point(|e| *e <= v).saturating_sub(1).min(n_bins - 1);
            counts[idx] += 1;
        }
        Self { edges, counts }
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn max_count(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }
}
