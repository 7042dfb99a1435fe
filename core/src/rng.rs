//! Deterministic random number generation.
//!
//! RULE: Nothing in the pipeline may call any platform RNG.
//! All randomness flows through a single `SimRng` built from the
//! configured seed and passed by `&mut` into every generation call.
//! There is no global RNG state and no reseeding mid-run.
//!
//! The draw order is part of the reproducibility contract: changing the
//! order in which the synthesizer samples fields changes every output row.

use rand::{Rng, RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// Above this rate a Poisson draw is split into two half-rate draws so
/// `exp(-lambda)` never underflows.
const POISSON_SPLIT_LAMBDA: f64 = 30.0;

/// A named, seeded RNG for one pipeline run.
pub struct SimRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
    spare_normal: Option<f64>,
}

impl SimRng {
    pub fn new(seed: u64) -> Self {
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(seed),
            spare_normal: None,
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Draw a raw u64 (full range).
    pub fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        assert!(n > 0, "n must be > 0");
        self.inner.gen_range(0..n)
    }

    /// Roll an integer uniformly in [low, high).
    pub fn uniform_int(&mut self, low: u32, high: u32) -> u32 {
        assert!(high > low, "empty range {low}..{high}");
        low + self.next_u64_below(u64::from(high - low)) as u32
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Pick an index with probability proportional to `weights[i]`.
    /// Falls back to the last index if rounding leaves the roll unmatched.
    pub fn pick_weighted(&mut self, weights: &[f64]) -> usize {
        assert!(!weights.is_empty(), "weights must be non-empty");
        let total: f64 = weights.iter().sum();
        let roll = self.next_f64() * total;
        let mut cumulative = 0.0;
        for (i, w) in weights.iter().enumerate() {
            cumulative += w;
            if roll < cumulative {
                return i;
            }
        }
        weights.len() - 1
    }

    /// Sample a normal distribution (Box-Muller, second variate cached).
    pub fn normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        if let Some(z) = self.spare_normal.take() {
            return mean + std_dev * z;
        }
        // u1 in (0, 1] so ln() stays finite.
        let u1 = 1.0 - self.next_f64();
        let u2 = self.next_f64();
        let radius = (-2.0 * u1.ln()).sqrt();
        let theta = std::f64::consts::TAU * u2;
        self.spare_normal = Some(radius * theta.sin());
        mean + std_dev * radius * theta.cos()
    }

    /// Sample a Poisson count (Knuth's multiplication method).
    pub fn poisson(&mut self, lambda: f64) -> u64 {
        if lambda <= 0.0 {
            return 0;
        }
        if lambda > POISSON_SPLIT_LAMBDA {
            let half = lambda / 2.0;
            return self.poisson(half) + self.poisson(half);
        }
        let limit = (-lambda).exp();
        let mut k = 0u64;
        let mut product = 1.0 - self.next_f64();
        while product > limit {
            k += 1;
            product *= 1.0 - self.next_f64();
        }
        k
    }
}
