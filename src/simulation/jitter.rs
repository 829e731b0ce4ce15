// src/simulation/jitter.rs
//! Jitter draws and synthesis options

use crate::config::{ReferenceSetup, SimulationConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use std::f64::consts::SQRT_2;

/// Source of standard normal deviates for jitter offsets
pub trait JitterSource {
    /// Next N(0, 1) deviate
    fn standard_normal(&mut self) -> f64;
}

/// Seeded Gaussian stream; one per run, consumed in firing order
pub struct GaussianJitter {
    rng: StdRng,
}

impl GaussianJitter {
    /// Reproducible stream when `seed` is set, entropy-seeded otherwise
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    /// Stream seeded from the jitter settings
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(config.jitter.seed)
    }
}

impl JitterSource for GaussianJitter {
    fn standard_normal(&mut self) -> f64 {
        StandardNormal.sample(&mut self.rng)
    }
}

/// Replays a fixed sequence of deviates, cycling at the end
#[derive(Debug, Clone)]
pub struct ScriptedJitter {
    values: Vec<f64>,
    position: usize,
}

impl ScriptedJitter {
    /// Replay `values`; an empty script yields zeros
    pub fn new(values: Vec<f64>) -> Self {
        Self { values, position: 0 }
    }

    /// Number of deviates handed out so far
    pub fn draws(&self) -> usize {
        self.position
    }
}

impl JitterSource for ScriptedJitter {
    fn standard_normal(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let value = self.values[self.position % self.values.len()];
        self.position += 1;
        value
    }
}

/// How jitter offsets are obtained for one synthesis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JitterMode {
    /// Fresh draw per jitterable buffer, accumulated for templates
    Individual,
    /// Rounded mean of the draws accumulated since the last reset
    Template,
}

/// Arguments of one jittered synthesis
#[derive(Debug, Clone, Copy)]
pub struct SynthesisOptions {
    /// Draw offsets at all
    pub do_jitter: bool,
    /// Variance in base-rate samples
    pub jitter_variance_samples: f64,
    /// Individual draws or template means
    pub mode: JitterMode,
    /// Which pickups are summed
    pub reference: ReferenceSetup,
}

impl SynthesisOptions {
    /// Options from the run configuration
    pub fn from_config(config: &SimulationConfig, mode: JitterMode) -> Self {
        Self {
            do_jitter: config.jitter.enabled,
            jitter_variance_samples: config.jitter.variance_samples,
            mode,
            reference: config.electrode.reference,
        }
    }

    /// No jitter, tip pickup only
    pub fn unjittered() -> Self {
        Self {
            do_jitter: false,
            jitter_variance_samples: 0.0,
            mode: JitterMode::Individual,
            reference: ReferenceSetup::TipOnly,
        }
    }

    /// Same options in another mode
    pub fn with_mode(mut self, mode: JitterMode) -> Self {
        self.mode = mode;
        self
    }

    /// Same options with another reference
    pub fn with_reference(mut self, reference: ReferenceSetup) -> Self {
        self.reference = reference;
        self
    }
}

/// Offset in expanded-rate units: `round(N(0,1) * variance * factor / sqrt(2))`
pub fn draw_offset(source: &mut dyn JitterSource, variance_samples: f64, expansion_factor: usize) -> i64 {
    (source.standard_normal() * variance_samples * expansion_factor as f64 / SQRT_2).round() as i64
}

/// Running sum and count of the draws of one jitterable buffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JitterAccount {
    sum: i64,
    count: u64,
}

impl JitterAccount {
    /// Add one draw
    pub fn record(&mut self, offset: i64) {
        self.sum += offset;
        self.count += 1;
    }

    /// Rounded mean of the recorded draws, 0 before any draw
    pub fn mean_offset(&self) -> i64 {
        if self.count == 0 {
            0
        } else {
            (self.sum as f64 / self.count as f64).round() as i64
        }
    }

    /// Draws recorded
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Forget every draw
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_stream_is_reproducible() {
        let mut a = GaussianJitter::new(Some(42));
        let mut b = GaussianJitter::new(Some(42));
        for _ in 0..16 {
            assert_eq!(a.standard_normal(), b.standard_normal());
        }
    }

    #[test]
    fn test_gaussian_moments() {
        let mut source = GaussianJitter::new(Some(7));
        let draws: Vec<f64> = (0..20_000).map(|_| source.standard_normal()).collect();
        let mean = draws.iter().sum::<f64>() / draws.len() as f64;
        let var = draws.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / draws.len() as f64;
        assert!(mean.abs() < 0.05);
        assert!((var - 1.0).abs() < 0.05);
    }

    #[test]
    fn test_draw_offset_scaling() {
        let mut source = ScriptedJitter::new(vec![1.0, -1.0, 0.0]);
        // 1.0 * 0.5 * 30 / sqrt(2) = 10.6
        assert_eq!(draw_offset(&mut source, 0.5, 30), 11);
        assert_eq!(draw_offset(&mut source, 0.5, 30), -11);
        assert_eq!(draw_offset(&mut source, 0.5, 30), 0);
        assert_eq!(source.draws(), 3);
    }

    #[test]
    fn test_account_mean() {
        let mut account = JitterAccount::default();
        assert_eq!(account.mean_offset(), 0);

        account.record(4);
        account.record(-1);
        account.record(3);
        assert_eq!(account.mean_offset(), 2);
        assert_eq!(account.count(), 3);

        account.reset();
        assert_eq!(account.count(), 0);
    }

    #[test]
    fn test_options_from_config() {
        let config = SimulationConfig::default();
        let options = SynthesisOptions::from_config(&config, JitterMode::Template);
        assert_eq!(options.mode, JitterMode::Template);
        assert_eq!(options.do_jitter, config.jitter.enabled);
        assert_eq!(options.reference, config.electrode.reference);
    }
}
