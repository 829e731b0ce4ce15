// src/simulation/buffer_pool.rs
//! Fibre contribution buffers of one motor unit
//!
//! Slot 0 holds the composite buffer (base rate, every low-acceleration fibre
//! summed). Slots 1.. hold one jitterable buffer each, sampled at
//! `base * expansion_factor`. The cannula pickup is kept beside the slots.

use crate::error::{EmgErrorBuilder, EmgResult};
use crate::utils::max_slope_index;

/// One fibre (or composite) contribution
#[derive(Debug, Clone, PartialEq)]
pub struct FibreBuffer {
    fibre_id: i32,
    samples: Vec<f32>,
    expansion_factor: usize,
}

impl FibreBuffer {
    /// Zeroed base-rate accumulator
    pub fn composite(base_sample_count: usize) -> Self {
        Self {
            fibre_id: 0,
            samples: vec![0.0; base_sample_count],
            expansion_factor: 1,
        }
    }

    /// Buffer of `samples` at `expansion_factor` times the base rate (at least 1)
    pub fn new(fibre_id: i32, samples: Vec<f32>, expansion_factor: usize) -> Self {
        Self {
            fibre_id,
            samples,
            expansion_factor: expansion_factor.max(1),
        }
    }

    /// Source fibre, 0 for the composite
    pub fn fibre_id(&self) -> i32 {
        self.fibre_id
    }

    /// Stored samples at the buffer's own rate
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Stored sample count
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Rate multiple of the base rate
    pub fn expansion_factor(&self) -> usize {
        self.expansion_factor
    }

    /// Sample count at base rate
    pub fn base_sample_count(&self) -> usize {
        self.samples.len() / self.expansion_factor
    }

    /// Expanded-rate index of the steepest step
    pub fn max_slope_index(&self) -> Option<usize> {
        max_slope_index(&self.samples)
    }

    /// Sample-wise add of an equally long waveform
    pub fn accumulate(&mut self, samples: &[f32]) -> EmgResult<()> {
        if samples.len() != self.samples.len() {
            return Err(EmgErrorBuilder::new("buffer_pool", "accumulate").invalid_data(
                "fibre waveform",
                format!("{} samples added to a {}-sample buffer", samples.len(), self.samples.len()),
            ));
        }
        for (acc, &s) in self.samples.iter_mut().zip(samples) {
            *acc += s;
        }
        Ok(())
    }
}

/// All contribution buffers of one MUP
#[derive(Debug, Clone, Default)]
pub struct FibrePool {
    slots: Vec<Option<FibreBuffer>>,
    cannula: Option<FibreBuffer>,
}

impl FibrePool {
    /// Empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted slots
    pub fn from_parts(slots: Vec<Option<FibreBuffer>>, cannula: Option<FibreBuffer>) -> Self {
        Self { slots, cannula }
    }

    /// Number of slots, composite included
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// No slot or cannula holds a buffer
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none) && self.cannula.is_none()
    }

    /// True when any tip-side buffer holds samples
    pub fn has_tip_data(&self) -> bool {
        self.slots.iter().flatten().any(|b| b.sample_count() > 0)
    }

    /// Buffer in slot `index`, if present
    pub fn get(&self, index: usize) -> Option<&FibreBuffer> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// All slots, absent ones as `None`
    pub fn slots(&self) -> &[Option<FibreBuffer>] {
        &self.slots
    }

    /// Slot 0
    pub fn composite(&self) -> Option<&FibreBuffer> {
        self.get(0)
    }

    /// Cannula pickup
    pub fn cannula(&self) -> Option<&FibreBuffer> {
        self.cannula.as_ref()
    }

    /// Jitterable buffers with their slot index
    pub fn jitterable(&self) -> impl Iterator<Item = (usize, &FibreBuffer)> {
        self.slots
            .iter()
            .enumerate()
            .skip(1)
            .filter_map(|(i, slot)| slot.as_ref().map(|b| (i, b)))
    }

    /// Present jitterable buffers
    pub fn jitterable_count(&self) -> usize {
        self.jitterable().count()
    }

    /// Add a base-rate waveform into slot 0, creating it on demand
    pub fn add_to_composite(&mut self, samples: &[f32]) -> EmgResult<()> {
        if self.slots.is_empty() {
            self.slots.push(None);
        }
        self.slots[0]
            .get_or_insert_with(|| FibreBuffer::composite(samples.len()))
            .accumulate(samples)
    }

    /// Store a jitterable buffer and return its slot
    pub fn push_jitterable(&mut self, buffer: FibreBuffer) -> usize {
        if self.slots.is_empty() {
            // slot 0 stays absent until a composite contribution arrives
            self.slots.push(None);
        }
        self.slots.push(Some(buffer));
        self.slots.len() - 1
    }

    /// Add a base-rate waveform into the cannula buffer
    pub fn add_to_cannula(&mut self, samples: &[f32]) -> EmgResult<()> {
        self.cannula
            .get_or_insert_with(|| FibreBuffer::composite(samples.len()))
            .accumulate(samples)
    }

    /// Check slot layout against the base sample count
    pub fn check_invariants(&self, base_sample_count: usize) -> EmgResult<()> {
        let fail = |reason: String| {
            Err(EmgErrorBuilder::new("buffer_pool", "check_invariants").invalid_data("fibre pool", reason))
        };

        if let Some(composite) = self.composite() {
            if composite.expansion_factor() != 1 || composite.sample_count() != base_sample_count {
                return fail(format!(
                    "composite holds {} samples at factor {}, expected {} at factor 1",
                    composite.sample_count(),
                    composite.expansion_factor(),
                    base_sample_count
                ));
            }
        }

        for (slot, buffer) in self.jitterable() {
            let count = buffer.sample_count();
            let factor = buffer.expansion_factor();
            if count % factor != 0 || count / factor != base_sample_count {
                return fail(format!(
                    "slot {} holds {} samples, not a multiple {} of base {}",
                    slot, count, factor, base_sample_count
                ));
            }
        }

        if let Some(cannula) = &self.cannula {
            if cannula.sample_count() != base_sample_count {
                return fail(format!(
                    "cannula holds {} samples, expected {}",
                    cannula.sample_count(),
                    base_sample_count
                ));
            }
        }

        Ok(())
    }

    /// Drop every buffer
    pub fn clear(&mut self) {
        self.slots.clear();
        self.cannula = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_accumulates() {
        let mut pool = FibrePool::new();
        pool.add_to_composite(&[1.0, 2.0, 3.0]).unwrap();
        pool.add_to_composite(&[0.5, 0.5, 0.5]).unwrap();

        assert_eq!(pool.len(), 1);
        assert_eq!(pool.composite().unwrap().samples(), &[1.5, 2.5, 3.5]);
        assert!(pool.add_to_composite(&[1.0]).is_err());
    }

    #[test]
    fn test_first_jitterable_leaves_slot_zero_absent() {
        let mut pool = FibrePool::new();
        let slot = pool.push_jitterable(FibreBuffer::new(7, vec![0.0; 30], 30));

        assert_eq!(slot, 1);
        assert_eq!(pool.len(), 2);
        assert!(pool.composite().is_none());
        assert_eq!(pool.jitterable_count(), 1);

        pool.add_to_composite(&[1.0]).unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.composite().unwrap().samples(), &[1.0]);
    }

    #[test]
    fn test_invariants() {
        let mut pool = FibrePool::new();
        pool.add_to_composite(&[0.0; 4]).unwrap();
        pool.push_jitterable(FibreBuffer::new(3, vec![0.0; 12], 3));
        assert!(pool.check_invariants(4).is_ok());

        pool.push_jitterable(FibreBuffer::new(4, vec![0.0; 10], 3));
        assert!(pool.check_invariants(4).is_err());
    }

    #[test]
    fn test_cannula_is_separate() {
        let mut pool = FibrePool::new();
        pool.add_to_cannula(&[1.0, -1.0]).unwrap();
        assert_eq!(pool.len(), 0);
        assert!(!pool.has_tip_data());
        assert!(!pool.is_empty());
        assert_eq!(pool.cannula().unwrap().samples(), &[1.0, -1.0]);
    }
}
