// src/processing/convolution.rs
//! Linear convolution through `rustfft`

use crate::error::{EmgErrorBuilder, EmgResult, ProcessingStage};
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

/// FFT convolver that keeps its planner and complex work buffers between calls
pub struct FftConvolver {
    planner: FftPlanner<f64>,
    lhs: Vec<Complex<f64>>,
    rhs: Vec<Complex<f64>>,
}

impl FftConvolver {
    /// Convolver with an empty plan cache
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
            lhs: Vec::new(),
            rhs: Vec::new(),
        }
    }

    /// Full linear convolution written to `out`, which must hold
    /// `a.len() + b.len() - 1` samples
    pub fn convolve_into(&mut self, a: &[f64], b: &[f64], out: &mut [f64]) -> EmgResult<()> {
        if a.is_empty() || b.is_empty() {
            return Err(EmgErrorBuilder::new("convolution", "convolve")
                .processing(ProcessingStage::Convolution, "Empty convolution operand"));
        }

        let full_len = a.len() + b.len() - 1;
        if out.len() != full_len {
            return Err(EmgErrorBuilder::new("convolution", "convolve").processing(
                ProcessingStage::Convolution,
                format!("Output holds {} samples, expected {}", out.len(), full_len),
            ));
        }

        let fft_len = full_len.next_power_of_two();
        load_padded(&mut self.lhs, a, fft_len);
        load_padded(&mut self.rhs, b, fft_len);

        let forward = self.planner.plan_fft_forward(fft_len);
        forward.process(&mut self.lhs);
        forward.process(&mut self.rhs);

        for (l, r) in self.lhs.iter_mut().zip(&self.rhs) {
            *l *= *r;
        }

        let inverse = self.planner.plan_fft_inverse(fft_len);
        inverse.process(&mut self.lhs);

        let scale = 1.0 / fft_len as f64;
        for (o, c) in out.iter_mut().zip(&self.lhs) {
            *o = c.re * scale;
        }

        Ok(())
    }

    /// Full linear convolution into a new vector
    pub fn convolve(&mut self, a: &[f64], b: &[f64]) -> EmgResult<Vec<f64>> {
        let mut out = vec![0.0; (a.len() + b.len()).saturating_sub(1)];
        self.convolve_into(a, b, &mut out)?;
        Ok(out)
    }
}

impl Default for FftConvolver {
    fn default() -> Self {
        Self::new()
    }
}

fn load_padded(buffer: &mut Vec<Complex<f64>>, data: &[f64], len: usize) {
    buffer.clear();
    buffer.extend(data.iter().map(|&x| Complex::new(x, 0.0)));
    buffer.resize(len, Complex::new(0.0, 0.0));
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn direct(a: &[f64], b: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; a.len() + b.len() - 1];
        for (i, x) in a.iter().enumerate() {
            for (j, y) in b.iter().enumerate() {
                out[i + j] += x * y;
            }
        }
        out
    }

    #[test]
    fn test_matches_direct_convolution() {
        let a: Vec<f64> = (0..37).map(|i| (i as f64 * 0.3).sin()).collect();
        let b: Vec<f64> = (0..11).map(|i| 1.0 / (1.0 + i as f64)).collect();

        let mut convolver = FftConvolver::new();
        let fft = convolver.convolve(&a, &b).unwrap();
        let reference = direct(&a, &b);

        assert_eq!(fft.len(), reference.len());
        for (x, y) in fft.iter().zip(&reference) {
            assert_abs_diff_eq!(x, y, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_impulse_is_identity() {
        let signal = [1.0, -2.0, 3.5, 0.25];
        let mut convolver = FftConvolver::new();
        let out = convolver.convolve(&signal, &[1.0]).unwrap();
        for (x, y) in out.iter().zip(&signal) {
            assert_abs_diff_eq!(x, y, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_reuse_across_sizes() {
        let mut convolver = FftConvolver::new();
        let long = convolver.convolve(&[1.0; 100], &[1.0; 3]).unwrap();
        let short = convolver.convolve(&[1.0, 1.0], &[1.0]).unwrap();
        assert_abs_diff_eq!(long[50], 3.0, epsilon = 1e-9);
        assert_eq!(short.len(), 2);
        assert_abs_diff_eq!(short[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_operand_rejected() {
        let mut convolver = FftConvolver::new();
        assert!(convolver.convolve(&[], &[1.0]).is_err());
        let mut out = vec![0.0; 3];
        assert!(convolver.convolve_into(&[1.0, 2.0], &[1.0], &mut out).is_err());
    }
}
