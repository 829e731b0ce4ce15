// src/processing/filters/iir.rs
//! IIR (Infinite Impulse Response) digital filters

use super::{BandType, FilterError, IirCoefficients};
use crate::config::constants::filters::{MAX_FILTER_ORDER, MIN_FILTER_ORDER};
use std::f64::consts::PI;

/// One IIR section (first or second order)
#[derive(Debug, Clone)]
pub struct IirFilter {
    coefficients: IirCoefficients,
    x_history: Vec<f64>,
    y_history: Vec<f64>,
    order: usize,
}

impl IirFilter {
    /// Create filter from coefficients
    pub fn new(coefficients: IirCoefficients) -> Result<Self, FilterError> {
        if coefficients.a.is_empty() || coefficients.b.is_empty() {
            return Err(FilterError::InvalidCoefficients("Empty coefficient vector".to_string()));
        }
        if coefficients.a[0] == 0.0 {
            return Err(FilterError::InvalidCoefficients("a[0] must be non-zero".to_string()));
        }

        let order = coefficients.a.len() - 1;
        Ok(Self {
            x_history: vec![0.0; coefficients.b.len()],
            y_history: vec![0.0; coefficients.a.len() - 1],
            coefficients,
            order,
        })
    }

    /// Direct Form I step; `y_history[k]` holds `y[n - 1 - k]` on entry
    pub fn process_sample(&mut self, input: f64) -> f64 {
        self.x_history.rotate_right(1);
        self.x_history[0] = input;

        let coeffs = &self.coefficients;
        let forward: f64 = coeffs.b.iter().zip(&self.x_history).map(|(b, x)| b * x).sum();
        let feedback: f64 = coeffs.a[1..].iter().zip(&self.y_history).map(|(a, y)| a * y).sum();
        let output = (forward - feedback) / coeffs.a[0];

        if !self.y_history.is_empty() {
            self.y_history.rotate_right(1);
            self.y_history[0] = output;
        }
        output
    }

    /// Reset filter state
    pub fn reset(&mut self) {
        self.x_history.fill(0.0);
        self.y_history.fill(0.0);
    }

    /// Get filter order
    pub fn order(&self) -> usize {
        self.order
    }

    /// Section coefficients
    pub fn coefficients(&self) -> &IirCoefficients {
        &self.coefficients
    }
}

/// Butterworth filter realised as a cascade of first/second order sections
#[derive(Debug, Clone)]
pub struct ButterworthCascade {
    sections: Vec<IirFilter>,
    order: usize,
}

impl ButterworthCascade {
    /// Design a Butterworth lowpass or highpass of the given order
    pub fn design(order: usize, cutoff: f32, sample_rate: f32, band_type: BandType) -> Result<Self, FilterError> {
        if !(MIN_FILTER_ORDER..=MAX_FILTER_ORDER).contains(&order) {
            return Err(FilterError::InvalidParameters("Order must be 1-8".to_string()));
        }
        if cutoff <= 0.0 || cutoff >= sample_rate / 2.0 {
            return Err(FilterError::InvalidParameters("Invalid cutoff frequency".to_string()));
        }

        // Pre-warp frequency for bilinear transform
        let k = (PI * cutoff as f64 / sample_rate as f64).tan();

        let mut sections = Vec::with_capacity(order / 2 + 1);
        for pair in 0..order / 2 {
            let q = 1.0 / (2.0 * (PI * (2 * pair + 1) as f64 / (2 * order) as f64).cos());
            sections.push(IirFilter::new(second_order_section(k, q, band_type))?);
        }
        if order % 2 == 1 {
            sections.push(IirFilter::new(first_order_section(k, band_type))?);
        }

        Ok(Self { sections, order })
    }

    /// Run one sample through every section
    pub fn process_sample(&mut self, input: f64) -> f64 {
        self.sections
            .iter_mut()
            .fold(input, |acc, section| section.process_sample(acc))
    }

    /// Zero every section's history
    pub fn reset(&mut self) {
        for section in &mut self.sections {
            section.reset();
        }
    }

    /// Design order
    pub fn order(&self) -> usize {
        self.order
    }

    /// Number of first/second-order sections
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }
}

fn first_order_section(k: f64, band_type: BandType) -> IirCoefficients {
    let norm = 1.0 + k;
    let a = vec![1.0, (k - 1.0) / norm];
    match band_type {
        BandType::Lowpass => IirCoefficients { b: vec![k / norm, k / norm], a },
        BandType::Highpass => IirCoefficients { b: vec![1.0 / norm, -1.0 / norm], a },
    }
}

fn second_order_section(k: f64, q: f64, band_type: BandType) -> IirCoefficients {
    let k2 = k * k;
    let norm = 1.0 + k / q + k2;
    let a = vec![1.0, (2.0 * k2 - 2.0) / norm, (1.0 - k / q + k2) / norm];
    match band_type {
        BandType::Lowpass => IirCoefficients {
            b: vec![k2 / norm, 2.0 * k2 / norm, k2 / norm],
            a,
        },
        BandType::Highpass => IirCoefficients {
            b: vec![1.0 / norm, -2.0 / norm, 1.0 / norm],
            a,
        },
    }
}
