// src/processing/interpolation.rs
//! Time expansion of base-rate waveforms
//!
//! Each base interval `[i, i + 1]` is filled with `factor` samples. Intervals
//! that contain a turning point and have a neighbour on both sides use a
//! 4-point cubic (Catmull-Rom); boundary and monotone intervals use linear
//! interpolation. The output always holds exactly `len * factor` samples.

use crate::error::{EmgErrorBuilder, EmgResult, ProcessingStage};

/// Interpolation used for one base interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// Catmull-Rom through a turning interval
    Cubic,
    /// Straight line between the two samples
    Linear,
}

/// Expand `samples` by an integer factor
pub fn time_expand(samples: &[f32], factor: usize) -> EmgResult<Vec<f32>> {
    if factor == 0 {
        return Err(EmgErrorBuilder::new("interpolation", "time_expand")
            .processing(ProcessingStage::Interpolation, "Expansion factor must be at least 1"));
    }

    let n = samples.len();
    let mut out = Vec::with_capacity(n * factor);
    if factor == 1 {
        out.extend_from_slice(samples);
        return Ok(out);
    }

    for i in 0..n {
        let y1 = samples[i];
        let Some(&y2) = samples.get(i + 1) else {
            // No right neighbour: hold the last value
            out.extend(std::iter::repeat(y1).take(factor));
            break;
        };

        match segment_kind(samples, i) {
            SegmentKind::Cubic => {
                let y0 = samples[i - 1];
                let y3 = samples[i + 2];
                for k in 0..factor {
                    let t = k as f32 / factor as f32;
                    out.push(catmull_rom(y0, y1, y2, y3, t));
                }
            }
            SegmentKind::Linear => {
                for k in 0..factor {
                    let t = k as f32 / factor as f32;
                    out.push(y1 + (y2 - y1) * t);
                }
            }
        }
    }

    Ok(out)
}

/// Classify base interval `i` (between samples `i` and `i + 1`)
pub fn segment_kind(samples: &[f32], i: usize) -> SegmentKind {
    if i == 0 || i + 2 >= samples.len() {
        return SegmentKind::Linear;
    }

    let d0 = samples[i] - samples[i - 1];
    let d1 = samples[i + 1] - samples[i];
    let d2 = samples[i + 2] - samples[i + 1];

    let turning = d0 * d1 <= 0.0 || d1 * d2 <= 0.0;
    if turning && (d0 != 0.0 || d1 != 0.0 || d2 != 0.0) {
        SegmentKind::Cubic
    } else {
        SegmentKind::Linear
    }
}

fn catmull_rom(y0: f32, y1: f32, y2: f32, y3: f32, t: f32) -> f32 {
    let c0 = y1;
    let c1 = 0.5 * (y2 - y0);
    let c2 = y0 - 2.5 * y1 + 2.0 * y2 - 0.5 * y3;
    let c3 = 0.5 * (y3 - y0) + 1.5 * (y1 - y2);
    ((c3 * t + c2) * t + c1) * t + c0
}
