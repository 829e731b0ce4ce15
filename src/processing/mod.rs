// src/processing/mod.rs
//! Numeric primitives shared by the generator, the MUP object and the driver

pub mod convolution;
pub mod filters;
pub mod interpolation;

pub use convolution::FftConvolver;
pub use filters::{ButterworthCascade, ZeroPhaseBandPass};
pub use interpolation::time_expand;
