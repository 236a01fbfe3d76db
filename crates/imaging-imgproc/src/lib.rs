#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// color space conversions.
pub mod color;

/// rank-based denoising filters (vector median, alpha-trimmed mean, scalar median).
pub mod denoise;

/// iterative Richardson-Lucy restoration.
pub mod deconvolution;

/// error type shared by the operators.
pub mod error;
pub use error::FilterError;

/// image filtering module.
pub mod filter;

/// image processing metrics module.
pub mod metrics;

/// morphological operators (erosion, dilation, opening, closing).
pub mod morphology;

/// border handling for convolutions.
pub mod padding;

/// module containing parallization utilities.
pub mod parallel;

/// thresholding operations.
pub mod threshold;
