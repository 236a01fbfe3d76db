//! Rank-based denoising
//!
//! Every filter here works on a fixed square window around interior pixels. The outermost
//! `radius` rows and columns are copied from the source unchanged.

/// Pairwise distances between multichannel samples.
pub mod distance;

/// Window extraction around interior pixels.
pub mod neighborhood;

/// Aggregate-distance ranking of window samples.
pub mod ranking;

mod median;
pub use median::*;

mod vector_median;
pub use vector_median::*;
