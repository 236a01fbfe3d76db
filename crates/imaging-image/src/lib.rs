#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// image representation for computer vision purposes.
pub mod image;

/// Error types for the image module.
pub mod error;

/// Type-erased pixel buffer exchanged at the engine boundary.
pub mod buffer;

/// image conversion operations.
pub mod ops;

pub use crate::buffer::{ImageBuffer, SampleType};
pub use crate::error::ImageError;
pub use crate::image::{Image, ImageDtype, ImageSize};
