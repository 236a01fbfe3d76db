use imaging_image::ImageError;

use crate::parallel::ParallelError;

/// Errors returned by the filtering and restoration operators.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum FilterError {
    /// The input or output image is not valid for the operation.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// The row-parallel executor could not run.
    #[error(transparent)]
    Parallel(#[from] ParallelError),

    /// A parameter is outside of its valid range.
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Name of the offending parameter.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}
