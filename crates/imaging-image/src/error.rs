/// An error type for the image module.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ImageError {
    /// Error when the image has no pixels.
    #[error("Image is empty ({0}x{1})")]
    EmptyImage(usize, usize),

    /// Error when channel and shape are not valid.
    #[error("Data length ({0}) does not match the image size ({1})")]
    InvalidChannelShape(usize, usize),

    /// Error when the two image sizes do not match.
    #[error("Image size mismatch: source ({0}x{1}) vs destination ({2}x{3})")]
    InvalidImageSize(usize, usize, usize, usize),

    /// Error when the pixel index is out of bounds.
    #[error("Pixel index ({0}, {1}) is out of bounds ({2}x{3})")]
    PixelIndexOutOfBounds(usize, usize, usize, usize),

    /// Error when the channel index is out of bounds.
    #[error("Channel index ({0}) is out of bounds ({1})")]
    ChannelIndexOutOfBounds(usize, usize),

    /// Error when a pixel value cannot be represented in the target type.
    #[error("Failed to cast image data to {0}")]
    CastError(String),

    /// Error when the channel count is not supported by the engine.
    #[error("Unsupported channel count ({0}), expected 1 or 3")]
    UnsupportedChannels(usize),

    /// Error when the sample type is not the one an operation expects.
    #[error("Unsupported sample type: expected {expected}, got {actual}")]
    UnsupportedSampleType {
        /// The sample type the operation requires.
        expected: String,
        /// The sample type that was provided.
        actual: String,
    },

    /// Error when a filter kernel is empty or has an even length.
    #[error("Invalid kernel length: {0} and {1}")]
    InvalidKernelLength(usize, usize),
}
