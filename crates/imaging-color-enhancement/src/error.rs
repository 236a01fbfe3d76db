use imaging_image::ImageError;
use imaging_plugin::ProcessError;

/// Errors returned by the enhancement operators.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EnhanceError {
    /// The input or output image is not valid for the operation.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// A parameter is outside of its valid range.
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Name of the offending parameter.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The method name is not one of `histEq`, `histAdaptive` or `clahe`.
    #[error("Unknown enhancement method `{0}`")]
    UnknownMethod(String),
}

impl From<EnhanceError> for ProcessError {
    fn from(err: EnhanceError) -> Self {
        match err {
            EnhanceError::Image(e) => ProcessError::Image(e),
            EnhanceError::InvalidParameter { name, reason } => ProcessError::InvalidParameter {
                name: name.to_string(),
                reason,
            },
            EnhanceError::UnknownMethod(_) => ProcessError::Unsupported(err.to_string()),
        }
    }
}
