use std::path::PathBuf;

use imaging_image::ImageError;
use imaging_imgproc::FilterError;

/// Faults of the accelerator path.
///
/// Every variant is recoverable: the dispatcher either falls back to the CPU or surfaces the
/// error to the caller.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ComputeError {
    /// The device query itself failed.
    #[error("Accelerator probe failed: {0}")]
    ProbeFailed(String),

    /// The probe succeeded but no device is present.
    #[error("No accelerator device found")]
    NoDevice,

    /// The shared library holding the kernels could not be opened.
    #[error("Failed to load accelerator library {path}: {reason}")]
    LibraryLoad {
        /// Path of the library.
        path: PathBuf,
        /// Loader message.
        reason: String,
    },

    /// A required kernel symbol is not exported by the library.
    #[error("Accelerator library does not export `{0}`")]
    MissingSymbol(String),

    /// The kernel reported a non-zero status.
    #[error("Accelerator kernel `{kernel}` failed with status {status}")]
    KernelFailed {
        /// Name of the kernel.
        kernel: String,
        /// Status returned by the kernel.
        status: i32,
    },

    /// Input and output buffers do not have the layout the kernel expects.
    #[error("Kernel buffer holds {actual} samples, expected {expected}")]
    LayoutMismatch {
        /// Samples required by the kernel.
        expected: usize,
        /// Samples provided.
        actual: usize,
    },
}

/// Errors surfaced by [`crate::BackendDispatcher`].
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum DispatchError {
    /// The input buffer was rejected.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// The CPU operator failed.
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// The accelerator path failed and fallback is disabled.
    #[error(transparent)]
    Compute(#[from] ComputeError),
}
