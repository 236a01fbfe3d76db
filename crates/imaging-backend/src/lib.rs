#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// accelerator probe and kernel interface.
pub mod accelerator;

/// accelerator kernels loaded from a shared library.
pub mod cuda;

/// per-call backend selection with timing and fallback.
pub mod dispatcher;

/// error types for the backend module.
pub mod error;

pub use crate::accelerator::{Accelerator, BackendChoice, DeviceProbe, NoAccelerator};
pub use crate::cuda::CudaLibraryAccelerator;
pub use crate::dispatcher::{BackendDispatcher, DispatchConfig, DispatchReport};
pub use crate::error::{ComputeError, DispatchError};
