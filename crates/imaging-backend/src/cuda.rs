use std::path::{Path, PathBuf};

use crate::accelerator::{check_layout, Accelerator, DeviceProbe};
use crate::error::ComputeError;

/// `int gpu_device_count(int* count)`, returns 0 on success.
type DeviceCountFn = unsafe extern "C" fn(*mut i32) -> i32;

/// `int run_gpu_filter(float* out, const float* in, size_t rows, size_t cols)`, returns 0 on
/// success.
type VectorFilterFn = unsafe extern "C" fn(*mut f32, *const f32, usize, usize) -> i32;

const DEVICE_COUNT_SYMBOL: &str = "gpu_device_count";
const VECTOR_FILTER_SYMBOL: &str = "run_gpu_filter";

/// Accelerator backed by a shared library exporting the CUDA vector median kernel.
///
/// The library must export two C symbols:
///
/// ```c
/// int gpu_device_count(int* count);
/// int run_gpu_filter(float* out, const float* in, size_t rows, size_t cols);
/// ```
///
/// Both return `0` on success. Any other status is turned into a [`ComputeError`], so a device
/// fault never takes the host process down with it.
pub struct CudaLibraryAccelerator {
    path: PathBuf,
    library: libloading::Library,
}

impl std::fmt::Debug for CudaLibraryAccelerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CudaLibraryAccelerator")
            .field("path", &self.path)
            .finish()
    }
}

impl CudaLibraryAccelerator {
    /// Open the kernel library and check that both symbols are exported.
    ///
    /// # Errors
    ///
    /// Returns [`ComputeError::LibraryLoad`] if the file cannot be opened as a shared library
    /// and [`ComputeError::MissingSymbol`] if a kernel symbol is absent.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ComputeError> {
        let path = path.as_ref().to_path_buf();

        // SAFETY: opening the library runs its initializers. The path comes from the host
        // configuration, which is trusted.
        let library =
            unsafe { libloading::Library::new(&path) }.map_err(|e| ComputeError::LibraryLoad {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        let accelerator = Self { path, library };
        accelerator.device_count_fn()?;
        accelerator.vector_filter_fn()?;

        log::debug!("loaded accelerator library {}", accelerator.path.display());
        Ok(accelerator)
    }

    /// Path of the loaded library.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn device_count_fn(&self) -> Result<libloading::Symbol<'_, DeviceCountFn>, ComputeError> {
        // SAFETY: the symbol type matches the documented C signature.
        unsafe { self.library.get(DEVICE_COUNT_SYMBOL.as_bytes()) }
            .map_err(|_| ComputeError::MissingSymbol(DEVICE_COUNT_SYMBOL.to_string()))
    }

    fn vector_filter_fn(&self) -> Result<libloading::Symbol<'_, VectorFilterFn>, ComputeError> {
        // SAFETY: the symbol type matches the documented C signature.
        unsafe { self.library.get(VECTOR_FILTER_SYMBOL.as_bytes()) }
            .map_err(|_| ComputeError::MissingSymbol(VECTOR_FILTER_SYMBOL.to_string()))
    }
}

impl Accelerator for CudaLibraryAccelerator {
    fn name(&self) -> &str {
        "cuda"
    }

    fn probe(&self) -> Result<DeviceProbe, ComputeError> {
        let device_count = self.device_count_fn()?;
        let mut count = 0i32;
        // SAFETY: `count` outlives the call and is the only pointer handed over.
        let status = unsafe { device_count(&mut count) };
        if status != 0 {
            return Err(ComputeError::ProbeFailed(format!(
                "{DEVICE_COUNT_SYMBOL} returned status {status}"
            )));
        }
        Ok(DeviceProbe {
            available: true,
            device_count: count.max(0) as usize,
        })
    }

    fn vector_median(
        &self,
        output: &mut [f32],
        input: &[f32],
        rows: usize,
        cols: usize,
    ) -> Result<(), ComputeError> {
        check_layout(output, input, rows, cols)?;
        let kernel = self.vector_filter_fn()?;
        // SAFETY: both buffers hold `rows * cols * 3` samples, checked above.
        let status = unsafe { kernel(output.as_mut_ptr(), input.as_ptr(), rows, cols) };
        if status != 0 {
            return Err(ComputeError::KernelFailed {
                kernel: VECTOR_FILTER_SYMBOL.to_string(),
                status,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_library() {
        let err = CudaLibraryAccelerator::load("/definitely/not/here/libvmf_gpu.so")
            .expect_err("library does not exist");
        assert!(matches!(err, ComputeError::LibraryLoad { .. }));
    }

    #[test]
    fn test_corrupt_library() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir
            .path()
            .join(format!("libvmf_gpu.{}", std::env::consts::DLL_EXTENSION));
        std::fs::File::create(&path)?.write_all(b"not a shared library")?;

        let err = CudaLibraryAccelerator::load(&path).expect_err("garbage is not a library");
        match err {
            ComputeError::LibraryLoad { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error {other:?}"),
        }
        Ok(())
    }
}
