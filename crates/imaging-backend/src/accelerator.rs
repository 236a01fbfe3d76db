use crate::error::ComputeError;

/// Result of a device query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct DeviceProbe {
    /// Whether the accelerator runtime answered the query.
    pub available: bool,
    /// Number of usable devices.
    pub device_count: usize,
}

impl DeviceProbe {
    /// A probe reporting no usable device.
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Whether at least one device can run kernels.
    pub fn is_usable(&self) -> bool {
        self.available && self.device_count > 0
    }
}

/// Execution path chosen for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum BackendChoice {
    /// Row-parallel CPU operators.
    Cpu,
    /// Accelerator kernel.
    Gpu,
}

impl std::fmt::Display for BackendChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendChoice::Cpu => write!(f, "cpu"),
            BackendChoice::Gpu => write!(f, "gpu"),
        }
    }
}

/// A device able to run the 3x3 vector median kernel.
///
/// The kernel works on interleaved three channel float samples in `[0, 255]` and fills
/// `output` in place. Faults must be reported as [`ComputeError`], never by aborting.
pub trait Accelerator: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Query the device runtime. Called once per dispatch, the result is not cached.
    fn probe(&self) -> Result<DeviceProbe, ComputeError>;

    /// Run the vector median kernel.
    ///
    /// # Arguments
    ///
    /// * `output` - Destination samples, `rows * cols * 3` long.
    /// * `input` - Source samples, `rows * cols * 3` long.
    /// * `rows` - Image height.
    /// * `cols` - Image width.
    fn vector_median(
        &self,
        output: &mut [f32],
        input: &[f32],
        rows: usize,
        cols: usize,
    ) -> Result<(), ComputeError>;
}

/// Check the buffer lengths against the kernel layout.
pub(crate) fn check_layout(
    output: &[f32],
    input: &[f32],
    rows: usize,
    cols: usize,
) -> Result<(), ComputeError> {
    let expected = rows * cols * 3;
    for actual in [input.len(), output.len()] {
        if actual != expected {
            return Err(ComputeError::LayoutMismatch { expected, actual });
        }
    }
    Ok(())
}

/// The accelerator of hosts without any device.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAccelerator;

impl Accelerator for NoAccelerator {
    fn name(&self) -> &str {
        "none"
    }

    fn probe(&self) -> Result<DeviceProbe, ComputeError> {
        Ok(DeviceProbe::unavailable())
    }

    fn vector_median(
        &self,
        _output: &mut [f32],
        _input: &[f32],
        _rows: usize,
        _cols: usize,
    ) -> Result<(), ComputeError> {
        Err(ComputeError::NoDevice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_usable() {
        assert!(!DeviceProbe::unavailable().is_usable());
        let probe = DeviceProbe {
            available: true,
            device_count: 0,
        };
        assert!(!probe.is_usable());
        let probe = DeviceProbe {
            available: true,
            device_count: 2,
        };
        assert!(probe.is_usable());
    }

    #[test]
    fn test_no_accelerator() -> Result<(), ComputeError> {
        let acc = NoAccelerator;
        assert_eq!(acc.probe()?, DeviceProbe::unavailable());
        let mut out = vec![0.0; 3];
        assert_eq!(
            acc.vector_median(&mut out, &[0.0; 3], 1, 1),
            Err(ComputeError::NoDevice)
        );
        Ok(())
    }

    #[test]
    fn test_check_layout() {
        assert_eq!(check_layout(&[0.0; 6], &[0.0; 6], 1, 2), Ok(()));
        assert_eq!(
            check_layout(&[0.0; 6], &[0.0; 5], 1, 2),
            Err(ComputeError::LayoutMismatch {
                expected: 6,
                actual: 5
            })
        );
    }
}
