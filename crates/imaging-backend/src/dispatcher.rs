use std::time::{Duration, Instant};

use imaging_image::{Image, ImageBuffer, ImageError};
use imaging_imgproc::deconvolution::{deconvolve_buffer, DeconvolutionParams};
use imaging_imgproc::denoise::{rank_filter_buffer, VectorMedianConfig, VmfPolicy};
use imaging_imgproc::parallel::ExecutionStrategy;
use imaging_imgproc::FilterError;

use crate::accelerator::{Accelerator, BackendChoice, NoAccelerator};
use crate::error::{ComputeError, DispatchError};

/// Dispatcher settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Rerun on the CPU when the accelerator kernel faults instead of returning the fault.
    pub fallback_on_fault: bool,
    /// Hardware threads kept free for the caller while a CPU filter runs. Zero uses the
    /// strategy of the filter configuration.
    pub reserved_threads: usize,
}

/// Output of one dispatched call.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReport {
    /// The filtered buffer, with the layout of the input.
    pub image: ImageBuffer,
    /// The path that produced `image`.
    pub backend: BackendChoice,
    /// Wall-clock time of the call, probe included.
    pub elapsed: Duration,
    /// Why the CPU was used, when an accelerator path was considered.
    pub fallback_reason: Option<String>,
}

/// Routes filter calls to the accelerator or to the CPU operators.
///
/// The accelerator is probed on every call. When the probe fails or reports no device, the
/// call runs on the CPU and the reason is logged and returned in the report.
pub struct BackendDispatcher {
    accelerator: Box<dyn Accelerator>,
    config: DispatchConfig,
}

impl Default for BackendDispatcher {
    fn default() -> Self {
        Self::cpu_only(DispatchConfig::default())
    }
}

impl std::fmt::Debug for BackendDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendDispatcher")
            .field("accelerator", &self.accelerator.name())
            .field("config", &self.config)
            .finish()
    }
}

impl BackendDispatcher {
    /// Create a dispatcher using `accelerator` when it reports a device.
    pub fn new(accelerator: Box<dyn Accelerator>, config: DispatchConfig) -> Self {
        Self {
            accelerator,
            config,
        }
    }

    /// Create a dispatcher that always runs on the CPU.
    pub fn cpu_only(config: DispatchConfig) -> Self {
        Self::new(Box::new(NoAccelerator), config)
    }

    /// The dispatcher settings.
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Decide the backend for one call.
    ///
    /// Returns the fallback reason when the CPU has to be used.
    pub fn select_backend(&self) -> Result<(), String> {
        match self.accelerator.probe() {
            Ok(probe) if probe.is_usable() => Ok(()),
            Ok(probe) if !probe.available => {
                Err(format!("accelerator `{}` is not available", self.accelerator.name()))
            }
            Ok(_) => Err(ComputeError::NoDevice.to_string()),
            Err(e) => Err(e.to_string()),
        }
    }

    fn cpu_strategy(&self, strategy: ExecutionStrategy) -> ExecutionStrategy {
        match self.config.reserved_threads {
            0 => strategy,
            reserved => ExecutionStrategy::reserving(reserved),
        }
    }

    /// Rank-filter a buffer: scalar median for one channel, vector median for three.
    ///
    /// Only three channel buffers filtered with the 3x3 vector median policy are eligible for
    /// the accelerator; everything else runs on the CPU.
    pub fn vector_median(
        &self,
        src: &ImageBuffer,
        config: &VectorMedianConfig,
    ) -> Result<DispatchReport, DispatchError> {
        src.ensure_not_empty()?;
        let start = Instant::now();

        let mut cpu_config = *config;
        cpu_config.strategy = self.cpu_strategy(config.strategy);

        let eligible = src.channels() == 3
            && config.radius == 1
            && config.policy == VmfPolicy::VectorMedian;

        let fallback_reason = if !eligible {
            Some("no accelerator kernel for this filter configuration".to_string())
        } else {
            match self.select_backend() {
                Ok(()) => match self.run_accelerated(src) {
                    Ok(image) => {
                        return Ok(self.report(image, BackendChoice::Gpu, start, None));
                    }
                    Err(e) if self.config.fallback_on_fault => {
                        log::error!("accelerator kernel failed, rerunning on the cpu: {e}");
                        Some(e.to_string())
                    }
                    Err(e) => {
                        log::error!("accelerator kernel failed: {e}");
                        return Err(e);
                    }
                },
                Err(reason) => {
                    log::warn!("Failed to use the accelerator, using CPU instead: {reason}");
                    Some(reason)
                }
            }
        };

        let image = rank_filter_buffer(src, &cpu_config)?;
        Ok(self.report(image, BackendChoice::Cpu, start, fallback_reason))
    }

    /// Restore a blurred buffer. Deconvolution has no accelerator kernel and runs on the CPU.
    pub fn deconvolve(
        &self,
        src: &ImageBuffer,
        params: &DeconvolutionParams,
    ) -> Result<DispatchReport, DispatchError> {
        let mut cpu_params = *params;
        cpu_params.strategy = self.cpu_strategy(params.strategy);
        self.run_on_cpu(|| deconvolve_buffer(src, &cpu_params))
    }

    /// Time an arbitrary CPU operator and wrap its output in a report.
    pub fn run_on_cpu<F>(&self, op: F) -> Result<DispatchReport, DispatchError>
    where
        F: FnOnce() -> Result<ImageBuffer, FilterError>,
    {
        let start = Instant::now();
        let image = op()?;
        Ok(self.report(image, BackendChoice::Cpu, start, None))
    }

    fn run_accelerated(&self, src: &ImageBuffer) -> Result<ImageBuffer, DispatchError> {
        let size = src.size();
        // the kernel expects interleaved float samples in [0, 255]
        let input = match src.clone().into_f32()? {
            ImageBuffer::RgbF32(img) => img,
            other => {
                return Err(ImageError::UnsupportedChannels(other.channels()).into());
            }
        };

        // pixels the kernel leaves untouched keep the source value
        let mut output = input.as_slice().to_vec();
        self.accelerator
            .vector_median(&mut output, input.as_slice(), size.height, size.width)?;

        let out = ImageBuffer::RgbF32(Image::new(size, output)?);
        Ok(out.into_sample_type(src.sample_type())?)
    }

    fn report(
        &self,
        image: ImageBuffer,
        backend: BackendChoice,
        start: Instant,
        fallback_reason: Option<String>,
    ) -> DispatchReport {
        let elapsed = start.elapsed();
        log::info!("filter ran on {backend} in {:.3} ms", elapsed.as_secs_f64() * 1e3);
        DispatchReport {
            image,
            backend,
            elapsed,
            fallback_reason,
        }
    }
}
