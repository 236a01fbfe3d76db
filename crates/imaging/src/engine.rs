use std::path::PathBuf;
use std::time::Instant;

use imaging_backend::{
    Accelerator, BackendChoice, BackendDispatcher, CudaLibraryAccelerator, DispatchReport,
    NoAccelerator,
};
use imaging_image::ImageBuffer;
use imaging_imgproc::denoise::{median_filter_buffer, rank_filter_buffer_dual, VmfPolicy};
use imaging_imgproc::filter::{gaussian_blur_buffer, sobel_buffer};
use imaging_imgproc::morphology::{morphology_buffer, MorphOp};
use imaging_imgproc::threshold::binarize_buffer;
use imaging_plugin::{Invocation, Parameters, PluginRegistry};

use crate::config::EngineConfig;
use crate::error::EngineError;

/// Side of the gaussian kernel used to synthesize blurred inputs.
pub const DEFAULT_BLUR_KERNEL: usize = 15;

/// Side of the sobel kernel used by [`Operation::Sobel`].
pub const SOBEL_KERNEL: usize = 3;

/// A call on a plugin module.
#[derive(Debug, Clone, PartialEq)]
pub enum PluginCall {
    /// Filter the input.
    Filter,
    /// Filter the input together with a second co-located frame.
    FilterPair {
        /// The second frame.
        second: ImageBuffer,
    },
    /// Add noise to `density` of the pixels.
    Noise {
        /// Fraction of corrupted pixels in `[0, 1]`.
        density: f32,
    },
    /// Enhance with the named method.
    ColorEnhance {
        /// Name of the method.
        method: String,
    },
    /// Run an instrument, with its default parameters if `parameters` is `None`.
    Instrument {
        /// Parameters of the call.
        parameters: Option<Parameters>,
    },
}

/// Operation applied by [`Engine::apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Vector median for color buffers, scalar median for gray ones. May run on the accelerator.
    VectorMedian,
    /// Alpha-trimmed mean of the best ranked samples.
    AlphaTrimmedMean,
    /// Scalar median of every channel.
    Median,
    /// Dual-frame vector median with a second co-located frame.
    VectorMedianDual {
        /// The second frame.
        second: ImageBuffer,
    },
    /// Richardson-Lucy deconvolution.
    Deconvolve,
    /// Gaussian blur with a square kernel.
    GaussianBlur {
        /// Side of the kernel, must be odd.
        kernel_size: usize,
        /// Standard deviation, derived from the kernel size when not positive.
        sigma: f32,
    },
    /// Sobel edge map of the luminance, returned as a single channel buffer.
    Sobel,
    /// Binary threshold of the luminance, returned as a single channel buffer.
    Binarize {
        /// Threshold in sample units, see [`imaging_imgproc::threshold::DEFAULT_THRESHOLD`].
        threshold: f32,
    },
    /// Erosion, dilation, opening or closing of the luminance with a square element.
    Morphology {
        /// The operation.
        op: MorphOp,
        /// Half side of the structuring element.
        radius: usize,
    },
    /// Call a plugin module.
    Plugin {
        /// Path of the module file.
        path: PathBuf,
        /// The call.
        call: PluginCall,
    },
}

impl Operation {
    /// Gaussian blur with the default kernel and a sigma derived from it.
    pub fn default_blur() -> Self {
        Operation::GaussianBlur {
            kernel_size: DEFAULT_BLUR_KERNEL,
            sigma: 0.0,
        }
    }

    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::VectorMedian => "vector median",
            Operation::AlphaTrimmedMean => "alpha-trimmed mean",
            Operation::Median => "median",
            Operation::VectorMedianDual { .. } => "dual-frame vector median",
            Operation::Deconvolve => "deconvolution",
            Operation::GaussianBlur { .. } => "gaussian blur",
            Operation::Sobel => "sobel",
            Operation::Binarize { .. } => "binarization",
            Operation::Morphology { op, .. } => op.name(),
            Operation::Plugin { .. } => "plugin",
        }
    }
}

/// Entry point of the restoration engine.
///
/// The engine owns the backend dispatcher and the plugin registry. Each call takes a buffer and
/// returns a new one.
///
/// # Example
///
/// ```
/// use imaging::{Engine, EngineConfig, Operation};
/// use imaging::image::{ImageBuffer, ImageSize};
///
/// let engine = Engine::new(EngineConfig::default());
/// let noisy = ImageBuffer::from_u8(ImageSize { width: 4, height: 4 }, 3, vec![128; 48])?;
/// let filtered = engine.apply(noisy, Operation::VectorMedian)?;
/// assert_eq!(filtered.channels(), 3);
/// # Ok::<(), imaging::EngineError>(())
/// ```
pub struct Engine {
    config: EngineConfig,
    dispatcher: BackendDispatcher,
    registry: PluginRegistry,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("dispatcher", &self.dispatcher)
            .field("registry", &self.registry)
            .finish()
    }
}

impl Engine {
    /// Build an engine from its configuration.
    ///
    /// A missing or broken accelerator library and an unreadable plugin directory are logged
    /// and leave the engine on the CPU, respectively without plugins.
    pub fn new(config: EngineConfig) -> Self {
        let accelerator: Box<dyn Accelerator> = match &config.accelerator_library {
            Some(path) => match CudaLibraryAccelerator::load(path) {
                Ok(accelerator) => Box::new(accelerator),
                Err(e) => {
                    log::warn!("Failed to load the accelerator library, using CPU only: {e}");
                    Box::new(NoAccelerator)
                }
            },
            None => Box::new(NoAccelerator),
        };

        let dispatcher = BackendDispatcher::new(accelerator, config.dispatch);
        let registry = PluginRegistry::with_loader(
            config.registry.clone(),
            Box::new(imaging_plugin::DynamicLibraryLoader),
        );

        let mut engine = Self::with_parts(config, dispatcher, registry);
        if engine.config.plugin_dir.is_some() {
            if let Err(e) = engine.rescan() {
                log::warn!("Failed to scan the plugin directory: {e}");
            }
        }
        engine
    }

    /// Assemble an engine from already built parts. No directory is scanned.
    pub fn with_parts(
        config: EngineConfig,
        dispatcher: BackendDispatcher,
        registry: PluginRegistry,
    ) -> Self {
        Self {
            config,
            dispatcher,
            registry,
        }
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The backend dispatcher.
    pub fn dispatcher(&self) -> &BackendDispatcher {
        &self.dispatcher
    }

    /// The plugin registry.
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Clear the plugin registry and rebuild it from the configured directory.
    ///
    /// Returns the number of active plugins.
    pub fn rescan(&mut self) -> Result<usize, EngineError> {
        let dir = self
            .config
            .plugin_dir
            .as_ref()
            .ok_or(EngineError::NoPluginDirectory)?;
        Ok(self.registry.scan(dir)?)
    }

    /// Apply an operation, consuming the input buffer.
    pub fn apply(&self, input: ImageBuffer, op: Operation) -> Result<ImageBuffer, EngineError> {
        Ok(self.dispatch(&input, &op)?.image)
    }

    /// Apply an operation and report the backend and the elapsed time.
    ///
    /// The input is borrowed and left unchanged whatever the outcome.
    pub fn dispatch(
        &self,
        input: &ImageBuffer,
        op: &Operation,
    ) -> Result<DispatchReport, EngineError> {
        input.ensure_not_empty()?;
        log::debug!(
            "applying {} to a {} {}x{} buffer",
            op.name(),
            input.size(),
            input.sample_type(),
            input.channels()
        );

        let vmf = &self.config.vector_median;
        let report = match op {
            Operation::VectorMedian => self
                .dispatcher
                .vector_median(input, &vmf.with_policy(VmfPolicy::VectorMedian))?,
            Operation::AlphaTrimmedMean => self
                .dispatcher
                .vector_median(input, &vmf.with_policy(VmfPolicy::AlphaTrimmedMean))?,
            Operation::Median => self
                .dispatcher
                .run_on_cpu(|| median_filter_buffer(input, vmf.radius, vmf.strategy))?,
            Operation::VectorMedianDual { second } => self
                .dispatcher
                .run_on_cpu(|| rank_filter_buffer_dual(input, second, vmf))?,
            Operation::Deconvolve => self
                .dispatcher
                .deconvolve(input, &self.config.deconvolution)?,
            Operation::GaussianBlur { kernel_size, sigma } => self
                .dispatcher
                .run_on_cpu(|| gaussian_blur_buffer(input, *kernel_size, *sigma))?,
            Operation::Sobel => self
                .dispatcher
                .run_on_cpu(|| sobel_buffer(input, SOBEL_KERNEL))?,
            Operation::Binarize { threshold } => self
                .dispatcher
                .run_on_cpu(|| binarize_buffer(input, *threshold))?,
            Operation::Morphology { op, radius } => self
                .dispatcher
                .run_on_cpu(|| morphology_buffer(input, *op, *radius))?,
            Operation::Plugin { path, call } => {
                let start = Instant::now();
                let invocation = match call {
                    PluginCall::Filter => Invocation::Filter(input),
                    PluginCall::FilterPair { second } => Invocation::FilterPair(input, second),
                    PluginCall::Noise { density } => Invocation::Noise {
                        input,
                        density: *density,
                    },
                    PluginCall::ColorEnhance { method } => Invocation::ColorEnhance {
                        input,
                        method: method.as_str(),
                    },
                    PluginCall::Instrument { parameters } => Invocation::Instrument {
                        input,
                        parameters: parameters.as_ref(),
                    },
                };
                let image = self.registry.invoke(path, invocation)?;
                let elapsed = start.elapsed();
                log::info!(
                    "plugin {} ran in {:.3} ms",
                    path.display(),
                    elapsed.as_secs_f64() * 1e3
                );
                DispatchReport {
                    image,
                    backend: BackendChoice::Cpu,
                    elapsed,
                    fallback_reason: None,
                }
            }
        };
        Ok(report)
    }
}
