#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

use imaging_image::ImageBuffer;
use imaging_imgproc::denoise::{rank_filter_buffer, rank_filter_buffer_dual, VectorMedianConfig};
use imaging_imgproc::parallel::ExecutionStrategy;
use imaging_imgproc::FilterError;
use imaging_plugin::{Capability, Filtering, PluginRegistrar, ProcessError};

/// Hardware threads left to the host while the module filters.
pub const RESERVED_THREADS: usize = 4;

/// Rank filter for gray and color images.
///
/// Gray images go through the scalar median, color images through the vector median. Frame
/// pairs are filtered with the pooled dual-frame vector median.
#[derive(Debug, Clone)]
pub struct VectorFiltering {
    config: VectorMedianConfig,
}

impl Default for VectorFiltering {
    fn default() -> Self {
        Self::new(VectorMedianConfig {
            strategy: ExecutionStrategy::reserving(RESERVED_THREADS),
            ..Default::default()
        })
    }
}

impl VectorFiltering {
    /// A filter with a custom configuration.
    pub fn new(config: VectorMedianConfig) -> Self {
        Self { config }
    }

    /// The filter configuration.
    pub fn config(&self) -> &VectorMedianConfig {
        &self.config
    }
}

fn to_process_error(err: FilterError) -> ProcessError {
    match err {
        FilterError::Image(e) => ProcessError::Image(e),
        FilterError::InvalidParameter { name, reason } => ProcessError::InvalidParameter {
            name: name.to_string(),
            reason,
        },
        other => ProcessError::Failed(other.to_string()),
    }
}

impl Filtering for VectorFiltering {
    fn context_menu_label(&self) -> String {
        "Filter".to_string()
    }

    fn process(&self, input: &ImageBuffer) -> Result<ImageBuffer, ProcessError> {
        rank_filter_buffer(input, &self.config).map_err(to_process_error)
    }

    fn process_pair(
        &self,
        first: &ImageBuffer,
        second: &ImageBuffer,
    ) -> Result<ImageBuffer, ProcessError> {
        rank_filter_buffer_dual(first, second, &self.config).map_err(to_process_error)
    }
}

fn register(registrar: &mut dyn PluginRegistrar) {
    registrar.register(Capability::Filtering(Box::new(VectorFiltering::default())));
}

imaging_plugin::export_plugin!("vector-filtering", env!("CARGO_PKG_VERSION"), register);
