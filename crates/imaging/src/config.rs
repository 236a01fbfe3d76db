use std::path::{Path, PathBuf};

use imaging_backend::DispatchConfig;
use imaging_imgproc::deconvolution::DeconvolutionParams;
use imaging_imgproc::denoise::VectorMedianConfig;
use imaging_plugin::RegistryConfig;

use crate::error::EngineError;

/// Settings of an [`crate::Engine`].
///
/// Every field has a default, so a JSON document only needs the values that differ:
///
/// ```
/// use imaging::EngineConfig;
///
/// let config = EngineConfig::from_json_str(
///     r#"{ "plugin_dir": "plugins", "deconvolution": { "iterations": 10 } }"#,
/// )?;
/// assert_eq!(config.deconvolution.iterations, 10);
/// assert_eq!(config.deconvolution.kernel_size, 9);
/// assert_eq!(config.vector_median.radius, 1);
/// # Ok::<(), imaging::EngineError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rank filter parameters.
    pub vector_median: VectorMedianConfig,
    /// Richardson-Lucy parameters.
    pub deconvolution: DeconvolutionParams,
    /// Backend selection.
    pub dispatch: DispatchConfig,
    /// Plugin file matching.
    pub registry: RegistryConfig,
    /// Directory scanned for plugins when the engine is built and on every rescan.
    pub plugin_dir: Option<PathBuf>,
    /// Shared library with the accelerator kernels. The engine runs on the CPU without it.
    pub accelerator_library: Option<PathBuf>,
}

impl EngineConfig {
    /// Parse a configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| EngineError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Serialize the configuration to pretty printed JSON.
    pub fn to_json_string(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
