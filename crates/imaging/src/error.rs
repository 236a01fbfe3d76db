use std::path::PathBuf;

use imaging_backend::DispatchError;
use imaging_image::ImageError;
use imaging_imgproc::FilterError;
use imaging_plugin::{PluginInvokeError, PluginLoadError};

/// Errors surfaced by the [`crate::Engine`].
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// The configuration file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    ConfigIo {
        /// The config file.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// The configuration is not valid JSON for [`crate::EngineConfig`].
    #[error("Invalid engine config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// A rescan was requested without a plugin directory.
    #[error("No plugin directory configured")]
    NoPluginDirectory,

    /// The input buffer was rejected.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// A CPU operator failed.
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// The dispatched filter failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The plugin directory could not be scanned.
    #[error(transparent)]
    PluginLoad(#[from] PluginLoadError),

    /// A plugin call failed.
    #[error(transparent)]
    PluginInvoke(#[from] PluginInvokeError),
}
