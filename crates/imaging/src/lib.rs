#![doc = env!("CARGO_PKG_DESCRIPTION")]

#[doc(inline)]
pub use imaging_image as image;

#[doc(inline)]
pub use imaging_imgproc as imgproc;

#[doc(inline)]
pub use imaging_backend as backend;

#[doc(inline)]
pub use imaging_plugin as plugin;

/// engine settings loaded from JSON.
pub mod config;

/// operations and the engine that runs them.
pub mod engine;

/// error types for the engine.
pub mod error;

pub use crate::config::EngineConfig;
pub use crate::engine::{Engine, Operation, PluginCall};
pub use crate::error::EngineError;
