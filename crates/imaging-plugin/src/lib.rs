#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// capability interfaces implemented by filter modules.
pub mod capability;

/// the symbol every module exports and the registration handshake.
pub mod declaration;

/// immutable metadata of an active module.
pub mod descriptor;

/// error types for the plugin module.
pub mod error;

/// opening module files.
pub mod loader;

/// directory scan, validation and invocation of modules.
pub mod registry;

pub use crate::capability::{
    Capability, CapabilityKind, ColorEnhancement, Filtering, Instrument, Noise,
};
pub use crate::declaration::{
    PluginDeclaration, PluginRegistrar, ABI_VERSION, CORE_VERSION, DECLARATION_SYMBOL,
    RUSTC_VERSION,
};
pub use crate::descriptor::{ParamValue, Parameters, PluginDescriptor};
pub use crate::error::{PluginInvokeError, PluginLoadError, ProcessError};
pub use crate::loader::{DynamicLibraryLoader, ModuleHandle, ModuleLoader};
pub use crate::registry::{
    Invocation, LoadFailure, ModuleState, PluginEntry, PluginRegistry, RegistryConfig,
};
