use std::path::PathBuf;

use imaging_image::ImageError;

use crate::capability::CapabilityKind;

/// Why a module file did not become active.
///
/// A load error only rejects the offending module, the scan carries on with the others.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PluginLoadError {
    /// The scanned directory does not exist.
    #[error("Plugin directory {0} does not exist")]
    DirectoryNotFound(PathBuf),

    /// The directory or file could not be read.
    #[error("Failed to read {path}: {reason}")]
    Io {
        /// The offending path.
        path: PathBuf,
        /// The OS message.
        reason: String,
    },

    /// The file is not a loadable shared library.
    #[error("Failed to open module {path}: {reason}")]
    Open {
        /// The module path.
        path: PathBuf,
        /// The dynamic loader message.
        reason: String,
    },

    /// The library does not export a module declaration.
    #[error("Module {0} does not export a plugin declaration")]
    MissingDeclaration(PathBuf),

    /// The declaration layout version differs from the host.
    #[error("Module ABI version {found} does not match host ABI version {expected}")]
    AbiMismatch {
        /// Host ABI version.
        expected: u32,
        /// Module ABI version.
        found: u32,
    },

    /// The module was built by another compiler.
    #[error("Module was built with `{found}`, host was built with `{expected}`")]
    RustcMismatch {
        /// Host compiler.
        expected: String,
        /// Module compiler.
        found: String,
    },

    /// The module was built against another version of this crate.
    #[error("Module targets imaging-plugin {found}, host provides {expected}")]
    CoreMismatch {
        /// Host version.
        expected: String,
        /// Module version.
        found: String,
    },

    /// The module must register exactly one capability.
    #[error("Module registered {0} capabilities, expected exactly one")]
    RegistrationCount(usize),

    /// The registration function panicked.
    #[error("Module registration panicked: {0}")]
    RegistrationPanicked(String),
}

/// Why an invocation of an active module failed.
///
/// The input buffer is borrowed by every invocation, so it is left unchanged on failure.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PluginInvokeError {
    /// No active module is registered under this path.
    #[error("No active module at {0}")]
    UnknownModule(PathBuf),

    /// The module capability does not offer the requested call.
    #[error("{kind} module does not support `{call}`")]
    UnsupportedCall {
        /// Capability of the module.
        kind: CapabilityKind,
        /// Requested call.
        call: &'static str,
    },

    /// The input buffer was rejected before reaching the module.
    #[error(transparent)]
    InvalidInput(#[from] ImageError),

    /// The module panicked while processing.
    #[error("Module panicked: {0}")]
    Panicked(String),

    /// The module reported an error.
    #[error("Module failed: {0}")]
    Failed(#[from] ProcessError),

    /// The module returned an empty buffer.
    #[error("Module returned an empty image")]
    EmptyOutput,
}

/// Error reported by a module from inside one of its processing calls.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ProcessError {
    /// The input buffer cannot be handled.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// A parameter is outside of its valid range.
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Name of the parameter.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The module does not handle this input layout or method.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Any other processing failure.
    #[error("{0}")]
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoke_error_keeps_image_cause() {
        let cause = ImageError::EmptyImage(0, 4);
        let err = PluginInvokeError::from(ProcessError::from(cause.clone()));
        let copy = err.clone();

        assert_eq!(copy, PluginInvokeError::Failed(ProcessError::Image(cause)));
        assert_eq!(copy.to_string(), "Module failed: Image is empty (0x4)");
    }
}
