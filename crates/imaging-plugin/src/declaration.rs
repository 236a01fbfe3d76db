use crate::capability::Capability;

/// Layout version of [`PluginDeclaration`]. Bumped whenever its fields change.
pub const ABI_VERSION: u32 = 1;

/// Compiler that built this crate. Modules must match it exactly.
pub const RUSTC_VERSION: &str = env!("IMAGING_RUSTC_VERSION");

/// Version of this crate. Modules must match it exactly.
pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the static every module exports, see [`crate::export_plugin`].
pub const DECLARATION_SYMBOL: &str = "imaging_plugin_declaration";

/// Receives the capability of a module during registration.
pub trait PluginRegistrar {
    /// Register the capability of the module. A valid module calls this exactly once.
    fn register(&mut self, capability: Capability);
}

/// The static a module exports under [`DECLARATION_SYMBOL`].
///
/// `abi_version` comes first and the layout is fixed, so the host can read it before trusting
/// any other field.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct PluginDeclaration {
    /// Must equal [`ABI_VERSION`].
    pub abi_version: u32,
    /// Must equal [`RUSTC_VERSION`].
    pub rustc_version: &'static str,
    /// Must equal [`CORE_VERSION`].
    pub core_version: &'static str,
    /// Module name.
    pub name: &'static str,
    /// Module version.
    pub version: &'static str,
    /// Called once by the host after validation.
    ///
    /// # Safety
    ///
    /// Only called by the host after the version fields were checked.
    pub register: unsafe fn(&mut dyn PluginRegistrar),
}

impl std::fmt::Debug for PluginDeclaration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginDeclaration")
            .field("abi_version", &self.abi_version)
            .field("rustc_version", &self.rustc_version)
            .field("core_version", &self.core_version)
            .field("name", &self.name)
            .field("version", &self.version)
            .finish()
    }
}

/// Export the declaration of a module crate.
///
/// The crate must be built as a `cdylib`. The registration function receives the host
/// registrar and registers exactly one [`Capability`].
///
/// ```ignore
/// fn register(registrar: &mut dyn imaging_plugin::PluginRegistrar) {
///     registrar.register(imaging_plugin::Capability::Noise(Box::new(MyNoise)));
/// }
///
/// imaging_plugin::export_plugin!("my-noise", env!("CARGO_PKG_VERSION"), register);
/// ```
#[macro_export]
macro_rules! export_plugin {
    ($name:expr, $version:expr, $register:expr) => {
        #[doc(hidden)]
        #[no_mangle]
        #[allow(non_upper_case_globals)]
        pub static imaging_plugin_declaration: $crate::PluginDeclaration =
            $crate::PluginDeclaration {
                abi_version: $crate::ABI_VERSION,
                rustc_version: $crate::RUSTC_VERSION,
                core_version: $crate::CORE_VERSION,
                name: $name,
                version: $version,
                register: $register,
            };
    };
}
