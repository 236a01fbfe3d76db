use std::path::Path;

use crate::declaration::{PluginDeclaration, ABI_VERSION, DECLARATION_SYMBOL};
use crate::error::PluginLoadError;

/// An opened module: its declaration and the library keeping it mapped.
///
/// The string fields of the declaration borrow from the library, so the handle must be dropped
/// as a whole.
pub struct ModuleHandle {
    /// Copy of the exported declaration.
    pub declaration: PluginDeclaration,
    /// The library backing the declaration, `None` for modules linked into the host.
    pub library: Option<libloading::Library>,
}

impl std::fmt::Debug for ModuleHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleHandle")
            .field("declaration", &self.declaration)
            .field("dynamic", &self.library.is_some())
            .finish()
    }
}

impl ModuleHandle {
    /// Handle of a module linked into the host, with no library behind it.
    pub fn linked(declaration: PluginDeclaration) -> Self {
        Self {
            declaration,
            library: None,
        }
    }
}

/// Opens a module file and reads its declaration.
pub trait ModuleLoader: Send + Sync {
    /// Open the module at `path`.
    ///
    /// Implementations check [`PluginDeclaration::abi_version`] before reading any other field,
    /// the remaining checks are done by the registry.
    fn load(&self, path: &Path) -> Result<ModuleHandle, PluginLoadError>;
}

/// Loads modules with the platform dynamic library loader.
#[derive(Debug, Clone, Copy, Default)]
pub struct DynamicLibraryLoader;

impl ModuleLoader for DynamicLibraryLoader {
    fn load(&self, path: &Path) -> Result<ModuleHandle, PluginLoadError> {
        // SAFETY: opening a library runs its initializers. Module directories are trusted.
        let library =
            unsafe { libloading::Library::new(path) }.map_err(|e| PluginLoadError::Open {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let declaration = {
            // SAFETY: the symbol is the address of the exported static.
            let symbol = unsafe {
                library.get::<*const PluginDeclaration>(DECLARATION_SYMBOL.as_bytes())
            }
            .map_err(|_| PluginLoadError::MissingDeclaration(path.to_path_buf()))?;
            let ptr: *const PluginDeclaration = *symbol;

            // SAFETY: `abi_version` is the first field of every declaration layout.
            let abi_version = unsafe { std::ptr::addr_of!((*ptr).abi_version).read() };
            if abi_version != ABI_VERSION {
                return Err(PluginLoadError::AbiMismatch {
                    expected: ABI_VERSION,
                    found: abi_version,
                });
            }

            // SAFETY: same layout version, the library stays open as long as the copy lives.
            unsafe { ptr.read() }
        };

        Ok(ModuleHandle {
            declaration,
            library: Some(library),
        })
    }
}
