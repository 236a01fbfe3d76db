use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use imaging_image::ImageBuffer;

use crate::capability::{Capability, CapabilityKind};
use crate::declaration::{PluginDeclaration, PluginRegistrar, CORE_VERSION, RUSTC_VERSION};
use crate::descriptor::{Parameters, PluginDescriptor};
use crate::error::{PluginInvokeError, PluginLoadError};
use crate::loader::{DynamicLibraryLoader, ModuleHandle, ModuleLoader};

/// Which files of a directory are module candidates.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// File extensions without the dot, compared case-insensitively.
    pub extensions: Vec<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            extensions: vec![std::env::consts::DLL_EXTENSION.to_string()],
        }
    }
}

impl RegistryConfig {
    fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }
}

/// Lifecycle of a module file during a scan.
///
/// A module moves `Discovered -> Loaded -> Validated -> Active`, or ends in `Rejected` from any
/// of the first three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ModuleState {
    /// The file name matched a module extension.
    Discovered,
    /// The library was opened and its declaration read.
    Loaded,
    /// The declaration matches the host contract.
    Validated,
    /// Registered and available for invocation.
    Active,
    /// Terminal, see [`PluginRegistry::failures`].
    Rejected,
}

/// A module rejected during the last scan.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadFailure {
    /// The module file.
    pub path: PathBuf,
    /// Last state reached before the rejection.
    pub stage: ModuleState,
    /// Why the module was rejected.
    pub error: PluginLoadError,
}

/// A call on an active module.
#[derive(Debug, Clone, Copy)]
pub enum Invocation<'a> {
    /// [`crate::Filtering::process`]
    Filter(&'a ImageBuffer),
    /// [`crate::Filtering::process_pair`]
    FilterPair(&'a ImageBuffer, &'a ImageBuffer),
    /// [`crate::Noise::process`]
    Noise {
        /// The image to corrupt.
        input: &'a ImageBuffer,
        /// Fraction of corrupted pixels.
        density: f32,
    },
    /// [`crate::ColorEnhancement::process`]
    ColorEnhance {
        /// The image to enhance.
        input: &'a ImageBuffer,
        /// Name of the method.
        method: &'a str,
    },
    /// [`crate::Instrument::process`], with the default parameters if `parameters` is `None`.
    Instrument {
        /// The image to process.
        input: &'a ImageBuffer,
        /// Parameters of the call.
        parameters: Option<&'a Parameters>,
    },
}

impl<'a> Invocation<'a> {
    /// Name of the call, used in errors and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Invocation::Filter(_) => "filter",
            Invocation::FilterPair(..) => "filter_pair",
            Invocation::Noise { .. } => "noise",
            Invocation::ColorEnhance { .. } => "color_enhance",
            Invocation::Instrument { .. } => "instrument",
        }
    }

    fn inputs(&self) -> Vec<&'a ImageBuffer> {
        match *self {
            Invocation::Filter(input)
            | Invocation::Noise { input, .. }
            | Invocation::ColorEnhance { input, .. }
            | Invocation::Instrument { input, .. } => vec![input],
            Invocation::FilterPair(first, second) => vec![first, second],
        }
    }
}

/// An active module.
pub struct PluginEntry {
    descriptor: PluginDescriptor,
    // dropped before the library that holds its code
    capability: Capability,
    _library: Option<libloading::Library>,
}

impl std::fmt::Debug for PluginEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginEntry")
            .field("descriptor", &self.descriptor)
            .field("capability", &self.capability)
            .finish()
    }
}

impl PluginEntry {
    /// Metadata of the module.
    pub fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    /// The registered implementation.
    pub fn capability(&self) -> &Capability {
        &self.capability
    }

    fn call(&self, invocation: Invocation<'_>) -> Result<ImageBuffer, PluginInvokeError> {
        let output = match (&self.capability, invocation) {
            (Capability::Filtering(c), Invocation::Filter(input)) => c.process(input)?,
            (Capability::Filtering(c), Invocation::FilterPair(first, second)) => {
                c.process_pair(first, second)?
            }
            (Capability::Noise(c), Invocation::Noise { input, density }) => {
                c.process(input, density)?
            }
            (Capability::ColorEnhancement(c), Invocation::ColorEnhance { input, method }) => {
                c.process(input, method)?
            }
            (Capability::Instrument(c), Invocation::Instrument { input, parameters }) => {
                match parameters {
                    Some(parameters) => c.process(input, parameters)?,
                    None => c.process(input, &c.default_parameters())?,
                }
            }
            (capability, invocation) => {
                return Err(PluginInvokeError::UnsupportedCall {
                    kind: capability.kind(),
                    call: invocation.name(),
                })
            }
        };
        Ok(output)
    }
}

#[derive(Default)]
struct CapabilityCollector(Vec<Capability>);

impl PluginRegistrar for CapabilityCollector {
    fn register(&mut self, capability: Capability) {
        self.0.push(capability);
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn validate(declaration: &PluginDeclaration) -> Result<(), PluginLoadError> {
    if declaration.rustc_version != RUSTC_VERSION {
        return Err(PluginLoadError::RustcMismatch {
            expected: RUSTC_VERSION.to_string(),
            found: declaration.rustc_version.to_string(),
        });
    }
    if declaration.core_version != CORE_VERSION {
        return Err(PluginLoadError::CoreMismatch {
            expected: CORE_VERSION.to_string(),
            found: declaration.core_version.to_string(),
        });
    }
    Ok(())
}

fn describe(declaration: &PluginDeclaration, capability: &Capability) -> PluginDescriptor {
    let kind = capability.kind();
    let context_menu_label = capability.context_menu_label();
    match capability {
        Capability::Instrument(instrument) => PluginDescriptor {
            name: instrument.name(),
            version: instrument.version(),
            compatible_app_version: Some(instrument.compatible_app_version()),
            kind,
            context_menu_label,
            default_parameters: instrument.default_parameters(),
        },
        _ => PluginDescriptor {
            name: declaration.name.to_string(),
            version: declaration.version.to_string(),
            compatible_app_version: None,
            kind,
            context_menu_label,
            default_parameters: Parameters::new(),
        },
    }
}

/// Registry of the modules found in a directory, keyed by file path.
///
/// Each [`PluginRegistry::scan`] discards every entry and rebuilds the registry from scratch.
/// A module that fails any step is rejected and recorded in [`PluginRegistry::failures`], the
/// scan carries on with the next file.
///
/// The registry has no internal locking: scanning takes `&mut self`, invoking takes `&self`.
///
/// # Example
///
/// ```no_run
/// use imaging_plugin::PluginRegistry;
///
/// let mut registry = PluginRegistry::new();
/// let active = registry.scan("plugins")?;
/// for (path, descriptor) in registry.descriptors() {
///     println!("{}: {} {}", path.display(), descriptor.name, descriptor.version);
/// }
/// # Ok::<(), imaging_plugin::PluginLoadError>(())
/// ```
pub struct PluginRegistry {
    config: RegistryConfig,
    loader: Box<dyn ModuleLoader>,
    entries: BTreeMap<PathBuf, PluginEntry>,
    states: BTreeMap<PathBuf, ModuleState>,
    failures: Vec<LoadFailure>,
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("config", &self.config)
            .field("entries", &self.entries)
            .field("failures", &self.failures)
            .finish()
    }
}

impl PluginRegistry {
    /// An empty registry loading dynamic libraries with the platform extension.
    pub fn new() -> Self {
        Self::with_loader(RegistryConfig::default(), Box::new(DynamicLibraryLoader))
    }

    /// An empty registry with a custom loader.
    pub fn with_loader(config: RegistryConfig, loader: Box<dyn ModuleLoader>) -> Self {
        Self {
            config,
            loader,
            entries: BTreeMap::new(),
            states: BTreeMap::new(),
            failures: Vec::new(),
        }
    }

    /// The registry configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// List the module candidates of `dir` in path order.
    ///
    /// Files with another extension are skipped, subdirectories are not visited.
    pub fn discover(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, PluginLoadError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(PluginLoadError::DirectoryNotFound(dir.to_path_buf()));
        }

        let io_error = |e: std::io::Error| PluginLoadError::Io {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        };

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            if path.is_file() && self.config.matches(&path) {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Clear the registry and load every candidate of `dir`.
    ///
    /// Returns the number of active modules. The registry is left empty if `dir` cannot be
    /// listed.
    pub fn scan(&mut self, dir: impl AsRef<Path>) -> Result<usize, PluginLoadError> {
        let dir = dir.as_ref();
        self.clear();

        for path in self.discover(dir)? {
            // failures are recorded by `load`
            let _ = self.load(&path);
        }

        log::info!(
            "Scanned {}: {} active, {} rejected",
            dir.display(),
            self.entries.len(),
            self.failures.len()
        );
        Ok(self.entries.len())
    }

    /// Load, validate and register one module file.
    ///
    /// An entry already registered under `path` is replaced. On failure the module is marked
    /// [`ModuleState::Rejected`] and the error is recorded.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<&PluginDescriptor, PluginLoadError> {
        let path = path.as_ref().to_path_buf();
        self.entries.remove(&path);
        self.failures.retain(|failure| failure.path != path);

        match self.activate(&path) {
            Ok(entry) => {
                self.transition(&path, ModuleState::Active);
                Ok(&self.entries.entry(path).or_insert(entry).descriptor)
            }
            Err(error) => {
                let stage = self.state(&path).unwrap_or(ModuleState::Discovered);
                log::warn!("Rejected module {}: {error}", path.display());
                self.states.insert(path.clone(), ModuleState::Rejected);
                self.failures.push(LoadFailure {
                    path,
                    stage,
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }

    fn activate(&mut self, path: &Path) -> Result<PluginEntry, PluginLoadError> {
        self.transition(path, ModuleState::Discovered);

        let ModuleHandle {
            declaration,
            library,
        } = self.loader.load(path)?;
        self.transition(path, ModuleState::Loaded);

        validate(&declaration)?;
        self.transition(path, ModuleState::Validated);

        let mut collector = CapabilityCollector::default();
        let register = declaration.register;
        // SAFETY: the declaration was validated against the host compiler and crate version.
        panic::catch_unwind(AssertUnwindSafe(|| unsafe { register(&mut collector) }))
            .map_err(|payload| PluginLoadError::RegistrationPanicked(panic_message(payload)))?;

        let mut capabilities = collector.0;
        if capabilities.len() != 1 {
            return Err(PluginLoadError::RegistrationCount(capabilities.len()));
        }
        let Some(capability) = capabilities.pop() else {
            return Err(PluginLoadError::RegistrationCount(0));
        };

        let descriptor =
            panic::catch_unwind(AssertUnwindSafe(|| describe(&declaration, &capability)))
                .map_err(|payload| PluginLoadError::RegistrationPanicked(panic_message(payload)))?;

        Ok(PluginEntry {
            descriptor,
            capability,
            _library: library,
        })
    }

    fn transition(&mut self, path: &Path, state: ModuleState) {
        log::debug!("Module {} is {state:?}", path.display());
        self.states.insert(path.to_path_buf(), state);
    }

    /// Drop every entry, state and failure.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.states.clear();
        self.failures.clear();
    }

    /// Run a call on the module registered under `path`.
    ///
    /// Empty inputs are rejected before the module is reached. A panic inside the module is
    /// caught and returned as [`PluginInvokeError::Panicked`]. Inputs are borrowed, so they are
    /// unchanged whatever the outcome.
    pub fn invoke(
        &self,
        path: impl AsRef<Path>,
        invocation: Invocation<'_>,
    ) -> Result<ImageBuffer, PluginInvokeError> {
        let path = path.as_ref();
        let entry = self
            .entries
            .get(path)
            .ok_or_else(|| PluginInvokeError::UnknownModule(path.to_path_buf()))?;

        let result = Self::guarded_call(entry, invocation);
        if let Err(e) = &result {
            log::error!(
                "Module {} failed on `{}`: {e}",
                path.display(),
                invocation.name()
            );
        }
        result
    }

    fn guarded_call(
        entry: &PluginEntry,
        invocation: Invocation<'_>,
    ) -> Result<ImageBuffer, PluginInvokeError> {
        for input in invocation.inputs() {
            input.ensure_not_empty()?;
        }

        let output = panic::catch_unwind(AssertUnwindSafe(|| entry.call(invocation)))
            .map_err(|payload| PluginInvokeError::Panicked(panic_message(payload)))??;

        if output.is_empty() {
            return Err(PluginInvokeError::EmptyOutput);
        }
        Ok(output)
    }

    /// The active module registered under `path`.
    pub fn get(&self, path: impl AsRef<Path>) -> Option<&PluginEntry> {
        self.entries.get(path.as_ref())
    }

    /// Descriptors of the active modules in path order.
    pub fn descriptors(&self) -> impl Iterator<Item = (&Path, &PluginDescriptor)> {
        self.entries
            .iter()
            .map(|(path, entry)| (path.as_path(), &entry.descriptor))
    }

    /// Paths of the active modules of a kind.
    pub fn find_by_kind(&self, kind: CapabilityKind) -> Vec<&Path> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.descriptor.kind == kind)
            .map(|(path, _)| path.as_path())
            .collect()
    }

    /// Modules rejected since the last scan.
    pub fn failures(&self) -> &[LoadFailure] {
        &self.failures
    }

    /// State of a module file seen since the last scan.
    pub fn state(&self, path: impl AsRef<Path>) -> Option<ModuleState> {
        self.states.get(path.as_ref()).copied()
    }

    /// Number of active modules.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no module is active.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
