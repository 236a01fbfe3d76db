use std::io::Write;

use imaging_image::{ImageBuffer, ImageSize};
use imaging_plugin::{
    Invocation, ModuleState, PluginInvokeError, PluginLoadError, PluginRegistry,
};

#[test]
fn scan_directory_of_corrupt_libraries() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let ext = std::env::consts::DLL_EXTENSION;

    let corrupt = dir.path().join(format!("libcorrupt.{ext}"));
    std::fs::File::create(&corrupt)?.write_all(b"\x7fELF but not really")?;
    let empty = dir.path().join(format!("libempty.{}", ext.to_uppercase()));
    std::fs::File::create(&empty)?;
    std::fs::write(dir.path().join("notes.txt"), "skipped")?;

    let mut registry = PluginRegistry::new();
    assert_eq!(registry.discover(dir.path())?, vec![corrupt.clone(), empty.clone()]);

    assert_eq!(registry.scan(dir.path())?, 0);
    assert!(registry.is_empty());
    assert_eq!(registry.failures().len(), 2);
    for failure in registry.failures() {
        assert_eq!(failure.stage, ModuleState::Discovered);
        assert!(matches!(failure.error, PluginLoadError::Open { .. }));
        assert_eq!(registry.state(&failure.path), Some(ModuleState::Rejected));
    }

    let input = ImageBuffer::from_u8(ImageSize::from([1, 1]), 1, vec![7])?;
    let err = registry
        .invoke(&corrupt, Invocation::Filter(&input))
        .expect_err("rejected modules cannot be invoked");
    assert_eq!(err, PluginInvokeError::UnknownModule(corrupt));
    Ok(())
}

#[test]
fn scan_missing_directory() {
    let mut registry = PluginRegistry::new();
    let err = registry
        .scan("/this/directory/does/not/exist")
        .expect_err("missing directory");
    assert!(matches!(err, PluginLoadError::DirectoryNotFound(_)));
    assert!(registry.failures().is_empty());
}
