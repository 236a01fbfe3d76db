use std::path::{Path, PathBuf};

use imaging::image::{ImageBuffer, ImageSize};
use imaging::plugin::{
    CapabilityKind, ModuleState, PluginInvokeError, PluginLoadError, ProcessError,
};
use imaging::{Engine, EngineConfig, EngineError, Operation, PluginCall};

type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Locate the noise module cdylib cargo built next to this test binary.
fn built_noise_module() -> TestResult<Option<PathBuf>> {
    let exe = std::env::current_exe()?;
    let Some(deps) = exe.parent() else {
        return Ok(None);
    };
    let stem = format!("{}imaging_impulse_noise", std::env::consts::DLL_PREFIX);

    for dir in [deps, deps.parent().unwrap_or(deps)] {
        let mut candidates = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.starts_with(&stem) && name.ends_with(std::env::consts::DLL_SUFFIX) {
                candidates.push(path);
            }
        }
        candidates.sort();
        if let Some(path) = candidates.pop() {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

fn plugin_dir(module: &Path) -> TestResult<(tempfile::TempDir, PathBuf, PathBuf)> {
    let dir = tempfile::tempdir()?;
    let ext = std::env::consts::DLL_EXTENSION;

    let noise = dir.path().join(format!("libnoise.{ext}"));
    std::fs::copy(module, &noise)?;
    let corrupt = dir.path().join(format!("libcorrupt.{ext}"));
    std::fs::write(&corrupt, b"\x7fELF truncated")?;

    Ok((dir, noise, corrupt))
}

#[test]
fn scan_loads_built_module_next_to_corrupt_file() -> TestResult {
    let Some(module) = built_noise_module()? else {
        eprintln!("noise module cdylib not found next to the test binary, skipping");
        return Ok(());
    };
    let (dir, noise, corrupt) = plugin_dir(&module)?;

    let engine = Engine::new(EngineConfig {
        plugin_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    });
    let registry = engine.registry();

    assert_eq!(registry.len(), 1);
    assert_eq!(registry.state(&noise), Some(ModuleState::Active));
    assert_eq!(registry.state(&corrupt), Some(ModuleState::Rejected));

    let failures = registry.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].path, corrupt);
    assert_eq!(failures[0].stage, ModuleState::Discovered);
    assert!(matches!(failures[0].error, PluginLoadError::Open { .. }));

    let entry = registry.get(&noise).ok_or("noise module is not active")?;
    assert_eq!(entry.descriptor().name, "impulse-noise");
    assert_eq!(entry.descriptor().kind, CapabilityKind::Noise);

    let input = ImageBuffer::from_u8(ImageSize::from([8, 8]), 1, vec![128; 64])?;
    let noisy = engine.dispatch(
        &input,
        &Operation::Plugin {
            path: noise.clone(),
            call: PluginCall::Noise { density: 1.0 },
        },
    )?;
    let ImageBuffer::GrayU8(noisy) = noisy.image else {
        return Err("layout changed".into());
    };
    assert!(noisy.as_slice().iter().all(|&v| v == 0 || v == 255));

    let result = engine.dispatch(
        &input,
        &Operation::Plugin {
            path: noise,
            call: PluginCall::Noise { density: 2.0 },
        },
    );
    assert!(matches!(
        result,
        Err(EngineError::PluginInvoke(PluginInvokeError::Failed(
            ProcessError::InvalidParameter { .. }
        )))
    ));
    Ok(())
}
