#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

use std::sync::{Mutex, PoisonError};

use imaging_image::{Image, ImageBuffer};
use imaging_plugin::{Capability, Noise, PluginRegistrar, ProcessError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Value written into a corrupted pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum NoiseType {
    /// Every channel becomes the minimum or the maximum of the range, with equal odds.
    #[default]
    SaltAndPepper,
    /// Every channel becomes a uniform value of the range.
    RandomValue,
}

/// A sample type that can be corrupted.
///
/// The range is `[0, 255]` for 8-bit samples and `[0, 1]` for float samples.
pub trait ImpulseSample: Copy {
    /// The minimum or the maximum of the range.
    fn salt_or_pepper<R: Rng + ?Sized>(rng: &mut R) -> Self;

    /// A uniform value of the range.
    fn random_value<R: Rng + ?Sized>(rng: &mut R) -> Self;
}

impl ImpulseSample for u8 {
    fn salt_or_pepper<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.random_bool(0.5) {
            255
        } else {
            0
        }
    }

    fn random_value<R: Rng + ?Sized>(rng: &mut R) -> Self {
        rng.random_range(0..=255)
    }
}

impl ImpulseSample for f32 {
    fn salt_or_pepper<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.random_bool(0.5) {
            1.0
        } else {
            0.0
        }
    }

    fn random_value<R: Rng + ?Sized>(rng: &mut R) -> Self {
        rng.random_range(0.0..=1.0)
    }
}

fn check_density(density: f32) -> Result<(), ProcessError> {
    if !(0.0..=1.0).contains(&density) {
        return Err(ProcessError::InvalidParameter {
            name: "density".to_string(),
            reason: format!("must be in [0, 1], got {density}"),
        });
    }
    Ok(())
}

/// Corrupt each pixel of `img` with probability `density`.
///
/// Returns the number of corrupted pixels. The channels of a corrupted pixel are drawn
/// independently.
///
/// # Errors
///
/// Returns an error if `density` is not in `[0, 1]`.
pub fn add_impulse_noise<T: ImpulseSample, const C: usize, R: Rng + ?Sized>(
    img: &mut Image<T, C>,
    density: f32,
    noise_type: NoiseType,
    rng: &mut R,
) -> Result<usize, ProcessError> {
    check_density(density)?;

    let mut corrupted = 0;
    for pixel in img.as_slice_mut().chunks_exact_mut(C) {
        if !rng.random_bool(f64::from(density)) {
            continue;
        }
        for sample in pixel.iter_mut() {
            *sample = match noise_type {
                NoiseType::SaltAndPepper => T::salt_or_pepper(rng),
                NoiseType::RandomValue => T::random_value(rng),
            };
        }
        corrupted += 1;
    }
    Ok(corrupted)
}

/// Impulse noise generator.
///
/// The generator owns its random state, so two generators built with the same seed corrupt the
/// same pixels of the same input.
#[derive(Debug)]
pub struct ImpulseNoise {
    noise_type: NoiseType,
    rng: Mutex<StdRng>,
}

impl Default for ImpulseNoise {
    fn default() -> Self {
        Self::new(NoiseType::default())
    }
}

impl ImpulseNoise {
    /// A generator seeded from the operating system.
    pub fn new(noise_type: NoiseType) -> Self {
        Self {
            noise_type,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// A deterministic generator.
    pub fn with_seed(noise_type: NoiseType, seed: u64) -> Self {
        Self {
            noise_type,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// The kind of noise added.
    pub fn noise_type(&self) -> NoiseType {
        self.noise_type
    }

    fn corrupt<T: ImpulseSample, const C: usize>(
        &self,
        img: &Image<T, C>,
        density: f32,
    ) -> Result<Image<T, C>, ProcessError> {
        let mut out = img.clone();
        // poisoning leaves the generator state valid
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        add_impulse_noise(&mut out, density, self.noise_type, &mut *rng)?;
        Ok(out)
    }
}

impl Noise for ImpulseNoise {
    fn context_menu_label(&self) -> String {
        "Add Noise".to_string()
    }

    fn process(&self, input: &ImageBuffer, density: f32) -> Result<ImageBuffer, ProcessError> {
        let out = match input {
            ImageBuffer::GrayU8(img) => ImageBuffer::GrayU8(self.corrupt(img, density)?),
            ImageBuffer::RgbU8(img) => ImageBuffer::RgbU8(self.corrupt(img, density)?),
            ImageBuffer::GrayF32(img) => ImageBuffer::GrayF32(self.corrupt(img, density)?),
            ImageBuffer::RgbF32(img) => ImageBuffer::RgbF32(self.corrupt(img, density)?),
        };
        Ok(out)
    }
}

fn register(registrar: &mut dyn PluginRegistrar) {
    registrar.register(Capability::Noise(Box::new(ImpulseNoise::default())));
}

imaging_plugin::export_plugin!("impulse-noise", env!("CARGO_PKG_VERSION"), register);

#[cfg(test)]
mod tests {
    use super::*;
    use imaging_image::ImageSize;

    #[test]
    fn test_density_bounds() -> Result<(), ProcessError> {
        let noise = ImpulseNoise::with_seed(NoiseType::SaltAndPepper, 0);
        let input = ImageBuffer::from_u8(ImageSize::from([4, 4]), 1, vec![128; 16])?;

        assert_eq!(noise.process(&input, 0.0)?, input);
        for density in [-0.1, 1.5, f32::NAN] {
            let err = noise.process(&input, density).expect_err("out of range");
            assert!(matches!(err, ProcessError::InvalidParameter { .. }));
        }
        Ok(())
    }

    #[test]
    fn test_salt_and_pepper_full_density() -> Result<(), ProcessError> {
        let noise = ImpulseNoise::with_seed(NoiseType::SaltAndPepper, 3);

        let input = ImageBuffer::from_u8(ImageSize::from([8, 8]), 3, vec![128; 192])?;
        let ImageBuffer::RgbU8(out) = noise.process(&input, 1.0)? else {
            panic!("sample type changed");
        };
        assert!(out.as_slice().iter().all(|&v| v == 0 || v == 255));

        let input = ImageBuffer::from_f32(ImageSize::from([8, 8]), 1, vec![0.5; 64])?;
        let ImageBuffer::GrayF32(out) = noise.process(&input, 1.0)? else {
            panic!("sample type changed");
        };
        assert!(out.as_slice().iter().all(|&v| v == 0.0 || v == 1.0));
        Ok(())
    }

    #[test]
    fn test_random_value_range() -> Result<(), ProcessError> {
        let mut img = Image::<f32, 3>::from_size_val(ImageSize::from([16, 16]), -1.0)?;
        let mut rng = StdRng::seed_from_u64(11);
        let corrupted = add_impulse_noise(&mut img, 1.0, NoiseType::RandomValue, &mut rng)?;
        assert_eq!(corrupted, 256);
        assert!(img.as_slice().iter().all(|v| (0.0..=1.0).contains(v)));
        Ok(())
    }

    #[test]
    fn test_density_fraction() -> Result<(), ProcessError> {
        let mut img = Image::<u8, 1>::from_size_val(ImageSize::from([100, 100]), 128)?;
        let mut rng = StdRng::seed_from_u64(42);
        let corrupted = add_impulse_noise(&mut img, 0.3, NoiseType::SaltAndPepper, &mut rng)?;

        let changed = img.as_slice().iter().filter(|&&v| v != 128).count();
        assert_eq!(changed, corrupted);
        let fraction = corrupted as f32 / 10_000.0;
        assert!((0.27..0.33).contains(&fraction), "fraction {fraction}");
        Ok(())
    }

    #[test]
    fn test_seeded_generators_agree() -> Result<(), ProcessError> {
        let input = ImageBuffer::from_u8(ImageSize::from([10, 10]), 3, vec![90; 300])?;
        let a = ImpulseNoise::with_seed(NoiseType::RandomValue, 9).process(&input, 0.5)?;
        let b = ImpulseNoise::with_seed(NoiseType::RandomValue, 9).process(&input, 0.5)?;
        assert_eq!(a, b);
        assert_ne!(a, input);
        Ok(())
    }

    #[test]
    fn test_noise_type_serde() -> Result<(), serde_json::Error> {
        let kind: NoiseType = serde_json::from_str("\"RandomValue\"")?;
        assert_eq!(kind, NoiseType::RandomValue);
        Ok(())
    }

    #[test]
    fn test_declaration() {
        struct Collector(Vec<Capability>);

        impl PluginRegistrar for Collector {
            fn register(&mut self, capability: Capability) {
                self.0.push(capability);
            }
        }

        let decl = imaging_plugin_declaration;
        assert_eq!(decl.name, "impulse-noise");
        let mut collector = Collector(Vec::new());
        // SAFETY: the declaration belongs to this crate.
        unsafe { (decl.register)(&mut collector) };
        assert_eq!(collector.0.len(), 1);
        assert_eq!(collector.0[0].context_menu_label(), "Add Noise");
    }
}
