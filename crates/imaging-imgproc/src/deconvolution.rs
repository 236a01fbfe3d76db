//! Richardson-Lucy deconvolution
//!
//! The estimate starts at the observed image and is refined a fixed number of times:
//!
//! 1. `convolved = estimate * kernel`
//! 2. `ratio = observed / (convolved + epsilon)`, truncated at `ratio_ceiling`
//! 3. `update = ratio * kernel` with a replicated border
//! 4. `estimate = clamp(estimate * update, 0, 1)`
//!
//! Iterations run one after the other. The two convolutions of an iteration are row-parallel.

use imaging_image::{ops, Image, ImageBuffer, ImageError};

use crate::filter::{kernels, separable_filter_with_strategy};
use crate::padding::PaddingMode;
use crate::parallel::ExecutionStrategy;
use crate::FilterError;

/// Parameters of the Richardson-Lucy restoration.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DeconvolutionParams {
    /// Number of refinement steps.
    pub iterations: usize,
    /// Side of the isotropic gaussian point spread function, must be odd.
    pub kernel_size: usize,
    /// Standard deviation of the point spread function.
    pub sigma: f32,
    /// Added to the re-blurred estimate before dividing.
    pub epsilon: f32,
    /// Upper bound of the correction ratio.
    pub ratio_ceiling: f32,
    /// Row partitioning of the convolutions.
    pub strategy: ExecutionStrategy,
}

impl Default for DeconvolutionParams {
    fn default() -> Self {
        Self {
            iterations: 50,
            kernel_size: 9,
            sigma: 2.0,
            epsilon: 1e-6,
            ratio_ceiling: 5.0,
            strategy: ExecutionStrategy::ParallelRows,
        }
    }
}

fn positive(name: &'static str, value: f32) -> Result<(), FilterError> {
    if value.is_nan() || value <= 0.0 {
        return Err(FilterError::InvalidParameter {
            name,
            reason: format!("must be > 0, got {value}"),
        });
    }
    Ok(())
}

impl DeconvolutionParams {
    fn validate_kernel(&self) -> Result<(), FilterError> {
        if self.kernel_size % 2 == 0 {
            return Err(FilterError::InvalidParameter {
                name: "kernel_size",
                reason: format!("must be odd, got {}", self.kernel_size),
            });
        }
        positive("sigma", self.sigma)
    }

    fn validate_update(&self) -> Result<(), FilterError> {
        positive("epsilon", self.epsilon)?;
        positive("ratio_ceiling", self.ratio_ceiling)
    }
}

/// Restore an image blurred by the gaussian point spread function of `params`.
///
/// # Arguments
///
/// * `src` - The observed image with shape (H, W, C) and values in `[0, 1]`.
/// * `dst` - The restored image with shape (H, W, C).
/// * `params` - Restoration parameters.
///
/// An empty `src` leaves `dst` untouched.
pub fn richardson_lucy<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    params: &DeconvolutionParams,
) -> Result<(), FilterError> {
    params.validate_kernel()?;
    let kernel = kernels::gaussian_kernel_1d(params.kernel_size, params.sigma);
    richardson_lucy_with_observer(src, dst, &kernel, &kernel, params, |_, _| {})
}

/// Restore an image blurred by an arbitrary separable point spread function.
///
/// `params.kernel_size` and `params.sigma` are ignored.
pub fn richardson_lucy_with_kernel<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    kernel_x: &[f32],
    kernel_y: &[f32],
    params: &DeconvolutionParams,
) -> Result<(), FilterError> {
    richardson_lucy_with_observer(src, dst, kernel_x, kernel_y, params, |_, _| {})
}

/// Same as [`richardson_lucy_with_kernel`], calling `observer` with the estimate after every
/// iteration.
pub fn richardson_lucy_with_observer<const C: usize, F>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    kernel_x: &[f32],
    kernel_y: &[f32],
    params: &DeconvolutionParams,
    mut observer: F,
) -> Result<(), FilterError>
where
    F: FnMut(usize, &Image<f32, C>),
{
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        )
        .into());
    }

    if src.is_empty() {
        return Ok(());
    }

    params.validate_update()?;

    let observed = src.as_slice();
    let mut estimate = src.clone();
    let mut convolved = Image::<f32, C>::from_size_val(src.size(), 0.0f32)?;
    let mut ratio = Image::<f32, C>::from_size_val(src.size(), 0.0f32)?;
    let mut update = Image::<f32, C>::from_size_val(src.size(), 0.0f32)?;

    for i in 0..params.iterations {
        separable_filter_with_strategy(
            &estimate,
            &mut convolved,
            kernel_x,
            kernel_y,
            PaddingMode::Reflect101,
            params.strategy,
        )?;

        ratio
            .as_slice_mut()
            .iter_mut()
            .zip(observed.iter().zip(convolved.as_slice()))
            .for_each(|(r, (&o, &c))| {
                *r = (o / (c + params.epsilon)).min(params.ratio_ceiling);
            });

        separable_filter_with_strategy(
            &ratio,
            &mut update,
            kernel_x,
            kernel_y,
            PaddingMode::Replicate,
            params.strategy,
        )?;

        // max/min instead of clamp so that NaN collapses to 0
        estimate
            .as_slice_mut()
            .iter_mut()
            .zip(update.as_slice())
            .for_each(|(e, &u)| *e = (*e * u).max(0.0).min(1.0));

        if log::log_enabled!(log::Level::Trace) {
            let (min, max) = estimate
                .as_slice()
                .iter()
                .fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
            log::trace!("richardson-lucy iteration {i}: min {min:.6}, max {max:.6}");
        }

        observer(i, &estimate);
    }

    dst.as_slice_mut().copy_from_slice(estimate.as_slice());
    Ok(())
}

/// Restore an 8-bit image.
///
/// Samples are scaled to `[0, 1]`, restored and scaled back to `[0, 255]`.
pub fn richardson_lucy_u8<const C: usize>(
    src: &Image<u8, C>,
    params: &DeconvolutionParams,
) -> Result<Image<u8, C>, FilterError> {
    let observed = ops::to_f32(src, 1.0 / 255.0)?;
    let mut restored = observed.clone();
    richardson_lucy(&observed, &mut restored, params)?;
    Ok(ops::from_f32(&restored, 255.0)?)
}

/// Restore a buffer of any supported layout.
///
/// 8-bit buffers are handled by [`richardson_lucy_u8`]. Float buffers are expected in
/// `[0, 1]` and stay float.
pub fn deconvolve_buffer(
    src: &ImageBuffer,
    params: &DeconvolutionParams,
) -> Result<ImageBuffer, FilterError> {
    fn restore<const C: usize>(
        src: &Image<f32, C>,
        params: &DeconvolutionParams,
    ) -> Result<Image<f32, C>, FilterError> {
        let mut dst = src.clone();
        richardson_lucy(src, &mut dst, params)?;
        Ok(dst)
    }

    Ok(match src {
        ImageBuffer::GrayU8(img) => ImageBuffer::GrayU8(richardson_lucy_u8(img, params)?),
        ImageBuffer::RgbU8(img) => ImageBuffer::RgbU8(richardson_lucy_u8(img, params)?),
        ImageBuffer::GrayF32(img) => ImageBuffer::GrayF32(restore(img, params)?),
        ImageBuffer::RgbF32(img) => ImageBuffer::RgbF32(restore(img, params)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::gaussian_blur;
    use crate::metrics::mse;
    use imaging_image::ImageSize;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_identity_kernel_converges_to_input() -> Result<(), FilterError> {
        let size = ImageSize {
            width: 8,
            height: 6,
        };
        let data = (0..size.area() * 3)
            .map(|i| (i % 17) as f32 / 16.0)
            .collect();
        let src = Image::<f32, 3>::new(size, data)?;
        let mut dst = Image::from_size_val(size, 0.0)?;

        let identity = kernels::identity_kernel_1d(9);
        richardson_lucy_with_kernel(
            &src,
            &mut dst,
            &identity,
            &identity,
            &DeconvolutionParams::default(),
        )?;

        for (&a, &b) in dst.as_slice().iter().zip(src.as_slice()) {
            approx::assert_abs_diff_eq!(a, b, epsilon = 1e-4);
        }
        Ok(())
    }

    #[test]
    fn test_estimate_stays_in_unit_range() -> Result<(), FilterError> {
        let size = ImageSize {
            width: 24,
            height: 16,
        };
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let data = (0..size.area())
            .map(|_| rng.random_range(-0.5f32..2.0))
            .collect();
        let src = Image::<f32, 1>::new(size, data)?;
        let mut dst = Image::from_size_val(size, 0.0)?;

        let params = DeconvolutionParams::default();
        let kernel = kernels::gaussian_kernel_1d(params.kernel_size, params.sigma);
        let mut seen = 0;
        richardson_lucy_with_observer(&src, &mut dst, &kernel, &kernel, &params, |_, est| {
            seen += 1;
            assert!(est.as_slice().iter().all(|v| (0.0..=1.0).contains(v)));
        })?;

        assert_eq!(seen, params.iterations);
        assert!(dst.as_slice().iter().all(|v| (0.0..=1.0).contains(v)));
        Ok(())
    }

    #[test]
    fn test_restoration_sharpens_blurred_edge() -> Result<(), FilterError> {
        let size = ImageSize {
            width: 32,
            height: 8,
        };
        let data = (0..size.area())
            .map(|i| if i % size.width < size.width / 2 { 0.2 } else { 0.8 })
            .collect();
        let sharp = Image::<f32, 1>::new(size, data)?;

        let params = DeconvolutionParams::default();
        let mut blurred = Image::from_size_val(size, 0.0)?;
        gaussian_blur(
            &sharp,
            &mut blurred,
            (params.kernel_size, params.kernel_size),
            (params.sigma, params.sigma),
        )?;

        let mut restored = Image::from_size_val(size, 0.0)?;
        richardson_lucy(&blurred, &mut restored, &params)?;

        assert!(mse(&restored, &sharp)? < mse(&blurred, &sharp)?);
        Ok(())
    }

    #[test]
    fn test_empty_input_is_noop() -> Result<(), FilterError> {
        let src = Image::<f32, 3>::new([0, 0].into(), vec![])?;
        let mut dst = src.clone();
        richardson_lucy(&src, &mut dst, &DeconvolutionParams::default())?;
        assert!(dst.is_empty());

        let buf = ImageBuffer::from_u8([0, 4].into(), 3, vec![])?;
        assert_eq!(
            deconvolve_buffer(&buf, &DeconvolutionParams::default())?,
            buf
        );
        Ok(())
    }

    #[test]
    fn test_u8_flat_image_is_stable() -> Result<(), FilterError> {
        let src = Image::<u8, 3>::from_size_val([10, 10].into(), 128)?;
        let out = richardson_lucy_u8(&src, &DeconvolutionParams::default())?;
        assert_eq!(out, src);
        Ok(())
    }

    #[test]
    fn test_invalid_params() -> Result<(), FilterError> {
        let src = Image::<f32, 1>::from_size_val([3, 3].into(), 0.5)?;
        let mut dst = src.clone();
        let params = DeconvolutionParams {
            kernel_size: 4,
            ..Default::default()
        };
        assert!(matches!(
            richardson_lucy(&src, &mut dst, &params),
            Err(FilterError::InvalidParameter {
                name: "kernel_size",
                ..
            })
        ));
        Ok(())
    }
}
