use imaging_image::{ops, Image, ImageBuffer, ImageError, SampleType};
use rayon::prelude::*;

use super::{kernels, separable_filter};
use crate::{color, FilterError};

/// Blur an image using a gaussian blur filter
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `kernel_size` - The size of the kernel (kernel_x, kernel_y).
/// * `sigma` - The sigma of the gaussian kernel. Non-positive values derive sigma from the
///   kernel size.
///
/// PRECONDITION: `src` and `dst` must have the same shape.
pub fn gaussian_blur<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    kernel_size: (usize, usize),
    sigma: (f32, f32),
) -> Result<(), FilterError> {
    let sigma_x = if sigma.0 > 0.0 {
        sigma.0
    } else {
        kernels::gaussian_sigma_for_size(kernel_size.0)
    };
    let sigma_y = if sigma.1 > 0.0 {
        sigma.1
    } else {
        kernels::gaussian_sigma_for_size(kernel_size.1)
    };

    let kernel_x = kernels::gaussian_kernel_1d(kernel_size.0, sigma_x);
    let kernel_y = kernels::gaussian_kernel_1d(kernel_size.1, sigma_y);
    separable_filter(src, dst, &kernel_x, &kernel_y)?;
    Ok(())
}

/// Blur a buffer of any layout with a square gaussian kernel, keeping its sample type.
///
/// # Arguments
///
/// * `src` - The source buffer.
/// * `kernel_size` - Side of the kernel, must be odd.
/// * `sigma` - The sigma of the kernel. Non-positive values derive sigma from the kernel size.
pub fn gaussian_blur_buffer(
    src: &ImageBuffer,
    kernel_size: usize,
    sigma: f32,
) -> Result<ImageBuffer, FilterError> {
    if kernel_size % 2 == 0 {
        return Err(FilterError::InvalidParameter {
            name: "kernel_size",
            reason: format!("must be odd, got {kernel_size}"),
        });
    }

    fn blur<const C: usize>(
        src: &Image<f32, C>,
        kernel_size: usize,
        sigma: f32,
    ) -> Result<Image<f32, C>, FilterError> {
        let mut dst = Image::from_size_val(src.size(), 0.0)?;
        gaussian_blur(src, &mut dst, (kernel_size, kernel_size), (sigma, sigma))?;
        Ok(dst)
    }

    fn blur_u8<const C: usize>(
        src: &Image<u8, C>,
        kernel_size: usize,
        sigma: f32,
    ) -> Result<Image<u8, C>, FilterError> {
        let dst = blur(&ops::to_f32(src, 1.0)?, kernel_size, sigma)?;
        Ok(ops::from_f32(&dst, 1.0)?)
    }

    Ok(match src {
        ImageBuffer::GrayU8(img) => ImageBuffer::GrayU8(blur_u8(img, kernel_size, sigma)?),
        ImageBuffer::RgbU8(img) => ImageBuffer::RgbU8(blur_u8(img, kernel_size, sigma)?),
        ImageBuffer::GrayF32(img) => ImageBuffer::GrayF32(blur(img, kernel_size, sigma)?),
        ImageBuffer::RgbF32(img) => ImageBuffer::RgbF32(blur(img, kernel_size, sigma)?),
    })
}

/// Compute the sobel edge strength `0.5 * |gx| + 0.5 * |gy|` of an image.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `kernel_size` - The size of the sobel kernel, 3 or 5.
/// * `ceiling` - Each absolute gradient is clamped to this value before averaging.
///
/// PRECONDITION: `src` and `dst` must have the same shape.
pub fn sobel<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    kernel_size: usize,
    ceiling: f32,
) -> Result<(), FilterError> {
    let (derivative, smoothing) =
        kernels::sobel_kernel_1d(kernel_size).ok_or_else(|| FilterError::InvalidParameter {
            name: "kernel_size",
            reason: format!("must be 3 or 5, got {kernel_size}"),
        })?;

    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        )
        .into());
    }

    let mut gx = Image::<f32, C>::from_size_val(src.size(), 0.0)?;
    separable_filter(src, &mut gx, &derivative, &smoothing)?;

    let mut gy = Image::<f32, C>::from_size_val(src.size(), 0.0)?;
    separable_filter(src, &mut gy, &smoothing, &derivative)?;

    dst.as_slice_mut()
        .par_iter_mut()
        .zip(gx.as_slice().par_iter().zip(gy.as_slice().par_iter()))
        .for_each(|(out, (&dx, &dy))| {
            *out = 0.5 * dx.abs().min(ceiling) + 0.5 * dy.abs().min(ceiling);
        });

    Ok(())
}

/// Sobel edge map of a buffer as a single channel buffer of the same sample type.
///
/// RGB input is converted to luminance first. For `u8` buffers each gradient saturates at
/// 255 before the two are averaged.
pub fn sobel_buffer(src: &ImageBuffer, kernel_size: usize) -> Result<ImageBuffer, FilterError> {
    let gray = color::gray_plane(src)?;
    let ceiling = match src.sample_type() {
        SampleType::U8 => 255.0,
        SampleType::F32 => f32::INFINITY,
    };

    let mut edges = Image::from_size_val(gray.size(), 0.0)?;
    sobel(&gray, &mut edges, kernel_size, ceiling)?;
    Ok(color::gray_buffer(edges, src.sample_type())?)
}
