use imaging_image::{ops, Image, ImageBuffer, ImageError, SampleType};
use num_traits::Zero;
use rayon::prelude::*;

use crate::{color, FilterError};

/// Threshold used by [`binarize_buffer`] callers that do not pick one.
pub const DEFAULT_THRESHOLD: f32 = 128.0;

/// Apply a binary threshold to an image.
///
/// # Arguments
///
/// * `src` - The input image of an arbitrary number of channels and type.
/// * `dst` - The output image of an arbitrary number of channels and type.
/// * `threshold` - The threshold value. Must be the same type as the image.
/// * `max_value` - The value written where the input is greater than the threshold.
///
/// # Examples
///
/// ```
/// use imaging_image::{Image, ImageSize};
/// use imaging_imgproc::threshold::threshold_binary;
///
/// let data = vec![100u8, 200, 50, 150, 200, 250];
/// let image = Image::<_, 1>::new(ImageSize { width: 2, height: 3 }, data).unwrap();
///
/// let mut thresholded = Image::<_, 1>::from_size_val(image.size(), 0).unwrap();
///
/// threshold_binary(&image, &mut thresholded, 100, 255).unwrap();
/// assert_eq!(thresholded.as_slice(), &[0, 255, 0, 255, 255, 255]);
/// ```
pub fn threshold_binary<T, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    threshold: T,
    max_value: T,
) -> Result<(), ImageError>
where
    T: Copy + Send + Sync + PartialOrd + Zero,
{
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    dst.as_slice_mut()
        .par_iter_mut()
        .zip(src.as_slice().par_iter())
        .for_each(|(dst_pixel, src_pixel)| {
            *dst_pixel = if *src_pixel > threshold {
                max_value
            } else {
                T::zero()
            };
        });

    Ok(())
}

/// Binarize the luminance of a buffer into a single channel buffer of the same sample type.
///
/// Pixels brighter than `threshold` become 255 for `u8` buffers and 1.0 for `f32` buffers,
/// the rest become zero. The threshold is in sample units.
pub fn binarize_buffer(src: &ImageBuffer, threshold: f32) -> Result<ImageBuffer, FilterError> {
    if !threshold.is_finite() {
        return Err(FilterError::InvalidParameter {
            name: "threshold",
            reason: format!("must be finite, got {threshold}"),
        });
    }

    let gray = color::gray_plane(src)?;
    Ok(match src.sample_type() {
        SampleType::U8 => {
            let gray: Image<u8, 1> = ops::from_f32(&gray, 1.0)?;
            let mut dst = Image::from_size_val(gray.size(), 0u8)?;
            if threshold < 0.0 {
                dst.as_slice_mut().fill(u8::MAX);
            } else if threshold < 255.0 {
                // integer samples compare against the floor of the threshold
                threshold_binary(&gray, &mut dst, threshold as u8, u8::MAX)?;
            }
            ImageBuffer::GrayU8(dst)
        }
        SampleType::F32 => {
            let mut dst = Image::from_size_val(gray.size(), 0.0)?;
            threshold_binary(&gray, &mut dst, threshold, 1.0)?;
            ImageBuffer::GrayF32(dst)
        }
    })
}
