use imaging_image::{ops, Image, ImageBuffer, ImageError, SampleType};
use rayon::prelude::*;

const RW: f32 = 0.299;
const GW: f32 = 0.587;
const BW: f32 = 0.114;

/// Convert an RGB image to grayscale using the formula:
///
/// Y = 0.299 * R + 0.587 * G + 0.114 * B
///
/// # Arguments
///
/// * `src` - The input RGB image.
/// * `dst` - The output grayscale image.
///
/// Precondition: the input and output images must have the same size.
pub fn gray_from_rgb(src: &Image<f32, 3>, dst: &mut Image<f32, 1>) -> Result<(), ImageError> {
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
        .zip(src.as_slice().par_chunks_exact(3))
        .for_each(|(gray, rgb)| {
            *gray = RW * rgb[0] + GW * rgb[1] + BW * rgb[2];
        });

    Ok(())
}

/// Luminance plane of a buffer as float samples, keeping the sample scale.
///
/// Gray buffers are promoted as they are, RGB buffers go through [`gray_from_rgb`].
pub fn gray_plane(src: &ImageBuffer) -> Result<Image<f32, 1>, ImageError> {
    let rgb = match src {
        ImageBuffer::GrayU8(img) => return ops::to_f32(img, 1.0),
        ImageBuffer::GrayF32(img) => return Ok(img.clone()),
        ImageBuffer::RgbU8(img) => ops::to_f32(img, 1.0)?,
        ImageBuffer::RgbF32(img) => img.clone(),
    };
    let mut gray = Image::from_size_val(rgb.size(), 0.0)?;
    gray_from_rgb(&rgb, &mut gray)?;
    Ok(gray)
}

/// Wrap a float plane as a single channel buffer of the given sample type.
///
/// `u8` output is rounded and saturated.
pub fn gray_buffer(
    plane: Image<f32, 1>,
    sample_type: SampleType,
) -> Result<ImageBuffer, ImageError> {
    Ok(match sample_type {
        SampleType::U8 => ImageBuffer::GrayU8(ops::from_f32(&plane, 1.0)?),
        SampleType::F32 => ImageBuffer::GrayF32(plane),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gray_from_rgb_weights() -> Result<(), ImageError> {
        let rgb = Image::<f32, 3>::new(
            [3, 1].into(),
            vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        )?;
        let mut gray = Image::<f32, 1>::from_size_val(rgb.size(), 0.0)?;
        gray_from_rgb(&rgb, &mut gray)?;

        approx::assert_relative_eq!(gray.as_slice()[0], 0.299);
        approx::assert_relative_eq!(gray.as_slice()[1], 0.587);
        approx::assert_relative_eq!(gray.as_slice()[2], 0.114);
        Ok(())
    }

    #[test]
    fn test_gray_from_rgb_size_mismatch() -> Result<(), ImageError> {
        let rgb = Image::<f32, 3>::from_size_val([2, 2].into(), 0.0)?;
        let mut gray = Image::<f32, 1>::from_size_val([3, 2].into(), 0.0)?;
        assert_eq!(
            gray_from_rgb(&rgb, &mut gray),
            Err(ImageError::InvalidImageSize(2, 2, 3, 2))
        );
        Ok(())
    }

    #[test]
    fn test_gray_plane_keeps_scale() -> Result<(), ImageError> {
        let gray = ImageBuffer::from_u8([2, 1].into(), 1, vec![10, 250])?;
        assert_eq!(gray_plane(&gray)?.as_slice(), &[10.0, 250.0]);

        let white = ImageBuffer::from_u8([1, 1].into(), 3, vec![200, 200, 200])?;
        let plane = gray_plane(&white)?;
        approx::assert_relative_eq!(plane.as_slice()[0], 200.0, epsilon = 1e-3);

        let back = gray_buffer(plane, SampleType::U8)?;
        assert_eq!(back, ImageBuffer::from_u8([1, 1].into(), 1, vec![200])?);
        Ok(())
    }
}
