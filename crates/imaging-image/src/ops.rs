use crate::{Image, ImageDtype, ImageError};

/// Cast the pixel data of an image to a different type.
///
/// # Arguments
///
/// * `src` - The source image.
/// * `dst` - The destination image.
/// * `scale` - The scale to multiply the pixel data with.
///
/// Example:
///
/// ```
/// use imaging_image::{Image, ImageSize};
/// use imaging_image::ops::cast_and_scale;
///
/// let image = Image::<u8, 1>::new(
///  ImageSize {
///   width: 2,
///  height: 1,
/// },
/// vec![0u8, 255],
/// ).unwrap();
///
/// let mut image_f32 = Image::from_size_val(image.size(), 0.0f32).unwrap();
///
/// cast_and_scale(&image, &mut image_f32, 1. / 255.0).unwrap();
///
/// assert_eq!(image_f32.get_pixel(0, 0, 0).unwrap(), &0.0f32);
/// assert_eq!(image_f32.get_pixel(1, 0, 0).unwrap(), &1.0f32);
/// ```
pub fn cast_and_scale<T, U, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<U, C>,
    scale: U,
) -> Result<(), ImageError>
where
    T: Copy + num_traits::NumCast,
    U: Copy + num_traits::NumCast + std::ops::Mul<U, Output = U>,
{
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.width(),
            src.height(),
            dst.width(),
            dst.height(),
        ));
    }

    dst.as_slice_mut()
        .iter_mut()
        .zip(src.as_slice().iter())
        .try_for_each(|(out, &inp)| {
            let x = U::from(inp).ok_or(ImageError::CastError(
                std::any::type_name::<U>().to_string(),
            ))?;
            *out = x * scale;
            Ok::<(), ImageError>(())
        })?;

    Ok(())
}

/// Promote an image to `f32` samples, multiplying every sample by `scale`.
///
/// Promotion is lossless for `u8` inputs.
pub fn to_f32<T: ImageDtype, const C: usize>(
    src: &Image<T, C>,
    scale: f32,
) -> Result<Image<f32, C>, ImageError> {
    let mut dst = Image::from_size_val(src.size(), 0.0)?;
    cast_and_scale(src, &mut dst, scale)?;
    Ok(dst)
}

/// Demote an `f32` image to another sample type, multiplying every sample by `scale` first.
///
/// For `u8` outputs the values are rounded and saturated to `[0, 255]`.
pub fn from_f32<T: ImageDtype, const C: usize>(
    src: &Image<f32, C>,
    scale: f32,
) -> Result<Image<T, C>, ImageError> {
    let data = src
        .as_slice()
        .iter()
        .map(|&x| T::from_f32(x * scale))
        .collect();
    Image::new(src.size(), data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageSize;

    #[test]
    fn test_cast_and_scale() -> Result<(), ImageError> {
        let image = Image::<u8, 3>::new(
            ImageSize {
                height: 2,
                width: 1,
            },
            vec![0u8, 0, 255, 0, 0, 255],
        )?;

        let mut image_f64: Image<f64, 3> = Image::from_size_val(image.size(), 0.0)?;

        super::cast_and_scale(&image, &mut image_f64, 1. / 255.0)?;

        let expected = vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0];

        assert_eq!(image_f64.as_slice(), expected);

        Ok(())
    }

    #[test]
    fn test_cast_and_scale_size_mismatch() -> Result<(), ImageError> {
        let image = Image::<u8, 1>::from_size_val([2, 1].into(), 0)?;
        let mut dst = Image::<f32, 1>::from_size_val([1, 2].into(), 0.0)?;
        assert_eq!(
            cast_and_scale(&image, &mut dst, 1.0),
            Err(ImageError::InvalidImageSize(2, 1, 1, 2))
        );
        Ok(())
    }

    #[test]
    fn test_promote_demote_roundtrip() -> Result<(), ImageError> {
        let data: Vec<u8> = (0..=255).collect();
        let image = Image::<u8, 1>::new([16, 16].into(), data)?;

        let image_f32 = to_f32(&image, 1.0 / 255.0)?;
        approx::assert_relative_eq!(image_f32.as_slice()[255], 1.0);

        let back: Image<u8, 1> = from_f32(&image_f32, 255.0)?;
        assert_eq!(back, image);

        Ok(())
    }
}
