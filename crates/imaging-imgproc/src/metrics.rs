use imaging_image::{Image, ImageError};

/// Compute the mean squared error (MSE) between two images.
///
/// The MSE is defined as:
///
/// $ MSE = \frac{1}{n} \sum_{i=1}^{n} (I_1 - I_2)^2 $
///
/// where `I_1` and `I_2` are the two images and `n` is the number of samples.
///
/// # Arguments
///
/// * `image1` - The first input image with shape (H, W, C).
/// * `image2` - The second input image with shape (H, W, C).
///
/// # Example
///
/// ```
/// use imaging_image::{Image, ImageSize};
/// use imaging_imgproc::metrics::mse;
///
/// let image1 = Image::<f32, 1>::new(
///    ImageSize {
///      width: 2,
///      height: 3,
///    },
///    vec![0f32, 1f32, 2f32, 3f32, 4f32, 5f32],
/// )
/// .unwrap();
///
/// let mse = mse(&image1, &image1).unwrap();
/// assert_eq!(mse, 0f32);
/// ```
pub fn mse<const C: usize>(
    image1: &Image<f32, C>,
    image2: &Image<f32, C>,
) -> Result<f32, ImageError> {
    if image1.size() != image2.size() {
        return Err(ImageError::InvalidImageSize(
            image1.cols(),
            image1.rows(),
            image2.cols(),
            image2.rows(),
        ));
    }

    if image1.is_empty() {
        return Err(ImageError::EmptyImage(image1.cols(), image1.rows()));
    }

    let mse = image1
        .as_slice()
        .iter()
        .zip(image2.as_slice().iter())
        .map(|(a, b)| (a - b).powi(2))
        .sum::<f32>();

    Ok(mse / (image1.numel() as f32))
}

/// Compute the peak signal-to-noise ratio (PSNR) between two images.
///
/// The PSNR is defined as:
///
/// $ PSNR = 20 \log_{10} \left( \frac{MAX}{\sqrt{MSE}} \right) $
///
/// and is expressed in decibels. Identical images yield `f32::INFINITY`.
///
/// # Arguments
///
/// * `image1` - The first input image with shape (H, W, C).
/// * `image2` - The second input image with shape (H, W, C).
/// * `max_value` - The maximum possible pixel value, e.g. `255.0` or `1.0`.
pub fn psnr<const C: usize>(
    image1: &Image<f32, C>,
    image2: &Image<f32, C>,
    max_value: f32,
) -> Result<f32, ImageError> {
    let mse = mse(image1, image2)?;

    if mse == 0f32 {
        return Ok(f32::INFINITY);
    }

    Ok(20f32 * (max_value / mse.sqrt()).log10())
}

#[cfg(test)]
mod tests {
    use imaging_image::{Image, ImageError, ImageSize};

    #[test]
    fn test_equal() -> Result<(), ImageError> {
        let image1 = Image::<_, 1>::new(
            ImageSize {
                width: 2,
                height: 3,
            },
            vec![0f32, 1f32, 2f32, 3f32, 4f32, 5f32],
        )?;
        let mse = crate::metrics::mse(&image1, &image1.clone())?;
        assert_eq!(mse, 0f32);
        assert_eq!(crate::metrics::psnr(&image1, &image1, 255.0)?, f32::INFINITY);

        Ok(())
    }

    #[test]
    fn test_not_equal() -> Result<(), ImageError> {
        let image1 = Image::<_, 1>::new([2, 2].into(), vec![0f32, 1f32, 2f32, 3f32])?;
        let image2 = Image::<_, 1>::new([2, 2].into(), vec![0f32, 3f32, 2f32, 3f32])?;
        let mse = crate::metrics::mse(&image1, &image2)?;
        assert_eq!(mse, 1.0);

        // max / sqrt(mse) == 10 -> 20 dB
        let psnr = crate::metrics::psnr(&image1, &image2, 10.0)?;
        approx::assert_relative_eq!(psnr, 20.0, epsilon = 1e-5);

        Ok(())
    }

    #[test]
    fn test_shape_mismatch() -> Result<(), ImageError> {
        let image1 = Image::<f32, 3>::from_size_val([2, 2].into(), 0.0)?;
        let image2 = Image::<f32, 3>::from_size_val([1, 2].into(), 0.0)?;
        assert_eq!(
            crate::metrics::mse(&image1, &image2),
            Err(ImageError::InvalidImageSize(2, 2, 1, 2))
        );
        Ok(())
    }
}
