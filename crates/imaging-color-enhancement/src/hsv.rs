use imaging_image::{Image, ImageError};
use rayon::prelude::*;

fn check_same_size(src: &Image<f32, 3>, dst: &Image<f32, 3>) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }
    Ok(())
}

/// Convert an RGB image to an HSV image.
///
/// The input channels are in `[0, 255]`. The output channels are all scaled to `[0, 255]`:
/// hue `255` is 360 degrees, saturation `255` is fully saturated and value is the channel
/// maximum.
///
/// # Arguments
///
/// * `src` - The input RGB image.
/// * `dst` - The output HSV image.
///
/// # Example
///
/// ```
/// use imaging_image::{Image, ImageSize};
/// use imaging_color_enhancement::hsv::hsv_from_rgb;
///
/// let rgb = Image::<f32, 3>::new([1, 1].into(), vec![255.0, 0.0, 0.0]).unwrap();
/// let mut hsv = Image::<f32, 3>::from_size_val(rgb.size(), 0.0).unwrap();
///
/// hsv_from_rgb(&rgb, &mut hsv).unwrap();
/// assert_eq!(hsv.as_slice(), &[0.0, 255.0, 255.0]);
/// ```
pub fn hsv_from_rgb(src: &Image<f32, 3>, dst: &mut Image<f32, 3>) -> Result<(), ImageError> {
    check_same_size(src, dst)?;

    dst.as_slice_mut()
        .par_chunks_exact_mut(3)
        .zip(src.as_slice().par_chunks_exact(3))
        .for_each(|(dst_pixel, src_pixel)| {
            let r = src_pixel[0] / 255.;
            let g = src_pixel[1] / 255.;
            let b = src_pixel[2] / 255.;

            let max = r.max(g).max(b);
            let min = r.min(g).min(b);
            let delta = max - min;

            let h = if delta == 0.0 {
                0.0
            } else if max == r {
                60.0 * (((g - b) / delta) % 6.0)
            } else if max == g {
                60.0 * (((b - r) / delta) + 2.0)
            } else {
                60.0 * (((r - g) / delta) + 4.0)
            };
            let h = if h < 0.0 { h + 360.0 } else { h };

            let s = if max == 0.0 { 0.0 } else { delta / max };

            dst_pixel[0] = (h / 360.0) * 255.0;
            dst_pixel[1] = s * 255.0;
            dst_pixel[2] = max * 255.0;
        });

    Ok(())
}

/// Convert an HSV image back to RGB, the inverse of [`hsv_from_rgb`].
///
/// # Arguments
///
/// * `src` - The input HSV image, channels in `[0, 255]`.
/// * `dst` - The output RGB image, channels in `[0, 255]`.
pub fn rgb_from_hsv(src: &Image<f32, 3>, dst: &mut Image<f32, 3>) -> Result<(), ImageError> {
    check_same_size(src, dst)?;

    dst.as_slice_mut()
        .par_chunks_exact_mut(3)
        .zip(src.as_slice().par_chunks_exact(3))
        .for_each(|(dst_pixel, src_pixel)| {
            let h = (src_pixel[0] / 255.0 * 360.0).rem_euclid(360.0) / 60.0;
            let s = src_pixel[1] / 255.0;
            let v = src_pixel[2] / 255.0;

            let c = v * s;
            let x = c * (1.0 - ((h % 2.0) - 1.0).abs());
            let m = v - c;

            let (r, g, b) = match h as u32 {
                0 => (c, x, 0.0),
                1 => (x, c, 0.0),
                2 => (0.0, c, x),
                3 => (0.0, x, c),
                4 => (x, 0.0, c),
                _ => (c, 0.0, x),
            };

            dst_pixel[0] = (r + m) * 255.0;
            dst_pixel[1] = (g + m) * 255.0;
            dst_pixel[2] = (b + m) * 255.0;
        });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hsv_from_rgb() -> Result<(), ImageError> {
        let image = Image::<f32, 3>::new(
            [2, 1].into(),
            vec![0.0, 128.0, 255.0, 128.0, 128.0, 128.0],
        )?;
        let mut hsv = Image::<f32, 3>::from_size_val(image.size(), 0.0)?;
        hsv_from_rgb(&image, &mut hsv)?;

        let expected = [148.66667, 255.0, 255.0, 0.0, 0.0, 128.0];
        for (a, b) in hsv.as_slice().iter().zip(expected.iter()) {
            approx::assert_relative_eq!(a, b, epsilon = 1e-3);
        }
        Ok(())
    }

    #[test]
    fn test_round_trip() -> Result<(), ImageError> {
        let data: Vec<f32> = (0..3 * 64).map(|i| ((i * 37) % 256) as f32).collect();
        let rgb = Image::<f32, 3>::new([8, 8].into(), data)?;

        let mut hsv = Image::<f32, 3>::from_size_val(rgb.size(), 0.0)?;
        let mut back = Image::<f32, 3>::from_size_val(rgb.size(), 0.0)?;
        hsv_from_rgb(&rgb, &mut hsv)?;
        rgb_from_hsv(&hsv, &mut back)?;

        for (a, b) in back.as_slice().iter().zip(rgb.as_slice().iter()) {
            approx::assert_abs_diff_eq!(a, b, epsilon = 1e-2);
        }
        Ok(())
    }

    #[test]
    fn test_size_mismatch() -> Result<(), ImageError> {
        let rgb = Image::<f32, 3>::from_size_val([2, 2].into(), 0.0)?;
        let mut hsv = Image::<f32, 3>::from_size_val([2, 1].into(), 0.0)?;
        assert_eq!(
            hsv_from_rgb(&rgb, &mut hsv),
            Err(ImageError::InvalidImageSize(2, 2, 2, 1))
        );
        Ok(())
    }
}
