use imaging_image::{ops, Image, ImageBuffer, ImageError};

use super::neighborhood::NeighborhoodSampler;
use crate::parallel::{par_iter_interior_rows, ExecutionStrategy};
use crate::FilterError;

/// Apply a scalar median filter to every channel of an image.
///
/// Window samples are sorted by value and the middle one is taken, i.e. the 5th of 9 for
/// `radius = 1`. Channels are filtered independently of each other. Border pixels and images
/// smaller than one window are copied unchanged.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `radius` - Window radius.
/// * `strategy` - Row partitioning of the interior.
pub fn median_filter<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    radius: usize,
    strategy: ExecutionStrategy,
) -> Result<(), FilterError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        )
        .into());
    }

    dst.as_slice_mut().copy_from_slice(src.as_slice());

    let sampler = NeighborhoodSampler::new(radius);
    if !sampler.fits(src.size()) {
        return Ok(());
    }

    let cols = src.cols();
    let src_data = src.as_slice();
    let k = sampler.window_len();

    par_iter_interior_rows(dst.as_slice_mut(), cols * C, radius, strategy, |row, dst_row| {
        let mut window: Vec<[f32; C]> = Vec::with_capacity(k);
        let mut values = Vec::with_capacity(k);
        for col in radius..cols - radius {
            window.clear();
            sampler.fill(&mut window, src_data, cols, row, col);
            for ch in 0..C {
                values.clear();
                values.extend(window.iter().map(|px| px[ch]));
                values.sort_by(f32::total_cmp);
                dst_row[col * C + ch] = values[k / 2];
            }
        }
    })?;

    Ok(())
}

/// Median-filter a buffer of any layout, keeping its sample type.
pub fn median_filter_buffer(
    src: &ImageBuffer,
    radius: usize,
    strategy: ExecutionStrategy,
) -> Result<ImageBuffer, FilterError> {
    fn run<const C: usize>(
        src: &Image<f32, C>,
        radius: usize,
        strategy: ExecutionStrategy,
    ) -> Result<Image<f32, C>, FilterError> {
        let mut dst = Image::from_size_val(src.size(), 0.0)?;
        median_filter(src, &mut dst, radius, strategy)?;
        Ok(dst)
    }

    fn run_u8<const C: usize>(
        src: &Image<u8, C>,
        radius: usize,
        strategy: ExecutionStrategy,
    ) -> Result<Image<u8, C>, FilterError> {
        let dst = run(&ops::to_f32(src, 1.0)?, radius, strategy)?;
        Ok(ops::from_f32(&dst, 1.0)?)
    }

    Ok(match src {
        ImageBuffer::GrayU8(img) => ImageBuffer::GrayU8(run_u8(img, radius, strategy)?),
        ImageBuffer::RgbU8(img) => ImageBuffer::RgbU8(run_u8(img, radius, strategy)?),
        ImageBuffer::GrayF32(img) => ImageBuffer::GrayF32(run(img, radius, strategy)?),
        ImageBuffer::RgbF32(img) => ImageBuffer::RgbF32(run(img, radius, strategy)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_takes_middle_value() -> Result<(), FilterError> {
        #[rustfmt::skip]
        let img = Image::<f32, 1>::new(
            [3, 3].into(),
            vec![
                9.0, 1.0, 8.0,
                2.0, 7.0, 3.0,
                6.0, 4.0, 5.0,
            ],
        )?;
        let mut dst = Image::from_size_val(img.size(), 0.0)?;
        median_filter(&img, &mut dst, 1, ExecutionStrategy::Serial)?;

        assert_eq!(*dst.get_pixel(1, 1, 0)?, 5.0);
        assert_eq!(*dst.get_pixel(0, 0, 0)?, 9.0);
        Ok(())
    }

    #[test]
    fn test_median_salt_and_pepper() -> Result<(), FilterError> {
        let mut img = Image::<f32, 1>::from_size_val([5, 5].into(), 100.0)?;
        img.set_pixel(0, 0, 0, 0.0)?;
        img.set_pixel(2, 2, 0, 255.0)?;
        let mut dst = Image::from_size_val(img.size(), 0.0)?;
        median_filter(&img, &mut dst, 1, ExecutionStrategy::ParallelRows)?;

        for y in 1..4 {
            for x in 1..4 {
                assert_eq!(*dst.get_pixel(x, y, 0)?, 100.0);
            }
        }
        Ok(())
    }

    #[test]
    fn test_median_larger_radius() -> Result<(), FilterError> {
        let data = (0..25).map(|v| v as f32).collect();
        let img = Image::<f32, 1>::new([5, 5].into(), data)?;
        let mut dst = Image::from_size_val(img.size(), 0.0)?;
        median_filter(&img, &mut dst, 2, ExecutionStrategy::Serial)?;

        assert_eq!(*dst.get_pixel(2, 2, 0)?, 12.0);
        // everything else is border for a 5x5 window
        assert_eq!(*dst.get_pixel(1, 1, 0)?, 6.0);
        Ok(())
    }

    #[test]
    fn test_median_size_mismatch() -> Result<(), FilterError> {
        let img = Image::<f32, 1>::from_size_val([3, 3].into(), 0.0)?;
        let mut dst = Image::from_size_val([3, 2].into(), 0.0)?;
        assert_eq!(
            median_filter(&img, &mut dst, 1, ExecutionStrategy::Serial),
            Err(FilterError::Image(ImageError::InvalidImageSize(3, 3, 3, 2)))
        );
        Ok(())
    }

    #[test]
    fn test_median_buffer_per_channel() -> Result<(), FilterError> {
        // channel 0 holds an outlier at the center, channel 1 a ramp, channel 2 is flat
        let mut data = Vec::new();
        for i in 0..9u8 {
            let outlier = if i == 4 { 250 } else { 10 };
            data.extend_from_slice(&[outlier, i * 10, 42]);
        }
        let src = ImageBuffer::from_u8([3, 3].into(), 3, data)?;
        let ImageBuffer::RgbU8(dst) = median_filter_buffer(&src, 1, ExecutionStrategy::Serial)?
        else {
            panic!("layout changed");
        };

        assert_eq!(*dst.get_pixel(1, 1, 0)?, 10);
        assert_eq!(*dst.get_pixel(1, 1, 1)?, 40);
        assert_eq!(*dst.get_pixel(1, 1, 2)?, 42);
        assert_eq!(*dst.get_pixel(0, 0, 1)?, 0);
        Ok(())
    }
}
