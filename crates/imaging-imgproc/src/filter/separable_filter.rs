use imaging_image::{Image, ImageError};

use crate::padding::PaddingMode;
use crate::parallel::{par_iter_interior_rows, ExecutionStrategy};
use crate::FilterError;

/// A separable 2D filter that applies horizontal and vertical 1D convolutions sequentially.
///
/// This struct caches the kernel data and precomputed offsets for efficient filtering.
struct SeparableFilter<'a> {
    kernel_x: &'a [f32],
    kernel_y: &'a [f32],
    offsets_x: Vec<isize>,
    offsets_y: Vec<isize>,
    padding: PaddingMode,
}

impl<'a> SeparableFilter<'a> {
    fn new(kernel_x: &'a [f32], kernel_y: &'a [f32], padding: PaddingMode) -> Self {
        let half_x = (kernel_x.len() / 2) as isize;
        let half_y = (kernel_y.len() / 2) as isize;

        Self {
            kernel_x,
            kernel_y,
            offsets_x: (0..kernel_x.len() as isize).map(|i| i - half_x).collect(),
            offsets_y: (0..kernel_y.len() as isize).map(|i| i - half_y).collect(),
            padding,
        }
    }

    /// Horizontal pass over one row followed by a vertical pass into `dst`, both row-parallel.
    fn apply<const C: usize>(
        &self,
        src: &Image<f32, C>,
        dst: &mut Image<f32, C>,
        strategy: ExecutionStrategy,
    ) -> Result<(), FilterError> {
        let rows = src.rows();
        let cols = src.cols();
        let stride = cols * C;
        let src_data = src.as_slice();

        // Horizontal
        let mut temp = vec![0.0f32; src_data.len()];
        par_iter_interior_rows(&mut temp, stride, 0, strategy, |r, row_temp| {
            let src_row = &src_data[r * stride..(r + 1) * stride];
            for c in 0..cols {
                let mut acc = [0.0f32; C];
                for (&k, &off) in self.kernel_x.iter().zip(self.offsets_x.iter()) {
                    let Some(x) = self.padding.map_index(c as isize + off, cols) else {
                        continue;
                    };
                    for (ch, acc_val) in acc.iter_mut().enumerate() {
                        *acc_val += src_row[x * C + ch] * k;
                    }
                }
                row_temp[c * C..(c + 1) * C].copy_from_slice(&acc);
            }
        })?;

        // Vertical
        let temp = &temp;
        par_iter_interior_rows(dst.as_slice_mut(), stride, 0, strategy, |r, row_dst| {
            row_dst.fill(0.0);
            for (&k, &off) in self.kernel_y.iter().zip(self.offsets_y.iter()) {
                let Some(y) = self.padding.map_index(r as isize + off, rows) else {
                    continue;
                };
                let temp_row = &temp[y * stride..(y + 1) * stride];
                row_dst
                    .iter_mut()
                    .zip(temp_row.iter())
                    .for_each(|(d, &t)| *d += t * k);
            }
        })?;

        Ok(())
    }
}

/// Apply a separable filter with border and execution strategy control.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `kernel_x` - The horizontal kernel, odd length.
/// * `kernel_y` - The vertical kernel, odd length.
/// * `padding` - How taps falling outside of the image are resolved.
/// * `strategy` - Execution strategy.
pub fn separable_filter_with_strategy<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    kernel_x: &[f32],
    kernel_y: &[f32],
    padding: PaddingMode,
    strategy: ExecutionStrategy,
) -> Result<(), FilterError> {
    if kernel_x.len() % 2 == 0 || kernel_y.len() % 2 == 0 {
        return Err(ImageError::InvalidKernelLength(kernel_x.len(), kernel_y.len()).into());
    }

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

    SeparableFilter::new(kernel_x, kernel_y, padding).apply(src, dst, strategy)
}

/// Apply a separable filter to an image using the reflect-101 border and row parallelism.
///
/// For explicit control, use [`separable_filter_with_strategy`].
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `kernel_x` - The horizontal kernel.
/// * `kernel_y` - The vertical kernel.
pub fn separable_filter<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    kernel_x: &[f32],
    kernel_y: &[f32],
) -> Result<(), FilterError> {
    separable_filter_with_strategy(
        src,
        dst,
        kernel_x,
        kernel_y,
        PaddingMode::Reflect101,
        ExecutionStrategy::ParallelRows,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use imaging_image::ImageSize;

    #[test]
    fn test_separable_filter_f32() -> Result<(), FilterError> {
        let size = ImageSize {
            width: 5,
            height: 5,
        };

        #[rustfmt::skip]
        let img = Image::new(
            size,
            vec![
                0.0, 0.0, 0.0, 0.0, 0.0,
                0.0, 0.0, 0.0, 0.0, 0.0,
                0.0, 0.0, 9.0, 0.0, 0.0,
                0.0, 0.0, 0.0, 0.0, 0.0,
                0.0, 0.0, 0.0, 0.0, 0.0,
            ],
        )?;

        let mut dst = Image::<_, 1>::from_size_val(size, 0f32)?;
        let kernel_x = vec![1.0, 1.0, 1.0];
        let kernel_y = vec![1.0, 1.0, 1.0];

        separable_filter(&img, &mut dst, &kernel_x, &kernel_y)?;

        #[rustfmt::skip]
        assert_eq!(
            dst.as_slice(),
            &[
                0.0, 0.0, 0.0, 0.0, 0.0,
                0.0, 9.0, 9.0, 9.0, 0.0,
                0.0, 9.0, 9.0, 9.0, 0.0,
                0.0, 9.0, 9.0, 9.0, 0.0,
                0.0, 0.0, 0.0, 0.0, 0.0,
            ]
        );

        Ok(())
    }

    #[test]
    fn test_separable_filter_replicate_keeps_constant_image() -> Result<(), FilterError> {
        let size = [4, 3].into();
        let img = Image::<f32, 3>::from_size_val(size, 0.5)?;
        let mut dst = Image::<f32, 3>::from_size_val(size, 0.0)?;
        let kernel = crate::filter::kernels::gaussian_kernel_1d(5, 1.0);

        separable_filter_with_strategy(
            &img,
            &mut dst,
            &kernel,
            &kernel,
            PaddingMode::Replicate,
            ExecutionStrategy::Serial,
        )?;

        for &v in dst.as_slice() {
            approx::assert_relative_eq!(v, 0.5, epsilon = 1e-6);
        }
        Ok(())
    }

    #[test]
    fn test_separable_filter_constant_border_darkens_edges() -> Result<(), FilterError> {
        let size = [3, 1].into();
        let img = Image::<f32, 1>::from_size_val(size, 3.0)?;
        let mut dst = Image::<f32, 1>::from_size_val(size, 0.0)?;

        separable_filter_with_strategy(
            &img,
            &mut dst,
            &[1.0, 1.0, 1.0],
            &[1.0],
            PaddingMode::Constant,
            ExecutionStrategy::Serial,
        )?;

        assert_eq!(dst.as_slice(), &[6.0, 9.0, 6.0]);
        Ok(())
    }

    #[test]
    fn test_separable_filter_errors() -> Result<(), FilterError> {
        let img = Image::<f32, 1>::from_size_val([3, 3].into(), 0.0)?;
        let mut dst = Image::<f32, 1>::from_size_val([3, 3].into(), 0.0)?;
        assert_eq!(
            separable_filter(&img, &mut dst, &[1.0, 1.0], &[1.0]),
            Err(FilterError::Image(ImageError::InvalidKernelLength(2, 1)))
        );

        let mut wrong = Image::<f32, 1>::from_size_val([2, 3].into(), 0.0)?;
        assert_eq!(
            separable_filter(&img, &mut wrong, &[1.0], &[1.0]),
            Err(FilterError::Image(ImageError::InvalidImageSize(3, 3, 2, 3)))
        );
        Ok(())
    }
}
