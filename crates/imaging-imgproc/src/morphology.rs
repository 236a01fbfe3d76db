use imaging_image::{Image, ImageBuffer, ImageError};
use rayon::prelude::*;

use crate::{color, FilterError};

/// Morphological operation on a square structuring element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MorphOp {
    /// Minimum over the neighborhood.
    Erode,
    /// Maximum over the neighborhood.
    Dilate,
    /// Erosion followed by dilation.
    Open,
    /// Dilation followed by erosion.
    Close,
}

impl MorphOp {
    /// Lower-case name of the operation.
    pub fn name(&self) -> &'static str {
        match self {
            MorphOp::Erode => "erosion",
            MorphOp::Dilate => "dilation",
            MorphOp::Open => "opening",
            MorphOp::Close => "closing",
        }
    }
}

#[derive(Clone, Copy)]
enum Extreme {
    Min,
    Max,
}

impl Extreme {
    fn pick(self, a: f32, b: f32) -> f32 {
        match self {
            Extreme::Min => a.min(b),
            Extreme::Max => a.max(b),
        }
    }
}

// The square window is separable: a row pass then a column pass. Taps falling outside of
// the image are ignored.
fn rank_extreme<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    radius: usize,
    extreme: Extreme,
) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }
    if src.is_empty() {
        return Ok(());
    }

    let (width, height) = (src.width(), src.height());
    let row_stride = width * C;

    let mut horizontal = vec![0.0f32; src.numel()];
    horizontal
        .par_chunks_exact_mut(row_stride)
        .zip(src.as_slice().par_chunks_exact(row_stride))
        .for_each(|(out_row, src_row)| {
            for x in 0..width {
                let (lo, hi) = (x.saturating_sub(radius), (x + radius).min(width - 1));
                for c in 0..C {
                    let mut acc = src_row[lo * C + c];
                    for k in lo + 1..=hi {
                        acc = extreme.pick(acc, src_row[k * C + c]);
                    }
                    out_row[x * C + c] = acc;
                }
            }
        });

    dst.as_slice_mut()
        .par_chunks_exact_mut(row_stride)
        .enumerate()
        .for_each(|(y, out_row)| {
            let (lo, hi) = (y.saturating_sub(radius), (y + radius).min(height - 1));
            out_row.copy_from_slice(&horizontal[lo * row_stride..(lo + 1) * row_stride]);
            for k in lo + 1..=hi {
                let row = &horizontal[k * row_stride..(k + 1) * row_stride];
                for (out, &v) in out_row.iter_mut().zip(row) {
                    *out = extreme.pick(*out, v);
                }
            }
        });

    Ok(())
}

/// Erode an image with a square structuring element of side `2 * radius + 1`.
///
/// Each pixel is replaced by the minimum of its neighborhood, taps outside of the image are
/// ignored.
///
/// PRECONDITION: `src` and `dst` must have the same shape.
pub fn erode<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    radius: usize,
) -> Result<(), ImageError> {
    rank_extreme(src, dst, radius, Extreme::Min)
}

/// Dilate an image with a square structuring element of side `2 * radius + 1`.
///
/// Each pixel is replaced by the maximum of its neighborhood, taps outside of the image are
/// ignored.
///
/// PRECONDITION: `src` and `dst` must have the same shape.
pub fn dilate<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    radius: usize,
) -> Result<(), ImageError> {
    rank_extreme(src, dst, radius, Extreme::Max)
}

/// Opening: erosion followed by dilation.
///
/// Removes bright specks smaller than the structuring element.
pub fn open<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    radius: usize,
) -> Result<(), ImageError> {
    let mut temp_img = src.clone();
    erode(src, &mut temp_img, radius)?;
    dilate(&temp_img, dst, radius)
}

/// Closing: dilation followed by erosion.
///
/// Fills dark holes smaller than the structuring element.
pub fn close<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    radius: usize,
) -> Result<(), ImageError> {
    let mut temp_img = src.clone();
    dilate(src, &mut temp_img, radius)?;
    erode(&temp_img, dst, radius)
}

/// Apply a morphological operation to the luminance of a buffer.
///
/// The result is a single channel buffer of the same sample type as `src`.
///
/// # Arguments
///
/// * `src` - The source buffer, RGB input is converted to luminance first.
/// * `op` - The operation to apply.
/// * `radius` - Half side of the square structuring element, 0 leaves the luminance as is.
pub fn morphology_buffer(
    src: &ImageBuffer,
    op: MorphOp,
    radius: usize,
) -> Result<ImageBuffer, FilterError> {
    let gray = color::gray_plane(src)?;
    let mut dst = Image::from_size_val(gray.size(), 0.0)?;
    match op {
        MorphOp::Erode => erode(&gray, &mut dst, radius)?,
        MorphOp::Dilate => dilate(&gray, &mut dst, radius)?,
        MorphOp::Open => open(&gray, &mut dst, radius)?,
        MorphOp::Close => close(&gray, &mut dst, radius)?,
    }
    log::debug!("{} with radius {radius} on {} image", op.name(), src.sample_type());
    Ok(color::gray_buffer(dst, src.sample_type())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use imaging_image::ImageSize;

    const SIZE: ImageSize = ImageSize {
        width: 7,
        height: 5,
    };

    fn dot(x: usize, y: usize, fg: f32, bg: f32) -> Result<Image<f32, 1>, ImageError> {
        let mut img = Image::from_size_val(SIZE, bg)?;
        img.set_pixel(x, y, 0, fg)?;
        Ok(img)
    }

    #[test]
    fn test_dilate_grows_dot() -> Result<(), ImageError> {
        let src = dot(3, 2, 1.0, 0.0)?;
        let mut dst = Image::from_size_val(SIZE, 0.0)?;
        dilate(&src, &mut dst, 1)?;

        for y in 0..SIZE.height {
            for x in 0..SIZE.width {
                let inside = (2..=4).contains(&x) && (1..=3).contains(&y);
                assert_eq!(*dst.get_pixel(x, y, 0)?, if inside { 1.0 } else { 0.0 });
            }
        }
        Ok(())
    }

    #[test]
    fn test_erode_ignores_outside_taps() -> Result<(), ImageError> {
        let src = Image::<f32, 1>::from_size_val(SIZE, 5.0)?;
        let mut dst = Image::from_size_val(SIZE, 0.0)?;
        erode(&src, &mut dst, 2)?;
        assert!(dst.as_slice().iter().all(|&v| v == 5.0));

        let src = dot(0, 0, 0.0, 5.0)?;
        erode(&src, &mut dst, 1)?;
        assert_eq!(*dst.get_pixel(1, 1, 0)?, 0.0);
        assert_eq!(*dst.get_pixel(2, 0, 0)?, 5.0);
        Ok(())
    }

    #[test]
    fn test_open_removes_speck_close_fills_hole() -> Result<(), ImageError> {
        let mut dst = Image::from_size_val(SIZE, 0.0)?;

        open(&dot(3, 2, 1.0, 0.0)?, &mut dst, 1)?;
        assert!(dst.as_slice().iter().all(|&v| v == 0.0));

        close(&dot(3, 2, 0.0, 1.0)?, &mut dst, 1)?;
        assert!(dst.as_slice().iter().all(|&v| v == 1.0));
        Ok(())
    }

    #[test]
    fn test_rgb_channels_are_independent() -> Result<(), ImageError> {
        let mut src = Image::<f32, 3>::from_size_val(SIZE, 0.0)?;
        src.set_pixel(3, 2, 1, 9.0)?;
        let mut dst = Image::from_size_val(SIZE, 0.0)?;
        dilate(&src, &mut dst, 1)?;
        assert_eq!(dst.get_pixel(2, 1, 0)?, &0.0);
        assert_eq!(dst.get_pixel(2, 1, 1)?, &9.0);
        assert_eq!(dst.get_pixel(2, 1, 2)?, &0.0);
        Ok(())
    }

    #[test]
    fn test_size_mismatch() -> Result<(), ImageError> {
        let src = Image::<f32, 1>::from_size_val(SIZE, 0.0)?;
        let mut dst = Image::from_size_val([2, 2].into(), 0.0)?;
        assert_eq!(
            erode(&src, &mut dst, 1),
            Err(ImageError::InvalidImageSize(7, 5, 2, 2))
        );
        Ok(())
    }

    #[test]
    fn test_morphology_buffer() -> Result<(), FilterError> {
        let mut data = vec![0u8; SIZE.area() * 3];
        data[(2 * SIZE.width + 3) * 3..][..3].copy_from_slice(&[255, 255, 255]);
        let rgb = ImageBuffer::from_u8(SIZE, 3, data)?;

        let ImageBuffer::GrayU8(dilated) = morphology_buffer(&rgb, MorphOp::Dilate, 1)? else {
            panic!("expected a gray u8 buffer");
        };
        assert_eq!(dilated.as_slice().iter().filter(|&&v| v == 255).count(), 9);

        let opened = morphology_buffer(&rgb, MorphOp::Open, 1)?;
        assert_eq!(opened, ImageBuffer::from_u8(SIZE, 1, vec![0; SIZE.area()])?);

        let same = morphology_buffer(&rgb, MorphOp::Close, 0)?;
        assert_eq!(same.channels(), 1);
        assert_eq!(same.size(), SIZE);
        Ok(())
    }
}
