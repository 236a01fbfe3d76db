use imaging_image::{Image, ImageError};
use rayon::prelude::*;

use crate::error::EnhanceError;

/// Number of bins of an 8-bit histogram.
pub const HIST_SIZE: usize = 256;

fn check_same_size(src: &Image<u8, 1>, dst: &Image<u8, 1>) -> Result<(), ImageError> {
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

fn histogram_of<'a>(values: impl Iterator<Item = &'a u8>) -> [usize; HIST_SIZE] {
    let mut hist = [0usize; HIST_SIZE];
    for &v in values {
        hist[v as usize] += 1;
    }
    hist
}

/// Compute the 256 bin intensity histogram of an 8-bit image.
///
/// # Example
///
/// ```
/// use imaging_image::Image;
/// use imaging_color_enhancement::equalize::compute_histogram;
///
/// let image = Image::<u8, 1>::new([3, 1].into(), vec![0, 7, 7]).unwrap();
/// let hist = compute_histogram(&image);
/// assert_eq!((hist[0], hist[7], hist[255]), (1, 2, 0));
/// ```
pub fn compute_histogram(src: &Image<u8, 1>) -> [usize; HIST_SIZE] {
    src.as_slice()
        .par_chunks(4096)
        .map(|chunk| histogram_of(chunk.iter()))
        .reduce(
            || [0usize; HIST_SIZE],
            |mut a, b| {
                for (x, y) in a.iter_mut().zip(b.iter()) {
                    *x += y;
                }
                a
            },
        )
}

/// Lookup table spreading a histogram over the full `[0, 255]` range.
///
/// The lowest occupied bin maps to 0 and the cumulative distribution of the remaining bins
/// is scaled to 255. A histogram with a single occupied bin maps every value to itself.
pub fn equalization_lut(hist: &[usize; HIST_SIZE]) -> [u8; HIST_SIZE] {
    let mut lut = [0u8; HIST_SIZE];
    let total: usize = hist.iter().sum();

    let first = hist.iter().position(|&count| count > 0);
    let Some(first) = first.filter(|&i| hist[i] < total) else {
        for (i, v) in lut.iter_mut().enumerate() {
            *v = i as u8;
        }
        return lut;
    };

    let scale = 255.0 / (total - hist[first]) as f32;
    let mut sum = 0;
    for (v, count) in lut.iter_mut().zip(hist.iter()).skip(first + 1) {
        sum += count;
        *v = (sum as f32 * scale).round().min(255.0) as u8;
    }
    lut
}

/// Equalize the histogram of an 8-bit image.
///
/// # Arguments
///
/// * `src` - The input image.
/// * `dst` - The output image, same size as `src`.
pub fn equalize_hist(src: &Image<u8, 1>, dst: &mut Image<u8, 1>) -> Result<(), ImageError> {
    check_same_size(src, dst)?;

    let lut = equalization_lut(&compute_histogram(src));
    dst.as_slice_mut()
        .par_iter_mut()
        .zip(src.as_slice().par_iter())
        .for_each(|(out, &v)| *out = lut[v as usize]);

    Ok(())
}

/// Parameters of contrast limited adaptive histogram equalization.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ClaheParams {
    /// Histogram bins are clipped at `clip_limit` times the mean bin count of a tile. Zero
    /// disables clipping.
    pub clip_limit: f32,
    /// Number of tiles along x and y.
    pub tiles: (usize, usize),
}

impl Default for ClaheParams {
    fn default() -> Self {
        Self {
            clip_limit: 2.0,
            tiles: (8, 8),
        }
    }
}

impl ClaheParams {
    fn validate(&self) -> Result<(), EnhanceError> {
        if !self.clip_limit.is_finite() || self.clip_limit < 0.0 {
            return Err(EnhanceError::InvalidParameter {
                name: "clip_limit",
                reason: format!("must be finite and non-negative, got {}", self.clip_limit),
            });
        }
        if self.tiles.0 == 0 || self.tiles.1 == 0 {
            return Err(EnhanceError::InvalidParameter {
                name: "tiles",
                reason: format!("grid must not be empty, got {:?}", self.tiles),
            });
        }
        Ok(())
    }
}

/// Clip the bins above `limit` and spread the excess evenly over all bins.
fn clip_histogram(hist: &mut [usize; HIST_SIZE], limit: usize) {
    let mut excess = 0;
    for count in hist.iter_mut() {
        if *count > limit {
            excess += *count - limit;
            *count = limit;
        }
    }

    let batch = excess / HIST_SIZE;
    let mut residual = excess - batch * HIST_SIZE;
    for count in hist.iter_mut() {
        *count += batch;
    }

    if residual > 0 {
        let step = (HIST_SIZE / residual).max(1);
        for count in hist.iter_mut().step_by(step) {
            if residual == 0 {
                break;
            }
            *count += 1;
            residual -= 1;
        }
    }
}

/// Start and end of tile `i` of `n` over `len` pixels.
fn tile_bounds(i: usize, n: usize, len: usize) -> (usize, usize) {
    (i * len / n, (i + 1) * len / n)
}

/// Tile indices and weight of the second tile for interpolation at `pos`.
fn tile_weights(pos: usize, tile_len: f32, n: usize) -> (usize, usize, f32) {
    let f = pos as f32 / tile_len - 0.5;
    let t1 = f.floor();
    let w = f - t1;
    let t2 = (t1 as isize + 1).min(n as isize - 1).max(0) as usize;
    let t1 = (t1.max(0.0) as usize).min(n - 1);
    (t1, t2, w)
}

/// Contrast limited adaptive histogram equalization of an 8-bit image.
///
/// The image is split into a grid of tiles, each tile gets its own clipped equalization
/// lookup table and every pixel is bilinearly interpolated between the tables of the four
/// nearest tiles. Grids larger than the image are shrunk to one tile per pixel.
///
/// # Arguments
///
/// * `src` - The input image.
/// * `dst` - The output image, same size as `src`.
/// * `params` - Clip limit and tile grid.
pub fn clahe(
    src: &Image<u8, 1>,
    dst: &mut Image<u8, 1>,
    params: &ClaheParams,
) -> Result<(), EnhanceError> {
    check_same_size(src, dst)?;
    params.validate()?;

    let (cols, rows) = (src.cols(), src.rows());
    if cols == 0 || rows == 0 {
        return Ok(());
    }

    let tiles_x = params.tiles.0.min(cols);
    let tiles_y = params.tiles.1.min(rows);
    let data = src.as_slice();

    let luts: Vec<[u8; HIST_SIZE]> = (0..tiles_x * tiles_y)
        .into_par_iter()
        .map(|t| {
            let (x0, x1) = tile_bounds(t % tiles_x, tiles_x, cols);
            let (y0, y1) = tile_bounds(t / tiles_x, tiles_y, rows);
            let area = (x1 - x0) * (y1 - y0);

            let mut hist =
                histogram_of((y0..y1).flat_map(|y| data[y * cols + x0..y * cols + x1].iter()));
            if params.clip_limit > 0.0 {
                let limit = params.clip_limit * area as f32 / HIST_SIZE as f32;
                clip_histogram(&mut hist, (limit as usize).max(1));
            }

            let scale = 255.0 / area as f32;
            let mut lut = [0u8; HIST_SIZE];
            let mut sum = 0;
            for (v, count) in lut.iter_mut().zip(hist.iter()) {
                sum += count;
                *v = (sum as f32 * scale).round().min(255.0) as u8;
            }
            lut
        })
        .collect();

    let tile_w = cols as f32 / tiles_x as f32;
    let tile_h = rows as f32 / tiles_y as f32;

    dst.as_slice_mut()
        .par_chunks_exact_mut(cols)
        .zip(data.par_chunks_exact(cols))
        .enumerate()
        .for_each(|(y, (dst_row, src_row))| {
            let (ty1, ty2, ya) = tile_weights(y, tile_h, tiles_y);
            for (x, (out, &v)) in dst_row.iter_mut().zip(src_row.iter()).enumerate() {
                let (tx1, tx2, xa) = tile_weights(x, tile_w, tiles_x);
                let v = v as usize;
                let lut = |tx: usize, ty: usize| luts[ty * tiles_x + tx][v] as f32;

                let top = lut(tx1, ty1) * (1.0 - xa) + lut(tx2, ty1) * xa;
                let bottom = lut(tx1, ty2) * (1.0 - xa) + lut(tx2, ty2) * xa;
                *out = (top * (1.0 - ya) + bottom * ya).round().clamp(0.0, 255.0) as u8;
            }
        });

    Ok(())
}
