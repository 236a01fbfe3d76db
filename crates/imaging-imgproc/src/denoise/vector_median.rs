use imaging_image::{ops, Image, ImageBuffer, ImageError};

use super::distance::DistanceMetric;
use super::median::median_filter;
use super::neighborhood::NeighborhoodSampler;
use super::ranking::AlphaRanking;
use crate::parallel::{par_iter_interior_rows, ExecutionStrategy};
use crate::FilterError;

/// How the output pixel is formed from a ranked window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum VmfPolicy {
    /// The sample with the lowest aggregate distance.
    #[default]
    VectorMedian,
    /// The mean of the `trim` lowest-aggregate-distance samples.
    AlphaTrimmedMean,
}

/// How two co-located windows are combined by the dual-frame filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum DualFramePolicy {
    /// Rank the pooled samples of both windows together.
    #[default]
    Pooled,
    /// Rank each window on its own and average the two per-window outputs.
    PerFrameAverage,
}

/// Parameters of the vector median family of filters.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct VectorMedianConfig {
    /// Window radius, the window side is `2 * radius + 1`.
    pub radius: usize,
    /// Number of samples averaged by [`VmfPolicy::AlphaTrimmedMean`].
    pub trim: usize,
    /// Output policy.
    pub policy: VmfPolicy,
    /// Combination rule for the dual-frame filter.
    pub dual: DualFramePolicy,
    /// Distance used for ranking.
    pub metric: DistanceMetric,
    /// Row partitioning of the interior.
    pub strategy: ExecutionStrategy,
}

impl Default for VectorMedianConfig {
    fn default() -> Self {
        Self {
            radius: 1,
            trim: 3,
            policy: VmfPolicy::VectorMedian,
            dual: DualFramePolicy::Pooled,
            metric: DistanceMetric::L1,
            strategy: ExecutionStrategy::ParallelRows,
        }
    }
}

impl VectorMedianConfig {
    /// Same configuration with another output policy.
    pub fn with_policy(mut self, policy: VmfPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Same configuration with another window radius.
    pub fn with_radius(mut self, radius: usize) -> Self {
        self.radius = radius;
        self
    }

    fn validate(&self) -> Result<(), FilterError> {
        if self.policy == VmfPolicy::AlphaTrimmedMean && self.trim == 0 {
            return Err(FilterError::InvalidParameter {
                name: "trim",
                reason: "at least one sample must be averaged".to_string(),
            });
        }
        Ok(())
    }

    #[inline]
    fn select<const C: usize>(
        &self,
        ranking: &AlphaRanking,
        window: &[[f32; C]],
    ) -> Option<[f32; C]> {
        match self.policy {
            VmfPolicy::VectorMedian => ranking.best().map(|idx| window[idx]),
            VmfPolicy::AlphaTrimmedMean => ranking.trimmed_mean(window, self.trim),
        }
    }
}

fn check_same_size<const C: usize>(
    a: &Image<f32, C>,
    b: &Image<f32, C>,
) -> Result<(), FilterError> {
    if a.size() != b.size() {
        return Err(ImageError::InvalidImageSize(a.cols(), a.rows(), b.cols(), b.rows()).into());
    }
    Ok(())
}

/// Apply the vector median filter to an image.
///
/// For every interior pixel the `(2r+1)^2` window samples are ranked by the sum of their
/// distances to the other samples and the output is chosen by `config.policy`. Pixels closer
/// than `radius` to the edge keep their source value. Images smaller than one window are
/// copied unchanged.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `config` - Filter parameters.
///
/// # Errors
///
/// Returns an error if the image sizes differ or `config.trim` is zero for the
/// alpha-trimmed mean.
pub fn vector_median_filter<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    config: &VectorMedianConfig,
) -> Result<(), FilterError> {
    check_same_size(src, dst)?;
    config.validate()?;

    dst.as_slice_mut().copy_from_slice(src.as_slice());

    let sampler = NeighborhoodSampler::new(config.radius);
    if !sampler.fits(src.size()) {
        log::debug!(
            "image {} is smaller than a {}x{} window, copying",
            src.size(),
            sampler.side(),
            sampler.side()
        );
        return Ok(());
    }

    let cols = src.cols();
    let radius = config.radius;
    let src_data = src.as_slice();

    par_iter_interior_rows(
        dst.as_slice_mut(),
        cols * C,
        radius,
        config.strategy,
        |row, dst_row| {
            let mut window = Vec::<[f32; C]>::with_capacity(sampler.window_len());
            let mut ranking = AlphaRanking::default();
            for col in radius..cols - radius {
                window.clear();
                sampler.fill(&mut window, src_data, cols, row, col);
                ranking.recompute(&window, config.metric);
                if let Some(px) = config.select(&ranking, &window) {
                    dst_row[col * C..(col + 1) * C].copy_from_slice(&px);
                }
            }
        },
    )?;

    Ok(())
}

/// Apply the dual-frame vector median filter to two co-located frames.
///
/// With [`DualFramePolicy::Pooled`] the two windows form one pool of `2 (2r+1)^2` samples that
/// is ranked as a whole. With [`DualFramePolicy::PerFrameAverage`] each window is ranked on
/// its own and the output is the mean of both selections. Border pixels keep the value of
/// `first`.
///
/// # Errors
///
/// Returns an error if the three images do not share the same size or `config.trim` is zero
/// for the alpha-trimmed mean.
pub fn vector_median_filter_dual<const C: usize>(
    first: &Image<f32, C>,
    second: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    config: &VectorMedianConfig,
) -> Result<(), FilterError> {
    check_same_size(first, second)?;
    check_same_size(first, dst)?;
    config.validate()?;

    dst.as_slice_mut().copy_from_slice(first.as_slice());

    let sampler = NeighborhoodSampler::new(config.radius);
    if !sampler.fits(first.size()) {
        return Ok(());
    }

    let cols = first.cols();
    let radius = config.radius;
    let first_data = first.as_slice();
    let second_data = second.as_slice();

    par_iter_interior_rows(
        dst.as_slice_mut(),
        cols * C,
        radius,
        config.strategy,
        |row, dst_row| {
            let mut window = Vec::<[f32; C]>::with_capacity(2 * sampler.window_len());
            let mut other = Vec::<[f32; C]>::with_capacity(sampler.window_len());
            let mut ranking = AlphaRanking::default();
            for col in radius..cols - radius {
                window.clear();
                sampler.fill(&mut window, first_data, cols, row, col);

                let px = match config.dual {
                    DualFramePolicy::Pooled => {
                        sampler.fill(&mut window, second_data, cols, row, col);
                        ranking.recompute(&window, config.metric);
                        config.select(&ranking, &window)
                    }
                    DualFramePolicy::PerFrameAverage => {
                        ranking.recompute(&window, config.metric);
                        let a = config.select(&ranking, &window);

                        other.clear();
                        sampler.fill(&mut other, second_data, cols, row, col);
                        ranking.recompute(&other, config.metric);
                        let b = config.select(&ranking, &other);

                        a.zip(b).map(|(a, b)| {
                            let mut mean = [0.0f32; C];
                            for ((m, x), y) in mean.iter_mut().zip(a.iter()).zip(b.iter()) {
                                *m = 0.5 * (x + y);
                            }
                            mean
                        })
                    }
                };

                if let Some(px) = px {
                    dst_row[col * C..(col + 1) * C].copy_from_slice(&px);
                }
            }
        },
    )?;

    Ok(())
}

/// Apply the vector median filter and return the filtered image.
pub fn vector_median<const C: usize>(
    src: &Image<f32, C>,
    config: &VectorMedianConfig,
) -> Result<Image<f32, C>, FilterError> {
    let mut dst = Image::from_size_val(src.size(), 0.0)?;
    vector_median_filter(src, &mut dst, config)?;
    Ok(dst)
}

/// Apply the dual-frame vector median filter and return the filtered image.
pub fn vector_median_dual<const C: usize>(
    first: &Image<f32, C>,
    second: &Image<f32, C>,
    config: &VectorMedianConfig,
) -> Result<Image<f32, C>, FilterError> {
    let mut dst = Image::from_size_val(first.size(), 0.0)?;
    vector_median_filter_dual(first, second, &mut dst, config)?;
    Ok(dst)
}

/// Rank-filter a buffer according to its channel count.
///
/// Single channel buffers go through the scalar median filter, three channel buffers through
/// the vector median filter. 8-bit buffers are promoted to float and demoted back afterwards,
/// so the output has the sample type of the input.
pub fn rank_filter_buffer(
    src: &ImageBuffer,
    config: &VectorMedianConfig,
) -> Result<ImageBuffer, FilterError> {
    let out = match src {
        ImageBuffer::GrayU8(img) => {
            let img = ops::to_f32(img, 1.0)?;
            let mut dst = Image::from_size_val(img.size(), 0.0)?;
            median_filter(&img, &mut dst, config.radius, config.strategy)?;
            ImageBuffer::GrayU8(ops::from_f32(&dst, 1.0)?)
        }
        ImageBuffer::GrayF32(img) => {
            let mut dst = Image::from_size_val(img.size(), 0.0)?;
            median_filter(img, &mut dst, config.radius, config.strategy)?;
            ImageBuffer::GrayF32(dst)
        }
        ImageBuffer::RgbU8(img) => {
            let img = ops::to_f32(img, 1.0)?;
            let dst = vector_median(&img, config)?;
            ImageBuffer::RgbU8(ops::from_f32(&dst, 1.0)?)
        }
        ImageBuffer::RgbF32(img) => ImageBuffer::RgbF32(vector_median(img, config)?),
    };
    Ok(out)
}

/// Dual-frame counterpart of [`rank_filter_buffer`] for three channel buffers.
///
/// # Errors
///
/// Returns an error if the buffers differ in size, channel count or sample type, or if they
/// are not three channel buffers.
pub fn rank_filter_buffer_dual(
    first: &ImageBuffer,
    second: &ImageBuffer,
    config: &VectorMedianConfig,
) -> Result<ImageBuffer, FilterError> {
    let out = match (first, second) {
        (ImageBuffer::RgbU8(a), ImageBuffer::RgbU8(b)) => {
            let a = ops::to_f32(a, 1.0)?;
            let b = ops::to_f32(b, 1.0)?;
            let dst = vector_median_dual(&a, &b, config)?;
            ImageBuffer::RgbU8(ops::from_f32(&dst, 1.0)?)
        }
        (ImageBuffer::RgbF32(a), ImageBuffer::RgbF32(b)) => {
            ImageBuffer::RgbF32(vector_median_dual(a, b, config)?)
        }
        (ImageBuffer::GrayU8(_) | ImageBuffer::GrayF32(_), _) => {
            return Err(ImageError::UnsupportedChannels(first.channels()).into());
        }
        _ => {
            return Err(ImageError::UnsupportedSampleType {
                expected: format!("{}x{}", first.sample_type(), first.channels()),
                actual: format!("{}x{}", second.sample_type(), second.channels()),
            }
            .into());
        }
    };
    Ok(out)
}
