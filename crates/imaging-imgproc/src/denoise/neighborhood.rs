use imaging_image::{Image, ImageSize};

/// Ordered samples of one window, in raster order from the top-left to the bottom-right.
///
/// For the dual-frame variant the samples of the first frame come first, followed by the
/// co-located samples of the second frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighborhood<const C: usize> {
    samples: Vec<[f32; C]>,
}

impl<const C: usize> Neighborhood<C> {
    /// The window samples.
    pub fn samples(&self) -> &[[f32; C]] {
        &self.samples
    }

    /// Number of samples in the window.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if the window holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Extracts square windows of side `2 * radius + 1` around interior pixels.
///
/// A pixel is interior when the whole window fits inside the image. Border pixels are never
/// sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighborhoodSampler {
    radius: usize,
}

impl Default for NeighborhoodSampler {
    fn default() -> Self {
        Self { radius: 1 }
    }
}

impl NeighborhoodSampler {
    /// Create a sampler for windows of side `2 * radius + 1`.
    pub fn new(radius: usize) -> Self {
        Self { radius }
    }

    /// Window radius.
    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Window side length.
    pub fn side(&self) -> usize {
        2 * self.radius + 1
    }

    /// Number of samples in one single-frame window.
    pub fn window_len(&self) -> usize {
        self.side() * self.side()
    }

    /// Whether an image of this size has at least one interior pixel.
    pub fn fits(&self, size: ImageSize) -> bool {
        size.width >= self.side() && size.height >= self.side()
    }

    /// Whether the window around (`row`, `col`) lies fully inside the image.
    pub fn is_interior(&self, row: usize, col: usize, size: ImageSize) -> bool {
        self.fits(size)
            && row >= self.radius
            && col >= self.radius
            && row + self.radius < size.height
            && col + self.radius < size.width
    }

    /// Extract the window around (`row`, `col`), or `None` for border pixels.
    pub fn sample<const C: usize>(
        &self,
        img: &Image<f32, C>,
        row: usize,
        col: usize,
    ) -> Option<Neighborhood<C>> {
        if !self.is_interior(row, col, img.size()) {
            return None;
        }
        let mut samples = Vec::with_capacity(self.window_len());
        self.fill(&mut samples, img.as_slice(), img.cols(), row, col);
        Some(Neighborhood { samples })
    }

    /// Extract the pooled window of two co-located frames, or `None` for border pixels or
    /// frames of different sizes.
    pub fn sample_dual<const C: usize>(
        &self,
        first: &Image<f32, C>,
        second: &Image<f32, C>,
        row: usize,
        col: usize,
    ) -> Option<Neighborhood<C>> {
        if first.size() != second.size() || !self.is_interior(row, col, first.size()) {
            return None;
        }
        let mut samples = Vec::with_capacity(2 * self.window_len());
        self.fill(&mut samples, first.as_slice(), first.cols(), row, col);
        self.fill(&mut samples, second.as_slice(), second.cols(), row, col);
        Some(Neighborhood { samples })
    }

    /// Append the window around an interior pixel of `data` to `out`.
    ///
    /// The caller guarantees that (`row`, `col`) is interior.
    #[inline]
    pub(crate) fn fill<const C: usize>(
        &self,
        out: &mut Vec<[f32; C]>,
        data: &[f32],
        cols: usize,
        row: usize,
        col: usize,
    ) {
        debug_assert!(row >= self.radius && col >= self.radius);
        for y in row - self.radius..=row + self.radius {
            let start = (y * cols + col - self.radius) * C;
            let end = (y * cols + col + self.radius + 1) * C;
            out.extend(data[start..end].chunks_exact(C).map(|px| {
                let mut sample = [0.0f32; C];
                sample.copy_from_slice(px);
                sample
            }));
        }
    }
}
