use super::distance::DistanceMetric;

/// Aggregate distance of every window sample plus the sample indices sorted by it.
///
/// The alpha value of a sample is the sum of its distances to every other sample of the same
/// window. Ties keep their window order, so the ranking of a given window is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlphaRanking {
    alphas: Vec<f32>,
    order: Vec<usize>,
}

impl AlphaRanking {
    /// Rank `samples` with the given metric.
    pub fn compute<const C: usize>(samples: &[[f32; C]], metric: DistanceMetric) -> Self {
        let mut ranking = Self::default();
        ranking.recompute(samples, metric);
        ranking
    }

    /// Rank `samples` reusing the internal buffers.
    ///
    /// The filters call this once per interior pixel, so the allocations are kept per row.
    pub fn recompute<const C: usize>(&mut self, samples: &[[f32; C]], metric: DistanceMetric) {
        let k = samples.len();
        self.alphas.clear();
        self.alphas.resize(k, 0.0);

        // d(i, j) == d(j, i): accumulate each pair once
        for i in 0..k {
            for j in (i + 1)..k {
                let d = metric.distance(&samples[i], &samples[j]);
                self.alphas[i] += d;
                self.alphas[j] += d;
            }
        }

        self.order.clear();
        self.order.extend(0..k);
        let alphas = &self.alphas;
        // sort_by is stable
        self.order.sort_by(|&a, &b| alphas[a].total_cmp(&alphas[b]));
    }

    /// Alpha value of every sample, in window order.
    pub fn alphas(&self) -> &[f32] {
        &self.alphas
    }

    /// Sample indices ascending by alpha value.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Index of the sample with the lowest alpha value.
    pub fn best(&self) -> Option<usize> {
        self.order.first().copied()
    }

    /// Mean of the `n` lowest-alpha samples.
    ///
    /// `n` is clamped to `[1, samples.len()]`. Returns `None` for an empty window.
    pub fn trimmed_mean<const C: usize>(
        &self,
        samples: &[[f32; C]],
        n: usize,
    ) -> Option<[f32; C]> {
        if self.order.is_empty() {
            return None;
        }
        let n = n.clamp(1, self.order.len());
        let mut acc = [0.0f32; C];
        for &idx in &self.order[..n] {
            for (a, &s) in acc.iter_mut().zip(samples[idx].iter()) {
                *a += s;
            }
        }
        acc.iter_mut().for_each(|a| *a /= n as f32);
        Some(acc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alpha_values() {
        let samples = [[0.0], [1.0], [3.0]];
        let ranking = AlphaRanking::compute(&samples, DistanceMetric::L1);
        assert_eq!(ranking.alphas(), &[4.0, 3.0, 5.0]);
        assert_eq!(ranking.order(), &[1, 0, 2]);
        assert_eq!(ranking.best(), Some(1));
    }

    #[test]
    fn test_ties_keep_window_order() {
        let samples = [[5.0, 5.0, 5.0]; 9];
        let ranking = AlphaRanking::compute(&samples, DistanceMetric::L1);
        assert_eq!(ranking.order(), &[0, 1, 2, 3, 4, 5, 6, 7, 8]);

        // symmetric values around 2.0: indices 0 and 2 tie
        let samples = [[1.0], [2.0], [3.0]];
        let ranking = AlphaRanking::compute(&samples, DistanceMetric::L1);
        assert_eq!(ranking.order(), &[1, 0, 2]);
    }

    #[test]
    fn test_trimmed_mean() {
        let samples = [[10.0], [0.0], [11.0], [12.0], [100.0]];
        let ranking = AlphaRanking::compute(&samples, DistanceMetric::L1);
        let mean = ranking.trimmed_mean(&samples, 3).expect("non-empty window");
        approx::assert_relative_eq!(mean[0], 11.0);

        // n larger than the window averages everything
        let all = ranking.trimmed_mean(&samples, 99).expect("non-empty window");
        approx::assert_relative_eq!(all[0], 26.6, epsilon = 1e-4);
    }

    #[test]
    fn test_empty_window() {
        let samples: [[f32; 3]; 0] = [];
        let ranking = AlphaRanking::compute(&samples, DistanceMetric::L1);
        assert_eq!(ranking.best(), None);
        assert_eq!(ranking.trimmed_mean(&samples, 3), None);
    }
}
