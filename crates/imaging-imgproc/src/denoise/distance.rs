/// Distance used to compare two multichannel samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum DistanceMetric {
    /// Sum of absolute channel differences.
    #[default]
    L1,
    /// Euclidean distance.
    L2,
}

impl DistanceMetric {
    /// Distance between two samples under this metric.
    #[inline]
    pub fn distance<const C: usize>(&self, a: &[f32; C], b: &[f32; C]) -> f32 {
        match self {
            DistanceMetric::L1 => l1_distance(a, b),
            DistanceMetric::L2 => l2_distance(a, b),
        }
    }
}

/// `|Δr| + |Δg| + |Δb|` for three channel samples, generalized to `C` channels.
#[inline]
pub fn l1_distance<const C: usize>(a: &[f32; C], b: &[f32; C]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum()
}

/// Euclidean distance between two samples.
#[inline]
pub fn l2_distance<const C: usize>(a: &[f32; C], b: &[f32; C]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l1_distance() {
        assert_eq!(l1_distance(&[1.0, 2.0, 3.0], &[4.0, 0.0, 3.0]), 5.0);
        assert_eq!(l1_distance(&[7.0], &[7.0]), 0.0);
    }

    #[test]
    fn test_l2_distance() {
        assert_eq!(l2_distance(&[0.0, 3.0, 0.0], &[4.0, 0.0, 0.0]), 5.0);
        assert_eq!(
            DistanceMetric::L2.distance(&[1.0, 1.0, 1.0], &[1.0, 1.0, 1.0]),
            0.0
        );
    }

    #[test]
    fn test_metric_is_symmetric() {
        let a = [10.0, 20.0, 30.0];
        let b = [-1.0, 25.0, 0.5];
        for metric in [DistanceMetric::L1, DistanceMetric::L2] {
            assert_eq!(metric.distance(&a, &b), metric.distance(&b, &a));
        }
    }
}
