/// Create a gaussian blur kernel.
///
/// # Arguments
///
/// * `kernel_size` - The size of the kernel.
/// * `sigma` - The sigma of the gaussian kernel.
///
/// # Returns
///
/// A vector of the kernel, normalized to sum one.
pub fn gaussian_kernel_1d(kernel_size: usize, sigma: f32) -> Vec<f32> {
    let mut kernel = Vec::with_capacity(kernel_size);

    let mean = (kernel_size - 1) as f32 / 2.0;
    let sigma_sq = sigma * sigma;

    // compute the kernel
    for i in 0..kernel_size {
        let x = i as f32 - mean;
        kernel.push((-(x * x) / (2.0 * sigma_sq)).exp());
    }

    // normalize the kernel
    let norm = kernel.iter().sum::<f32>();
    kernel.iter_mut().for_each(|k| *k /= norm);
    kernel
}

/// Sigma used for a gaussian kernel of `kernel_size` when no sigma is given.
///
/// Matches the rule `0.3 * ((ksize - 1) * 0.5 - 1) + 0.8` used by most imaging toolkits.
pub fn gaussian_sigma_for_size(kernel_size: usize) -> f32 {
    0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Create a kernel with all of its mass at the center tap.
///
/// Convolving with it leaves the signal unchanged.
pub fn identity_kernel_1d(kernel_size: usize) -> Vec<f32> {
    let mut kernel = vec![0.0; kernel_size];
    if let Some(center) = kernel.get_mut(kernel_size / 2) {
        *center = 1.0;
    }
    kernel
}

/// Create a sobel kernel pair as `(derivative, smoothing)`.
///
/// Only sizes 3 and 5 are defined, other sizes return `None`.
pub fn sobel_kernel_1d(kernel_size: usize) -> Option<(Vec<f32>, Vec<f32>)> {
    match kernel_size {
        3 => Some((vec![-1.0, 0.0, 1.0], vec![1.0, 2.0, 1.0])),
        5 => Some((
            vec![-1.0, -2.0, 0.0, 2.0, 1.0],
            vec![1.0, 4.0, 6.0, 4.0, 1.0],
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gaussian_kernel_1d() {
        let kernel = gaussian_kernel_1d(5, 0.5);

        let expected = [
            0.00026386508,
            0.10645077,
            0.78657067,
            0.10645077,
            0.00026386508,
        ];

        for (i, &k) in kernel.iter().enumerate() {
            approx::assert_relative_eq!(k, expected[i], epsilon = 1e-6);
        }
    }

    #[test]
    fn test_gaussian_kernel_9_2_is_normalized_and_symmetric() {
        let kernel = gaussian_kernel_1d(9, 2.0);
        approx::assert_relative_eq!(kernel.iter().sum::<f32>(), 1.0, epsilon = 1e-6);
        for i in 0..4 {
            approx::assert_relative_eq!(kernel[i], kernel[8 - i]);
        }
        assert!(kernel[4] > kernel[3]);
    }

    #[test]
    fn test_identity_kernel_1d() {
        assert_eq!(identity_kernel_1d(5), vec![0.0, 0.0, 1.0, 0.0, 0.0]);
        assert_eq!(identity_kernel_1d(1), vec![1.0]);
    }

    #[test]
    fn test_gaussian_sigma_for_size() {
        approx::assert_relative_eq!(gaussian_sigma_for_size(3), 0.8);
        approx::assert_relative_eq!(gaussian_sigma_for_size(15), 2.6, epsilon = 1e-6);
    }

    #[test]
    fn test_sobel_kernel_1d() {
        let (derivative, smoothing) = sobel_kernel_1d(3).unwrap_or_default();
        assert_eq!(derivative, vec![-1.0, 0.0, 1.0]);
        assert_eq!(smoothing, vec![1.0, 2.0, 1.0]);

        let (derivative, _) = sobel_kernel_1d(5).unwrap_or_default();
        approx::assert_relative_eq!(derivative.iter().sum::<f32>(), 0.0);
        assert!(sobel_kernel_1d(7).is_none());
    }
}
