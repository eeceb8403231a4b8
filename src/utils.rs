/// Helper function for evaluating the dot product between two vectors.
/// This implementation expect f64 slices and does not use any kind
/// of SSE operations. The slices are expected to have the same length.
///
/// ## Example
///
/// ```
/// let probabilities = vec![0.2, 0.45, 0.35];
/// let demands = vec![8.0, 10.0, 12.0];
///
/// let expected = facloc_rs::utils::dot_product(&probabilities, &demands);
/// assert!((expected - 10.3).abs() < 1e-12);
/// ```
pub fn dot_product(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Arithmetic mean of the values, or `None` for an empty slice.
///
/// ## Example
///
/// ```
/// assert_eq!(facloc_rs::utils::mean(&[1.0, 2.0, 6.0]), Some(3.0));
/// assert_eq!(facloc_rs::utils::mean(&[]), None);
/// ```
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}
