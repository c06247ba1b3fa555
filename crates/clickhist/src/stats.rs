//! Order statistics used for quantile overlays.

/// Quantile `q` (0..=1) of an ascending slice, interpolating linearly
/// between the two nearest order statistics at position `(n - 1) * q`.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }

    let h = (sorted.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    let frac = h - lo as f64;

    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Copy the finite values of an iterator into an ascending vector.
pub fn sorted_finite(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut out: Vec<f64> = values.filter(|v| v.is_finite()).collect();
    out.sort_by(f64::total_cmp);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantile_endpoints() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile_sorted(&values, 0.0), Some(1.0));
        assert_eq!(quantile_sorted(&values, 1.0), Some(4.0));
    }

    #[test]
    fn test_quantile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0];
        // h = 3 * 0.5 = 1.5 -> halfway between 2 and 3
        assert_eq!(quantile_sorted(&values, 0.5), Some(2.5));
        // h = 3 * 0.1 = 0.3
        let q10 = quantile_sorted(&values, 0.1).unwrap();
        assert!((q10 - 1.3).abs() < 1e-12);
    }

    #[test]
    fn test_quantile_single_value() {
        assert_eq!(quantile_sorted(&[7.0], 0.999), Some(7.0));
    }

    #[test]
    fn test_quantile_rejects_bad_input() {
        assert_eq!(quantile_sorted(&[], 0.5), None);
        assert_eq!(quantile_sorted(&[1.0], 1.5), None);
        assert_eq!(quantile_sorted(&[1.0], f64::NAN), None);
    }

    #[test]
    fn test_sorted_finite_drops_missing() {
        let sorted = sorted_finite([3.0, f64::NAN, 1.0, f64::INFINITY, 2.0].into_iter());
        assert_eq!(sorted, vec![1.0, 2.0, 3.0]);
    }
}
