/// Median of `values`, averaging the two middle elements for even lengths
///
/// Returns `None` for an empty slice. NaN values sort last.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let len = sorted.len();
    if len % 2 == 0 {
        Some((sorted[len / 2 - 1] + sorted[len / 2]) / 2.0)
    } else {
        Some(sorted[len / 2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_odd() {
        assert_eq!(median(&[30.0, 10.0, 20.0]), Some(20.0));
    }

    #[test]
    fn test_median_even() {
        assert_eq!(median(&[10.0, 20.0]), Some(15.0));
    }

    #[test]
    fn test_median_with_outliers() {
        assert_eq!(median(&[10.0, 11.0, 100.0]), Some(11.0));
    }

    #[test]
    fn test_median_empty() {
        assert_eq!(median(&[]), None);
    }
}
