//! Evenly spaced grids.

/// Generate `steps` evenly spaced points between `min` and `max` (inclusive).
///
/// Mirrors the usual `linspace` conventions: `steps == 0` is empty,
/// `steps == 1` is `[min]`, and the last point is exactly `max`.
pub fn lin_space(min: f64, max: f64, steps: usize) -> Vec<f64> {
    match steps {
        0 => Vec::new(),
        1 => vec![min],
        _ => {
            let step = (max - min) / (steps as f64 - 1.0);
            let mut out: Vec<f64> = (0..steps).map(|i| min + step * i as f64).collect();
            out[steps - 1] = max;
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lin_space_includes_endpoints() {
        let v = lin_space(6.0, 60.0, 20);
        assert_eq!(v.len(), 20);
        assert_eq!(v[0], 6.0);
        assert_eq!(v[19], 60.0);
    }

    #[test]
    fn lin_space_is_strictly_increasing_arithmetic() {
        let v = lin_space(6.0, 60.0, 7);
        let step = v[1] - v[0];
        for w in v.windows(2) {
            assert!(w[1] > w[0]);
            assert!((w[1] - w[0] - step).abs() < 1e-12);
        }
    }

    #[test]
    fn lin_space_degenerate_lengths() {
        assert!(lin_space(6.0, 60.0, 0).is_empty());
        assert_eq!(lin_space(6.0, 60.0, 1), vec![6.0]);
    }
}
