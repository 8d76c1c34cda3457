use anyhow::{anyhow, bail};
use ndarray::ArrayView2;
use num_traits::ToPrimitive;
use std::ops::Range;

/// Converts numeric values to `f64`, rejecting anything that does not convert
/// or is not finite.
pub fn to_finite_f64<T: ToPrimitive>(values: &[T]) -> anyhow::Result<Vec<f64>> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let value = v
                .to_f64()
                .ok_or_else(|| anyhow!("Value at index {} is not representable as f64", i))?;
            if !value.is_finite() {
                bail!("Value at index {} is not finite ({})", i, value);
            }
            Ok(value)
        })
        .collect()
}

pub fn ensure_finite(x: ArrayView2<f64>) -> anyhow::Result<()> {
    if let Some(((row, col), value)) = x.indexed_iter().find(|(_, v)| !v.is_finite()) {
        bail!("Matrix entry ({}, {}) is not finite ({})", row, col, value);
    }
    Ok(())
}

/// Smallest range covering `values`, widened by `pad` of its span on each side.
///
/// `include_zero` keeps the origin visible, which bar charts need. A
/// span too small to tell apart from rounding noise at the values' own scale
/// is widened to one unit around its centre.
pub fn padded_range<I>(values: I, pad: f64, include_zero: bool) -> Range<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (mut lo, mut hi) = values
        .into_iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !lo.is_finite() || !hi.is_finite() {
        lo = 0.0;
        hi = 0.0;
    }
    if include_zero {
        lo = lo.min(0.0);
        hi = hi.max(0.0);
    }

    let span = hi - lo;
    if span <= f64::EPSILON * lo.abs().max(hi.abs()) {
        let centre = (lo + hi) / 2.0;
        return (centre - 0.5)..(centre + 0.5);
    }
    (lo - span * pad)..(hi + span * pad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_to_finite_f64() {
        let values = to_finite_f64(&[1.0f32, 2.5, -3.0]).unwrap();
        assert_eq!(values, vec![1.0, 2.5, -3.0]);

        let ints = to_finite_f64(&[1i32, 2, 3]).unwrap();
        assert_eq!(ints, vec![1.0, 2.0, 3.0]);

        assert!(to_finite_f64(&[1.0, f64::NAN]).is_err());
        assert!(to_finite_f64(&[f32::INFINITY]).is_err());
    }

    #[test]
    fn test_ensure_finite() {
        assert!(ensure_finite(array![[1.0, 2.0], [3.0, 4.0]].view()).is_ok());
        assert!(ensure_finite(array![[1.0, f64::NAN]].view()).is_err());
    }

    #[test]
    fn test_padded_range() {
        let range = padded_range(vec![1.0, 2.0, 3.0], 0.05, true);
        assert_relative_eq!(range.start, -0.15);
        assert_relative_eq!(range.end, 3.15);

        let range = padded_range(vec![-4.0, -2.0], 0.0, false);
        assert_relative_eq!(range.start, -4.0);
        assert_relative_eq!(range.end, -2.0);
    }

    #[test]
    fn test_padded_range_degenerate() {
        let range = padded_range(vec![0.0, 0.0], 0.05, true);
        assert_relative_eq!(range.start, -0.5);
        assert_relative_eq!(range.end, 0.5);

        let range = padded_range(Vec::new(), 0.05, false);
        assert_relative_eq!(range.start, -0.5);
        assert_relative_eq!(range.end, 0.5);

        let range = padded_range(vec![1e6, 1e6], 0.05, false);
        assert_relative_eq!(range.start, 1e6 - 0.5);
        assert_relative_eq!(range.end, 1e6 + 0.5);
    }

    #[test]
    fn test_padded_range_tiny_values_keep_their_scale() {
        let range = padded_range(vec![1e-17, 3e-17], 0.05, true);
        assert_relative_eq!(range.start, -1.5e-18, max_relative = 1e-12);
        assert_relative_eq!(range.end, 3.15e-17, max_relative = 1e-12);
        assert!(range.end < 1e-16);
    }
}
