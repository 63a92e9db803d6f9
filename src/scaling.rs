//! Min/max ranges and linear rescaling.

use serde::{Deserialize, Serialize};

/// Observed range of a single dimension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMax {
    pub min: f64,
    pub max: f64,
}

impl Default for MinMax {
    fn default() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl MinMax {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn update(&mut self, value: f64) {
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    /// Maps `value` from this range into `[dst_min, dst_max]`.
    pub fn scale(&self, value: f64, dst_min: f64, dst_max: f64) -> f64 {
        scale(value, self.min, self.max, dst_min, dst_max)
    }

    /// Maps `value` from `[src_min, src_max]` back into this range.
    pub fn unscale(&self, value: f64, src_min: f64, src_max: f64) -> f64 {
        scale(value, src_min, src_max, self.min, self.max)
    }
}

/// Computes per-dimension ranges over a set of rows.
pub fn ranges<'a, I>(rows: I, num_dimensions: usize) -> Vec<MinMax>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let mut ranges = vec![MinMax::default(); num_dimensions];
    for row in rows {
        for (range, &value) in ranges.iter_mut().zip(row.iter()) {
            range.update(value);
        }
    }
    ranges
}

/// Linearly maps `x` from `[src_min, src_max]` to `[dst_min, dst_max]`.
///
/// A degenerate source range maps everything to `dst_min`.
pub fn scale(x: f64, src_min: f64, src_max: f64, dst_min: f64, dst_max: f64) -> f64 {
    if src_min == src_max {
        return dst_min;
    }
    (x - src_min) * (dst_max - dst_min) / (src_max - src_min) + dst_min
}

/// Like [`scale`] but clamps the result into the destination range.
pub fn scale_clamped(x: f64, src_min: f64, src_max: f64, dst_min: f64, dst_max: f64) -> f64 {
    let y = scale(x, src_min, src_max, dst_min, dst_max);
    let (lo, hi) = if dst_min <= dst_max {
        (dst_min, dst_max)
    } else {
        (dst_max, dst_min)
    };
    y.clamp(lo, hi)
}

/// Scales every element of `x` into `[0, 1]` using `ranges`.
pub(crate) fn scale_vector(x: &[f64], ranges: &[MinMax]) -> Vec<f64> {
    x.iter()
        .zip(ranges.iter())
        .map(|(&v, r)| r.scale(v, 0.0, 1.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_maps_endpoints() {
        assert_eq!(scale(2.0, 2.0, 4.0, 0.0, 1.0), 0.0);
        assert_eq!(scale(4.0, 2.0, 4.0, 0.0, 1.0), 1.0);
        assert_eq!(scale(3.0, 2.0, 4.0, -1.0, 1.0), 0.0);
    }

    #[test]
    fn test_degenerate_range() {
        assert_eq!(scale(7.0, 5.0, 5.0, 0.0, 1.0), 0.0);
    }

    #[test]
    fn test_scale_clamped() {
        assert_eq!(scale_clamped(10.0, 0.0, 1.0, 0.0, 1.0), 1.0);
        assert_eq!(scale_clamped(-3.0, 0.0, 1.0, 0.0, 1.0), 0.0);
    }

    #[test]
    fn test_ranges() {
        let rows = vec![vec![1.0, -2.0], vec![3.0, 5.0], vec![2.0, 0.0]];
        let r = ranges(rows.iter().map(|r| r.as_slice()), 2);
        assert_eq!(r[0], MinMax::new(1.0, 3.0));
        assert_eq!(r[1], MinMax::new(-2.0, 5.0));
    }

    #[test]
    fn test_unscale_inverts_scale() {
        let range = MinMax::new(-4.0, 12.0);
        let y = range.scale(3.0, 0.0, 1.0);
        assert!((range.unscale(y, 0.0, 1.0) - 3.0).abs() < 1e-12);
    }
}
