use serde::{Deserialize, Serialize};

use crate::core::grid::RasterGrid;

/// Scalar summary of the valid pixels of a grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

impl StatsSummary {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Mean, population std, min, max and count over unmasked finite values.
/// A grid without valid values summarizes to all zeros.
pub fn summarize(grid: &RasterGrid) -> StatsSummary {
    let values = grid
        .data
        .iter()
        .zip(grid.mask.iter())
        .filter(|&(v, &m)| !m && v.is_finite())
        .map(|(&v, _)| v);

    let mut count = 0usize;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values.clone() {
        count += 1;
        sum += v;
        min = min.min(v);
        max = max.max(v);
    }
    if count == 0 {
        return StatsSummary::default();
    }

    let mean = sum / count as f64;
    let variance = values.map(|v| (v - mean) * (v - mean)).sum::<f64>() / count as f64;
    StatsSummary {
        mean,
        std: variance.sqrt(),
        min,
        max,
        count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::grid::{Affine, Crs};
    use ndarray::{Array2, array};

    fn grid(data: Array2<f64>, mask: Array2<bool>) -> RasterGrid {
        RasterGrid::new(data, mask, Affine::north_up(0.0, 0.0, 1.0, -1.0), Crs::wgs84()).unwrap()
    }

    #[test]
    fn test_summary_ignores_masked_and_nan() {
        let g = grid(
            array![[1.0, 2.0, 3.0], [4.0, f64::NAN, 100.0]],
            array![[false, false, false], [false, false, true]],
        );
        let s = summarize(&g);
        assert_eq!(s.count, 4);
        assert!((s.mean - 2.5).abs() < 1e-12);
        assert!((s.std - 1.25f64.sqrt()).abs() < 1e-12);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 4.0);
    }

    #[test]
    fn test_all_invalid_summarizes_to_zero() {
        let g = grid(Array2::from_elem((3, 3), 0.7), Array2::from_elem((3, 3), true));
        let s = summarize(&g);
        assert_eq!(s, StatsSummary::default());
        assert!(s.is_empty());
    }

    #[test]
    fn test_empty_grid_summarizes_to_zero() {
        let g = RasterGrid::empty(Affine::north_up(0.0, 0.0, 1.0, -1.0), Crs::wgs84());
        assert_eq!(summarize(&g).count, 0);
    }
}
