use ndarray::{Array2, Zip};

use crate::core::aoi::Polygon;
use crate::core::grid::Affine;

/// True where the pixel centre falls outside `polygon`.
///
/// `polygon` must be expressed in the CRS of `transform`.
pub fn outside_polygon_mask(polygon: &Polygon, shape: (usize, usize), transform: &Affine) -> Array2<bool> {
    let bbox = polygon.bbox();
    let mut mask = Array2::from_elem(shape, true);
    Zip::indexed(&mut mask).par_for_each(|(row, col), m| {
        let (x, y) = transform.apply(col as f64 + 0.5, row as f64 + 0.5);
        let in_bbox = x >= bbox.min_x && x <= bbox.max_x && y >= bbox.min_y && y <= bbox.max_y;
        *m = !(in_bbox && polygon.contains(x, y));
    });
    mask
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(min: f64, max: f64) -> Polygon {
        Polygon::new(
            vec![(min, min), (max, min), (max, max), (min, max), (min, min)],
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn test_centre_rule() {
        // 4x4 grid of unit pixels, y up from 0 to 4
        let t = Affine::north_up(0.0, 4.0, 1.0, -1.0);
        let mask = outside_polygon_mask(&square(1.0, 3.0), (4, 4), &t);
        let inside: Vec<(usize, usize)> = mask
            .indexed_iter()
            .filter(|&(_, &m)| !m)
            .map(|(ix, _)| ix)
            .collect();
        assert_eq!(inside, vec![(1, 1), (1, 2), (2, 1), (2, 2)]);
    }

    #[test]
    fn test_hole_pixels_are_outside() {
        let t = Affine::north_up(0.0, 3.0, 1.0, -1.0);
        let poly = Polygon::new(
            vec![(0.0, 0.0), (3.0, 0.0), (3.0, 3.0), (0.0, 3.0)],
            vec![vec![(1.0, 1.0), (2.0, 1.0), (2.0, 2.0), (1.0, 2.0)]],
        )
        .unwrap();
        let mask = outside_polygon_mask(&poly, (3, 3), &t);
        assert!(mask[[1, 1]]);
        assert_eq!(mask.iter().filter(|&&m| !m).count(), 8);
    }

    #[test]
    fn test_upsampled_mask_agrees_on_whole_blocks() {
        use crate::core::grid::{Crs, RasterGrid};
        use crate::core::processing::resize::upsample;

        let factor = 3;
        let t = Affine::north_up(0.0, 6.0, 1.0, -1.0);
        let triangle = Polygon::new(vec![(0.2, 0.3), (5.7, 0.5), (2.9, 5.8)], vec![]).unwrap();
        let native = RasterGrid::from_samples(Array2::from_elem((6, 6), 1.0), None, t, Crs::wgs84());
        let high = upsample(&native, factor).unwrap();

        let native_mask = outside_polygon_mask(&triangle, native.shape(), &native.transform);
        let high_mask = outside_polygon_mask(&triangle, high.shape(), &high.transform);

        let (mut inside_blocks, mut outside_blocks, mut boundary_blocks) = (0, 0, 0);
        for ((r, c), &native_outside) in native_mask.indexed_iter() {
            let block: Vec<bool> = (0..factor)
                .flat_map(|i| (0..factor).map(move |j| (r * factor + i, c * factor + j)))
                .map(|ix| high_mask[ix])
                .collect();
            if block.iter().all(|&m| m == block[0]) {
                assert_eq!(block[0], native_outside, "block ({}, {})", r, c);
                if block[0] {
                    outside_blocks += 1;
                } else {
                    inside_blocks += 1;
                }
            } else {
                boundary_blocks += 1;
            }
        }
        assert!(inside_blocks > 0);
        assert!(outside_blocks > 0);
        assert!(boundary_blocks > 0);
    }
}
