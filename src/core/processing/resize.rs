use fast_image_resize::{PixelType, ResizeAlg, ResizeOptions, Resizer, images::Image};
use ndarray::Array2;
use tracing::{debug, info};

use crate::core::grid::RasterGrid;
use crate::error::{Error, Result};

/// Replicate every pixel into a `factor x factor` block.
///
/// Data and mask are expanded identically; the transform keeps its origin and
/// has its pixel terms divided by `factor`.
pub fn upsample(grid: &RasterGrid, factor: usize) -> Result<RasterGrid> {
    if factor == 0 {
        return Err(Error::InvalidArgument {
            arg: "upscale_factor",
            value: factor.to_string(),
        });
    }
    if factor == 1 {
        return Ok(grid.clone());
    }
    let (rows, cols) = grid.shape();
    let shape = (rows * factor, cols * factor);
    let data = Array2::from_shape_fn(shape, |(r, c)| grid.data[[r / factor, c / factor]]);
    let mask = Array2::from_shape_fn(shape, |(r, c)| grid.mask[[r / factor, c / factor]]);
    debug!(
        "Upsampled {}x{} -> {}x{} (factor {})",
        cols, rows, shape.1, shape.0, factor
    );
    RasterGrid::new(data, mask, grid.transform.scaled(factor), grid.crs.clone())
}

/// Resample `grid` onto the shape of `reference` by nearest-neighbour index
/// mapping `src = floor(dst * src_len / dst_len)` on each axis.
///
/// The result adopts the reference transform, CRS and validity mask. Samples
/// invalid in `grid` itself are also masked.
pub fn align_to_reference(grid: &RasterGrid, reference: &RasterGrid) -> Result<RasterGrid> {
    let (dst_rows, dst_cols) = reference.shape();
    let (src_rows, src_cols) = grid.shape();
    if grid.shape() == reference.shape() {
        let mut aligned = grid.with_mask_union(&reference.mask)?;
        aligned.transform = reference.transform;
        aligned.crs = reference.crs.clone();
        return Ok(aligned);
    }
    if src_rows == 0 || src_cols == 0 {
        // nothing to sample from: everything invalid
        return RasterGrid::new(
            Array2::from_elem((dst_rows, dst_cols), f64::NAN),
            Array2::from_elem((dst_rows, dst_cols), true),
            reference.transform,
            reference.crs.clone(),
        );
    }
    let src_index = |dst: usize, dst_len: usize, src_len: usize| -> usize {
        ((dst * src_len) / dst_len).min(src_len - 1)
    };
    let data = Array2::from_shape_fn((dst_rows, dst_cols), |(r, c)| {
        grid.data[[src_index(r, dst_rows, src_rows), src_index(c, dst_cols, src_cols)]]
    });
    let mask = Array2::from_shape_fn((dst_rows, dst_cols), |(r, c)| {
        reference.mask[[r, c]]
            || grid.mask[[src_index(r, dst_rows, src_rows), src_index(c, dst_cols, src_cols)]]
    });
    info!(
        "Aligned {}x{} band to {}x{} reference",
        src_cols, src_rows, dst_cols, dst_rows
    );
    RasterGrid::new(data, mask, reference.transform, reference.crs.clone())
}

/// Block factor applied to overlays whose short side is under `min_size`:
/// `max(2, ceil(min_size / short_side))`, or 1 when no upscaling is needed.
pub fn overlay_upscale_factor(width: usize, height: usize, min_size: usize) -> usize {
    let short = width.min(height);
    if short == 0 || short >= min_size {
        return 1;
    }
    min_size.div_ceil(short).max(2)
}

/// Nearest-neighbour upscale of an RGBA8 buffer by an integer factor.
pub fn upscale_rgba(rgba: &[u8], width: usize, height: usize, factor: usize) -> Result<Vec<u8>> {
    if factor <= 1 {
        return Ok(rgba.to_vec());
    }
    let resize_options = ResizeOptions::new()
        .resize_alg(ResizeAlg::Nearest)
        .use_alpha(false);
    let mut resizer = Resizer::new();

    let src_image = Image::from_vec_u8(width as u32, height as u32, rgba.to_vec(), PixelType::U8x4)
        .map_err(Error::encode)?;
    let mut dst_image = Image::new(
        (width * factor) as u32,
        (height * factor) as u32,
        PixelType::U8x4,
    );
    resizer
        .resize(&src_image, &mut dst_image, &resize_options)
        .map_err(Error::encode)?;
    Ok(dst_image.into_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::grid::{Affine, Crs};
    use ndarray::array;

    fn grid(data: Array2<f64>, transform: Affine) -> RasterGrid {
        RasterGrid::from_samples(data, Some(0.0), transform, Crs::from_epsg(32631))
    }

    #[test]
    fn test_upsample_replicates_blocks_and_scales_transform() {
        let g = grid(array![[1.0, 0.0], [3.0, 4.0]], Affine::north_up(100.0, 200.0, 10.0, -10.0));
        let up = upsample(&g, 3).unwrap();
        assert_eq!(up.shape(), (6, 6));
        assert_eq!(up.data[[2, 2]], 1.0);
        assert_eq!(up.data[[5, 0]], 3.0);
        assert!(up.mask[[0, 3]] && up.mask[[2, 5]]);
        assert!(!up.mask[[3, 3]]);
        assert_eq!(up.transform.coefficients()[0], 100.0);
        assert!((up.transform.coefficients()[1] - 10.0 / 3.0).abs() < 1e-12);
        assert!((up.transform.coefficients()[5] + 10.0 / 3.0).abs() < 1e-12);
        assert!((up.bounds().max_x - g.bounds().max_x).abs() < 1e-9);
        assert!((up.bounds().min_y - g.bounds().min_y).abs() < 1e-9);
    }

    #[test]
    fn test_upsample_rejects_zero_factor() {
        let g = grid(array![[1.0]], Affine::north_up(0.0, 0.0, 1.0, -1.0));
        assert!(matches!(upsample(&g, 0), Err(Error::InvalidArgument { .. })));
        assert_eq!(upsample(&g, 1).unwrap().shape(), (1, 1));
    }

    #[test]
    fn test_align_coarse_band_to_fine_reference() {
        let coarse = grid(array![[1.0, 2.0], [3.0, 4.0]], Affine::north_up(0.0, 40.0, 20.0, -20.0));
        let reference = grid(Array2::from_elem((4, 4), 9.0), Affine::north_up(0.0, 40.0, 10.0, -10.0));
        let aligned = align_to_reference(&coarse, &reference).unwrap();
        assert_eq!(aligned.shape(), (4, 4));
        assert_eq!(aligned.data[[0, 1]], 1.0);
        assert_eq!(aligned.data[[1, 2]], 2.0);
        assert_eq!(aligned.data[[3, 0]], 3.0);
        assert_eq!(aligned.transform, reference.transform);
    }

    #[test]
    fn test_align_adopts_reference_mask() {
        let band = grid(array![[1.0, 2.0, 3.0]], Affine::north_up(0.0, 0.0, 20.0, -20.0));
        let reference = grid(array![[5.0, 0.0, 5.0, 5.0, 5.0, 5.0]], Affine::north_up(0.0, 0.0, 10.0, -10.0));
        let aligned = align_to_reference(&band, &reference).unwrap();
        assert_eq!(aligned.data.as_slice().unwrap(), &[1.0, 1.0, 2.0, 2.0, 3.0, 3.0]);
        assert!(aligned.mask[[0, 1]]);
        assert_eq!(aligned.valid_count(), 5);
    }

    #[test]
    fn test_overlay_upscale_factor() {
        assert_eq!(overlay_upscale_factor(200, 150, 100), 1);
        assert_eq!(overlay_upscale_factor(80, 300, 100), 2);
        assert_eq!(overlay_upscale_factor(30, 40, 100), 4);
        assert_eq!(overlay_upscale_factor(0, 40, 100), 1);
    }

    #[test]
    fn test_upscale_rgba_nearest() {
        let rgba = vec![255, 0, 0, 255, 0, 0, 255, 0];
        let out = upscale_rgba(&rgba, 2, 1, 2).unwrap();
        assert_eq!(out.len(), 4 * 2 * 4);
        assert_eq!(&out[0..4], &[255, 0, 0, 255]);
        assert_eq!(&out[4..8], &[255, 0, 0, 255]);
        assert_eq!(&out[8..12], &[0, 0, 255, 0]);
        assert_eq!(&out[16..20], &[255, 0, 0, 255]);
    }
}
