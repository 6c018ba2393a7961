//! Spectral index band math.
//!
//! Every formula adds [`EPSILON`] to its denominator, so a zero-sum pixel
//! evaluates to a finite value instead of NaN. The output mask is the union of
//! the masks of the bands the formula reads.
use std::collections::BTreeMap;

use ndarray::{Array2, Zip};
use tracing::debug;

use crate::core::grid::{IndexGrid, RasterGrid};
use crate::error::{Error, Result};
use crate::types::{Band, SpectralIndex};

/// Default denominator guard
pub const EPSILON: f64 = 1e-8;

/// Default SAVI soil brightness factor
pub const SAVI_L: f64 = 0.5;

/// Coefficients applied by the index formulas.
#[derive(Debug, Clone, Copy)]
pub struct IndexParams {
    pub epsilon: f64,
    pub savi_l: f64,
}

impl Default for IndexParams {
    fn default() -> Self {
        Self {
            epsilon: EPSILON,
            savi_l: SAVI_L,
        }
    }
}

/// Band grids of one scene, all aligned to the same reference grid.
#[derive(Debug, Clone, Default)]
pub struct BandSet {
    bands: BTreeMap<Band, RasterGrid>,
}

impl BandSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, band: Band, grid: RasterGrid) {
        self.bands.insert(band, grid);
    }

    pub fn get(&self, band: Band) -> Result<&RasterGrid> {
        self.bands.get(&band).ok_or(Error::InvalidArgument {
            arg: "band",
            value: band.to_string(),
        })
    }
}

/// Normalized difference: (a - b) / (a + b + eps)
pub fn normalized_difference(a: f64, b: f64, eps: f64) -> f64 {
    (a - b) / (a + b + eps)
}

pub fn evi(nir: f64, red: f64, blue: f64, eps: f64) -> f64 {
    2.5 * (nir - red) / (nir + 6.0 * red - 7.5 * blue + 1.0 + eps)
}

pub fn savi(nir: f64, red: f64, l: f64, eps: f64) -> f64 {
    (nir - red) / (nir + red + l + eps) * (1.0 + l)
}

/// Band grids must share shape, transform and CRS before they are combined.
fn ensure_aligned(grids: &[&RasterGrid]) -> Result<()> {
    let first = grids[0];
    for g in &grids[1..] {
        if !first.is_aligned_with(g) {
            return Err(Error::GridMismatch(format!(
                "band grids differ: {:?} {:?} {} vs {:?} {:?} {}",
                first.shape(),
                first.transform.coefficients(),
                first.crs,
                g.shape(),
                g.transform.coefficients(),
                g.crs
            )));
        }
    }
    Ok(())
}

fn union_mask(grids: &[&RasterGrid]) -> Array2<bool> {
    let mut mask = grids[0].mask.clone();
    for g in &grids[1..] {
        Zip::from(&mut mask).and(&g.mask).for_each(|m, &o| *m |= o);
    }
    mask
}

fn combine2<F>(a: &RasterGrid, b: &RasterGrid, f: F) -> Result<RasterGrid>
where
    F: Fn(f64, f64) -> f64 + Sync + Send,
{
    ensure_aligned(&[a, b])?;
    let mut out = Array2::<f64>::zeros(a.shape());
    Zip::from(&mut out)
        .and(&a.data)
        .and(&b.data)
        .par_for_each(|o, &x, &y| *o = f(x, y));
    RasterGrid::new(out, union_mask(&[a, b]), a.transform, a.crs.clone())
}

fn combine3<F>(a: &RasterGrid, b: &RasterGrid, c: &RasterGrid, f: F) -> Result<RasterGrid>
where
    F: Fn(f64, f64, f64) -> f64 + Sync + Send,
{
    ensure_aligned(&[a, b, c])?;
    let mut out = Array2::<f64>::zeros(a.shape());
    Zip::from(&mut out)
        .and(&a.data)
        .and(&b.data)
        .and(&c.data)
        .par_for_each(|o, &x, &y, &z| *o = f(x, y, z));
    RasterGrid::new(out, union_mask(&[a, b, c]), a.transform, a.crs.clone())
}

/// Evaluate `index` over the aligned bands in `bands`.
pub fn compute_index(index: SpectralIndex, bands: &BandSet, params: IndexParams) -> Result<IndexGrid> {
    let eps = params.epsilon;
    let grid = match index {
        SpectralIndex::Ndvi => combine2(bands.get(Band::Nir)?, bands.get(Band::Red)?, |nir, red| {
            normalized_difference(nir, red, eps)
        })?,
        SpectralIndex::Ndwi => combine2(bands.get(Band::Green)?, bands.get(Band::Nir)?, |g, nir| {
            normalized_difference(g, nir, eps)
        })?,
        SpectralIndex::Ndmi => combine2(bands.get(Band::Nir)?, bands.get(Band::Swir16)?, |nir, swir| {
            normalized_difference(nir, swir, eps)
        })?,
        SpectralIndex::Evi => combine3(
            bands.get(Band::Nir)?,
            bands.get(Band::Red)?,
            bands.get(Band::Blue)?,
            |nir, red, blue| evi(nir, red, blue, eps),
        )?,
        SpectralIndex::Savi => {
            let l = params.savi_l;
            combine2(bands.get(Band::Nir)?, bands.get(Band::Red)?, |nir, red| {
                savi(nir, red, l, eps)
            })?
        }
    };
    debug!("Computed {} over {:?} grid", index, grid.shape());
    Ok(IndexGrid { index, grid })
}
