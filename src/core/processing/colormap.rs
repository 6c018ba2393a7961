//! Index value → RGBA colour ramps and overlay rendering.
//!
//! Each index belongs to one ramp family. Ramps are piecewise linear and
//! continuous at their breakpoints; masked or non-finite pixels are fully
//! transparent.
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::grid::{Affine, Crs, RasterGrid};
use crate::core::processing::resize::{overlay_upscale_factor, upscale_rgba};
use crate::error::Result;
use crate::io::writers::png::{encode_rgba_png, png_data_uri};
use crate::types::SpectralIndex;

pub const TRANSPARENT: [u8; 4] = [0, 0, 0, 0];

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexFamily {
    /// Red (stressed) → yellow → green (healthy)
    Vegetation,
    /// Red → yellow → cyan → deep blue
    Water,
    /// Brown (dry) → yellow → green → teal → blue (wet)
    Moisture,
}

impl From<SpectralIndex> for IndexFamily {
    fn from(index: SpectralIndex) -> Self {
        match index {
            SpectralIndex::Ndvi | SpectralIndex::Evi | SpectralIndex::Savi => IndexFamily::Vegetation,
            SpectralIndex::Ndwi => IndexFamily::Water,
            SpectralIndex::Ndmi => IndexFamily::Moisture,
        }
    }
}

fn channel(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Position of `v` in `[lo, hi]`, clamped to [0, 1].
fn ratio(v: f64, lo: f64, hi: f64) -> f64 {
    ((v - lo) / (hi - lo)).clamp(0.0, 1.0)
}

fn opaque(r: f64, g: f64, b: f64) -> [u8; 4] {
    [channel(r), channel(g), channel(b), 255]
}

impl IndexFamily {
    pub fn color(&self, v: f64) -> [u8; 4] {
        if !v.is_finite() {
            return TRANSPARENT;
        }
        match self {
            IndexFamily::Vegetation => vegetation(v),
            IndexFamily::Water => water(v),
            IndexFamily::Moisture => moisture(v),
        }
    }

    /// Breakpoints between ramp segments.
    pub fn breakpoints(&self) -> &'static [f64] {
        match self {
            IndexFamily::Vegetation => &[0.3, 0.6],
            IndexFamily::Water => &[0.0, 0.2, 0.4],
            IndexFamily::Moisture => &[0.0, 0.3, 0.5],
        }
    }
}

fn vegetation(v: f64) -> [u8; 4] {
    if v < 0.3 {
        let r = ratio(v, -1.0, 0.3);
        opaque(255.0, 255.0 * r, 0.0)
    } else if v < 0.6 {
        // ends on the dark green where the intensity segment starts
        let r = ratio(v, 0.3, 0.6);
        opaque(255.0 * (1.0 - r), 255.0 - 155.0 * r, 0.0)
    } else {
        let r = ratio(v, 0.6, 1.0);
        opaque(0.0, 100.0 + 155.0 * r, 0.0)
    }
}

fn water(v: f64) -> [u8; 4] {
    if v < 0.0 {
        let r = ratio(v, -1.0, 0.0);
        opaque(255.0, 255.0 * r, 0.0)
    } else if v < 0.2 {
        let r = ratio(v, 0.0, 0.2);
        opaque(255.0 * (1.0 - r), 255.0, 255.0 * r)
    } else if v < 0.4 {
        let r = ratio(v, 0.2, 0.4);
        opaque(0.0, 255.0 * (1.0 - r), 255.0)
    } else {
        let intensity = (255.0 * (1.0 - (v - 0.4) / 0.6)).max(100.0);
        opaque(0.0, 0.0, (intensity + 50.0).min(255.0))
    }
}

fn moisture(v: f64) -> [u8; 4] {
    if v < 0.0 {
        let r = ratio(v, -1.0, 0.0);
        opaque(165.0 + 90.0 * r, 100.0 + 155.0 * r, 42.0)
    } else if v < 0.3 {
        // blue rises from the brown ramp's 42 to the teal ramp's 128
        let r = ratio(v, 0.0, 0.3);
        opaque(255.0 * (1.0 - r), 255.0, 42.0 + 86.0 * r)
    } else if v < 0.5 {
        let r = ratio(v, 0.3, 0.5);
        opaque(0.0, 255.0, 128.0 + 127.0 * r)
    } else {
        let r = ratio(v, 0.5, 1.0);
        opaque(0.0, 255.0 * (1.0 - r), 255.0)
    }
}

/// RGBA8 buffer of `grid`, row-major, one pixel per cell.
pub fn colorize(grid: &RasterGrid, family: IndexFamily) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(grid.data.len() * 4);
    for (&v, &masked) in grid.data.iter().zip(grid.mask.iter()) {
        let px = if masked { TRANSPARENT } else { family.color(v) };
        rgba.extend_from_slice(&px);
    }
    rgba
}

/// A coloured, PNG-encoded overlay co-registered with the grid it came from.
#[derive(Debug, Clone)]
pub struct RenderedOverlay {
    pub width: usize,
    pub height: usize,
    /// Block factor applied after colouring (1 when the grid was large enough)
    pub scale: usize,
    pub rgba: Vec<u8>,
    pub png: Vec<u8>,
    /// Transform of the output bitmap
    pub transform: Affine,
    pub crs: Crs,
}

impl RenderedOverlay {
    pub fn data_uri(&self) -> String {
        png_data_uri(&self.png)
    }

    /// `"WxHpx"`
    pub fn dimensions_label(&self) -> String {
        format!("{}x{}px", self.width, self.height)
    }
}

/// Colour `grid`, upscale it when its short side is below `min_size`, and encode as PNG.
/// A zero-size grid renders nothing.
pub fn render_overlay(grid: &RasterGrid, family: IndexFamily, min_size: usize) -> Result<Option<RenderedOverlay>> {
    if grid.is_empty() {
        return Ok(None);
    }
    let (rows, cols) = grid.shape();
    let rgba = colorize(grid, family);
    let scale = overlay_upscale_factor(cols, rows, min_size);
    let rgba = upscale_rgba(&rgba, cols, rows, scale)?;
    let (width, height) = (cols * scale, rows * scale);
    let png = encode_rgba_png(width, height, &rgba)?;
    debug!(
        "Rendered {:?} overlay {}x{} (scale {}), {} PNG bytes",
        family,
        width,
        height,
        scale,
        png.len()
    );
    Ok(Some(RenderedOverlay {
        width,
        height,
        scale,
        rgba,
        png,
        transform: grid.transform.scaled(scale),
        crs: grid.crs.clone(),
    }))
}
