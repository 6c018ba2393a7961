use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::core::grid::{Affine, Crs};
use crate::error::Result;

/// World file path for an image: `.pgw` for PNG, `.tfw` for TIFF, `.wld` otherwise.
pub fn world_file_path(output_image: &Path) -> PathBuf {
    let ext = output_image
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    let world_ext = match ext.as_str() {
        "png" => "pgw",
        "tif" | "tiff" => "tfw",
        "jpg" | "jpeg" => "jgw",
        _ => "wld",
    };
    output_image.with_extension(world_ext)
}

/// Write a world file next to the image. World files store the transform in
/// pixel-centre convention.
pub fn write_world_file(output_image: &Path, transform: &Affine) -> Result<PathBuf> {
    let gt = transform.coefficients();
    // A: pixel size in X, D: rotation about Y, B: rotation about X, E: pixel size Y
    // C, F: centre of the upper-left pixel
    let a = gt[1];
    let d = gt[4];
    let b = gt[2];
    let e = gt[5];
    let c = gt[0] + 0.5 * a + 0.5 * b;
    let f = gt[3] + 0.5 * d + 0.5 * e;

    let world_path = world_file_path(output_image);
    let mut file = File::create(&world_path)?;
    for v in [a, d, b, e, c, f] {
        writeln!(file, "{:.12}", v)?;
    }
    Ok(world_path)
}

/// Write a .prj file holding the CRS definition (WKT or EPSG:XXXX)
pub fn write_prj_file(output_image: &Path, crs: &Crs) -> Result<PathBuf> {
    let prj_path = output_image.with_extension("prj");
    std::fs::write(&prj_path, crs.as_str().as_bytes())?;
    Ok(prj_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_file_uses_pixel_centre() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("ndvi.png");
        let path = write_world_file(&image, &Affine::north_up(500_000.0, 4_600_000.0, 10.0, -10.0)).unwrap();
        assert_eq!(path, dir.path().join("ndvi.pgw"));
        let lines: Vec<f64> = std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| l.parse().unwrap())
            .collect();
        assert_eq!(lines, vec![10.0, 0.0, 0.0, -10.0, 500_005.0, 4_599_995.0]);
    }

    #[test]
    fn test_prj_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_prj_file(&dir.path().join("ndvi.png"), &Crs::from_epsg(32631)).unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "EPSG:32631");
        assert_eq!(world_file_path(Path::new("x.TIF")), PathBuf::from("x.tfw"));
    }
}
