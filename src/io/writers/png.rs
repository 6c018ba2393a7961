use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use tracing::info;

use crate::error::{Error, Result};

/// Encode an RGBA8 buffer as PNG bytes.
pub fn encode_rgba_png(width: usize, height: usize, rgba: &[u8]) -> Result<Vec<u8>> {
    if rgba.len() != width * height * 4 {
        return Err(Error::Encode(format!(
            "RGBA buffer of {} bytes does not match {}x{}",
            rgba.len(),
            width,
            height
        )));
    }
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(rgba, width as u32, height as u32, ExtendedColorType::Rgba8)
        .map_err(Error::encode)?;
    Ok(buf)
}

/// `data:image/png;base64,...` URI for embedding PNG bytes in JSON payloads.
pub fn png_data_uri(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}

pub fn write_png(output: &Path, png: &[u8]) -> Result<()> {
    std::fs::write(output, png)?;
    info!("Wrote PNG overlay: {:?}", output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_decodes_back_to_same_pixels() {
        let rgba = vec![255, 0, 0, 255, 0, 0, 0, 0, 0, 255, 0, 255, 0, 0, 255, 255];
        let png = encode_rgba_png(2, 2, &rgba).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (2, 2));
        assert_eq!(decoded.into_raw(), rgba);
    }

    #[test]
    fn test_buffer_size_checked() {
        assert!(matches!(encode_rgba_png(3, 3, &[0; 8]), Err(Error::Encode(_))));
    }

    #[test]
    fn test_data_uri_prefix() {
        let uri = png_data_uri(&[0x89, b'P', b'N', b'G']);
        assert_eq!(uri, "data:image/png;base64,iVBORw==");
    }
}
