//! `convert` and `thumbnail` (spec.md §4.8). Both are pure byte-in/byte-out
//! transforms invoked by the Worker's post-hoc palette fallback and by the
//! Export endpoint (`POST /export/process`).

use std::io::Cursor;

use base64::Engine;
use image::imageops::FilterType;
use image::ImageFormat as RasterFormat;

use crate::error::ImageProcessorError;

/// Target raster/vector formats for `convert` and the Export endpoint
/// (spec.md §6 `target_format`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    Png,
    Jpg,
    Webp,
    Svg,
}

impl TargetFormat {
    pub fn parse(value: &str) -> Result<Self, ImageProcessorError> {
        match value.to_ascii_lowercase().as_str() {
            "png" => Ok(TargetFormat::Png),
            "jpg" | "jpeg" => Ok(TargetFormat::Jpg),
            "webp" => Ok(TargetFormat::Webp),
            "svg" => Ok(TargetFormat::Svg),
            other => Err(ImageProcessorError::InvalidArgument(format!("unsupported target_format '{other}'"))),
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            TargetFormat::Png => "image/png",
            TargetFormat::Jpg => "image/jpeg",
            TargetFormat::Webp => "image/webp",
            TargetFormat::Svg => "image/svg+xml",
        }
    }
}

/// Re-encode `image_bytes` (any format the `image` crate can decode) into
/// `target_format`. `Svg` has no raster encoder, so the conversion wraps a
/// PNG-encoded raster in a minimal SVG `<image>` element — a vector
/// container around a raster payload, not a true vectorization, which
/// matches what a logo export step can promise without a tracing algorithm.
pub fn convert(image_bytes: &[u8], target_format: TargetFormat) -> Result<Vec<u8>, ImageProcessorError> {
    let image = image::load_from_memory(image_bytes).map_err(|e| ImageProcessorError::Decode(e.to_string()))?;

    match target_format {
        TargetFormat::Png => encode_raster(&image, RasterFormat::Png),
        TargetFormat::Jpg => encode_raster(&image.to_rgb8().into(), RasterFormat::Jpeg),
        TargetFormat::Webp => encode_raster(&image, RasterFormat::WebP),
        TargetFormat::Svg => {
            let png = encode_raster(&image, RasterFormat::Png)?;
            let base64_png = base64::engine::general_purpose::STANDARD.encode(&png);
            let (width, height) = (image.width(), image.height());
            Ok(format!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}"><image width="{width}" height="{height}" href="data:image/png;base64,{base64_png}"/></svg>"#
            )
            .into_bytes())
        }
    }
}

fn encode_raster(image: &image::DynamicImage, format: RasterFormat) -> Result<Vec<u8>, ImageProcessorError> {
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, format).map_err(|e| ImageProcessorError::Encode(e.to_string()))?;
    Ok(bytes.into_inner())
}

/// Resize so the longer side is `max_dim`, preserving aspect ratio, encoded
/// as PNG (spec.md §4.8 `thumbnail`).
pub fn thumbnail(image_bytes: &[u8], max_dim: u32) -> Result<Vec<u8>, ImageProcessorError> {
    if max_dim == 0 {
        return Err(ImageProcessorError::InvalidArgument("max_dim must be at least 1".into()));
    }
    let image = image::load_from_memory(image_bytes).map_err(|e| ImageProcessorError::Decode(e.to_string()))?;
    let resized = image.resize(max_dim, max_dim, FilterType::Lanczos3);
    encode_raster(&resized, RasterFormat::Png)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};

    fn sample_png(width: u32, height: u32) -> Vec<u8> {
        let image = RgbImage::from_pixel(width, height, Rgb([10, 20, 30]));
        let mut bytes = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(image).write_to(&mut bytes, RasterFormat::Png).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn parses_known_formats_case_insensitively() {
        assert_eq!(TargetFormat::parse("PNG").unwrap(), TargetFormat::Png);
        assert_eq!(TargetFormat::parse("jpeg").unwrap(), TargetFormat::Jpg);
        assert!(TargetFormat::parse("gif").is_err());
    }

    #[test]
    fn convert_to_png_round_trips() {
        let png = sample_png(10, 10);
        let converted = convert(&png, TargetFormat::Png).unwrap();
        assert_eq!(image::load_from_memory(&converted).unwrap().dimensions(), (10, 10));
    }

    #[test]
    fn convert_to_svg_embeds_a_data_uri() {
        let png = sample_png(4, 4);
        let svg = convert(&png, TargetFormat::Svg).unwrap();
        let text = String::from_utf8(svg).unwrap();
        assert!(text.contains("data:image/png;base64,"));
        assert!(text.contains("<svg"));
    }

    #[test]
    fn thumbnail_shrinks_preserving_aspect_ratio() {
        let png = sample_png(200, 100);
        let thumb = thumbnail(&png, 50).unwrap();
        let decoded = image::load_from_memory(&thumb).unwrap();
        assert_eq!(decoded.width(), 50);
        assert_eq!(decoded.height(), 25);
    }

    #[test]
    fn thumbnail_rejects_zero_max_dim() {
        assert!(thumbnail(&sample_png(10, 10), 0).is_err());
    }
}
