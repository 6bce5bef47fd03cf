//! `apply_palette` and `extract_palette` (spec.md §4.8).

use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage};
use std::collections::HashMap;
use std::io::Cursor;

use crate::error::ImageProcessorError;

pub(crate) fn parse_hex_color(color: &str) -> Result<Rgb<u8>, ImageProcessorError> {
    let hex = color.trim_start_matches('#');
    if hex.len() != 6 {
        return Err(ImageProcessorError::InvalidArgument(format!("'{color}' is not a 6-digit hex color")));
    }
    let value = u32::from_str_radix(hex, 16)
        .map_err(|_| ImageProcessorError::InvalidArgument(format!("'{color}' is not valid hex")))?;
    Ok(Rgb([((value >> 16) & 0xff) as u8, ((value >> 8) & 0xff) as u8, (value & 0xff) as u8]))
}

pub(crate) fn to_hex(color: Rgb<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", color.0[0], color.0[1], color.0[2])
}

/// Recolor `image_bytes` by mapping each pixel's luminance onto the ordered
/// `colors` gradient: darkest pixels map to `colors[0]`, lightest to
/// `colors[last]`, with linear interpolation between bucket boundaries.
/// This is the Worker's post-hoc fallback when the provider ignores a
/// requested palette (spec.md §4.8).
pub fn apply_palette(image_bytes: &[u8], colors: &[String]) -> Result<Vec<u8>, ImageProcessorError> {
    if colors.is_empty() {
        return Err(ImageProcessorError::InvalidArgument("palette must have at least one color".into()));
    }
    let parsed: Vec<Rgb<u8>> = colors.iter().map(|c| parse_hex_color(c)).collect::<Result<_, _>>()?;

    let image = image::load_from_memory(image_bytes).map_err(|e| ImageProcessorError::Decode(e.to_string()))?;
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut recolored = RgbImage::new(width, height);
    for (x, y, pixel) in rgb.enumerate_pixels() {
        let luminance = 0.299 * pixel.0[0] as f32 + 0.587 * pixel.0[1] as f32 + 0.114 * pixel.0[2] as f32;
        recolored.put_pixel(x, y, lerp_palette(&parsed, luminance / 255.0));
    }

    encode_png(&DynamicImage::ImageRgb8(recolored))
}

fn lerp_palette(colors: &[Rgb<u8>], t: f32) -> Rgb<u8> {
    if colors.len() == 1 {
        return colors[0];
    }
    let t = t.clamp(0.0, 1.0) * (colors.len() - 1) as f32;
    let lower = t.floor() as usize;
    let upper = (lower + 1).min(colors.len() - 1);
    let frac = t - lower as f32;
    let a = colors[lower];
    let b = colors[upper];
    Rgb([
        (a.0[0] as f32 + (b.0[0] as f32 - a.0[0] as f32) * frac) as u8,
        (a.0[1] as f32 + (b.0[1] as f32 - a.0[1] as f32) * frac) as u8,
        (a.0[2] as f32 + (b.0[2] as f32 - a.0[2] as f32) * frac) as u8,
    ])
}

/// Extract the `k` most common colors, quantized to reduce near-duplicate
/// noise from anti-aliasing, ordered by descending frequency.
pub fn extract_palette(image_bytes: &[u8], k: usize) -> Result<Vec<String>, ImageProcessorError> {
    if k == 0 {
        return Err(ImageProcessorError::InvalidArgument("k must be at least 1".into()));
    }
    let image = image::load_from_memory(image_bytes).map_err(|e| ImageProcessorError::Decode(e.to_string()))?;
    let rgb = image.to_rgb8();

    // Quantize to 16 levels per channel to merge near-identical colors
    // before counting, then de-quantize to the bucket midpoint for output.
    let mut counts: HashMap<(u8, u8, u8), u64> = HashMap::new();
    for pixel in rgb.pixels() {
        let bucket = (quantize(pixel.0[0]), quantize(pixel.0[1]), quantize(pixel.0[2]));
        *counts.entry(bucket).or_insert(0) += 1;
    }

    let mut ranked: Vec<((u8, u8, u8), u64)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    Ok(ranked.into_iter().take(k).map(|((r, g, b), _)| to_hex(Rgb([r, g, b]))).collect())
}

fn quantize(channel: u8) -> u8 {
    const BUCKET: u16 = 16;
    let bucket_index = channel as u16 / BUCKET;
    (bucket_index * BUCKET + BUCKET / 2).min(255) as u8
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, ImageProcessorError> {
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png).map_err(|e| ImageProcessorError::Encode(e.to_string()))?;
    Ok(bytes.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn sample_gradient_png() -> Vec<u8> {
        let mut image = RgbImage::new(8, 8);
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            let v = ((x + y) * 16) as u8;
            *pixel = Rgb([v, v, v]);
        }
        let mut bytes = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(image).write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn apply_palette_rejects_empty_colors() {
        assert!(apply_palette(&sample_gradient_png(), &[]).is_err());
    }

    #[test]
    fn apply_palette_produces_decodable_image_of_same_dimensions() {
        let input = sample_gradient_png();
        let recolored = apply_palette(&input, &["#1b4332".into(), "#d8f3dc".into()]).unwrap();
        let decoded = image::load_from_memory(&recolored).unwrap();
        assert_eq!(decoded.dimensions(), (8, 8));
    }

    #[test]
    fn apply_palette_rejects_malformed_hex() {
        assert!(apply_palette(&sample_gradient_png(), &["not-a-color".into()]).is_err());
    }

    #[test]
    fn extract_palette_returns_requested_count_or_fewer() {
        let palette = extract_palette(&sample_gradient_png(), 5).unwrap();
        assert!(palette.len() <= 5);
        assert!(!palette.is_empty());
        for color in &palette {
            assert!(color.starts_with('#'));
            assert_eq!(color.len(), 7);
        }
    }

    #[test]
    fn extract_palette_rejects_zero_k() {
        assert!(extract_palette(&sample_gradient_png(), 0).is_err());
    }
}
