//! Image scaling, square cropping and PNG encoding.
//!
//! Everything here is a pure function of its inputs: the same image and
//! factor always produce byte-identical output (bilinear kernel, fixed PNG
//! encoder settings).

use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageEncoder, RgbaImage};

use crate::thumbnail::types::ThumbnailError;

/// Both tiers derived from one source image, PNG-encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedPair {
    pub standard: Vec<u8>,
    pub high: Vec<u8>,
    /// Side length of the square standard image.
    pub standard_side: u32,
    /// Side length of the square high resolution image.
    pub high_side: u32,
}

/// Decode encoded image bytes (PNG or JPEG) into RGBA.
pub fn decode(bytes: &[u8]) -> Result<RgbaImage, ThumbnailError> {
    let image = image::load_from_memory(bytes)?.to_rgba8();
    if image.width() == 0 || image.height() == 0 {
        return Err(ThumbnailError::ImageDecode("image has no pixels".to_string()));
    }
    Ok(image)
}

/// Encode an image as PNG with fixed settings.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ThumbnailError> {
    let mut buf = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut buf, CompressionType::Default, PngFilterType::Adaptive);
    encoder
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| ThumbnailError::ImageDecode(format!("PNG encoding failed: {}", e)))?;
    Ok(buf)
}

/// Output dimensions of scaling `width x height` by `factor`.
pub fn scaled_dimensions(width: u32, height: u32, factor: f64) -> (u32, u32) {
    let scale = |v: u32| ((v as f64 * factor).round() as u32).max(1);
    (scale(width), scale(height))
}

/// Bilinear resample by `factor`.
///
/// A factor of exactly 1.0 hands the input back untouched.
pub fn scale(image: RgbaImage, factor: f64) -> RgbaImage {
    if factor == 1.0 {
        return image;
    }
    let (width, height) = scaled_dimensions(image.width(), image.height(), factor);
    if (width, height) == image.dimensions() {
        return image;
    }
    imageops::resize(&image, width, height, FilterType::Triangle)
}

/// Centered square region `(x, y, side)` of a `width x height` image.
///
/// The offset along the longer axis is `(longer - shorter) / 2`, rounded down.
pub fn square_crop_region(width: u32, height: u32) -> (u32, u32, u32) {
    if width > height {
        ((width - height) / 2, 0, height)
    } else {
        (0, (height - width) / 2, width)
    }
}

/// Crop to the centered square whose side is the shorter dimension.
pub fn crop_to_square(image: RgbaImage) -> RgbaImage {
    let (width, height) = image.dimensions();
    if width == height {
        return image;
    }
    let (x, y, side) = square_crop_region(width, height);
    imageops::crop_imm(&image, x, y, side, side).to_image()
}

/// Derive the standard and high resolution thumbnails from a source image.
///
/// The source is scaled so its shorter side becomes `target` (standard) or
/// `2 * target` (high), then square-cropped. Both tiers come from the same
/// decoded image, so the high tier is always exactly twice the standard.
pub fn derive_pair(source: &[u8], target: u32) -> Result<DerivedPair, ThumbnailError> {
    let image = decode(source)?;
    let shorter = image.width().min(image.height());
    let factor = target as f64 / shorter as f64;

    let standard = crop_to_square(scale(image.clone(), factor));
    let high = crop_to_square(scale(image, 2.0 * factor));

    Ok(DerivedPair {
        standard_side: standard.width(),
        high_side: high.width(),
        standard: encode_png(&standard)?,
        high: encode_png(&high)?,
    })
}
