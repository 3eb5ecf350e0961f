//! Pixel marshaling: decoded bitmaps to the raw BGR buffer the native library reads.

use image::DynamicImage;
use thiserror::Error;

/// Bytes per pixel in the native layout.
pub const CHANNELS: usize = 3;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("image has zero width or height")]
    EmptyImage,
    #[error("image {width}x{height} exceeds the native size limit")]
    TooLarge { width: u32, height: u32 },
    #[error("invalid pixel buffer length: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// A row-major, 3-channel interleaved BGR pixel buffer with no row padding.
///
/// Built once per query and dropped when the native call returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBuffer {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
}

impl ImageBuffer {
    /// Convert a decoded image. Any color type is flattened to 8-bit BGR;
    /// alpha is dropped.
    pub fn from_image(img: &DynamicImage) -> Result<Self, ImageError> {
        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();
        let mut pixels = rgb.into_raw();
        rgb_to_bgr_in_place(&mut pixels);
        Self::from_bgr(pixels, width, height)
    }

    /// Wrap an existing BGR buffer after validating its geometry.
    pub fn from_bgr(pixels: Vec<u8>, width: u32, height: u32) -> Result<Self, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::EmptyImage);
        }
        if i32::try_from(width).is_err() || i32::try_from(height).is_err() {
            return Err(ImageError::TooLarge { width, height });
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(CHANNELS))
            .ok_or(ImageError::TooLarge { width, height })?;
        if pixels.len() != expected {
            return Err(ImageError::LengthMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self { pixels, width, height })
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Width as the native `int32_t`. Always in range once constructed.
    pub fn width_i32(&self) -> i32 {
        self.width as i32
    }

    pub fn height_i32(&self) -> i32 {
        self.height as i32
    }
}

/// Swap R and B in a packed RGB buffer. Trailing partial pixels are left as is.
fn rgb_to_bgr_in_place(pixels: &mut [u8]) {
    for px in pixels.chunks_exact_mut(CHANNELS) {
        px.swap(0, 2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    #[test]
    fn test_rgb_to_bgr() {
        let mut px = vec![1, 2, 3, 4, 5, 6];
        rgb_to_bgr_in_place(&mut px);
        assert_eq!(px, vec![3, 2, 1, 6, 5, 4]);
    }

    #[test]
    fn test_from_image_layout() {
        // 2x1: red then blue
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(1, 0, Rgb([0, 0, 255]));

        let buf = ImageBuffer::from_image(&DynamicImage::ImageRgb8(img)).unwrap();
        assert_eq!(buf.width(), 2);
        assert_eq!(buf.height(), 1);
        assert_eq!(buf.pixels(), &[0, 0, 255, 255, 0, 0]);
    }

    #[test]
    fn test_from_image_row_major() {
        // 1x2: top green, bottom white
        let mut img = RgbImage::new(1, 2);
        img.put_pixel(0, 0, Rgb([0, 200, 0]));
        img.put_pixel(0, 1, Rgb([255, 255, 255]));

        let buf = ImageBuffer::from_image(&DynamicImage::ImageRgb8(img)).unwrap();
        assert_eq!(buf.pixels(), &[0, 200, 0, 255, 255, 255]);
    }

    #[test]
    fn test_from_image_drops_alpha() {
        let mut img = RgbaImage::new(1, 1);
        img.put_pixel(0, 0, Rgba([10, 20, 30, 40]));
        let buf = ImageBuffer::from_image(&DynamicImage::ImageRgba8(img)).unwrap();
        assert_eq!(buf.pixels(), &[30, 20, 10]);
    }

    #[test]
    fn test_from_image_grayscale_expands() {
        let img = image::GrayImage::from_pixel(2, 2, image::Luma([77]));
        let buf = ImageBuffer::from_image(&DynamicImage::ImageLuma8(img)).unwrap();
        assert_eq!(buf.pixels().len(), 2 * 2 * CHANNELS);
        assert!(buf.pixels().iter().all(|&b| b == 77));
    }

    #[test]
    fn test_empty_image_rejected() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(0, 5));
        assert!(matches!(ImageBuffer::from_image(&img), Err(ImageError::EmptyImage)));
    }

    #[test]
    fn test_length_mismatch() {
        let err = ImageBuffer::from_bgr(vec![0; 10], 2, 2).unwrap_err();
        assert!(matches!(
            err,
            ImageError::LengthMismatch { expected: 12, actual: 10 }
        ));
    }

    #[test]
    fn test_too_large() {
        let err = ImageBuffer::from_bgr(Vec::new(), u32::MAX, 1).unwrap_err();
        assert!(matches!(err, ImageError::TooLarge { .. }));
    }

    #[test]
    fn test_native_dimensions() {
        let buf = ImageBuffer::from_bgr(vec![0; 4 * 3 * CHANNELS], 4, 3).unwrap();
        assert_eq!(buf.width_i32(), 4);
        assert_eq!(buf.height_i32(), 3);
    }
}
