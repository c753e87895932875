//! Conversion of uploaded bytes into the forms the pipeline consumes.

use image::imageops::FilterType;
use image::{Rgb, RgbImage};

use crate::error::Result;

/// Pure white marks pixels outside the mask shape.
const MASKED_OUT: Rgb<u8> = Rgb([255, 255, 255]);

/// The two upload slots of the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Text,
    Mask,
}

impl UploadKind {
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            UploadKind::Text => &["txt"],
            UploadKind::Mask => &["png", "jpg", "jpeg"],
        }
    }

    /// Check a file name against the allowed extensions (case-insensitive)
    pub fn accepts(self, file_name: &str) -> bool {
        file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .is_some_and(|ext| self.extensions().contains(&ext.as_str()))
    }

    /// Value for an HTML `accept` attribute
    pub fn accept_attr(self) -> String {
        self.extensions()
            .iter()
            .map(|e| format!(".{}", e))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Decode an uploaded text file. Only UTF-8 is accepted.
pub fn decode_text(bytes: Vec<u8>) -> Result<String> {
    Ok(String::from_utf8(bytes)?)
}

/// RGB mask resized to the canvas. Pure white pixels are background.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskArray(RgbImage);

impl MaskArray {
    /// Wrap an image that already has canvas dimensions
    pub fn from_image(image: RgbImage) -> Self {
        Self(image)
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    /// Whether words may not cover the pixel at (x, y)
    pub fn is_masked_out(&self, x: u32, y: u32) -> bool {
        *self.0.get_pixel(x, y) == MASKED_OUT
    }

    pub fn image(&self) -> &RgbImage {
        &self.0
    }
}

/// Decode a mask image, drop alpha and stretch it to `width` x `height`.
/// Non-square inputs are distorted, never cropped.
pub fn decode_mask(bytes: &[u8], width: u32, height: u32) -> Result<MaskArray> {
    let decoded = image::load_from_memory(bytes)?;
    tracing::debug!(
        original_width = decoded.width(),
        original_height = decoded.height(),
        width,
        height,
        "Decoded mask image"
    );

    let rgb = decoded.to_rgb8();
    let resized = image::imageops::resize(&rgb, width, height, FilterType::CatmullRom);
    Ok(MaskArray(resized))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CloudError;
    use image::{DynamicImage, ImageFormat, RgbaImage};
    use std::io::Cursor;

    fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
        bytes
    }

    #[test]
    fn test_decode_text_utf8() {
        let text = decode_text("사과 바나나".as_bytes().to_vec()).unwrap();
        assert_eq!(text, "사과 바나나");
    }

    #[test]
    fn test_decode_text_rejects_invalid_utf8() {
        // "사과" in EUC-KR
        let err = decode_text(vec![0xbb, 0xe7, 0xb0, 0xfa]).unwrap_err();
        assert!(matches!(err, CloudError::Decode(_)));
    }

    #[test]
    fn test_non_square_mask_is_stretched() {
        let wide = DynamicImage::ImageRgb8(RgbImage::from_pixel(300, 120, Rgb([0, 0, 0])));
        let mask = decode_mask(&encode(wide, ImageFormat::Png), 800, 800).unwrap();

        assert_eq!(mask.width(), 800);
        assert_eq!(mask.height(), 800);
        assert_eq!(mask.image().as_raw().len(), 800 * 800 * 3);
        // Stretched, not cropped or padded: the corners keep the source color
        assert!(!mask.is_masked_out(0, 0));
        assert!(!mask.is_masked_out(799, 799));
    }

    #[test]
    fn test_rgba_mask_normalized_to_rgb() {
        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            50,
            200,
            image::Rgba([255, 255, 255, 128]),
        ));
        let mask = decode_mask(&encode(rgba, ImageFormat::Png), 800, 800).unwrap();

        assert_eq!((mask.width(), mask.height()), (800, 800));
        assert!(mask.is_masked_out(400, 400));
    }

    #[test]
    fn test_jpeg_mask() {
        let gray = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 32, Rgb([20, 20, 20])));
        let mask = decode_mask(&encode(gray, ImageFormat::Jpeg), 800, 800).unwrap();

        assert_eq!((mask.width(), mask.height()), (800, 800));
    }

    #[test]
    fn test_decode_mask_rejects_garbage() {
        let err = decode_mask(b"definitely not an image", 800, 800).unwrap_err();
        assert!(matches!(err, CloudError::ImageDecode(_)));
    }

    #[test]
    fn test_upload_kind_accepts() {
        assert!(UploadKind::Text.accepts("speech.txt"));
        assert!(UploadKind::Text.accepts("SPEECH.TXT"));
        assert!(!UploadKind::Text.accepts("speech.md"));
        assert!(!UploadKind::Text.accepts("txt"));
        assert!(UploadKind::Mask.accepts("heart.png"));
        assert!(UploadKind::Mask.accepts("heart.JPEG"));
        assert!(!UploadKind::Mask.accepts("heart.gif"));
    }

    #[test]
    fn test_accept_attr() {
        assert_eq!(UploadKind::Text.accept_attr(), ".txt");
        assert_eq!(UploadKind::Mask.accept_attr(), ".png,.jpg,.jpeg");
    }
}
