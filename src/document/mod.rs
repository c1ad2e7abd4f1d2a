//! Document loading
//!
//! Turns a file (PNG, JPEG or PDF) into a [`DocumentImage`] and rotates it
//! by quarter turns.

pub mod pdf;

use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Document loading failures
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported or corrupt image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("Invalid PDF: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("PDF renderer could not open the file: {0}")]
    PdfRender(String),

    #[error("PDF has no pages")]
    PdfNoPages,

    #[error("First PDF page has no raster image")]
    PdfNoImage,

    #[error("Unsupported PDF image: {0}")]
    UnsupportedPdfImage(String),
}

/// Where the pixels came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Png,
    Jpeg,
    Pdf,
    Other,
}

impl SourceFormat {
    pub fn name(&self) -> &'static str {
        match self {
            SourceFormat::Png => "PNG",
            SourceFormat::Jpeg => "JPEG",
            SourceFormat::Pdf => "PDF",
            SourceFormat::Other => "image",
        }
    }
}

/// Guess the container from its leading bytes
pub fn sniff_format(bytes: &[u8]) -> SourceFormat {
    if bytes.starts_with(b"%PDF") {
        SourceFormat::Pdf
    } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        SourceFormat::Png
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        SourceFormat::Jpeg
    } else {
        SourceFormat::Other
    }
}

/// A decoded page raster
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentImage {
    image: DynamicImage,
    source_format: SourceFormat,
}

impl DocumentImage {
    pub fn new(image: DynamicImage, source_format: SourceFormat) -> Self {
        Self {
            image,
            source_format,
        }
    }

    /// Load an image or the first page of a PDF from disk
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let bytes = std::fs::read(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document = Self::from_bytes(&bytes)?;
        let (width, height) = document.dimensions();
        info!(
            "Loaded {} ({}, {}x{})",
            path.display(),
            document.source_format().name(),
            width,
            height
        );
        Ok(document)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocumentError> {
        let format = sniff_format(bytes);
        let image = match format {
            SourceFormat::Pdf => pdf::first_page_image(bytes)?,
            SourceFormat::Png => image::load_from_memory_with_format(bytes, ImageFormat::Png)?,
            SourceFormat::Jpeg => image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)?,
            SourceFormat::Other => image::load_from_memory(bytes)?,
        };
        Ok(Self::new(image, format))
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn source_format(&self) -> SourceFormat {
        self.source_format
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    /// Rotate by quarter turns; positive is clockwise
    pub fn rotated(&self, quarter_turns: i32) -> Self {
        let image = match quarter_turns.rem_euclid(4) {
            1 => self.image.rotate90(),
            2 => self.image.rotate180(),
            3 => self.image.rotate270(),
            _ => self.image.clone(),
        };
        debug!("Rotated by {} quarter turns", quarter_turns);
        Self::new(image, self.source_format)
    }

    /// PNG bytes for the OCR service and the model
    pub fn encode_png(&self) -> Result<Vec<u8>, DocumentError> {
        encode_png(&self.image)
    }
}

pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, DocumentError> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(DocumentError::Encode)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn sample() -> DocumentImage {
        let mut pixels = RgbaImage::new(3, 2);
        for (x, y, pixel) in pixels.enumerate_pixels_mut() {
            *pixel = Rgba([x as u8 * 80, y as u8 * 120, 7, 255]);
        }
        DocumentImage::new(DynamicImage::ImageRgba8(pixels), SourceFormat::Png)
    }

    #[test]
    fn test_sniff_format() {
        assert_eq!(sniff_format(b"%PDF-1.7\n"), SourceFormat::Pdf);
        assert_eq!(sniff_format(&[0xFF, 0xD8, 0xFF, 0xE0]), SourceFormat::Jpeg);
        assert_eq!(
            sniff_format(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0]),
            SourceFormat::Png
        );
        assert_eq!(sniff_format(b"GIF89a"), SourceFormat::Other);
    }

    #[test]
    fn test_four_quarter_turns_are_identity() {
        let original = sample();
        let turned = original.rotated(1).rotated(1).rotated(1).rotated(1);
        assert_eq!(turned, original);
    }

    #[test]
    fn test_rotation_swaps_dimensions() {
        let original = sample();
        assert_eq!(original.rotated(1).dimensions(), (2, 3));
        assert_eq!(original.rotated(2).dimensions(), (3, 2));
    }

    #[test]
    fn test_negative_turns_are_counter_clockwise() {
        let original = sample();
        assert_eq!(original.rotated(-1), original.rotated(3));
        assert_eq!(original.rotated(-1).rotated(1), original);
        assert_eq!(original.rotated(5), original.rotated(1));
    }

    #[test]
    fn test_png_round_trip_through_bytes() {
        let original = sample();
        let bytes = original.encode_png().unwrap();

        let decoded = DocumentImage::from_bytes(&bytes).unwrap();

        assert_eq!(decoded.source_format(), SourceFormat::Png);
        assert_eq!(decoded.image().to_rgba8(), original.image().to_rgba8());
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(matches!(
            DocumentImage::from_bytes(b"not an image"),
            Err(DocumentError::Decode(_))
        ));
        assert!(DocumentImage::from_bytes(b"%PDF-1.4 truncated").is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = DocumentImage::load(Path::new("/nonexistent/receipt.png")).unwrap_err();
        assert!(matches!(err, DocumentError::Io { .. }));
    }
}
