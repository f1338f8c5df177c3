use std::io::Cursor;
use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        }
    }

    fn codec(&self) -> image::ImageFormat {
        match self {
            Self::Png => image::ImageFormat::Png,
            Self::Jpeg => image::ImageFormat::Jpeg,
        }
    }
}

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("failed reading {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("image is empty")]
    Empty,
    #[error("unsupported image format (expected PNG or JPEG)")]
    UnsupportedFormat,
    #[error("image could not be decoded: {0}")]
    Decode(#[source] image::ImageError),
    #[error("image could not be encoded: {0}")]
    Encode(#[source] image::ImageError),
}

/// Uploaded image bytes, sniffed as PNG or JPEG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBlob {
    bytes: Vec<u8>,
    format: ImageFormat,
}

impl ImageBlob {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, IntakeError> {
        if bytes.is_empty() {
            return Err(IntakeError::Empty);
        }
        let format = match image::guess_format(&bytes) {
            Ok(image::ImageFormat::Png) => ImageFormat::Png,
            Ok(image::ImageFormat::Jpeg) => ImageFormat::Jpeg,
            _ => return Err(IntakeError::UnsupportedFormat),
        };
        Ok(Self { bytes, format })
    }

    pub fn from_path(path: &Path) -> Result<Self, IntakeError> {
        let bytes = std::fs::read(path).map_err(|source| IntakeError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_bytes(bytes)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn sha256_hex(&self) -> String {
        hex::encode(Sha256::digest(&self.bytes))
    }

    pub fn decode(&self) -> Result<DecodedImage, IntakeError> {
        let image = image::load_from_memory_with_format(&self.bytes, self.format.codec())
            .map_err(IntakeError::Decode)?;
        Ok(DecodedImage {
            image,
            source_format: self.format,
        })
    }
}

#[derive(Debug, Clone)]
pub struct DecodedImage {
    image: DynamicImage,
    source_format: ImageFormat,
}

impl DecodedImage {
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn source_format(&self) -> ImageFormat {
        self.source_format
    }

    /// Re-encodes as PNG for the generator, shrinking the image so its
    /// longest side is at most `max_dim` pixels.
    pub fn encode_for_transport(&self, max_dim: u32) -> Result<EncodedImage, IntakeError> {
        let max_dim = max_dim.max(1);
        let (width, height) = self.image.dimensions();
        let scaled;
        let source = if width.max(height) > max_dim {
            scaled = self.image.resize(max_dim, max_dim, FilterType::Triangle);
            &scaled
        } else {
            &self.image
        };

        let mut bytes = Vec::new();
        source
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .map_err(IntakeError::Encode)?;
        let (width, height) = source.dimensions();
        Ok(EncodedImage {
            bytes,
            mime_type: ImageFormat::Png.mime_type(),
            width,
            height,
        })
    }
}

/// Transport form of an image: what the generation service receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub width: u32,
    pub height: u32,
}

#[cfg(test)]
pub(crate) fn sample_image_bytes(
    width: u32,
    height: u32,
    format: image::ImageFormat,
    rgb: [u8; 3],
) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        width,
        height,
        image::Rgb(rgb),
    ));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), format)
        .expect("encode sample image");
    bytes
}
