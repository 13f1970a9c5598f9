//! Raster image intake for audit requests.
//!
//! Images are forwarded to the model as the original encoded bytes. The only
//! processing done here is reading the header to make sure the bytes really
//! are a PNG or JPEG the model will accept.

use std::io::Cursor;
use std::path::Path;
use std::path::PathBuf;

use image::ImageFormat;
use image::ImageReader;

mod error;

pub use error::ImageProcessingError;

/// Encoded image bytes that passed header validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

impl ValidatedImage {
    pub fn mime_type(&self) -> &'static str {
        match self.format {
            ImageFormat::Jpeg => "image/jpeg",
            _ => "image/png",
        }
    }
}

pub fn load_and_validate(path: &Path) -> Result<ValidatedImage, ImageProcessingError> {
    let bytes = std::fs::read(path).map_err(|source| ImageProcessingError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    validate_bytes(path, bytes)
}

/// Validate already-loaded bytes. `origin` is only used in error messages.
pub fn validate_bytes(
    origin: &Path,
    bytes: Vec<u8>,
) -> Result<ValidatedImage, ImageProcessingError> {
    let reader = ImageReader::new(Cursor::new(bytes.as_slice()))
        .with_guessed_format()
        .map_err(|source| ImageProcessingError::Read {
            path: origin.to_path_buf(),
            source,
        })?;

    let format = match reader.format() {
        Some(format @ (ImageFormat::Png | ImageFormat::Jpeg)) => format,
        other => {
            return Err(ImageProcessingError::UnsupportedFormat {
                path: origin.to_path_buf(),
                format: other,
            });
        }
    };

    let (width, height) =
        reader
            .into_dimensions()
            .map_err(|source| ImageProcessingError::Decode {
                path: PathBuf::from(origin),
                source,
            })?;

    tracing::debug!(?format, width, height, "validated image input");

    Ok(ValidatedImage {
        bytes,
        format,
        width,
        height,
    })
}
