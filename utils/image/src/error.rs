use std::path::PathBuf;

use image::ImageFormat;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageProcessingError {
    #[error("failed to read image at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is not a PNG or JPEG image")]
    UnsupportedFormat {
        path: PathBuf,
        format: Option<ImageFormat>,
    },
    #[error("failed to decode image header at {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}
