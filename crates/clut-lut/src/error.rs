//! Error types for LUT loading and evaluation.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for LUT operations.
pub type LutResult<T> = Result<T, LutError>;

/// Errors that can occur while loading or applying a LUT.
#[derive(Debug, Error)]
pub enum LutError {
    /// I/O error while reading a LUT file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed LUT content.
    #[error("parse error: {0}")]
    Parse(String),

    /// Table dimensions do not match the data.
    #[error("invalid LUT size: {0}")]
    InvalidSize(String),

    /// A Hald image whose side is not `level^3` for an integer `level >= 2`.
    #[error("{path}: {width}x{height} is not a valid Hald CLUT")]
    NotACube {
        /// Source image
        path: PathBuf,
        /// Image width
        width: u32,
        /// Image height
        height: u32,
    },

    /// Pixel layout or file type the loader cannot handle.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A color processor refused the input.
    #[error("processor error: {0}")]
    Processor(String),
}

impl From<quick_xml::Error> for LutError {
    fn from(e: quick_xml::Error) -> Self {
        LutError::Parse(e.to_string())
    }
}

impl From<png::DecodingError> for LutError {
    fn from(e: png::DecodingError) -> Self {
        match e {
            png::DecodingError::IoError(io) => LutError::Io(io),
            other => LutError::UnsupportedFormat(other.to_string()),
        }
    }
}
