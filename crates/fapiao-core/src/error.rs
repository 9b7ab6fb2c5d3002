//! Error types for the fapiao-core library.

use serde::Serialize;
use thiserror::Error;

use crate::models::record::InvoiceField;

/// Main error type for the fapiao library.
#[derive(Error, Debug)]
pub enum FapiaoError {
    /// OCR engine or OCR service error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Invoice extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Missing or invalid configuration. Raised at construction time.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to the OCR engine and the remote OCR service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OcrError {
    /// The engine could not be initialized. Retried on the next request.
    #[error("engine initialization failed: {0}")]
    EngineInit(String),

    /// Text recognition failed for one image.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// The OCR service answered with a non-success HTTP status.
    #[error("OCR service error: {0}")]
    Status(u16),

    /// Unsupported image format or size.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Errors related to invoice field extraction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// The OCR service reported a non-zero status or returned no data.
    #[error("recognition failed: {message}")]
    RecognitionFailed { message: String },

    /// The service payload does not have the expected shape.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

/// A single field that could not be normalized.
///
/// Local to one field: the rest of the record is still formatted.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("cannot format {field} value {value:?}")]
pub struct FormatError {
    pub field: InvoiceField,
    pub value: String,
}

/// Result type for the fapiao library.
pub type Result<T> = std::result::Result<T, FapiaoError>;
