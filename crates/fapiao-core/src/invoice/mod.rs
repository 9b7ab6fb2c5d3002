//! Invoice field extraction and normalization.

mod extractor;
mod normalizer;
pub mod rules;

pub use extractor::{FieldExtractor, RawOcrOutput, SERVICE_FIELDS};
pub use normalizer::{NormalizationResult, Normalizer};

use crate::error::ExtractionError;

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;
