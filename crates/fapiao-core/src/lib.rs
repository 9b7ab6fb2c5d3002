//! Core library for Chinese VAT invoice recognition.
//!
//! This crate provides:
//! - Field extraction from OCR text or OCR service payloads
//! - Normalization of amounts and dates
//! - Form synchronization through a pluggable target resolver
//! - OCR engines (local `pure-onnx-ocr` model or remote service) and the
//!   recognition orchestrator, behind the `native` feature

pub mod error;
pub mod form;
pub mod invoice;
pub mod models;
pub mod ocr;
#[cfg(feature = "native")]
pub mod orchestrator;

pub use error::{ExtractionError, FapiaoError, FormatError, OcrError, Result};
pub use form::{FillReport, FormSync, MemoryForm, TargetResolver};
pub use invoice::{FieldExtractor, NormalizationResult, Normalizer, RawOcrOutput};
pub use models::{FapiaoConfig, FieldMapping, InvoiceField, InvoiceRecord};
pub use ocr::ImageSource;
#[cfg(feature = "native")]
pub use ocr::{EngineFactory, LocalEngineFactory, Recognizer, RemoteOcrClient};
#[cfg(feature = "native")]
pub use orchestrator::{Notification, Notifier, Orchestrator};
