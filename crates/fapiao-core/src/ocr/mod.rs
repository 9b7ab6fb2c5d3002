//! OCR collaborators: image sources, recognizers and engine factories.
//!
//! The recognition itself is done by external engines: a local
//! `pure-onnx-ocr` model ([`LocalEngineFactory`]) or a remote OCR service
//! ([`RemoteOcrClient`]).

mod validate;

#[cfg(feature = "native")]
mod pure_engine;
#[cfg(feature = "native")]
mod remote;

pub use validate::{strip_data_uri, validate_image, DEFAULT_MAX_IMAGE_BYTES};

#[cfg(feature = "native")]
pub use pure_engine::{LocalEngineFactory, PureOcrEngine};
#[cfg(feature = "native")]
pub use remote::RemoteOcrClient;

#[cfg(feature = "native")]
use std::sync::Arc;

#[cfg(feature = "native")]
use async_trait::async_trait;

#[cfg(feature = "native")]
use crate::error::OcrError;
#[cfg(feature = "native")]
use crate::invoice::RawOcrOutput;

/// An image to recognize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSource {
    /// Stable identity of the image (URL, path, ...), used for de-bouncing.
    pub key: String,
    /// Encoded image bytes.
    pub bytes: Vec<u8>,
}

impl ImageSource {
    pub fn new(key: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            key: key.into(),
            bytes,
        }
    }

    /// Decode a `data:image/...;base64,` URI (or a bare base64 payload).
    #[cfg(feature = "native")]
    pub fn from_data_uri(key: impl Into<String>, uri: &str) -> Result<Self, OcrError> {
        use base64::Engine as _;

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(strip_data_uri(uri).trim())
            .map_err(|e| OcrError::InvalidImage(format!("invalid base64 image: {}", e)))?;
        Ok(Self::new(key, bytes))
    }
}

/// A ready OCR engine.
///
/// Implementations are not assumed to be reentrant; callers serialize
/// access (see [`crate::orchestrator`]).
#[cfg(feature = "native")]
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Short engine name for logs.
    fn name(&self) -> &str;

    /// Recognize one image.
    async fn recognize(&self, image: &ImageSource) -> Result<RawOcrOutput, OcrError>;
}

/// Creates a [`Recognizer`]. Called lazily, and again after a failure.
#[cfg(feature = "native")]
#[async_trait]
pub trait EngineFactory: Send + Sync {
    async fn init(&self) -> Result<Arc<dyn Recognizer>, OcrError>;
}

/// Factory handing out an already constructed recognizer.
#[cfg(feature = "native")]
pub struct Preloaded(pub Arc<dyn Recognizer>);

#[cfg(feature = "native")]
#[async_trait]
impl EngineFactory for Preloaded {
    async fn init(&self) -> Result<Arc<dyn Recognizer>, OcrError> {
        Ok(Arc::clone(&self.0))
    }
}
