//! Configuration structures for the recognition pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::mapping::FieldMapping;

/// Main configuration for the fapiao pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FapiaoConfig {
    /// Local OCR engine configuration.
    pub ocr: OcrConfig,

    /// Remote OCR service configuration.
    pub api: ApiConfig,

    /// User notification configuration.
    pub notification: NotificationConfig,

    /// Form synchronization configuration.
    pub form: FormConfig,

    /// Recognition orchestrator configuration.
    pub orchestrator: OrchestratorConfig,
}

/// Local OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,

    /// Keep `[UNK]` tokens in recognized text instead of replacing them with spaces.
    pub keep_unknown: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "ch_rec.onnx".to_string(),
            dictionary: "ch_dict.txt".to_string(),
            keep_unknown: false,
        }
    }
}

impl OcrConfig {
    /// Get full path to a model file.
    pub fn model_path(&self, model_name: &str) -> PathBuf {
        self.model_dir.join(model_name)
    }

    /// Whether the detection and recognition models exist on disk.
    pub fn models_present(&self) -> bool {
        self.model_path(&self.detection_model).exists()
            && self.model_path(&self.recognition_model).exists()
    }
}

/// Remote OCR service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Service endpoint. Required for remote recognition.
    pub url: Option<String>,

    /// Bearer token. Required for remote recognition.
    pub api_key: Option<String>,

    /// Recognition language sent to the service.
    pub language: String,

    /// Document type sent to the service.
    pub doc_type: String,

    /// Largest accepted image, in bytes.
    pub max_image_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            language: "zh-CN".to_string(),
            doc_type: "invoice".to_string(),
            max_image_bytes: 5 * 1024 * 1024,
        }
    }
}

/// User notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Notification title.
    pub title: String,

    /// How long a notification stays visible, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            title: "Invoice recognition".to_string(),
            timeout_ms: 5000,
        }
    }
}

/// Form synchronization configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    /// Highlight duration after a target is filled, in milliseconds.
    pub highlight_ms: u64,

    /// Target bindings.
    pub mapping: FieldMapping,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            highlight_ms: 2000,
            mapping: FieldMapping::identity(),
        }
    }
}

/// Recognition orchestrator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Ignore an image seen again within this window, in milliseconds (0 disables).
    pub debounce_ms: u64,

    /// Capacity of the image event queue.
    pub queue_capacity: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 1000,
            queue_capacity: 32,
        }
    }
}

impl FapiaoConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}
