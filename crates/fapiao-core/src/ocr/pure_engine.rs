//! Local OCR engine using `pure-onnx-ocr`.
//!
//! The model session is not thread-safe, so it lives on a dedicated worker
//! thread. [`PureOcrEngine`] is a handle that queues images to that thread
//! and awaits the reply; dropping the awaiting future abandons the request.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use image::{DynamicImage, GenericImageView};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::error::OcrError;
use crate::invoice::RawOcrOutput;
use crate::models::config::OcrConfig;

use super::{EngineFactory, ImageSource, Recognizer};

/// Recognized text line with its top-left corner.
struct TextLine {
    text: String,
    left: f32,
    top: f32,
}

/// One image queued to the worker.
struct Job {
    bytes: Vec<u8>,
    reply: oneshot::Sender<Result<String, OcrError>>,
}

/// Handle to a `pure-onnx-ocr` engine running on its own thread.
///
/// The worker stops once every handle is dropped.
pub struct PureOcrEngine {
    jobs: mpsc::Sender<Job>,
}

impl PureOcrEngine {
    /// Load the models named in the configuration on a new worker thread.
    pub async fn start(config: OcrConfig) -> Result<Self, OcrError> {
        let (jobs, queue) = mpsc::channel(1);
        let (ready, loaded) = oneshot::channel();

        std::thread::Builder::new()
            .name("fapiao-ocr".to_string())
            .spawn(move || run_worker(config, queue, ready))
            .map_err(|e| OcrError::EngineInit(format!("cannot start OCR thread: {}", e)))?;

        loaded
            .await
            .map_err(|_| OcrError::EngineInit("OCR thread exited during startup".to_string()))??;

        Ok(Self { jobs })
    }
}

#[async_trait]
impl Recognizer for PureOcrEngine {
    fn name(&self) -> &str {
        "pure-onnx-ocr"
    }

    async fn recognize(&self, image: &ImageSource) -> Result<RawOcrOutput, OcrError> {
        let (reply, answer) = oneshot::channel();
        let job = Job {
            bytes: image.bytes.clone(),
            reply,
        };

        self.jobs
            .send(job)
            .await
            .map_err(|_| OcrError::Recognition("OCR thread stopped".to_string()))?;
        let text = answer
            .await
            .map_err(|_| OcrError::Recognition("OCR thread dropped the request".to_string()))??;

        Ok(RawOcrOutput::Text(text))
    }
}

fn run_worker(
    config: OcrConfig,
    mut queue: mpsc::Receiver<Job>,
    ready: oneshot::Sender<Result<(), OcrError>>,
) {
    let engine = match load_engine(&config) {
        Ok(engine) => engine,
        Err(err) => {
            let _ = ready.send(Err(err));
            return;
        }
    };
    if ready.send(Ok(())).is_err() {
        return;
    }

    while let Some(job) = queue.blocking_recv() {
        if job.reply.is_closed() {
            debug!("Skipping abandoned OCR request");
            continue;
        }

        let result = image::load_from_memory(&job.bytes)
            .map_err(|e| OcrError::InvalidImage(e.to_string()))
            .and_then(|decoded| extract_text(&engine, &decoded, config.keep_unknown));
        let _ = job.reply.send(result);
    }

    debug!("OCR thread stopped");
}

fn load_engine(config: &OcrConfig) -> Result<pure_onnx_ocr::engine::OcrEngine, OcrError> {
    let det_path = config.model_path(&config.detection_model);
    let rec_path = config.model_path(&config.recognition_model);
    let dict_path = config.model_path(&config.dictionary);

    let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
        .det_model_path(&det_path)
        .rec_model_path(&rec_path)
        .dictionary_path(&dict_path)
        .build()
        .map_err(|e| OcrError::EngineInit(format!("pure-onnx-ocr: {}", e)))?;

    info!("Loaded pure-onnx-ocr engine from {}", config.model_dir.display());
    Ok(engine)
}

/// Recognize an image, returning its text lines in reading order.
fn extract_text(
    engine: &pure_onnx_ocr::engine::OcrEngine,
    image: &DynamicImage,
    keep_unknown: bool,
) -> Result<String, OcrError> {
    let start = Instant::now();
    let (width, height) = image.dimensions();

    debug!("Recognizing image: {}x{}", width, height);

    let results = engine
        .run_from_image(image)
        .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?;

    let lines: Vec<TextLine> = results
        .iter()
        .map(|r| {
            let (left, top) = top_left(&r.bounding_box);
            let text = if keep_unknown {
                r.text.clone()
            } else {
                r.text.replace("[UNK]", " ")
            };
            TextLine { text, left, top }
        })
        .collect();
    let count = lines.len();
    let text = reading_order(lines);

    info!(
        "OCR complete: {} lines in {}ms",
        count,
        start.elapsed().as_millis()
    );

    Ok(text)
}

/// Rows of ~20px, then left to right.
fn reading_order(mut lines: Vec<TextLine>) -> String {
    lines.sort_by(|a, b| {
        let row_a = (a.top / 20.0) as i32;
        let row_b = (b.top / 20.0) as i32;
        if row_a != row_b {
            row_a.cmp(&row_b)
        } else {
            a.left.partial_cmp(&b.left).unwrap_or(std::cmp::Ordering::Equal)
        }
    });

    lines
        .iter()
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Starts a [`PureOcrEngine`] when the models are present.
pub struct LocalEngineFactory {
    config: OcrConfig,
}

impl LocalEngineFactory {
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl EngineFactory for LocalEngineFactory {
    async fn init(&self) -> Result<Arc<dyn Recognizer>, OcrError> {
        if !self.config.models_present() {
            return Err(OcrError::EngineInit(format!(
                "OCR models not found in {}",
                self.config.model_dir.display()
            )));
        }

        let engine = PureOcrEngine::start(self.config.clone()).await?;
        Ok(Arc::new(engine))
    }
}

/// Smallest x and y of the polygon's exterior.
fn top_left(polygon: &pure_onnx_ocr::Polygon<f64>) -> (f32, f32) {
    polygon
        .exterior()
        .coords()
        .fold((f32::INFINITY, f32::INFINITY), |(x, y), coord| {
            (x.min(coord.x as f32), y.min(coord.y as f32))
        })
}
