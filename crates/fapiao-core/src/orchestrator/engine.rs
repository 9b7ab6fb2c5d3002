//! Lazily initialized OCR engine slot.

use std::fmt;
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::error::OcrError;
use crate::invoice::RawOcrOutput;
use crate::ocr::{EngineFactory, ImageSource, Recognizer};

/// Lifecycle of the engine held by an [`EngineSlot`].
pub enum EngineState {
    Uninitialized,
    Initializing,
    Ready(Arc<dyn Recognizer>),
    /// Last initialization failed; the next request retries.
    Failed(OcrError),
}

impl EngineState {
    pub fn status(&self) -> EngineStatus {
        match self {
            EngineState::Uninitialized => EngineStatus::Uninitialized,
            EngineState::Initializing => EngineStatus::Initializing,
            EngineState::Ready(_) => EngineStatus::Ready,
            EngineState::Failed(_) => EngineStatus::Failed,
        }
    }
}

impl fmt::Debug for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineState::Ready(engine) => write!(f, "Ready({})", engine.name()),
            EngineState::Failed(err) => write!(f, "Failed({})", err),
            other => write!(f, "{:?}", other.status()),
        }
    }
}

/// Observable summary of [`EngineState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

/// Owns the engine and serializes access to it.
///
/// The lock is held across initialization and recognition, so at most one
/// recognition runs at a time and concurrent first requests trigger a single
/// initialization.
pub struct EngineSlot {
    factory: Arc<dyn EngineFactory>,
    state: Mutex<EngineState>,
    status: watch::Sender<EngineStatus>,
}

impl EngineSlot {
    pub fn new(factory: Arc<dyn EngineFactory>) -> Self {
        let (status, _) = watch::channel(EngineStatus::Uninitialized);
        Self {
            factory,
            state: Mutex::new(EngineState::Uninitialized),
            status,
        }
    }

    /// Current status.
    pub fn status(&self) -> EngineStatus {
        *self.status.borrow()
    }

    /// Receiver notified on every status change.
    pub fn subscribe(&self) -> watch::Receiver<EngineStatus> {
        self.status.subscribe()
    }

    /// Recognize `image`, initializing the engine first if needed.
    pub async fn recognize(&self, image: &ImageSource) -> Result<RawOcrOutput, OcrError> {
        let mut state = self.state.lock().await;

        let engine = match &*state {
            EngineState::Ready(engine) => Arc::clone(engine),
            _ => {
                self.transition(&mut state, EngineState::Initializing);
                match self.factory.init().await {
                    Ok(engine) => {
                        info!("OCR engine ready: {}", engine.name());
                        self.transition(&mut state, EngineState::Ready(Arc::clone(&engine)));
                        engine
                    }
                    Err(err) => {
                        warn!("OCR engine initialization failed: {}", err);
                        self.transition(&mut state, EngineState::Failed(err.clone()));
                        return Err(err);
                    }
                }
            }
        };

        debug!("Recognizing {} with {}", image.key, engine.name());
        engine.recognize(image).await
    }

    fn transition(&self, state: &mut EngineState, next: EngineState) {
        let status = next.status();
        *state = next;
        self.status.send_replace(status);
    }
}
