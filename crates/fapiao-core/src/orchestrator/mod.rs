//! Recognition orchestrator.
//!
//! Wires page events to the pipeline: OCR engine → [`FieldExtractor`] →
//! [`Normalizer`] → optional form fill → user notification.

mod engine;
mod events;
mod notify;

pub use engine::{EngineSlot, EngineState, EngineStatus};
pub use events::{page_events, AddedElement, PageEvent, PageHandle, PageLifetime};
pub use notify::{MemoryNotifier, Notification, Notifier};

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{ExtractionError, OcrError};
use crate::form::{FillReport, FormSync, TargetResolver};
use crate::invoice::{FieldExtractor, Normalizer, RawOcrOutput};
use crate::models::config::FapiaoConfig;
use crate::models::{FieldMapping, InvoiceRecord};
use crate::ocr::{EngineFactory, ImageSource};

/// Receives recognized records.
pub trait FormSink: Send + Sync {
    fn fill(&self, record: &InvoiceRecord) -> FillReport;
}

/// A [`FormSync`] paired with the mapping it fills.
pub struct BoundForm<R: TargetResolver> {
    sync: FormSync<R>,
    mapping: FieldMapping,
}

impl<R: TargetResolver> BoundForm<R> {
    pub fn new(sync: FormSync<R>, mapping: FieldMapping) -> Self {
        Self { sync, mapping }
    }
}

impl<R> FormSink for BoundForm<R>
where
    R: TargetResolver + Send + Sync,
{
    fn fill(&self, record: &InvoiceRecord) -> FillReport {
        self.sync.fill(record, &self.mapping)
    }
}

/// What happened to one image.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Seen within the debounce window.
    Debounced,
    /// The engine could not be initialized.
    EngineUnavailable,
    /// Recognition error, empty text or malformed payload.
    Abandoned,
    /// The OCR service reported a failure.
    RecognitionFailed,
    /// No usable field was extracted.
    NoMatch,
    /// A notification was emitted.
    Notified {
        record: InvoiceRecord,
        report: Option<FillReport>,
    },
}

/// Drives recognition for images appearing on a page.
pub struct Orchestrator {
    engine: EngineSlot,
    extractor: FieldExtractor,
    normalizer: Normalizer,
    notifier: Arc<dyn Notifier>,
    form: Option<Box<dyn FormSink>>,
    title: String,
    timeout_ms: u64,
    debounce: Duration,
    seen: Mutex<HashMap<String, Instant>>,
}

impl Orchestrator {
    pub fn new(factory: Arc<dyn EngineFactory>, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_config(factory, notifier, &FapiaoConfig::default())
    }

    pub fn with_config(
        factory: Arc<dyn EngineFactory>,
        notifier: Arc<dyn Notifier>,
        config: &FapiaoConfig,
    ) -> Self {
        Self {
            engine: EngineSlot::new(factory),
            extractor: FieldExtractor::new(),
            normalizer: Normalizer::new(),
            notifier,
            form: None,
            title: config.notification.title.clone(),
            timeout_ms: config.notification.timeout_ms,
            debounce: Duration::from_millis(config.orchestrator.debounce_ms),
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Fill recognized records into `sink`.
    pub fn with_form(mut self, sink: impl FormSink + 'static) -> Self {
        self.form = Some(Box::new(sink));
        self
    }

    /// Ignore an image seen again within `window` (zero disables).
    pub fn with_debounce(mut self, window: Duration) -> Self {
        self.debounce = window;
        self
    }

    pub fn engine_status(&self) -> EngineStatus {
        self.engine.status()
    }

    pub fn subscribe_engine(&self) -> watch::Receiver<EngineStatus> {
        self.engine.subscribe()
    }

    /// Run the whole pipeline for one image.
    pub async fn handle_image(&self, image: ImageSource) -> Outcome {
        if self.is_debounced(&image.key) {
            debug!("Ignoring {}: seen within {:?}", image.key, self.debounce);
            return Outcome::Debounced;
        }

        let raw = match self.engine.recognize(&image).await {
            Ok(raw) => raw,
            Err(OcrError::EngineInit(message)) => {
                self.send(format!("OCR engine failed to initialize: {}", message));
                return Outcome::EngineUnavailable;
            }
            Err(err) => {
                warn!("Recognition of {} failed: {}", image.key, err);
                return Outcome::Abandoned;
            }
        };

        if let RawOcrOutput::Text(text) = &raw {
            if text.trim().is_empty() {
                debug!("No text recognized in {}", image.key);
                return Outcome::Abandoned;
            }
        }

        let record = match self.extractor.extract(&raw) {
            Ok(record) => record,
            Err(ExtractionError::RecognitionFailed { message }) => {
                self.send(message);
                return Outcome::RecognitionFailed;
            }
            Err(err) => {
                warn!("Cannot extract fields from {}: {}", image.key, err);
                return Outcome::Abandoned;
            }
        };

        if record.is_empty() {
            debug!("No invoice fields found in {}", image.key);
            return Outcome::NoMatch;
        }

        let result = self.normalizer.normalize(&record);
        if result.record.is_empty() {
            debug!(
                "No usable invoice fields in {}: {:?}",
                image.key, result.errors
            );
            return Outcome::NoMatch;
        }
        if !self.normalizer.validate(&result.record) {
            warn!(
                "{}: incomplete invoice, missing {:?}",
                image.key,
                result.record.missing_required()
            );
        }

        let mut text = result.record.summary();
        let report = self.form.as_ref().map(|form| {
            let report = form.fill(&result.record);
            text.push_str("\n\n");
            text.push_str(&report.summary());
            report
        });

        info!("{}: recognized {} fields", image.key, result.record.len());
        self.send(text);

        Outcome::Notified {
            record: result.record,
            report,
        }
    }

    /// Process page events one at a time until the queue closes or the page
    /// lifetime ends. An in-flight recognition is dropped when the page ends.
    pub async fn run(&self, mut events: mpsc::Receiver<PageEvent>, lifetime: PageLifetime) {
        loop {
            let event = tokio::select! {
                biased;
                _ = lifetime.ended() => break,
                event = events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            for image in event.images() {
                tokio::select! {
                    biased;
                    _ = lifetime.ended() => {
                        debug!("Page ended, dropping {}", image.key);
                        return;
                    }
                    outcome = self.handle_image(image.clone()) => {
                        debug!("{}: {:?}", image.key, outcome);
                    }
                }
            }
        }

        debug!("Orchestrator stopped");
    }

    fn is_debounced(&self, key: &str) -> bool {
        if self.debounce.is_zero() {
            return false;
        }

        let now = Instant::now();
        let Ok(mut seen) = self.seen.lock() else {
            return false;
        };

        // Only keys inside the window are kept.
        seen.retain(|_, last| now.duration_since(*last) < self.debounce);
        if seen.contains_key(key) {
            return true;
        }

        seen.insert(key.to_string(), now);
        false
    }

    fn send(&self, text: String) {
        self.notifier.notify(&Notification {
            title: self.title.clone(),
            text,
            timeout_ms: self.timeout_ms,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{InputSpec, MemoryForm};
    use crate::models::InvoiceField;
    use crate::ocr::{Preloaded, Recognizer};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const INVOICE_TEXT: &str = "发票代码：044031900111\n发票号码：12345678\n开票日期：2024年3月5日\n金额：¥1,234.5";

    /// Returns a fixed output and tracks how many calls overlap.
    struct Scripted {
        output: RawOcrOutput,
        delay: Duration,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(output: RawOcrOutput) -> Self {
            Self {
                output,
                delay: Duration::ZERO,
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
            }
        }

        fn text(text: &str) -> Self {
            Self::new(RawOcrOutput::Text(text.to_string()))
        }

        fn delayed(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl Recognizer for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn recognize(&self, _image: &ImageSource) -> Result<RawOcrOutput, OcrError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(self.output.clone())
        }
    }

    struct FailingFactory {
        attempts: AtomicUsize,
        engine: Arc<Scripted>,
    }

    #[async_trait]
    impl EngineFactory for FailingFactory {
        async fn init(&self) -> Result<Arc<dyn Recognizer>, OcrError> {
            if self.attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(OcrError::EngineInit("model download failed".to_string()))
            } else {
                Ok(self.engine.clone())
            }
        }
    }

    fn orchestrator(engine: Arc<Scripted>, notifier: &MemoryNotifier) -> Orchestrator {
        Orchestrator::new(Arc::new(Preloaded(engine)), Arc::new(notifier.clone()))
            .with_debounce(Duration::ZERO)
    }

    fn image(key: &str) -> ImageSource {
        ImageSource::new(key, vec![0x89, b'P', b'N', b'G'])
    }

    #[tokio::test]
    async fn test_recognized_invoice_is_notified() {
        let notifier = MemoryNotifier::new();
        let orchestrator = orchestrator(Arc::new(Scripted::text(INVOICE_TEXT)), &notifier);

        let outcome = orchestrator.handle_image(image("a.png")).await;

        let Outcome::Notified { record, report } = outcome else {
            panic!("expected a notification, got {:?}", outcome);
        };
        assert_eq!(record.get(InvoiceField::Amount), Some("1234.50"));
        assert_eq!(record.get(InvoiceField::InvoiceDate), Some("2024-03-05"));
        assert!(report.is_none());

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].title, "Invoice recognition");
        assert_eq!(sent[0].timeout_ms, 5000);
        assert!(sent[0].text.contains("发票代码: 044031900111"));
        assert!(sent[0].text.contains("金额: 1234.50"));
    }

    #[tokio::test]
    async fn test_no_match_sends_no_notification() {
        let notifier = MemoryNotifier::new();
        let orchestrator =
            orchestrator(Arc::new(Scripted::text("Lorem ipsum dolor sit amet")), &notifier);

        assert_eq!(orchestrator.handle_image(image("a.png")).await, Outcome::NoMatch);
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_empty_text_is_abandoned_silently() {
        let notifier = MemoryNotifier::new();
        let orchestrator = orchestrator(Arc::new(Scripted::text("  \n ")), &notifier);

        assert_eq!(orchestrator.handle_image(image("a.png")).await, Outcome::Abandoned);
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_service_failure_is_notified() {
        let notifier = MemoryNotifier::new();
        let engine = Scripted::new(RawOcrOutput::Structured(json!({
            "code": 1001,
            "message": "image too blurry"
        })));
        let orchestrator = orchestrator(Arc::new(engine), &notifier);

        assert_eq!(
            orchestrator.handle_image(image("a.png")).await,
            Outcome::RecognitionFailed
        );
        assert_eq!(notifier.sent()[0].text, "image too blurry");
    }

    #[tokio::test]
    async fn test_init_failure_notifies_and_retries() {
        let notifier = MemoryNotifier::new();
        let factory = Arc::new(FailingFactory {
            attempts: AtomicUsize::new(0),
            engine: Arc::new(Scripted::text(INVOICE_TEXT)),
        });
        let orchestrator = Orchestrator::new(factory.clone(), Arc::new(notifier.clone()))
            .with_debounce(Duration::ZERO);

        assert_eq!(
            orchestrator.handle_image(image("a.png")).await,
            Outcome::EngineUnavailable
        );
        assert_eq!(orchestrator.engine_status(), EngineStatus::Failed);
        assert!(notifier.sent()[0].text.contains("model download failed"));

        let outcome = orchestrator.handle_image(image("a.png")).await;
        assert!(matches!(outcome, Outcome::Notified { .. }));
        assert_eq!(orchestrator.engine_status(), EngineStatus::Ready);
        assert_eq!(factory.attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_requests_do_not_overlap() {
        let notifier = MemoryNotifier::new();
        let engine =
            Arc::new(Scripted::text(INVOICE_TEXT).delayed(Duration::from_millis(20)));
        let orchestrator = Arc::new(orchestrator(engine.clone(), &notifier));

        let tasks: Vec<_> = (0..4)
            .map(|i| {
                let orchestrator = Arc::clone(&orchestrator);
                tokio::spawn(async move {
                    orchestrator.handle_image(image(&format!("{}.png", i))).await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(engine.calls.load(Ordering::SeqCst), 4);
        assert_eq!(engine.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.sent().len(), 4);
    }

    #[tokio::test]
    async fn test_repeated_image_is_debounced() {
        let notifier = MemoryNotifier::new();
        let engine = Arc::new(Scripted::text(INVOICE_TEXT));
        let orchestrator = orchestrator(engine.clone(), &notifier)
            .with_debounce(Duration::from_secs(60));

        orchestrator.handle_image(image("a.png")).await;
        assert_eq!(orchestrator.handle_image(image("a.png")).await, Outcome::Debounced);
        orchestrator.handle_image(image("b.png")).await;

        assert_eq!(engine.calls.load(Ordering::SeqCst), 2);
        assert_eq!(notifier.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_debounce_forgets_images_after_window() {
        let notifier = MemoryNotifier::new();
        let engine = Arc::new(Scripted::text(INVOICE_TEXT));
        let orchestrator = orchestrator(engine.clone(), &notifier)
            .with_debounce(Duration::from_millis(20));

        for key in ["a.png", "b.png", "c.png"] {
            orchestrator.handle_image(image(key)).await;
        }
        assert_eq!(orchestrator.seen.lock().unwrap().len(), 3);

        tokio::time::sleep(Duration::from_millis(40)).await;
        orchestrator.handle_image(image("d.png")).await;
        assert_eq!(orchestrator.seen.lock().unwrap().len(), 1);

        assert!(matches!(
            orchestrator.handle_image(image("a.png")).await,
            Outcome::Notified { .. }
        ));
        assert_eq!(engine.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_zero_debounce_tracks_nothing() {
        let notifier = MemoryNotifier::new();
        let orchestrator = orchestrator(Arc::new(Scripted::text(INVOICE_TEXT)), &notifier);

        orchestrator.handle_image(image("a.png")).await;
        orchestrator.handle_image(image("a.png")).await;

        assert!(orchestrator.seen.lock().unwrap().is_empty());
        assert_eq!(notifier.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_record_emptied_by_normalization_is_not_notified() {
        let notifier = MemoryNotifier::new();
        let engine = Scripted::new(RawOcrOutput::Structured(json!({
            "code": 0,
            "data": {"amount": "abc"}
        })));
        let orchestrator = orchestrator(Arc::new(engine), &notifier);

        assert_eq!(orchestrator.handle_image(image("a.png")).await, Outcome::NoMatch);
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_record_is_filled_into_form() {
        let notifier = MemoryNotifier::new();
        let form = MemoryForm::new(vec![
            InputSpec::named("inv_code"),
            InputSpec::named("inv_amt").typed("number"),
        ]);
        let mapping = FieldMapping::new()
            .bind("inv_code", InvoiceField::InvoiceCode)
            .bind("inv_amt", InvoiceField::Amount)
            .bind("seller", InvoiceField::SellerName);
        let orchestrator = orchestrator(Arc::new(Scripted::text(INVOICE_TEXT)), &notifier)
            .with_form(BoundForm::new(FormSync::new(form.clone()), mapping));

        let outcome = orchestrator.handle_image(image("a.png")).await;

        let Outcome::Notified { report: Some(report), .. } = outcome else {
            panic!("expected a fill report, got {:?}", outcome);
        };
        assert_eq!(report.succeeded, vec!["inv_code", "inv_amt"]);
        assert_eq!(form.value_of(0).as_deref(), Some("044031900111"));
        assert_eq!(form.value_of(1).as_deref(), Some("1234.50"));
        assert!(notifier.sent()[0].text.ends_with("filled 2/3"));
    }

    #[tokio::test]
    async fn test_run_consumes_images_until_queue_closes() {
        let notifier = MemoryNotifier::new();
        let engine = Arc::new(Scripted::text(INVOICE_TEXT));
        let orchestrator = orchestrator(engine.clone(), &notifier);
        let (_handle, lifetime) = PageLifetime::new();
        let (tx, rx) = page_events(4);

        tx.send(PageEvent::new(vec![
            AddedElement::image("a.png", vec![1]),
            AddedElement {
                tag: "SPAN".to_string(),
                key: "span".to_string(),
                bytes: None,
            },
        ]))
        .await
        .unwrap();
        tx.send(PageEvent::new(vec![AddedElement::image("b.png", vec![2])]))
            .await
            .unwrap();
        drop(tx);

        orchestrator.run(rx, lifetime).await;

        assert_eq!(engine.calls.load(Ordering::SeqCst), 2);
        assert_eq!(notifier.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_page_end_drops_in_flight_recognition() {
        let notifier = MemoryNotifier::new();
        let engine =
            Arc::new(Scripted::text(INVOICE_TEXT).delayed(Duration::from_secs(30)));
        let orchestrator = orchestrator(engine.clone(), &notifier);
        let (handle, lifetime) = PageLifetime::new();
        let (tx, rx) = page_events(4);

        tx.send(PageEvent::new(vec![AddedElement::image("a.png", vec![1])]))
            .await
            .unwrap();

        let ender = async {
            while engine.calls.load(Ordering::SeqCst) == 0 {
                tokio::task::yield_now().await;
            }
            handle.end();
        };
        tokio::join!(orchestrator.run(rx, lifetime), ender);

        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
        assert!(notifier.sent().is_empty());
    }
}
