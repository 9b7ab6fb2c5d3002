//! Page events and page lifetime.

use tokio::sync::{mpsc, watch};

use crate::ocr::ImageSource;

/// An element added to the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedElement {
    /// Tag name, e.g. `IMG`.
    pub tag: String,
    /// Source identity (URL, path, ...).
    pub key: String,
    /// Loaded image bytes, if any.
    pub bytes: Option<Vec<u8>>,
}

impl AddedElement {
    pub fn image(key: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            tag: "IMG".to_string(),
            key: key.into(),
            bytes: Some(bytes),
        }
    }

    /// The element as an image source, if it is an image with content.
    pub fn as_image(&self) -> Option<ImageSource> {
        if !self.tag.eq_ignore_ascii_case("img") {
            return None;
        }
        self.bytes
            .as_ref()
            .map(|bytes| ImageSource::new(self.key.clone(), bytes.clone()))
    }
}

/// A batch of elements added to the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageEvent {
    pub added: Vec<AddedElement>,
}

impl PageEvent {
    pub fn new(added: Vec<AddedElement>) -> Self {
        Self { added }
    }

    /// Images carried by the event, in order. Other elements are skipped.
    pub fn images(&self) -> impl Iterator<Item = ImageSource> + '_ {
        self.added.iter().filter_map(AddedElement::as_image)
    }
}

/// Bounded queue of page events.
pub fn page_events(capacity: usize) -> (mpsc::Sender<PageEvent>, mpsc::Receiver<PageEvent>) {
    mpsc::channel(capacity.max(1))
}

/// Ends a [`PageLifetime`].
#[derive(Debug)]
pub struct PageHandle {
    tx: watch::Sender<bool>,
}

impl PageHandle {
    pub fn end(&self) {
        self.tx.send_replace(true);
    }
}

/// Cancellation scope tied to the page. Dropping the [`PageHandle`] also
/// ends it.
#[derive(Debug, Clone)]
pub struct PageLifetime {
    rx: watch::Receiver<bool>,
}

impl PageLifetime {
    pub fn new() -> (PageHandle, PageLifetime) {
        let (tx, rx) = watch::channel(false);
        (PageHandle { tx }, PageLifetime { rx })
    }

    pub fn is_ended(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolves once the page is gone.
    pub async fn ended(&self) {
        let mut rx = self.rx.clone();
        // Err means the handle was dropped.
        let _ = rx.wait_for(|ended| *ended).await;
    }
}
