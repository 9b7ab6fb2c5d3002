//! Form synchronization: writing invoice records into form-like targets.
//!
//! The page is reached only through [`TargetResolver`] and [`FormTarget`], so
//! the same [`FormSync`] drives a browser DOM, the in-memory
//! [`MemoryForm`] or anything else that can look up and update inputs.

mod memory;
mod report;
mod sync;

pub use memory::{InputSpec, MemoryForm, MemoryTarget};
pub use report::{FillFailure, FillFailureReason, FillReport};
pub use sync::FormSync;

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How a target is looked up. [`FormSync`] tries them in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector<'a> {
    /// Element whose `name` attribute equals the value.
    Name(&'a str),
    /// Element whose identifier equals the value.
    Id(&'a str),
    /// Element carrying `data-field` equal to the value.
    DataField(&'a str),
}

/// Kind of value a target accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Date,
    Number,
    #[default]
    Text,
}

impl ValueKind {
    /// Classify an HTML input `type` attribute.
    pub fn from_input_type(input_type: &str) -> Self {
        match input_type.trim().to_ascii_lowercase().as_str() {
            "date" => ValueKind::Date,
            "number" => ValueKind::Number,
            _ => ValueKind::Text,
        }
    }
}

/// Change notifications raised after every write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormEvent {
    Input,
    Change,
    Blur,
}

impl FormEvent {
    /// Order in which the notifications are raised. Some frameworks listen
    /// to only one of them.
    pub const SEQUENCE: [FormEvent; 3] = [FormEvent::Input, FormEvent::Change, FormEvent::Blur];

    /// DOM event type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            FormEvent::Input => "input",
            FormEvent::Change => "change",
            FormEvent::Blur => "blur",
        }
    }
}

/// An addressable input-like element.
///
/// Methods take `&self`: targets are handles onto page state, like DOM
/// element references.
pub trait FormTarget {
    /// Value kind derived from the element type.
    fn value_kind(&self) -> ValueKind;

    /// Current value.
    fn value(&self) -> String;

    /// Replace the value without raising notifications.
    fn set_value(&self, value: &str);

    /// Raise a change notification on the element.
    fn dispatch(&self, event: FormEvent);

    /// Highlight the element; the highlight reverts by itself after `duration`.
    fn highlight(&self, duration: Duration);

    /// Whether the element is fully inside the visible viewport.
    fn is_in_viewport(&self) -> bool;

    /// Smooth-scroll the element to the centre of the viewport.
    fn scroll_into_view(&self);
}

/// Looks up targets in a page.
pub trait TargetResolver {
    type Target: FormTarget;

    /// First element matching the selector, in document order.
    fn query(&self, selector: Selector<'_>) -> Option<Self::Target>;
}
