//! Browser DOM as a form target resolver.

use std::time::Duration;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    Document, Element, Event, EventInit, HtmlElement, HtmlInputElement, HtmlTextAreaElement,
    ScrollBehavior, ScrollIntoViewOptions, ScrollLogicalPosition,
};

use fapiao_core::form::{FormEvent, FormTarget, Selector, TargetResolver, ValueKind};

/// CSS class added to a filled element while it is highlighted.
pub const HIGHLIGHT_CLASS: &str = "field-highlight";

/// Looks up inputs in a document.
pub struct DomForm {
    document: Document,
}

impl DomForm {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    /// The document of the current window.
    pub fn from_window() -> Option<Self> {
        web_sys::window()?.document().map(Self::new)
    }

    fn select(&self, selector: &str) -> Option<Element> {
        self.document.query_selector(selector).ok().flatten()
    }
}

impl TargetResolver for DomForm {
    type Target = DomTarget;

    fn query(&self, selector: Selector<'_>) -> Option<DomTarget> {
        let element = match selector {
            Selector::Name(name) => self.select(&format!("[name=\"{}\"]", css_string(name))),
            Selector::Id(id) => self.document.get_element_by_id(id),
            Selector::DataField(field) => {
                self.select(&format!("[data-field=\"{}\"]", css_string(field)))
            }
        }?;
        DomTarget::new(element)
    }
}

/// An `<input>` or `<textarea>` element.
pub enum DomTarget {
    Input(HtmlInputElement),
    TextArea(HtmlTextAreaElement),
}

impl DomTarget {
    /// Wrap an element; other element kinds cannot hold a value.
    pub fn new(element: Element) -> Option<Self> {
        match element.dyn_into::<HtmlInputElement>() {
            Ok(input) => Some(DomTarget::Input(input)),
            Err(element) => element
                .dyn_into::<HtmlTextAreaElement>()
                .ok()
                .map(DomTarget::TextArea),
        }
    }

    fn element(&self) -> &HtmlElement {
        match self {
            DomTarget::Input(input) => input,
            DomTarget::TextArea(area) => area,
        }
    }
}

impl FormTarget for DomTarget {
    fn value_kind(&self) -> ValueKind {
        match self {
            DomTarget::Input(input) => ValueKind::from_input_type(&input.type_()),
            DomTarget::TextArea(_) => ValueKind::Text,
        }
    }

    fn value(&self) -> String {
        match self {
            DomTarget::Input(input) => input.value(),
            DomTarget::TextArea(area) => area.value(),
        }
    }

    fn set_value(&self, value: &str) {
        match self {
            DomTarget::Input(input) => input.set_value(value),
            DomTarget::TextArea(area) => area.set_value(value),
        }
    }

    fn dispatch(&self, event: FormEvent) {
        let init = EventInit::new();
        init.set_bubbles(true);
        if let Ok(event) = Event::new_with_event_init_dict(event.as_str(), &init) {
            let _ = self.element().dispatch_event(&event);
        }
    }

    fn highlight(&self, duration: Duration) {
        let element = self.element().clone();
        if element.class_list().add_1(HIGHLIGHT_CLASS).is_err() {
            return;
        }

        let revert = Closure::once_into_js(move || {
            let _ = element.class_list().remove_1(HIGHLIGHT_CLASS);
        });
        let timeout = duration.as_millis().min(i32::MAX as u128) as i32;
        if let Some(window) = web_sys::window() {
            let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(
                revert.unchecked_ref::<js_sys::Function>(),
                timeout,
            );
        }
    }

    fn is_in_viewport(&self) -> bool {
        let Some(window) = web_sys::window() else {
            return true;
        };
        let dimension = |value: Result<JsValue, JsValue>| {
            value.ok().and_then(|v| v.as_f64()).unwrap_or(0.0)
        };
        let height = dimension(window.inner_height());
        let width = dimension(window.inner_width());

        let rect = self.element().get_bounding_client_rect();
        rect.top() >= 0.0 && rect.left() >= 0.0 && rect.bottom() <= height && rect.right() <= width
    }

    fn scroll_into_view(&self) {
        let options = ScrollIntoViewOptions::new();
        options.set_behavior(ScrollBehavior::Smooth);
        options.set_block(ScrollLogicalPosition::Center);
        self.element().scroll_into_view_with_scroll_into_view_options(&options);
    }
}

/// Quote-safe contents of a CSS string literal.
fn css_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
