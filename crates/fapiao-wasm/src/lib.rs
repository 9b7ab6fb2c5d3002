//! WASM bindings for invoice recognition and form filling.
//!
//! OCR runs in the page (or on a service the page calls); these bindings
//! turn its output into invoice records and write them into the page's form.

mod dom;

pub use dom::{DomForm, DomTarget, HIGHLIGHT_CLASS};

use std::time::Duration;

use serde::Serialize;
use wasm_bindgen::prelude::*;

use fapiao_core::form::FormSync;
use fapiao_core::invoice::rules::{normalize_amount, normalize_date};
use fapiao_core::invoice::{FieldExtractor, Normalizer};
use fapiao_core::models::{FieldMapping, InvoiceRecord};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Version information.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Plain JS objects rather than `Map`s for record-like values.
fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

fn from_js<T: serde::de::DeserializeOwned>(value: JsValue) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Extract and normalize invoice fields from OCR text.
///
/// Returns `{ record, errors, warnings, processingTimeMs }`.
#[wasm_bindgen]
pub fn extract_invoice_from_text(text: &str) -> Result<JsValue, JsValue> {
    let record = FieldExtractor::new().extract_text(text);
    to_js(&Normalizer::new().normalize(&record))
}

/// Extract and normalize invoice fields from an OCR service response.
///
/// Throws the service message when the response reports a failure.
#[wasm_bindgen]
pub fn extract_invoice_from_response(response: JsValue) -> Result<JsValue, JsValue> {
    let payload: serde_json::Value = from_js(response)?;
    let record = FieldExtractor::new()
        .extract_structured(&payload)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    to_js(&Normalizer::new().normalize(&record))
}

/// Whether a record has every required field.
#[wasm_bindgen]
pub fn validate_record(record: JsValue) -> Result<bool, JsValue> {
    let record: InvoiceRecord = from_js(record)?;
    Ok(Normalizer::new().validate(&record))
}

/// Format an amount with two decimals (`"¥1,234.5"` → `"1234.50"`).
#[wasm_bindgen]
pub fn format_amount(value: &str) -> Option<String> {
    normalize_amount(value)
}

/// Format a date as `YYYY-MM-DD`.
#[wasm_bindgen]
pub fn format_date(value: &str) -> Option<String> {
    normalize_date(value)
}

/// Fills the current page's form with invoice records.
#[wasm_bindgen]
pub struct FormFiller {
    sync: FormSync<DomForm>,
    mapping: FieldMapping,
}

#[wasm_bindgen]
impl FormFiller {
    /// Create a filler for `mapping` (`[{ targetId, field }]`). Without a
    /// mapping, target ids equal the field names.
    #[wasm_bindgen(constructor)]
    pub fn new(mapping: JsValue) -> Result<FormFiller, JsValue> {
        let mapping = if mapping.is_undefined() || mapping.is_null() {
            FieldMapping::identity()
        } else {
            from_js(mapping)?
        };
        let form = DomForm::from_window().ok_or_else(|| JsValue::from_str("no document"))?;

        Ok(Self {
            sync: FormSync::new(form),
            mapping,
        })
    }

    /// Set how long filled inputs stay highlighted.
    #[wasm_bindgen]
    pub fn set_highlight_ms(&mut self, ms: u32) {
        self.sync.set_highlight_duration(Duration::from_millis(ms as u64));
    }

    /// Write a record into the form. Returns the fill report.
    #[wasm_bindgen]
    pub fn fill(&self, record: JsValue) -> Result<JsValue, JsValue> {
        let record: InvoiceRecord = from_js(record)?;
        to_js(&self.sync.fill(&record, &self.mapping))
    }

    /// Empty every mapped input. Returns the number cleared.
    #[wasm_bindgen]
    pub fn clear(&self) -> usize {
        self.sync.clear(&self.mapping)
    }

    /// Check that every mapped input exists and holds a value.
    #[wasm_bindgen]
    pub fn validate(&self) -> Result<JsValue, JsValue> {
        to_js(&self.sync.validate_fill(&self.mapping))
    }

    /// Current values of the mapped inputs, keyed by target id.
    #[wasm_bindgen]
    pub fn form_data(&self) -> Result<JsValue, JsValue> {
        to_js(&self.sync.form_data(&self.mapping))
    }
}
