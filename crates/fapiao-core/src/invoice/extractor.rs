//! Field extraction from raw OCR text or structured OCR service payloads.

use serde_json::Value;
use tracing::debug;

use crate::error::ExtractionError;
use crate::models::record::{InvoiceField, InvoiceRecord};

use super::rules::{text_rules, FieldRule, Scope, BUYER_SECTION, SELLER_SECTION};
use super::Result;

/// Raw output of one recognition call.
#[derive(Debug, Clone, PartialEq)]
pub enum RawOcrOutput {
    /// Unstructured text from an OCR engine.
    Text(String),
    /// Payload returned by an OCR service: `{ code, message?, data? }`.
    Structured(Value),
}

/// Provider keys of the OCR service payload and the fields they map to.
pub const SERVICE_FIELDS: [(&str, InvoiceField); 10] = [
    ("invoice_code", InvoiceField::InvoiceCode),
    ("invoice_number", InvoiceField::InvoiceNumber),
    ("invoice_date", InvoiceField::InvoiceDate),
    ("amount", InvoiceField::Amount),
    ("tax_amount", InvoiceField::TaxAmount),
    ("total_amount", InvoiceField::TotalAmount),
    ("seller_name", InvoiceField::SellerName),
    ("seller_tax_id", InvoiceField::SellerTaxId),
    ("buyer_name", InvoiceField::BuyerName),
    ("buyer_tax_id", InvoiceField::BuyerTaxId),
];

const DEFAULT_FAILURE_MESSAGE: &str = "recognition failed";

/// Converts raw OCR output into an [`InvoiceRecord`].
pub struct FieldExtractor {
    rules: Vec<FieldRule>,
}

impl FieldExtractor {
    /// Create an extractor with the built-in rules.
    pub fn new() -> Self {
        Self { rules: text_rules() }
    }

    /// Create an extractor with a custom ordered rule list.
    pub fn with_rules(rules: Vec<FieldRule>) -> Self {
        Self { rules }
    }

    /// Extract a record from either kind of raw output.
    pub fn extract(&self, input: &RawOcrOutput) -> Result<InvoiceRecord> {
        match input {
            RawOcrOutput::Text(text) => Ok(self.extract_text(text)),
            RawOcrOutput::Structured(payload) => self.extract_structured(payload),
        }
    }

    /// Apply the text rules. Never fails: unmatched fields are absent.
    pub fn extract_text(&self, text: &str) -> InvoiceRecord {
        let (buyer_text, seller_text) = split_party_sections(text);
        let mut record = InvoiceRecord::new();

        for rule in &self.rules {
            if record.contains(rule.field) {
                continue;
            }

            let scoped = match rule.scope {
                Scope::Document => text,
                Scope::Buyer => buyer_text,
                Scope::Seller => seller_text,
            };

            if let Some(found) = rule.apply(scoped) {
                debug!("{} matched {:?}", rule.field, found.source);
                record.set(rule.field, found.value);
            }
        }

        debug!("Extracted {} fields from text", record.len());
        record
    }

    /// Rename the fields of a service payload.
    pub fn extract_structured(&self, payload: &Value) -> Result<InvoiceRecord> {
        let envelope = payload
            .as_object()
            .ok_or_else(|| ExtractionError::InvalidPayload("expected a JSON object".to_string()))?;

        let code = envelope.get("code").and_then(Value::as_i64);
        let data = envelope.get("data").filter(|data| !data.is_null());

        let data = match (code, data) {
            (Some(0), Some(data)) => data,
            _ => {
                let message = envelope
                    .get("message")
                    .and_then(Value::as_str)
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or(DEFAULT_FAILURE_MESSAGE)
                    .to_string();
                return Err(ExtractionError::RecognitionFailed { message });
            }
        };

        let data = data
            .as_object()
            .ok_or_else(|| ExtractionError::InvalidPayload("`data` is not an object".to_string()))?;

        let mut record = InvoiceRecord::new();
        for (key, field) in SERVICE_FIELDS {
            match data.get(key) {
                Some(Value::String(s)) => record.set(field, s.trim()),
                Some(Value::Number(n)) => record.set(field, n.to_string()),
                Some(Value::Null) | None => {}
                Some(other) => debug!("Ignoring non-scalar {} value: {}", key, other),
            }
        }

        debug!("Extracted {} fields from service payload", record.len());
        Ok(record)
    }
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Split the text into the buyer and seller blocks.
///
/// A block runs from its header to the other block's header (or the end of
/// the text). Missing headers yield empty blocks.
fn split_party_sections(text: &str) -> (&str, &str) {
    let buyer_pos = BUYER_SECTION.find(text).map(|m| m.start());
    let seller_pos = SELLER_SECTION.find(text).map(|m| m.start());

    match (buyer_pos, seller_pos) {
        (Some(b), Some(s)) if b < s => (&text[b..s], &text[s..]),
        (Some(b), Some(s)) => (&text[b..], &text[s..b]),
        (Some(b), None) => (&text[b..], ""),
        (None, Some(s)) => ("", &text[s..]),
        (None, None) => ("", ""),
    }
}
