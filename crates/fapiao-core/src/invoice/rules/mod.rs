//! Rule-based field extraction for Chinese VAT invoices.

pub mod amounts;
pub mod dates;
pub mod patterns;

pub use amounts::{format_amount, normalize_amount, parse_amount};
pub use dates::{format_date, normalize_date, parse_invoice_date};
pub use patterns::*;

use regex::Regex;

use crate::models::record::InvoiceField;

/// Part of the text a rule is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The whole recognized text.
    Document,
    /// The buyer (购买方) block.
    Buyer,
    /// The seller (销售方) block.
    Seller,
}

/// A labelled pattern with exactly one capture group for one field.
pub struct FieldRule {
    pub field: InvoiceField,
    pub pattern: &'static Regex,
    pub scope: Scope,
}

impl FieldRule {
    /// Apply the rule, returning the first match.
    pub fn apply(&self, text: &str) -> Option<ExtractionMatch<String>> {
        let caps = self.pattern.captures(text)?;
        let value = caps.get(1)?;
        let full_match = caps.get(0)?;

        Some(
            ExtractionMatch::new(value.as_str().trim().to_string(), full_match.as_str())
                .with_position(full_match.start(), full_match.end()),
        )
    }
}

/// Extraction context.
#[derive(Debug, Clone)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Position in source text.
    pub position: Option<(usize, usize)>,
    /// Source text that was matched.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, source: impl Into<String>) -> Self {
        Self {
            value,
            position: None,
            source: source.into(),
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }
}

/// Ordered text rules. For each field the first matching rule wins.
pub fn text_rules() -> Vec<FieldRule> {
    vec![
        FieldRule { field: InvoiceField::InvoiceCode, pattern: &INVOICE_CODE, scope: Scope::Document },
        FieldRule { field: InvoiceField::InvoiceNumber, pattern: &INVOICE_NUMBER, scope: Scope::Document },
        FieldRule { field: InvoiceField::InvoiceDate, pattern: &ISSUE_DATE, scope: Scope::Document },
        FieldRule { field: InvoiceField::InvoiceDate, pattern: &LABELED_DATE, scope: Scope::Document },
        FieldRule { field: InvoiceField::Amount, pattern: &AMOUNT, scope: Scope::Document },
        FieldRule { field: InvoiceField::TaxAmount, pattern: &TAX_AMOUNT, scope: Scope::Document },
        FieldRule { field: InvoiceField::TotalAmount, pattern: &TOTAL_AMOUNT, scope: Scope::Document },
        FieldRule { field: InvoiceField::TotalAmount, pattern: &TOTAL_AMOUNT_LOWERCASE, scope: Scope::Document },
        FieldRule { field: InvoiceField::BuyerName, pattern: &PARTY_NAME, scope: Scope::Buyer },
        FieldRule { field: InvoiceField::BuyerTaxId, pattern: &PARTY_TAX_ID, scope: Scope::Buyer },
        FieldRule { field: InvoiceField::SellerName, pattern: &PARTY_NAME, scope: Scope::Seller },
        FieldRule { field: InvoiceField::SellerTaxId, pattern: &PARTY_TAX_ID, scope: Scope::Seller },
    ]
}
