//! Validation and formatting of extracted records.

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::FormatError;
use crate::models::record::{InvoiceField, InvoiceRecord};

use super::rules::{normalize_amount, normalize_date};

/// Result of normalizing a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizationResult {
    /// Formatted record. Fields listed in `errors` are removed from it.
    pub record: InvoiceRecord,
    /// Fields that could not be formatted.
    pub errors: Vec<FormatError>,
    /// Non-fatal issues (unparseable dates, missing required fields).
    pub warnings: Vec<String>,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

impl NormalizationResult {
    /// Whether the given field failed formatting.
    pub fn has_error(&self, field: InvoiceField) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

/// Validates and formats invoice records.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer;

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// True iff every required field is present.
    pub fn validate(&self, record: &InvoiceRecord) -> bool {
        InvoiceField::REQUIRED
            .iter()
            .all(|field| record.get(*field).is_some_and(|v| !v.trim().is_empty()))
    }

    /// Format amounts and the invoice date.
    ///
    /// An unparseable amount is reported as a [`FormatError`] for that field
    /// only and removed from the record; the other fields are still
    /// formatted. An unparseable date is kept unchanged with a warning.
    pub fn format(&self, record: &InvoiceRecord) -> NormalizationResult {
        // std::time::Instant panics on wasm32.
        let start = Utc::now();
        let mut result = NormalizationResult::default();

        for (field, value) in record.iter() {
            if field.is_amount() {
                match normalize_amount(value) {
                    Some(formatted) => result.record.set(field, formatted),
                    None => {
                        warn!("Cannot format {} value {:?}", field, value);
                        result.errors.push(FormatError {
                            field,
                            value: value.to_string(),
                        });
                    }
                }
            } else if field.is_date() {
                match normalize_date(value) {
                    Some(formatted) => result.record.set(field, formatted),
                    None => {
                        warn!("Unrecognized {} value {:?}, keeping it as-is", field, value);
                        result
                            .warnings
                            .push(format!("unrecognized date {:?} left unchanged", value));
                        result.record.set(field, value.trim());
                    }
                }
            } else {
                result.record.set(field, value.trim());
            }
        }

        result.processing_time_ms = (Utc::now() - start).num_milliseconds().max(0) as u64;
        result
    }

    /// Format the record and flag missing required fields.
    pub fn normalize(&self, record: &InvoiceRecord) -> NormalizationResult {
        let mut result = self.format(record);

        if !self.validate(&result.record) {
            let missing: Vec<&str> = result
                .record
                .missing_required()
                .iter()
                .map(|f| f.as_str())
                .collect();
            warn!("Record is incomplete, missing: {}", missing.join(", "));
            result
                .warnings
                .push(format!("missing required fields: {}", missing.join(", ")));
        }

        debug!(
            "Normalized {} fields ({} errors) in {}ms",
            result.record.len(),
            result.errors.len(),
            result.processing_time_ms
        );

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn complete_record() -> InvoiceRecord {
        InvoiceRecord::new()
            .with(InvoiceField::InvoiceCode, "044031900111")
            .with(InvoiceField::InvoiceNumber, "12345678")
            .with(InvoiceField::InvoiceDate, "2024年1月5日")
            .with(InvoiceField::Amount, "100.5")
    }

    #[test]
    fn test_validate_complete_record() {
        assert!(Normalizer::new().validate(&complete_record()));
    }

    #[test]
    fn test_validate_without_amount() {
        let record = InvoiceRecord::new()
            .with(InvoiceField::InvoiceCode, "A")
            .with(InvoiceField::InvoiceNumber, "B")
            .with(InvoiceField::InvoiceDate, "2024-01-01");

        assert!(!Normalizer::new().validate(&record));
    }

    #[test]
    fn test_format_amounts_and_date() {
        let record = complete_record()
            .with(InvoiceField::TaxAmount, "13")
            .with(InvoiceField::TotalAmount, "¥1,113.456")
            .with(InvoiceField::SellerName, "  广州某某贸易有限公司 ");

        let result = Normalizer::new().format(&record);

        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
        assert_eq!(result.record.get(InvoiceField::Amount), Some("100.50"));
        assert_eq!(result.record.get(InvoiceField::TaxAmount), Some("13.00"));
        assert_eq!(result.record.get(InvoiceField::TotalAmount), Some("1113.46"));
        assert_eq!(result.record.get(InvoiceField::InvoiceDate), Some("2024-01-05"));
        assert_eq!(result.record.get(InvoiceField::SellerName), Some("广州某某贸易有限公司"));
    }

    #[test]
    fn test_bad_amount_is_local_to_field() {
        let record = complete_record()
            .with(InvoiceField::Amount, "abc")
            .with(InvoiceField::TaxAmount, "6.5");

        let result = Normalizer::new().normalize(&record);

        assert_eq!(
            result.errors,
            vec![FormatError {
                field: InvoiceField::Amount,
                value: "abc".to_string(),
            }]
        );
        assert!(result.has_error(InvoiceField::Amount));
        assert!(!result.record.contains(InvoiceField::Amount));
        assert_eq!(result.record.get(InvoiceField::TaxAmount), Some("6.50"));
        assert_eq!(result.record.get(InvoiceField::InvoiceDate), Some("2024-01-05"));
        assert_eq!(result.record.get(InvoiceField::InvoiceCode), Some("044031900111"));
    }

    #[test]
    fn test_nan_is_a_format_error() {
        let record = complete_record().with(InvoiceField::Amount, "NaN");
        let result = Normalizer::new().format(&record);

        assert!(result.has_error(InvoiceField::Amount));
        assert_eq!(result.record.get(InvoiceField::Amount), None);
    }

    #[test]
    fn test_unparseable_date_is_kept() {
        let record = complete_record().with(InvoiceField::InvoiceDate, "2024-02-30");
        let result = Normalizer::new().format(&record);

        assert!(result.errors.is_empty());
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.record.get(InvoiceField::InvoiceDate), Some("2024-02-30"));
    }

    #[test]
    fn test_normalize_warns_on_missing_required() {
        let record = InvoiceRecord::new().with(InvoiceField::InvoiceCode, "A");
        let result = Normalizer::new().normalize(&record);

        assert_eq!(
            result.warnings,
            vec!["missing required fields: invoiceNumber, invoiceDate, amount".to_string()]
        );
    }
}
