//! Canonical invoice record shared by the extractor, normalizer and form sync.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Semantic invoice fields.
///
/// The serialized names are the record vocabulary exchanged with callers and
/// field mappings; they must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InvoiceField {
    InvoiceCode,
    InvoiceNumber,
    InvoiceDate,
    Amount,
    TaxAmount,
    TotalAmount,
    SellerName,
    SellerTaxId,
    BuyerName,
    BuyerTaxId,
}

impl InvoiceField {
    /// All fields in canonical order.
    pub const ALL: [InvoiceField; 10] = [
        InvoiceField::InvoiceCode,
        InvoiceField::InvoiceNumber,
        InvoiceField::InvoiceDate,
        InvoiceField::Amount,
        InvoiceField::TaxAmount,
        InvoiceField::TotalAmount,
        InvoiceField::SellerName,
        InvoiceField::SellerTaxId,
        InvoiceField::BuyerName,
        InvoiceField::BuyerTaxId,
    ];

    /// Fields that must be present for a record to be considered complete.
    pub const REQUIRED: [InvoiceField; 4] = [
        InvoiceField::InvoiceCode,
        InvoiceField::InvoiceNumber,
        InvoiceField::InvoiceDate,
        InvoiceField::Amount,
    ];

    /// Record key, e.g. `invoiceCode`.
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceField::InvoiceCode => "invoiceCode",
            InvoiceField::InvoiceNumber => "invoiceNumber",
            InvoiceField::InvoiceDate => "invoiceDate",
            InvoiceField::Amount => "amount",
            InvoiceField::TaxAmount => "taxAmount",
            InvoiceField::TotalAmount => "totalAmount",
            InvoiceField::SellerName => "sellerName",
            InvoiceField::SellerTaxId => "sellerTaxId",
            InvoiceField::BuyerName => "buyerName",
            InvoiceField::BuyerTaxId => "buyerTaxId",
        }
    }

    /// Label printed on the invoice itself.
    pub fn label(&self) -> &'static str {
        match self {
            InvoiceField::InvoiceCode => "发票代码",
            InvoiceField::InvoiceNumber => "发票号码",
            InvoiceField::InvoiceDate => "开票日期",
            InvoiceField::Amount => "金额",
            InvoiceField::TaxAmount => "税额",
            InvoiceField::TotalAmount => "价税合计",
            InvoiceField::SellerName => "销售方名称",
            InvoiceField::SellerTaxId => "销售方税号",
            InvoiceField::BuyerName => "购买方名称",
            InvoiceField::BuyerTaxId => "购买方税号",
        }
    }

    /// Whether the field holds a money amount.
    pub fn is_amount(&self) -> bool {
        matches!(
            self,
            InvoiceField::Amount | InvoiceField::TaxAmount | InvoiceField::TotalAmount
        )
    }

    /// Whether the field holds a calendar date.
    pub fn is_date(&self) -> bool {
        matches!(self, InvoiceField::InvoiceDate)
    }
}

impl fmt::Display for InvoiceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InvoiceField::ALL
            .iter()
            .copied()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| format!("unknown invoice field: {}", s))
    }
}

/// Canonical invoice record.
///
/// Absent fields are simply missing from the map; an empty value is never
/// stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<InvoiceField, String>", into = "BTreeMap<InvoiceField, String>")]
pub struct InvoiceRecord {
    fields: BTreeMap<InvoiceField, String>,
}

impl InvoiceRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field. Empty or whitespace-only values remove the field instead.
    pub fn set(&mut self, field: InvoiceField, value: impl Into<String>) {
        let value = value.into();
        if value.trim().is_empty() {
            self.fields.remove(&field);
        } else {
            self.fields.insert(field, value);
        }
    }

    /// Builder-style variant of [`InvoiceRecord::set`].
    pub fn with(mut self, field: InvoiceField, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn get(&self, field: InvoiceField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    pub fn remove(&mut self, field: InvoiceField) -> Option<String> {
        self.fields.remove(&field)
    }

    pub fn contains(&self, field: InvoiceField) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Iterate over present fields in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (InvoiceField, &str)> {
        self.fields.iter().map(|(field, value)| (*field, value.as_str()))
    }

    /// Required fields that are missing.
    pub fn missing_required(&self) -> Vec<InvoiceField> {
        InvoiceField::REQUIRED
            .iter()
            .copied()
            .filter(|field| !self.contains(*field))
            .collect()
    }

    /// Human-readable summary, one labelled line per present field.
    pub fn summary(&self) -> String {
        self.iter()
            .map(|(field, value)| format!("{}: {}", field.label(), value))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl From<BTreeMap<InvoiceField, String>> for InvoiceRecord {
    fn from(fields: BTreeMap<InvoiceField, String>) -> Self {
        fields.into_iter().collect()
    }
}

impl From<InvoiceRecord> for BTreeMap<InvoiceField, String> {
    fn from(record: InvoiceRecord) -> Self {
        record.fields
    }
}

impl FromIterator<(InvoiceField, String)> for InvoiceRecord {
    fn from_iter<I: IntoIterator<Item = (InvoiceField, String)>>(iter: I) -> Self {
        let mut record = InvoiceRecord::new();
        for (field, value) in iter {
            record.set(field, value);
        }
        record
    }
}
