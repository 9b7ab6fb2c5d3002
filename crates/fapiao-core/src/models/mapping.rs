//! Declarative binding of form targets to invoice fields.

use serde::{Deserialize, Serialize};

use super::record::InvoiceField;

/// One `targetId → field` binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingEntry {
    /// Form target identifier (name, id or `data-field` value).
    pub target_id: String,
    /// Invoice field written into the target.
    pub field: InvoiceField,
}

/// Ordered field mapping.
///
/// Serialized as a JSON array so the declaration order survives a round
/// trip through configuration files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMapping {
    entries: Vec<MappingEntry>,
}

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a binding.
    pub fn bind(mut self, target_id: impl Into<String>, field: InvoiceField) -> Self {
        self.entries.push(MappingEntry {
            target_id: target_id.into(),
            field,
        });
        self
    }

    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mapping whose target ids equal the record keys (`invoiceCode`, ...).
    pub fn identity() -> Self {
        InvoiceField::ALL
            .iter()
            .fold(Self::new(), |mapping, field| mapping.bind(field.as_str(), *field))
    }
}

impl<S: Into<String>> FromIterator<(S, InvoiceField)> for FieldMapping {
    fn from_iter<I: IntoIterator<Item = (S, InvoiceField)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |mapping, (target_id, field)| mapping.bind(target_id, field))
    }
}
