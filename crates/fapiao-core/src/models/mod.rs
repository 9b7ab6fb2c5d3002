//! Data models: invoice record, field mapping and configuration.

pub mod config;
pub mod mapping;
pub mod record;

pub use config::FapiaoConfig;
pub use mapping::{FieldMapping, MappingEntry};
pub use record::{InvoiceField, InvoiceRecord};
