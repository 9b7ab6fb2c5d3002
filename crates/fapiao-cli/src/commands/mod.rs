//! CLI subcommands and the helpers they share.

pub mod config;
pub mod extract;
pub mod fill;
pub mod recognize;
pub mod watch;

use std::path::Path;

use fapiao_core::models::config::FapiaoConfig;
use fapiao_core::{InvoiceField, NormalizationResult};
use serde::Serialize;

/// Load the configuration from `--config`, else from the default location,
/// else use defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<FapiaoConfig> {
    if let Some(path) = config_path {
        return Ok(FapiaoConfig::from_file(Path::new(path))?);
    }

    let default_path = config::default_config_path();
    if default_path.exists() {
        Ok(FapiaoConfig::from_file(&default_path)?)
    } else {
        Ok(FapiaoConfig::default())
    }
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Labelled text
    Text,
}

/// One recognized input, as written to the output.
#[derive(Debug, Serialize)]
pub struct RecognizedInvoice {
    pub source: String,
    #[serde(flatten)]
    pub result: NormalizationResult,
}

pub fn format_results(results: &[RecognizedInvoice], format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => {
            if let [single] = results {
                Ok(serde_json::to_string_pretty(single)?)
            } else {
                Ok(serde_json::to_string_pretty(results)?)
            }
        }
        OutputFormat::Csv => format_csv(results),
        OutputFormat::Text => Ok(results
            .iter()
            .map(format_text)
            .collect::<Vec<_>>()
            .join("\n\n")),
    }
}

fn format_csv(results: &[RecognizedInvoice]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec!["source"];
    header.extend(InvoiceField::ALL.iter().map(|f| f.as_str()));
    wtr.write_record(&header)?;

    for result in results {
        let mut row = vec![result.source.as_str()];
        row.extend(
            InvoiceField::ALL
                .iter()
                .map(|f| result.result.record.get(*f).unwrap_or("")),
        );
        wtr.write_record(&row)?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(result: &RecognizedInvoice) -> String {
    let mut output = format!("{}\n", result.source);

    if result.result.record.is_empty() {
        output.push_str("  (no invoice fields found)\n");
    }
    for (field, value) in result.result.record.iter() {
        output.push_str(&format!("  {}: {}\n", field.label(), value));
    }
    for error in &result.result.errors {
        output.push_str(&format!("  ! {}\n", error));
    }
    for warning in &result.result.warnings {
        output.push_str(&format!("  ? {}\n", warning));
    }

    output
}
