//! Fill command - write an invoice record into a form description.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use console::style;
use serde_json::json;
use tracing::info;

use fapiao_core::form::{FormSync, MemoryForm};
use fapiao_core::models::{FieldMapping, InvoiceRecord};

use super::load_config;

/// Arguments for the fill command.
#[derive(Args)]
pub struct FillArgs {
    /// Invoice record (JSON object keyed by field name)
    record: PathBuf,

    /// Form description (JSON array of inputs)
    #[arg(long)]
    form: PathBuf,

    /// Field mapping (JSON array of {targetId, field}); defaults to the configured mapping
    #[arg(short, long)]
    mapping: Option<PathBuf>,

    /// Clear the mapped inputs after filling
    #[arg(long)]
    clear: bool,
}

pub async fn run(args: FillArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    let record: InvoiceRecord = serde_json::from_str(&fs::read_to_string(&args.record)?)?;
    let form = MemoryForm::from_json(&fs::read_to_string(&args.form)?)?;
    let mapping: FieldMapping = match &args.mapping {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => config.form.mapping.clone(),
    };

    let sync = FormSync::new(form.clone())
        .with_highlight_duration(Duration::from_millis(config.form.highlight_ms));

    let report = sync.fill(&record, &mapping);
    info!("{}", report.summary());

    if args.clear {
        let cleared = sync.clear(&mapping);
        info!("Cleared {} inputs", cleared);
    }

    let output = json!({
        "report": report,
        "values": sync.form_data(&mapping),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    if report.is_valid() {
        eprintln!("{} {}", style("✓").green(), report.summary());
    } else {
        eprintln!("{} {}", style("!").yellow(), report.summary());
    }

    Ok(())
}
