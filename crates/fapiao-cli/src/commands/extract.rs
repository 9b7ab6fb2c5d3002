//! Extract command - run field extraction on OCR text or a service payload.

use std::fs;
use std::io::Read;
use std::path::PathBuf;

use clap::Args;
use tracing::debug;

use fapiao_core::invoice::{FieldExtractor, Normalizer, RawOcrOutput};

use super::{format_results, OutputFormat, RecognizedInvoice};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// OCR text file, or `-` for stdin
    #[arg(default_value = "-")]
    input: String,

    /// Input is an OCR service JSON response
    #[arg(long)]
    json: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub async fn run(args: ExtractArgs) -> anyhow::Result<()> {
    let content = read_input(&args.input)?;

    let raw = if args.json {
        RawOcrOutput::Structured(serde_json::from_str(&content)?)
    } else {
        RawOcrOutput::Text(content)
    };

    let record = FieldExtractor::new().extract(&raw)?;
    debug!("Extracted {} fields", record.len());

    let result = RecognizedInvoice {
        source: args.input.clone(),
        result: Normalizer::new().normalize(&record),
    };
    let output = format_results(std::slice::from_ref(&result), args.format)?;

    match &args.output {
        Some(path) => fs::write(path, output)?,
        None => println!("{}", output),
    }

    Ok(())
}

fn read_input(input: &str) -> anyhow::Result<String> {
    if input == "-" {
        let mut content = String::new();
        std::io::stdin().read_to_string(&mut content)?;
        Ok(content)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}
