//! CLI application for Chinese VAT invoice recognition.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{config, extract, fill, recognize, watch};

/// Invoice OCR - recognize Chinese VAT invoices and fill forms with their fields
#[derive(Parser)]
#[command(name = "fapiao")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recognize invoice images
    Recognize(recognize::RecognizeArgs),

    /// Extract fields from OCR text or an OCR service response
    Extract(extract::ExtractArgs),

    /// Fill a form description with an invoice record
    Fill(fill::FillArgs),

    /// Recognize images as they appear in a directory
    Watch(watch::WatchArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Recognize(args) => recognize::run(args, config_path).await,
        Commands::Extract(args) => extract::run(args).await,
        Commands::Fill(args) => fill::run(args, config_path).await,
        Commands::Watch(args) => watch::run(args, config_path).await,
        Commands::Config(args) => config::run(args, config_path).await,
    }
}
