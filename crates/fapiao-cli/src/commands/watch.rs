//! Watch command - recognize invoice images as they appear in a directory.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use console::style;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use fapiao_core::form::{FormSync, MemoryForm};
use fapiao_core::ocr::{EngineFactory, LocalEngineFactory, Preloaded, RemoteOcrClient};
use fapiao_core::orchestrator::{
    page_events, AddedElement, BoundForm, Notification, Notifier, Orchestrator, PageEvent,
    PageLifetime,
};

use super::load_config;
use super::recognize::is_image;

/// Arguments for the watch command.
#[derive(Args)]
pub struct WatchArgs {
    /// Directory to watch
    dir: PathBuf,

    /// Polling interval in milliseconds
    #[arg(long, default_value = "500")]
    interval_ms: u64,

    /// Also recognize images already present at startup
    #[arg(long)]
    existing: bool,

    /// Model directory (overrides ocr.model_dir)
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Use the remote OCR service instead of the local models
    #[arg(long)]
    remote: bool,

    /// Fill recognized records into this form description (JSON array of inputs)
    #[arg(long)]
    form: Option<PathBuf>,
}

/// Prints notifications to the terminal.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: &Notification) {
        println!("{}", style(&notification.title).bold().cyan());
        for line in notification.text.lines() {
            println!("  {}", line);
        }
        println!();
    }
}

pub async fn run(args: WatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(model_dir) = &args.model_dir {
        config.ocr.model_dir = model_dir.clone();
    }

    if !args.dir.is_dir() {
        anyhow::bail!("Not a directory: {}", args.dir.display());
    }

    // The local engine loads on the first image.
    let factory: Arc<dyn EngineFactory> = if args.remote {
        Arc::new(Preloaded(Arc::new(RemoteOcrClient::new(&config.api)?)))
    } else {
        Arc::new(LocalEngineFactory::new(config.ocr.clone()))
    };

    let mut orchestrator = Orchestrator::with_config(factory, Arc::new(ConsoleNotifier), &config);
    let form = match &args.form {
        Some(path) => {
            let form = MemoryForm::from_json(&fs::read_to_string(path)?)?;
            let sync = FormSync::new(form.clone())
                .with_highlight_duration(Duration::from_millis(config.form.highlight_ms));
            orchestrator = orchestrator.with_form(BoundForm::new(sync, config.form.mapping.clone()));
            Some(form)
        }
        None => None,
    };

    let (handle, lifetime) = PageLifetime::new();
    let (tx, rx) = page_events(config.orchestrator.queue_capacity);
    let poller = poll_directory(
        args.dir.clone(),
        Duration::from_millis(args.interval_ms.max(10)),
        args.existing,
        tx,
    );

    println!(
        "{} Watching {} (Ctrl-C to stop)",
        style("ℹ").blue(),
        args.dir.display()
    );

    tokio::select! {
        _ = orchestrator.run(rx, lifetime) => {}
        result = poller => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
            handle.end();
        }
    }

    if let Some(form) = form {
        let values: Vec<_> = form
            .inputs()
            .into_iter()
            .filter(|input| !input.value.is_empty())
            .collect();
        println!("{}", serde_json::to_string_pretty(&values)?);
    }

    Ok(())
}

/// Send an event for every image that appears in `dir`.
async fn poll_directory(
    dir: PathBuf,
    interval: Duration,
    include_existing: bool,
    tx: mpsc::Sender<PageEvent>,
) -> anyhow::Result<()> {
    let mut seen = HashSet::new();
    if !include_existing {
        scan(&dir, &mut seen, false)?;
    }

    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;

        let added = match scan(&dir, &mut seen, true) {
            Ok(added) => added,
            Err(e) => {
                warn!("Cannot read {}: {}", dir.display(), e);
                continue;
            }
        };

        if added.is_empty() {
            continue;
        }

        debug!("{} new images in {}", added.len(), dir.display());
        if tx.send(PageEvent::new(added)).await.is_err() {
            return Ok(());
        }
    }
}

/// New image files in `dir`, in name order. Only marks them as seen when
/// `load` is false.
fn scan(dir: &Path, seen: &mut HashSet<PathBuf>, load: bool) -> std::io::Result<Vec<AddedElement>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_image(path))
        .collect();
    paths.sort();

    let mut added = Vec::new();
    for path in paths {
        if !seen.insert(path.clone()) || !load {
            continue;
        }
        match fs::read(&path) {
            Ok(bytes) => added.push(AddedElement::image(path.display().to_string(), bytes)),
            Err(e) => {
                warn!("Cannot read {}: {}", path.display(), e);
                seen.remove(&path);
            }
        }
    }

    Ok(added)
}
