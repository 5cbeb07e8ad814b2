//! Bulletin OCR
//!
//! Extracts the text of scanned weekly bulletin pages region by region and
//! stores one document per bulletin.

mod bulletin;
mod config;
mod error;
mod layout;
mod ocr;
mod paths;

use anyhow::{anyhow, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use bulletin::{
    load_manifest, roi_summary, run_batch, save_roi_overlay, BulletinJob, BulletinOutcome,
    BulletinProcessor, BulletinState, DynamicRegionResolver, JsonFileStore, ProcessOptions,
};
use config::AppConfig;
use ocr::{AnchorLocator, TesseractCli};

/// Logs a message to both console and log file with timestamp.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    print!("{}", line);
    let log_path = paths::get_logs_dir().join("bulletin_ocr.log");
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        let _ = file.write_all(line.as_bytes());
    }
}

#[derive(Parser, Debug)]
#[command(name = "bulletin-ocr", version, about = "Region-based OCR for scanned bulletins")]
struct Cli {
    /// Configuration file (defaults to config.json next to the executable)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Document store file (defaults to bulletins.json next to the executable)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Reprocess bulletins that already have a stored document
    #[arg(long, global = true)]
    force: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process one bulletin from page images given in page order
    Process {
        /// Bulletin identifier
        #[arg(long)]
        id: String,
        /// Page images, in bulletin page order
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
    /// Process every bulletin listed in a JSON manifest
    Batch {
        /// JSON array of { "id": .., "images": [..] }
        manifest: PathBuf,
        /// Number of bulletins processed concurrently
        #[arg(long, default_value_t = 1)]
        jobs: usize,
    },
    /// Draw the configured ROIs onto page images
    DebugRoi {
        /// Page images, in bulletin page order
        #[arg(required = true)]
        images: Vec<PathBuf>,
        /// Output directory (defaults to debug_output next to the executable)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Also locate flow regions and their labels with Tesseract
        #[arg(long)]
        locate: bool,
    },
    /// Print the configured reference frame, page order and ROIs
    Summary,
    /// Convert escaped "\n" sequences in stored documents into newlines
    Repair,
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = if let Some(loc) = panic_info.location() {
            format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column())
        } else {
            String::new()
        };
        log(&format!("[PANIC]{} {}", location, msg));
    }));
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Ensure output directories exist
    paths::ensure_directories()?;
    install_panic_hook();

    let config_path = cli.config.clone().unwrap_or_else(paths::get_default_config_path);
    let config = AppConfig::load(&config_path);
    let store_path = cli.store.clone().unwrap_or_else(paths::get_default_store_path);
    let options = ProcessOptions { force: cli.force };

    match cli.command {
        Command::Summary => {
            print!("{}", roi_summary(&config.layout));
            Ok(())
        }
        Command::DebugRoi {
            images,
            output,
            locate,
        } => {
            let output_dir = output.unwrap_or_else(paths::get_debug_output_dir);
            std::fs::create_dir_all(&output_dir)?;

            let backend = if locate {
                Some(TesseractCli::new(ocr::ensure_tesseract(&config.ocr)?))
            } else {
                None
            };
            let resolver = backend.as_ref().map(|backend| {
                DynamicRegionResolver::new(AnchorLocator::new(backend, &config.ocr.anchor_languages))
            });

            for (index, path) in images.iter().enumerate() {
                match save_roi_overlay(path, index, &config.layout, &output_dir, resolver.as_ref()) {
                    Ok(Some(_)) => {}
                    Ok(None) => log(&format!("Page {}: no ROIs configured, skipped", index + 1)),
                    Err(e) => log(&format!("Page {}: {:#}", index + 1, e)),
                }
            }
            Ok(())
        }
        Command::Repair => {
            let store = JsonFileStore::open(&store_path)?;
            let fixed = store.repair_escaped_newlines()?;
            log(&format!("{} document(s) repaired", fixed));
            Ok(())
        }
        Command::Process { id, images } => {
            let jobs = vec![BulletinJob { id, images }];
            run_jobs(&config, &store_path, jobs, 1, options)
        }
        Command::Batch { manifest, jobs } => {
            let bulletins = load_manifest(&manifest)?;
            run_jobs(&config, &store_path, bulletins, jobs, options)
        }
    }
}

fn run_jobs(
    config: &AppConfig,
    store_path: &std::path::Path,
    jobs: Vec<BulletinJob>,
    workers: usize,
    options: ProcessOptions,
) -> Result<()> {
    let tesseract = ocr::ensure_tesseract(&config.ocr)?;
    let backend = TesseractCli::new(tesseract);
    let store = JsonFileStore::open(store_path)?;
    let processor = BulletinProcessor::new(config, &backend, &store);

    let outcomes = run_batch(&processor, jobs, workers, options);
    report(&outcomes);

    let failed = outcomes.iter().filter(|o| o.is_failed()).count();
    if failed > 0 {
        return Err(anyhow!("{} bulletin(s) failed", failed));
    }
    Ok(())
}

fn report(outcomes: &[BulletinOutcome]) {
    log("=== Batch report ===");
    for outcome in outcomes {
        let detail = match &outcome.state {
            BulletinState::Completed => format!(
                "{} region(s) from {} page(s), {} ignored, {} unreadable",
                outcome.regions.len(),
                outcome.pages_processed,
                outcome.pages_ignored,
                outcome.pages_unreadable
            ),
            _ => String::new(),
        };
        log(&format!("{}: {} {}", outcome.id, outcome.state, detail));
        for (name, reason) in &outcome.skipped_regions {
            log(&format!("  skipped '{}': {}", name, reason));
        }
    }
}
