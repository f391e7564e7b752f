//! CLI surface: argument parsing and the simulated-viewport run loop.
//!
//! The CLI is the pipeline's UI collaborator: it owns the photo library,
//! decides what is "visible", raises the motion signals, and re-renders rows
//! when the core reports a change. All scheduling lives in photoflow-core.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::{Duration, Instant};
use url::Url;

use photoflow_core::config::{self, PhotoflowConfig};
use photoflow_core::record::{PhotoLibrary, RecordState};
use photoflow_core::scheduler::PhotoPipeline;
use photoflow_core::source;

/// Top-level CLI for the photoflow pipeline.
#[derive(Debug, Parser)]
#[command(name = "photoflow")]
#[command(about = "photoflow: viewport-driven photo download/filter pipeline", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Load a photo list and scroll a simulated viewport through it.
    Run {
        /// Photo list: local TOML file or http(s) URL. Falls back to the
        /// `source_url` from config when omitted.
        list: Option<String>,

        /// Number of rows visible at once.
        #[arg(long, default_value_t = 3)]
        window: usize,

        /// How long the viewport dwells at each scroll stop, in milliseconds.
        #[arg(long, default_value_t = 2000)]
        dwell_ms: u64,
    },

    /// Print the resolved configuration.
    ShowConfig,
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Run { list, window, dwell_ms } => {
                let location = list
                    .or_else(|| cfg.source_url.clone())
                    .context("no photo list given and no source_url in config")?;
                let library = load_library(&location, &cfg)?;
                run_viewport(library, &cfg, window.max(1), Duration::from_millis(dwell_ms))
            }
            CliCommand::ShowConfig => {
                println!("{:#?}", cfg);
                Ok(())
            }
        }
    }
}

fn load_library(location: &str, cfg: &PhotoflowConfig) -> Result<PhotoLibrary> {
    if location.starts_with("http://") || location.starts_with("https://") {
        let url = Url::parse(location).with_context(|| format!("bad list URL: {}", location))?;
        source::load_from_url(&url, &cfg.fetch_limits())
    } else {
        source::load_from_path(Path::new(location))
    }
}

/// Walk a window of `window` rows from the top of the list to the bottom,
/// dwelling at each stop until the visible rows settle or `dwell` elapses.
fn run_viewport(
    mut library: PhotoLibrary,
    cfg: &PhotoflowConfig,
    window: usize,
    dwell: Duration,
) -> Result<()> {
    if library.is_empty() {
        println!("photo list is empty");
        return Ok(());
    }

    let mut pipeline = PhotoPipeline::new(cfg)?;
    let len = library.len();
    let stops = len.saturating_sub(window) + 1;

    for start in 0..stops {
        let vis: BTreeSet<usize> = (start..(start + window).min(len)).collect();

        pipeline.motion_started();
        std::thread::sleep(Duration::from_millis(40));
        pipeline.motion_settled(&mut library, &vis);
        render(&library, &vis);

        let deadline = Instant::now() + dwell;
        loop {
            let changed = pipeline.drain_completions(&mut library);
            // A finished download unlocks the filter stage on the next pass.
            pipeline.reconcile(&library, &vis);
            if !changed.is_empty() {
                render(&library, &vis);
            }
            let settled = vis
                .iter()
                .all(|&i| library.get(i).map_or(true, |r| r.state.is_terminal()));
            if settled || Instant::now() >= deadline {
                break;
            }
            std::thread::sleep(Duration::from_millis(50));
        }
    }

    let mut filtered = 0usize;
    let mut failed = 0usize;
    let mut pending = 0usize;
    for record in library.iter() {
        match record.state {
            RecordState::Filtered => filtered += 1,
            RecordState::Failed => failed += 1,
            RecordState::New | RecordState::Downloaded => pending += 1,
        }
    }
    println!("done: {} filtered, {} failed, {} still pending", filtered, failed, pending);
    Ok(())
}

fn render(library: &PhotoLibrary, vis: &BTreeSet<usize>) {
    println!("----");
    for &i in vis {
        let Some(record) = library.get(i) else { continue };
        let status = match record.state {
            RecordState::New => "downloading...",
            RecordState::Downloaded => "filtering...",
            RecordState::Filtered => "ready",
            RecordState::Failed => "failed to load",
        };
        println!("{:>3}  {:<24} [{}]", i, record.name(), status);
    }
}
