//! Command-line interface for anchorlight.
//!
//! Provides commands for resolving fragments against a document snapshot,
//! replaying scripted sessions, fingerprinting snapshots and showing the
//! resolved configuration.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use crate::config::{self, ResolvedConfig};
use crate::domain::document::Document;
use crate::domain::geometry::Rect;
use crate::domain::snapshot::{self, Snapshot, FINGERPRINT_DEPTH};
use crate::engine::HighlightEngine;
use crate::resolver::{AnchorResolver, ResolveMode, Strategy};

pub mod replay;

/// anchorlight - Evidence anchoring and live connection overlays
#[derive(Parser, Debug)]
#[command(name = "anchorlight")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (overrides discovery)
    #[arg(long, global = true, env = "ANCHORLIGHT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve a text fragment to a region of a snapshot
    Resolve {
        /// Document snapshot (YAML or JSON)
        snapshot: PathBuf,

        /// Fragment to look for
        fragment: String,

        /// Resolution mode
        #[arg(short, long, value_enum, default_value = "body")]
        mode: ModeArg,

        /// Search the whole document instead of the main container
        #[arg(long)]
        whole_document: bool,
    },

    /// Replay a script of commands and UI events against a snapshot
    Replay {
        /// Document snapshot (YAML or JSON)
        snapshot: PathBuf,

        /// Replay script (YAML)
        script: PathBuf,

        /// Wait out `advance` steps in wall-clock time
        #[arg(long)]
        realtime: bool,

        /// Also write the records to the reports directory
        #[arg(long)]
        save: bool,
    },

    /// Print the structural fingerprint of a snapshot
    Fingerprint {
        /// Document snapshot (YAML or JSON)
        snapshot: PathBuf,

        /// Print the tag skeleton as well
        #[arg(long)]
        skeleton: bool,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// Resolution mode for CLI (maps to ResolveMode)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    /// Plain body text
    Body,

    /// Headings and labels
    Title,

    /// Section-label keyword
    Section,
}

impl From<ModeArg> for ResolveMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Body => ResolveMode::Body,
            ModeArg::Title => ResolveMode::Title,
            ModeArg::Section => ResolveMode::Section,
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let cfg = match &self.config {
            Some(path) => config::load_from(path)?,
            None => config::config()?.clone(),
        };

        match self.command {
            Commands::Resolve {
                snapshot,
                fragment,
                mode,
                whole_document,
            } => resolve_fragment(&cfg, &snapshot, &fragment, mode.into(), whole_document),
            Commands::Replay {
                snapshot,
                script,
                realtime,
                save,
            } => replay_script(&cfg, &snapshot, &script, realtime, save).await,
            Commands::Fingerprint { snapshot, skeleton } => {
                show_fingerprint(&cfg, &snapshot, skeleton)
            }
            Commands::Config => show_config(&cfg),
        }
    }
}

fn load_document(cfg: &ResolvedConfig, path: &Path) -> Result<Document> {
    Snapshot::load(path)?
        .into_document_with(cfg.viewport)
        .with_context(|| format!("Failed to build document from {}", path.display()))
}

#[derive(Debug, Serialize)]
struct ResolveReport {
    fragment: String,
    mode: ResolveMode,
    strategy: Strategy,
    score: f64,
    tag: Option<String>,
    text: String,
    rect: Option<Rect>,
}

/// Resolve one fragment and print the match as JSON
fn resolve_fragment(
    cfg: &ResolvedConfig,
    snapshot: &Path,
    fragment: &str,
    mode: ResolveMode,
    whole_document: bool,
) -> Result<()> {
    let doc = load_document(cfg, snapshot)?;
    let resolver = AnchorResolver::new(cfg.resolver.clone());
    let root = if whole_document {
        doc.root()
    } else {
        resolver.context_root(&doc)
    };

    let Some(found) = resolver.resolve(&doc, root, fragment, mode) else {
        eprintln!("No region found for '{}'", fragment);
        std::process::exit(1);
    };

    let report = ResolveReport {
        fragment: fragment.to_string(),
        mode,
        strategy: found.strategy,
        score: found.score,
        tag: doc.tag(found.region).map(str::to_string),
        text: doc.text_content(found.region),
        rect: doc.page_rect(found.region),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Replay a script and print one JSON line per step
async fn replay_script(
    cfg: &ResolvedConfig,
    snapshot: &Path,
    script: &Path,
    realtime: bool,
    save: bool,
) -> Result<()> {
    let doc = load_document(cfg, snapshot)?;
    let script = replay::Script::load(script)?;
    let mut engine = HighlightEngine::new(doc, AnchorResolver::new(cfg.resolver.clone()));

    let records = replay::run_script(&mut engine, script, realtime).await?;

    let mut lines = Vec::with_capacity(records.len());
    for record in &records {
        lines.push(serde_json::to_string(record)?);
    }
    let mut stdout = std::io::stdout().lock();
    for line in &lines {
        writeln!(stdout, "{}", line)?;
    }

    if save {
        let dir = cfg.reports_dir();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create reports directory: {}", dir.display()))?;
        let path = dir.join(format!(
            "replay-{}.jsonl",
            chrono::Utc::now().format("%Y%m%dT%H%M%S")
        ));
        std::fs::write(&path, lines.join("\n") + "\n")
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        eprintln!("[Report saved to {}]", path.display());
    }

    Ok(())
}

fn show_fingerprint(cfg: &ResolvedConfig, path: &Path, with_skeleton: bool) -> Result<()> {
    let doc = load_document(cfg, path)?;
    if with_skeleton {
        println!("{}", snapshot::skeleton(&doc, doc.root(), FINGERPRINT_DEPTH));
    }
    println!("{}", snapshot::fingerprint(&doc, doc.root()));
    Ok(())
}

/// Show resolved configuration
fn show_config(cfg: &ResolvedConfig) -> Result<()> {
    println!("anchorlight configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:    {}", cfg.home.display());
    println!("  Reports: {}", cfg.reports_dir().display());
    println!();
    println!(
        "Default viewport: {}x{}",
        cfg.viewport.width, cfg.viewport.height
    );
    println!();
    println!("Resolver:");
    println!("  Context selectors: {}", cfg.resolver.context_selectors.join(", "));
    println!("  Label selectors:   {}", cfg.resolver.label_selectors.join(", "));
    for tier in &cfg.resolver.section_tiers {
        println!("  Section tier:      {} (<= {} chars)", tier.selector, tier.max_chars);
    }
    println!("  Section names:     {}", cfg.resolver.section_names.join(", "));

    Ok(())
}
