//! DocGround - document field extraction with visual grounding
//!
//! Classifies a scanned document with a multimodal model, extracts its
//! fields, and outlines where each field appears using cloud OCR.

mod app;
mod commands;
mod config;
mod dashboard;
mod document;
mod extraction;
mod grounding;
mod llm;
mod render;
mod storage;
mod vision;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::commands::Command;
use crate::config::{AppConfig, CredentialOverrides};

/// DocGround - extract and locate document fields
#[derive(Parser, Debug)]
#[command(name = "docground", version)]
#[command(about = "Extract receipt fields with a multimodal model and outline them on the page")]
struct Args {
    /// Configuration file (defaults to the per-user config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Model API key, overrides GOOGLE_API_KEY
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// OCR credentials JSON, overrides GOOGLE_APPLICATION_CREDENTIALS
    #[arg(long, global = true)]
    credentials: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

fn main() -> Result<()> {
    // Load .env before reading RUST_LOG
    let dotenv = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("info,docground=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match dotenv {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("Ignoring .env: {}", e),
    }

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => storage::default_config_path()?,
    };
    let file_config = load_or_create_config(&config_path)?;

    let overrides = CredentialOverrides::from_env().layered(CredentialOverrides {
        api_key: args.api_key.clone(),
        credentials_path: args.credentials.clone(),
        vision_api_key: None,
    });
    let effective = file_config.with_overrides(&overrides);

    match args.command.unwrap_or(Command::Dashboard) {
        Command::Extract {
            input,
            output,
            json,
            threshold,
        } => commands::run_extract(effective, &input, output.as_deref(), json, threshold),
        Command::Ocr { input, json } => commands::run_ocr(&effective, &input, json),
        Command::Classify { input } => commands::run_classify(&effective, &input),
        Command::Rotate { input, output } => commands::run_rotate(&input, &output),
        Command::Config { action } => commands::run_config(&action, &effective, &config_path),
        Command::Dashboard => {
            info!("DocGround dashboard starting...");
            dashboard::run_dashboard(file_config, config_path, overrides)
                .map_err(|e| anyhow::anyhow!("Dashboard error: {e}"))
        }
    }
}

/// Load configuration from file or fall back to defaults
fn load_or_create_config(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        let config = config::load_config(path)
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        info!("Loaded configuration from {:?}", path);
        return Ok(config);
    }
    debug!("No configuration at {:?}, using defaults", path);
    Ok(AppConfig::default())
}
