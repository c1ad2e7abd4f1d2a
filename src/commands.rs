//! Command-line subcommands

use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::app::{self, DocumentPipeline, PipelineOutput};
use crate::config::{self, AppConfig};
use crate::document::DocumentImage;
use crate::extraction::{format_amount, Classification, ExtractedData};
use crate::grounding::GroundedAnnotation;
use crate::vision::{CloudVisionClient, OcrResult};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Classify, extract and ground fields on a document
    Extract {
        #[command(flatten)]
        input: InputArgs,
        /// Write the annotated image here (PNG)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
        /// Override the fuzzy match threshold (0-100)
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        threshold: Option<u8>,
    },
    /// Print the OCR tokens of a document
    Ocr {
        #[command(flatten)]
        input: InputArgs,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Classify a document
    Classify {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Rotate a document by quarter turns and save it as PNG
    Rotate {
        #[command(flatten)]
        input: InputArgs,
        /// Output PNG path
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Open the dashboard (default)
    Dashboard,
}

/// A document plus the rotation to apply before processing
#[derive(ClapArgs, Debug)]
pub struct InputArgs {
    /// Image (PNG, JPEG) or PDF; only the first PDF page is used
    pub input: PathBuf,
    /// Clockwise quarter turns, negative for counter-clockwise
    #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
    pub rotate: i32,
}

impl InputArgs {
    fn load(&self) -> Result<DocumentImage> {
        let document = DocumentImage::load(&self.input)
            .with_context(|| format!("Failed to load {}", self.input.display()))?;
        Ok(document.rotated(self.rotate))
    }
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration with secrets masked
    Show,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the configuration file path
    Path,
}

#[derive(Serialize)]
struct ExtractReport<'a> {
    classification: &'a Classification,
    data: &'a ExtractedData,
    annotations: &'a [GroundedAnnotation],
    ocr_tokens: usize,
}

pub fn run_extract(
    mut config: AppConfig,
    input: &InputArgs,
    output: Option<&Path>,
    json: bool,
    threshold: Option<u8>,
) -> Result<()> {
    if let Some(threshold) = threshold {
        config.grounding.threshold = threshold;
    }
    let pipeline = DocumentPipeline::from_config(&config)?;
    let document = input.load()?;

    let result = pipeline.run(&document).context("Extraction failed")?;

    if let Some(path) = output {
        result
            .grounded_image
            .save(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote annotated image to {}", path.display());
    }

    if json {
        let report = ExtractReport {
            classification: &result.classification,
            data: &result.data,
            annotations: &result.annotations,
            ocr_tokens: result.ocr.tokens.len(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&result);
    }
    Ok(())
}

fn print_summary(result: &PipelineOutput) {
    println!(
        "Document type: {}",
        result.classification.document_type.display_name()
    );
    if !result.classification.reasoning.is_empty() {
        println!("Reasoning:     {}", result.classification.reasoning);
    }

    if let Some(receipt) = &result.data.receipt {
        println!();
        println!("Merchant: {}", receipt.merchant_name);
        if let Some(date) = &receipt.date {
            println!("Date:     {}", date);
        }
        println!("Total:    {} {}", format_amount(receipt.total_amount), receipt.currency);
        for item in &receipt.items {
            let total = item.total.map(format_amount).unwrap_or_default();
            println!("  - {:<40} {:>10}", item.description, total);
        }
    }
    if let Some(text) = &result.data.raw_text {
        println!();
        println!("{}", text);
    }

    println!();
    println!(
        "Grounded {} of {} fields",
        result.annotations.len(),
        result.data.fields().len()
    );
    for annotation in &result.annotations {
        if let Some((x0, y0, x1, y1)) = annotation.polygon.bounds() {
            println!("  {:<10} ({}, {}) - ({}, {})", annotation.label, x0, y0, x1, y1);
        }
    }
}

pub fn run_ocr(config: &AppConfig, input: &InputArgs, json: bool) -> Result<()> {
    let client = CloudVisionClient::new(&config.ocr)?;
    let document = input.load()?;

    let result: OcrResult = app::detect_text(&client, &document).context("OCR failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }
    if result.is_empty() {
        println!("No text detected");
        return Ok(());
    }
    for token in &result.tokens {
        let bounds = token
            .polygon
            .bounds()
            .map(|(x0, y0, x1, y1)| format!("({x0}, {y0}) - ({x1}, {y1})"))
            .unwrap_or_default();
        println!("{:<30} {}", token.text, bounds);
    }
    Ok(())
}

pub fn run_classify(config: &AppConfig, input: &InputArgs) -> Result<()> {
    let pipeline = DocumentPipeline::from_config(config)?;
    let document = input.load()?;

    let classification = pipeline.classify(&document).context("Classification failed")?;

    println!("{}", classification.document_type);
    if !classification.reasoning.is_empty() {
        println!("{}", classification.reasoning);
    }
    Ok(())
}

pub fn run_rotate(input: &InputArgs, output: &Path) -> Result<()> {
    let document = input.load()?;
    document
        .image()
        .save(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    let (width, height) = document.dimensions();
    println!("Wrote {}x{} image to {}", width, height, output.display());
    Ok(())
}

pub fn run_config(action: &ConfigAction, effective: &AppConfig, path: &Path) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!("# {}", path.display());
            print!("{}", toml::to_string_pretty(&effective.redacted())?);
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            config::save_config(&AppConfig::default(), path)?;
            println!("Wrote default configuration to {}", path.display());
        }
        ConfigAction::Path => println!("{}", path.display()),
    }
    Ok(())
}
