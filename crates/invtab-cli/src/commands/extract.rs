//! Extract command - turn one scanned PDF into a CSV table.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use invtab_core::output::output_path_for;
use invtab_core::pipeline::{extract_to_file, DocumentProcessor, PageEvent};
use invtab_core::InvtabError;

use super::config::load_config;
use super::options::PipelineOptions;

/// Arguments for extracting a single document.
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Input PDF file
    #[arg(required = true)]
    input: Option<PathBuf>,

    /// Output CSV file (default: <input stem>_ocr_result.csv beside the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    options: PipelineOptions,
}

pub async fn run(args: ExtractArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let start = Instant::now();

    let Some(input) = args.input else {
        anyhow::bail!("No input file given");
    };

    let mut config = load_config(config_path)?;
    args.options.apply(&mut config);

    // Check input file exists
    if !input.exists() {
        return Err(InvtabError::InputMissing(input).into());
    }

    let output = match args.output {
        Some(path) => path,
        None => output_path_for(&input, &config.output.suffix).map_err(InvtabError::from)?,
    };

    info!("Processing file: {}", input.display());
    println!(
        "{} Extracting table from {} (OCR may take a few minutes)",
        style("ℹ").blue(),
        input.display()
    );

    let processor = DocumentProcessor::from_config(&config)?;

    let pb = ProgressBar::new_spinner();
    pb.set_message("Rendering pages...");
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    let bar_style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} pages {msg}",
    )?
    .progress_chars("##-");

    let extraction = extract_to_file(&processor, &input, &output, |event| match event {
        PageEvent::Rasterized { pages } => {
            pb.set_style(bar_style.clone());
            pb.set_length(pages as u64);
            pb.set_message("Running OCR...");
        }
        PageEvent::Recognized { .. } => pb.inc(1),
    });

    let extraction = match extraction {
        Ok(extraction) => extraction,
        Err(e) => {
            pb.abandon_with_message("Failed");
            return Err(e.into());
        }
    };

    pb.finish_with_message("Done");

    println!(
        "{} Extracted {} rows from {} lines on {} pages",
        style("✓").green(),
        extraction.rows.len(),
        extraction.total_lines(),
        extraction.pages.len()
    );
    println!(
        "{} Output written to {}",
        style("✓").green(),
        output.display()
    );

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}
