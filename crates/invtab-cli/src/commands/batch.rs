//! Batch processing command for multiple PDF files.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, warn};

use invtab_core::output::output_path_for;
use invtab_core::pipeline::{extract_to_file, DocumentProcessor};
use invtab_core::{InvtabError, Rasterizer, TextRecognizer};

use super::config::load_config;
use super::options::PipelineOptions;

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern matching the input PDFs
    #[arg(required = true)]
    input: String,

    /// Output directory (default: beside each input)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Also write a summary CSV to this file
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,

    #[command(flatten)]
    options: PipelineOptions,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    output: Option<PathBuf>,
    rows: usize,
    pages: usize,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    args.options.apply(&mut config);

    // Expand glob pattern
    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching PDF files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let processor = DocumentProcessor::from_config(&config)?;

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files",
        )?
        .progress_chars("=>-"),
    );

    let mut results = Vec::with_capacity(files.len());
    let mut outputs = OutputPaths::new(args.output_dir.as_deref(), &config.output.suffix);

    for path in files {
        let file_start = Instant::now();
        let result = outputs
            .claim(&path)
            .and_then(|output| process_single_file(&path, &processor, output));
        let processing_time_ms = file_start.elapsed().as_millis() as u64;

        match result {
            Ok((output, rows, pages)) => results.push(ProcessResult {
                path,
                output: Some(output),
                rows,
                pages,
                error: None,
                processing_time_ms,
            }),
            Err(e) => {
                if args.continue_on_error {
                    warn!("Failed to process {}: {}", path.display(), e);
                    results.push(ProcessResult {
                        path,
                        output: None,
                        rows: 0,
                        pages: 0,
                        error: Some(e.to_string()),
                        processing_time_ms,
                    });
                } else {
                    error!("Failed to process {}: {}", path.display(), e);
                    overall_pb.abandon();
                    return Err(e);
                }
            }
        }

        overall_pb.inc(1);
    }

    overall_pb.finish_with_message("Complete");

    if let Some(summary_path) = &args.summary {
        write_summary(summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();
    let succeeded = results.len() - failed.len();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(succeeded).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
        anyhow::bail!("{} of {} files failed", failed.len(), results.len());
    }

    Ok(())
}

/// Hands out one output CSV per input, refusing to hand out a path twice.
struct OutputPaths<'a> {
    output_dir: Option<&'a Path>,
    suffix: &'a str,
    claimed: HashMap<PathBuf, PathBuf>,
}

impl<'a> OutputPaths<'a> {
    fn new(output_dir: Option<&'a Path>, suffix: &'a str) -> Self {
        Self {
            output_dir,
            suffix,
            claimed: HashMap::new(),
        }
    }

    /// Output path for `input`. Fails if an earlier input already maps to it.
    fn claim(&mut self, input: &Path) -> anyhow::Result<PathBuf> {
        let mut output = output_path_for(input, self.suffix).map_err(InvtabError::from)?;
        if let (Some(dir), Some(name)) = (self.output_dir, output.file_name()) {
            output = dir.join(name);
        }

        if let Some(previous) = self.claimed.get(&output) {
            anyhow::bail!(
                "output {} is already used by {}",
                output.display(),
                previous.display()
            );
        }

        self.claimed.insert(output.clone(), input.to_path_buf());
        Ok(output)
    }
}

/// Extract one file and write its CSV. Returns (output path, rows, pages).
fn process_single_file<R: Rasterizer, T: TextRecognizer>(
    path: &Path,
    processor: &DocumentProcessor<R, T>,
    output: PathBuf,
) -> anyhow::Result<(PathBuf, usize, usize)> {
    let extraction = extract_to_file(processor, path, &output, |_| {})?;
    Ok((output, extraction.rows.len(), extraction.pages.len()))
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "rows",
        "pages",
        "output",
        "processing_time_ms",
        "error",
    ])?;

    for result in results {
        let filename = result.path.display().to_string();
        let output = result
            .output
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let status = if result.error.is_some() { "error" } else { "success" };
        let rows = result.rows.to_string();
        let pages = result.pages.to_string();
        let time_ms = result.processing_time_ms.to_string();

        wtr.write_record([
            filename.as_str(),
            status,
            rows.as_str(),
            pages.as_str(),
            output.as_str(),
            time_ms.as_str(),
            result.error.as_deref().unwrap_or(""),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
