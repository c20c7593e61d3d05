//! CLI application for extracting invoice tables from scanned PDFs.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use console::style;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use invtab_core::{ExtractionError, InvtabError};

use commands::{batch, config, extract};

/// Extract Item/Description/NCM/Unit/Quantity/R1/R2/Amount tables from scanned PDF invoices
#[derive(Parser)]
#[command(name = "invtab")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true, subcommand_negates_reqs = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    extract: extract::ExtractArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Process multiple PDF files
    Batch(batch::BatchArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

/// Exit status when the input document does not exist.
const EXIT_INPUT_MISSING: u8 = 3;
/// Exit status when rasterization or text recognition fails.
const EXIT_BACKEND_FAILED: u8 = 4;
/// Exit status when no table row could be extracted.
const EXIT_NO_ROWS: u8 = 5;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
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

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to set up logging: {}", e);
        return ExitCode::FAILURE;
    }

    let config_path = cli.config.as_deref();
    let result = match cli.command {
        Some(Commands::Batch(args)) => batch::run(args, config_path).await,
        Some(Commands::Config(args)) => config::run(args, config_path).await,
        None => extract::run(cli.extract, config_path).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            exit_code(&e)
        }
    }
}

fn report(err: &anyhow::Error) {
    eprintln!("{} {}", style("✗").red(), err);

    let Some(core) = err.downcast_ref::<InvtabError>() else {
        return;
    };

    let hints = core.hints();
    if !hints.is_empty() {
        eprintln!("{}", style("Possible causes:").yellow());
        for hint in hints {
            eprintln!("  - {}", hint);
        }
    }

    // Full error chain for collaborator failures
    if matches!(core, InvtabError::Pdf(_) | InvtabError::Ocr(_)) {
        eprintln!();
        eprintln!("{:?}", err);
    }
}

fn exit_code(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<InvtabError>() {
        Some(InvtabError::InputMissing(_)) => ExitCode::from(EXIT_INPUT_MISSING),
        Some(InvtabError::Pdf(_) | InvtabError::Ocr(_)) => ExitCode::from(EXIT_BACKEND_FAILED),
        Some(InvtabError::Extraction(ExtractionError::NoRows)) => ExitCode::from(EXIT_NO_ROWS),
        _ => ExitCode::FAILURE,
    }
}
