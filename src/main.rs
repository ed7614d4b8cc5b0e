#![forbid(unsafe_code)]

//! i2p — Insomnia ⇄ Postman collection converter.
//!
//! CLI entry point: parses arguments, dispatches subcommands, renders output.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use i2p::error::ConvertError;
use i2p::pipeline::{self, ConvertOptions};

/// Convert API collections between Insomnia YAML exports and Postman JSON
/// collections.
///
/// The direction follows the input file extension: `.yaml`/`.yml` is read as
/// an Insomnia export, `.json` as a Postman collection.
#[derive(Parser, Debug)]
#[command(name = "i2p", version, about, long_about = None)]
struct Cli {
    /// Show detailed conversion progress.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show everything including per-node conversion details.
    #[arg(long, global = true)]
    trace: bool,

    /// Output as JSON for machine consumption.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Convert a document to the other format.
    Convert {
        /// Document to convert (.yaml/.yml for Insomnia, .json for Postman).
        #[arg(long, default_value = "insomnia.yaml")]
        input_file: PathBuf,

        /// Destination file [default: postman_collection.json, or insomnia.yaml
        /// when the input is a Postman collection].
        #[arg(long)]
        output_file: Option<PathBuf>,

        /// Print the converted document instead of writing it.
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the i2p version.
    Version,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: clap_complete::Shell,
    },
}

/// Initialize the tracing subscriber based on CLI flags.
///
/// Priority: `--trace` > `--verbose` > `RUST_LOG` env var > default (warn).
fn init_tracing(cli: &Cli) {
    let filter = if cli.trace {
        EnvFilter::new("i2p=trace")
    } else if cli.verbose {
        EnvFilter::new("i2p=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);
    let json = cli.json;

    let outcome = match cli.command {
        Command::Convert {
            input_file,
            output_file,
            dry_run,
        } => run_convert(
            ConvertOptions {
                input: input_file,
                output: output_file,
                dry_run,
            },
            json,
        ),
        Command::Version => run_version(json),
        Command::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "i2p", &mut std::io::stdout());
            Ok(())
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err, json);
            ExitCode::FAILURE
        }
    }
}

fn run_convert(opts: ConvertOptions, json: bool) -> anyhow::Result<()> {
    let dry_run = opts.dry_run;
    let result = pipeline::convert(&opts)?;

    if json {
        let mut payload = serde_json::json!({
            "ok": true,
            "source_format": result.source_format.slug(),
            "target_format": result.target_format.slug(),
            "input_file": result.input_path.display().to_string(),
            "output_file": result.output_path.display().to_string(),
            "written": result.written.is_some(),
            "stats": result.stats,
            "warnings": result.warnings,
        });
        if dry_run {
            payload["document"] = serde_json::Value::String(result.rendered);
        }
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if dry_run {
        print!("{}", result.rendered);
    } else {
        println!(
            "{} Output: {}",
            "Conversion successful!".green().bold(),
            result.output_path.display()
        );
        println!(
            "  {} → {}: {} folder(s), {} request(s)",
            result.source_format, result.target_format, result.stats.folders, result.stats.requests
        );
    }
    for warning in &result.warnings {
        eprintln!("{} {warning}", "warning:".yellow().bold());
    }
    Ok(())
}

fn run_version(json: bool) -> anyhow::Result<()> {
    let version = env!("CARGO_PKG_VERSION");
    if json {
        println!("{}", serde_json::json!({ "ok": true, "version": version }));
    } else {
        println!("i2p version {version}");
    }
    Ok(())
}

fn report_error(err: &anyhow::Error, json: bool) {
    let error_type = err
        .downcast_ref::<ConvertError>()
        .map(ConvertError::error_type)
        .unwrap_or("InternalError");

    if json {
        let payload = serde_json::json!({
            "ok": false,
            "error_type": error_type,
            "message": format!("{err:#}"),
        });
        println!("{payload}");
    } else {
        eprintln!("{} {err:#}", "Error:".red().bold());
    }
}
