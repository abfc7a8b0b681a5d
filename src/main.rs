//! certforge – bulk-generate attendee certificates as PDFs.
//!
//! Usage:
//!   certforge [--csv attendees.csv] [--template cert_template.html] [--output DIR]
//!
//! Without `--output` the certificates land in
//! `output/{EventTitle}_{EventDate}/`, derived from the first attendee row.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::{fs, io};

use clap::Parser;

use cert_forge::config::{Backend, ForgeConfig};
use cert_forge::pipeline::{generate_with, GenerateRequest, DEFAULT_CSV, DEFAULT_TEMPLATE};
use cert_forge::{samples, OutputDir};

#[derive(Debug, Parser)]
#[command(name = "certforge", version, about = "Bulk-generate certificates as PDFs.")]
struct Cli {
    /// Path to attendee CSV file
    #[arg(long, default_value = DEFAULT_CSV)]
    csv: PathBuf,

    /// Path to HTML template file
    #[arg(long, default_value = DEFAULT_TEMPLATE)]
    template: PathBuf,

    /// Output folder (default: auto-creates a folder named after the event)
    #[arg(long)]
    output: Option<PathBuf>,

    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// PDF converter backend
    #[arg(long, value_enum)]
    backend: Option<BackendArg>,

    /// wkhtmltopdf executable (otherwise WKHTMLTOPDF_PATH, then PATH)
    #[arg(long)]
    wkhtmltopdf: Option<PathBuf>,

    /// Per-certificate conversion timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Write sample attendees.csv and cert_template.html, then exit
    #[arg(long)]
    init: bool,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum BackendArg {
    Wkhtmltopdf,
    Native,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Wkhtmltopdf => Backend::Wkhtmltopdf,
            BackendArg::Native => Backend::Native,
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if cli.init {
        return match write_samples(&cli.csv, &cli.template) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error writing samples: {e}");
                ExitCode::FAILURE
            }
        };
    }

    let mut config = match &cli.config {
        Some(path) => match ForgeConfig::from_json_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => ForgeConfig::default(),
    };
    if let Some(backend) = cli.backend {
        config.backend = backend.into();
    }
    if cli.wkhtmltopdf.is_some() {
        config.wkhtmltopdf_path = cli.wkhtmltopdf.clone();
    }
    if cli.timeout.is_some() {
        config.timeout_secs = cli.timeout;
    }

    let request = GenerateRequest {
        csv: cli.csv,
        template: cli.template,
        output: cli.output.map_or(OutputDir::AutoDerive, OutputDir::Explicit),
    };

    eprintln!("=== Certificate Generator ===");
    eprintln!(
        "Started at: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );

    let converter = config.converter();
    let run = generate_with(&request, &config, converter.as_ref(), |outcome| {
        match &outcome.result {
            Ok(path) => {
                let name = path.file_name().map(|n| n.to_string_lossy());
                eprintln!("✓ Created: {}", name.unwrap_or_default());
            }
            Err(e) => eprintln!("✗ Error creating certificate for {}: {e}", outcome.attendee),
        }
    });

    match run {
        Ok(result) => {
            eprintln!();
            eprintln!(
                "Completed! Generated {}/{} certificates",
                result.succeeded, result.total
            );
            eprintln!("All certificates saved in: {}/", result.output_dir.display());
            if result.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Write the bundled samples, leaving existing files untouched.
fn write_samples(csv: &Path, template: &Path) -> io::Result<()> {
    for (path, contents) in [
        (csv, samples::attendees_csv()),
        (template, samples::certificate_template()),
    ] {
        if path.exists() {
            eprintln!("Skipping '{}' (already exists)", path.display());
            continue;
        }
        fs::write(path, contents)?;
        eprintln!("Wrote '{}'", path.display());
    }
    Ok(())
}
