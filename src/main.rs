//! iip-source - operator tool for checking how image identifiers resolve.

use clap::Parser;
use serde::Serialize;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use iip_source::{
    config::{Cli, Command, ProbeArgs, ResolveArgs, SourceConfig},
    Backends, ImageFormat, ImageSource, Layout,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Probe(args) => run_probe(args).await,
        Command::Resolve(args) => run_resolve(args).await,
    }
}

// =============================================================================
// Probe Command
// =============================================================================

/// What `probe` reports about a resolved source.
#[derive(Debug, Serialize)]
struct ProbeReport {
    path: String,
    remote: bool,
    layout: Layout,
    format: ImageFormat,
    suffix: String,
    horizontal_angles: Vec<u32>,
    vertical_angles: Vec<u32>,
    last_modified: String,
}

async fn run_probe(args: ProbeArgs) -> ExitCode {
    let image = match open_source(&args.path, &args.source).await {
        Some(image) => image,
        None => return ExitCode::FAILURE,
    };

    let (Some(layout), Some(format)) = (image.layout(), image.format()) else {
        error!("Source reported ready without a layout");
        return ExitCode::FAILURE;
    };

    let report = ProbeReport {
        path: image.display_path(),
        remote: image.is_remote(),
        layout,
        format,
        suffix: image.suffix().to_string(),
        horizontal_angles: image.horizontal_angles().to_vec(),
        vertical_angles: image.vertical_angles().to_vec(),
        last_modified: image.timestamp_http_date(),
    };

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to serialize report: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("Path:           {}", report.path);
        println!("Backing store:  {}", if report.remote { "remote" } else { "local" });
        println!("Layout:         {:?}", report.layout);
        println!("Format:         {}", report.format.name());
        println!("Suffix:         {}", report.suffix);
        println!("Horizontal:     {:?}", report.horizontal_angles);
        println!("Vertical:       {:?}", report.vertical_angles);
        println!("Last-Modified:  {}", report.last_modified);
    }

    if format == ImageFormat::Unsupported {
        error!("No codec available for {}", report.path);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

// =============================================================================
// Resolve Command
// =============================================================================

async fn run_resolve(args: ResolveArgs) -> ExitCode {
    match open_source(&args.path, &args.source).await {
        Some(image) => {
            println!("{}", image.resolve_filename(args.seq, args.ang));
            ExitCode::SUCCESS
        }
        None => ExitCode::FAILURE,
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Validate config, build backends and initialise a source, logging failures.
async fn open_source(path: &str, config: &SourceConfig) -> Option<ImageSource> {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return None;
    }

    let backends = match Backends::from_config(config) {
        Ok(backends) => backends,
        Err(e) => {
            error!("Failed to create backing stores: {}", e);
            return None;
        }
    };

    let mut image = ImageSource::from_config(path, config, backends);
    match image.initialise().await {
        Ok(_) => Some(image),
        Err(e) => {
            error!(
                error_type = e.error_type(),
                status = e.status_code().as_u16(),
                "{}",
                e
            );
            None
        }
    }
}

fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "iip_source=debug"
    } else {
        "iip_source=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
