use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use decp_couverture::app::{App, CoverageRunResult, DownloadOptions, DownloadResult};
use decp_couverture::config::ConfigLoader;
use decp_couverture::download::{DownloadClient, HttpDownloadClient};
use decp_couverture::error::DecpError;
use decp_couverture::output::{JsonOutput, OutputMode};
use decp_couverture::store::DataStore;

#[derive(Parser)]
#[command(name = "decp-couverture")]
#[command(about = "Coverage statistics for French public procurement disclosure data (DECP)")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Download the DECP export, the Sirene registry and the map contours")]
    Download(DownloadArgs),
    #[command(about = "Compute per-area coverage statistics from the downloaded files")]
    Coverage(CoverageArgs),
}

#[derive(Args)]
struct DownloadArgs {
    #[arg(long, help = "number of DECP rows to download")]
    rows: Option<usize>,

    #[arg(long, conflicts_with_all = ["sirens_only", "contours_only"])]
    decp_only: bool,

    #[arg(long, conflicts_with = "contours_only")]
    sirens_only: bool,

    #[arg(long)]
    contours_only: bool,
}

#[derive(Args)]
struct CoverageArgs {
    #[arg(long, help = "number of rows to read from each input file")]
    rows: Option<usize>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<DecpError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &DecpError) -> u8 {
    match error {
        DecpError::SourceUnavailable { .. } | DecpError::ConfigRead(_) => 2,
        DecpError::DecpHttp(_)
        | DecpError::DecpStatus { .. }
        | DecpError::SireneHttp(_)
        | DecpError::SireneStatus { .. }
        | DecpError::ContoursHttp(_)
        | DecpError::ContoursStatus { .. }
        | DecpError::Archive(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    let settings = ConfigLoader::resolve(cli.config.as_deref()).into_diagnostic()?;
    let store = DataStore::new(settings.data_dir.clone());

    match cli.command {
        Commands::Download(args) => {
            let client = HttpDownloadClient::new().into_diagnostic()?;
            let app = App::new(settings, store, client);
            let options = DownloadOptions {
                rows: args.rows,
                decp_only: args.decp_only,
                sirens_only: args.sirens_only,
                contours_only: args.contours_only,
            };
            let result = app.download(options).into_diagnostic()?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_download(&result).into_diagnostic()?,
                OutputMode::Text => print_download_summary(&result),
            }
            Ok(())
        }
        Commands::Coverage(args) => {
            let app = App::new(settings, store, NopDownload);
            let result = app.coverage(args.rows).into_diagnostic()?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_coverage(&result).into_diagnostic()?,
                OutputMode::Text => print_coverage_summary(&result),
            }
            Ok(())
        }
    }
}

fn print_download_summary(result: &DownloadResult) {
    println!("downloaded {} file(s)", result.items.len());
    for item in &result.items {
        println!("  {} -> {}", item.source, item.path);
    }
}

fn print_coverage_summary(result: &CoverageRunResult) {
    let report = &result.report;
    println!(
        "notices: {} read ({} dropped), {} with a valid siren, {} public-sector",
        result.decp_rows_read,
        result.decp_rows_dropped,
        report.marches_sirens_valides,
        report.marches_sirens_publics
    );
    println!(
        "registry: {} read ({} dropped), {} public-sector",
        result.sirene_rows_read, result.sirene_rows_dropped, report.sirens_publics
    );
    println!(
        "wrote {} coverage row(s) to {}",
        result.records, result.output_path
    );
}

/// The coverage subcommand never touches the network.
struct NopDownload;

impl DownloadClient for NopDownload {
    fn download_decp(
        &self,
        _url: &str,
        _destination: &camino::Utf8Path,
    ) -> Result<(), DecpError> {
        Err(DecpError::DecpHttp("download client not configured".to_string()))
    }

    fn download_sirens(
        &self,
        _url: &str,
        _destination: &camino::Utf8Path,
    ) -> Result<(), DecpError> {
        Err(DecpError::SireneHttp("download client not configured".to_string()))
    }

    fn download_contour(
        &self,
        _url: &str,
        _destination: &camino::Utf8Path,
    ) -> Result<(), DecpError> {
        Err(DecpError::ContoursHttp("download client not configured".to_string()))
    }
}
