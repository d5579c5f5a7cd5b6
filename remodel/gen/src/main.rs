//! Remodel
//!
//! Regenerates CMS.gov API clients and models from OpenAPI documents.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use remodel_define::ApiVersion;
use remodel_gen::config::{RemodelConfig, parse_document_override, parse_timeout, validate_crate_name};
use remodel_gen::output::WriteStatus;
use remodel_gen::pipeline::{RunSummary, regenerate_all, resolve_handlers};
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Regenerates CMS.gov API clients and models, preserving renamed types
#[derive(Parser, Debug)]
#[command(name = "remodel")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    log_verbosity: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Regenerate client and model modules
    Generate {
        /// API versions to regenerate (e.g. "provider_data/v1"); all when omitted
        #[arg(value_name = "API")]
        apis: Vec<String>,

        /// Root of the generated crate
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Directory for document snapshots
        #[arg(long, value_name = "DIR")]
        openapi_dir: Option<PathBuf>,

        /// Package name of the generated crate
        #[arg(long, value_name = "NAME")]
        crate_name: Option<String>,

        /// Load a version's document from a URL or path instead (API=SOURCE)
        #[arg(long = "document", value_name = "API=SOURCE")]
        documents: Vec<String>,

        /// Document request timeout in seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<String>,

        /// Do not save original and fixed documents
        #[arg(long)]
        no_snapshots: bool,

        /// Print generated files without writing them
        #[arg(long)]
        dry_run: bool,
    },

    /// List declared API versions and their document URLs
    List,
}

fn init_tracing(verbose: u8, json: bool) {
    let base_filter = match std::env::var("RUST_LOG") {
        Ok(filter) => filter,
        Err(_) => match verbose {
            0 => "warn".to_string(),
            1 => "warn,remodel=info,remodel_gen=info".to_string(),
            2 => "info,remodel=debug,remodel_gen=debug,remodel_define=debug".to_string(),
            _ => "debug,remodel=trace,remodel_gen=trace,remodel_define=trace".to_string(),
        },
    };

    let filter = EnvFilter::try_new(&base_filter).unwrap_or_else(|_| EnvFilter::new("warn"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_file(verbose >= 3)
                    .with_line_number(verbose >= 3)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.log_verbosity, cli.json);

    match cli.command {
        Commands::List => {
            for api in ApiVersion::all() {
                let handler = api.handler();
                println!("{}\t{}\t{}", handler.label(), handler.title(), handler.document_url());
            }
            Ok(())
        }
        Commands::Generate {
            apis,
            output,
            openapi_dir,
            crate_name,
            documents,
            timeout,
            no_snapshots,
            dry_run,
        } => {
            let mut config = RemodelConfig::from_env()?;
            if let Some(output) = output {
                config.output_dir = output;
            }
            if let Some(openapi_dir) = openapi_dir {
                config.openapi_dir = openapi_dir;
            }
            if let Some(crate_name) = crate_name {
                config.crate_name = validate_crate_name(&crate_name)?;
            }
            if let Some(timeout) = timeout {
                config.timeout = parse_timeout(&timeout)?;
            }
            for document in &documents {
                let (api, source) = parse_document_override(document)?;
                ApiVersion::parse(&api)?;
                config.document_overrides.insert(api, source);
            }
            config.snapshots = !no_snapshots;
            config.dry_run = dry_run;

            let handlers = resolve_handlers(&apis)?;
            tracing::info!(versions = handlers.len(), dry_run, "starting regeneration");
            let summary = regenerate_all(handlers, Arc::new(config)).await;

            if dry_run {
                print_files(&summary);
            }
            report(&summary);
            if !summary.is_success() {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

/// Prints every generated file as a `=== path ===` section.
fn print_files(summary: &RunSummary) {
    let version_files = summary
        .versions
        .iter()
        .filter_map(|outcome| outcome.result.as_ref().ok())
        .flat_map(|report| report.files.iter());
    let scaffolding_files = summary
        .scaffolding
        .iter()
        .flat_map(|report| report.files.iter());
    for file in version_files.chain(scaffolding_files) {
        println!("=== {} ===", file.path.display());
        println!("{}", file.content);
    }
}

/// Prints one line per version and one for the scaffolding.
fn report(summary: &RunSummary) {
    for outcome in &summary.versions {
        match &outcome.result {
            Ok(report) => {
                let unchanged = report
                    .written
                    .iter()
                    .filter(|file| file.status == WriteStatus::Unchanged)
                    .count();
                eprintln!(
                    "{}: ok ({} models, {} operations, {} files written, {} unchanged, {} renames kept, {} dropped)",
                    outcome.api,
                    report.models,
                    report.operations,
                    report.changed(),
                    unchanged,
                    report.renames.carried.len(),
                    report.renames.dropped.len(),
                );
            }
            Err(e) => eprintln!("{}: failed: {e}", outcome.api),
        }
    }
    if let Err(e) = &summary.scaffolding {
        eprintln!("scaffolding: failed: {e}");
    }
    if summary.failed() > 0 {
        eprintln!("{} of {} versions failed", summary.failed(), summary.versions.len());
    }
}
