use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use seqrun_metadata::app::RunMetadata;
use seqrun_metadata::config::{ConfigLoader, ConfigOverrides};
use seqrun_metadata::domain::NameColumn;
use seqrun_metadata::error::MetadataError;
use seqrun_metadata::output::{JsonOutput, LogSink};

#[derive(Parser)]
#[command(name = "seqrun-meta")]
#[command(
    about = "Reconcile SampleSheet.csv, RunInfo.xml and run statistics into per-sample metadata"
)]
#[command(version, author)]
struct Cli {
    /// JSON run config (defaults to ./seqrun.json when present)
    #[arg(long)]
    config: Option<String>,

    /// Sequencing run directory
    #[arg(long)]
    run_dir: Option<Utf8PathBuf>,

    /// Sample sheet to use instead of <run-dir>/SampleSheet.csv
    #[arg(long)]
    sample_sheet: Option<Utf8PathBuf>,

    /// RunInfo.xml to use instead of <run-dir>/RunInfo.xml
    #[arg(long)]
    run_info: Option<Utf8PathBuf>,

    /// Pipeline commit stamped into each sample
    #[arg(long)]
    commit: Option<String>,

    #[arg(long, value_enum)]
    name_column: Option<NameColumn>,

    /// Write the metadata JSON here instead of stdout
    #[arg(long)]
    output: Option<Utf8PathBuf>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<MetadataError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &MetadataError) -> u8 {
    if error.is_configuration() {
        2
    } else if error.is_integrity() {
        3
    } else {
        1
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let overrides = ConfigOverrides {
        run_dir: cli.run_dir,
        sample_sheet: cli.sample_sheet,
        run_info: cli.run_info,
        commit: cli.commit,
        name_column: cli.name_column,
    };
    let config = ConfigLoader::resolve(cli.config.as_deref(), overrides)?;
    let metadata = RunMetadata::collect(&config, &LogSink)?;

    match cli.output {
        Some(path) => {
            JsonOutput::write_metadata(&path, &metadata)?;
            print_summary(&metadata, &path);
        }
        None => JsonOutput::print_metadata(&metadata).into_diagnostic()?,
    }
    Ok(())
}

fn print_summary(metadata: &RunMetadata, path: &Utf8PathBuf) {
    println!(
        "run {} ({} on {}): {} samples, statistics from {:?}",
        metadata.run_info.run_id,
        metadata.run_info.flowcell,
        metadata.run_info.instrument,
        metadata.samples.len(),
        metadata.statistics.source,
    );
    for sample in &metadata.samples {
        println!(
            "  {:>3} {} clusters={} percent={}",
            sample.sample_number,
            sample.name,
            sample.statistics.number_of_clusters_pf,
            sample.statistics.percent_of_clusters,
        );
    }
    println!("metadata written to {path}");
}
