use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use osdr_fetch::app::{App, ProgressSink, RunInput};
use osdr_fetch::config::ConfigLoader;
use osdr_fetch::domain::Classification;
use osdr_fetch::error::{ErrorKind, OsdrError};
use osdr_fetch::filter::FilterInput;
use osdr_fetch::metadata::OsdrHttpClient;
use osdr_fetch::output::{ConsoleOutput, JsonOutput, OutputMode};

#[derive(Parser)]
#[command(name = "osdr-fetch")]
#[command(about = "Download and classify files from NASA OSDR datasets")]
#[command(version)]
struct Cli {
    #[arg(long = "osd", value_name = "OSD-N", help = "Dataset accession, e.g. OSD-101")]
    dataset: String,

    #[arg(long, help = "Keep only files whose measurement type equals this value")]
    measurement: Option<String>,

    #[arg(long = "tech", help = "Technology type; parentheses act as wildcards")]
    technology: Option<String>,

    #[arg(long, help = "Keep only files with this extension")]
    ext: Option<String>,

    #[arg(long, help = "Drop files with this extension")]
    exclude_ext: Option<String>,

    #[arg(long, help = "Keep only files whose name contains this text")]
    search: Option<String>,

    #[arg(long, help = "Drop files whose name contains this text")]
    exclude_search: Option<String>,

    #[arg(long, conflicts_with = "raw_only")]
    processed_only: bool,

    #[arg(long)]
    raw_only: bool,

    #[arg(long = "out", value_name = "DIR", help = "Output directory (default: osdr_downloads_<OSD-N>)")]
    output_dir: Option<String>,

    #[arg(long = "list", help = "List matching files without downloading")]
    list_only: bool,

    #[arg(long, value_name = "SECS", help = "Per-file download timeout in seconds")]
    timeout: Option<u64>,

    #[arg(long)]
    no_manifest: bool,

    #[arg(long)]
    config: Option<String>,

    #[arg(long, help = "Print the run summary as JSON")]
    json: bool,

    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn classification(&self) -> Option<Classification> {
        if self.processed_only {
            Some(Classification::Processed)
        } else if self.raw_only {
            Some(Classification::Raw)
        } else {
            None
        }
    }

    fn run_input(&self) -> RunInput {
        RunInput {
            dataset: self.dataset.clone(),
            filters: FilterInput {
                measurement: self.measurement.clone(),
                technology: self.technology.clone(),
                include_ext: self.ext.clone(),
                exclude_ext: self.exclude_ext.clone(),
                include_search: self.search.clone(),
                exclude_search: self.exclude_search.clone(),
                classification: self.classification(),
            },
            output_dir: self.output_dir.clone(),
            list_only: self.list_only,
            write_manifest: self.no_manifest.then_some(false),
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if !err.use_stderr() => err.exit(),
        Err(err) => {
            let _ = err.print();
            return ExitCode::from(USAGE_EXIT_CODE);
        }
    };
    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(report) => {
            eprintln!("{report:?}");
            match report.downcast_ref::<OsdrError>() {
                Some(error) => ExitCode::from(map_exit_code(error)),
                None => ExitCode::from(1),
            }
        }
    }
}

const USAGE_EXIT_CODE: u8 = 1;

fn map_exit_code(error: &OsdrError) -> u8 {
    match error.kind() {
        ErrorKind::Connectivity => 3,
        ErrorKind::Configuration => USAGE_EXIT_CODE,
        ErrorKind::Transfer | ErrorKind::Io => 1,
    }
}

fn run(cli: Cli) -> miette::Result<u8> {
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = ConfigLoader::resolve(cli.config.as_deref())?;
    if let Some(secs) = cli.timeout {
        if secs == 0 {
            return Err(OsdrError::ConfigParse("--timeout must be positive".to_string()).into());
        }
        config.download_timeout = Duration::from_secs(secs);
    }
    let mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let client = OsdrHttpClient::new(&config)?;
    let app = App::new(config, client.clone(), client);

    let sink: &dyn ProgressSink = match mode {
        OutputMode::Json => &JsonOutput,
        OutputMode::Human => &ConsoleOutput,
    };
    let summary = app.execute(cli.run_input(), sink)?;

    match mode {
        OutputMode::Json => JsonOutput::print_summary(&summary).into_diagnostic()?,
        OutputMode::Human => ConsoleOutput::print_summary(&summary).into_diagnostic()?,
    }
    Ok(summary.status.exit_code())
}
