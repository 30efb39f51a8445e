use batch_submitter::{
    config::{BatchConfig, ConfigErrors},
    dispatch::current_hostname,
    executors::{Executors, Submission},
};
use clap::Parser;
use std::{path::PathBuf, process::exit};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Submit a batch of shell commands to a local pool or a cluster
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// YAML batch file with `submitter`, `executor` and `jobs` sections
    batch: PathBuf,

    /// Only generate job files and print the submission command
    #[arg(short = 'n', long)]
    dry: bool,

    /// Maximum number of jobs running at once
    #[arg(short = 'j', long)]
    max_jobs: Option<usize>,

    /// Directory for scripts, descriptors and logs
    #[arg(short = 'd', long)]
    job_dir: Option<PathBuf>,

    /// Seconds to wait between submissions
    #[arg(long)]
    delay: Option<f64>,
}

fn load(cli: &Cli) -> Result<BatchConfig, ConfigErrors> {
    let mut config = BatchConfig::load(&cli.batch)?;

    config.submitter.dry |= cli.dry;
    if let Some(max_jobs) = cli.max_jobs {
        config.submitter.max_jobs = Some(max_jobs);
    }
    if let Some(job_dir) = &cli.job_dir {
        config.submitter.job_dir = job_dir.clone();
    }
    if let Some(delay) = cli.delay {
        config.submitter.delay = delay;
    }
    config.fill_from_environment();

    if config.preflight_checks() {
        return Err(ConfigErrors::Preflight);
    }

    Ok(config)
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match load(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load {}: {e}", cli.batch.display());
            exit(1)
        }
    };

    let batch = match config.batch() {
        Ok(batch) => batch,
        Err(e) => {
            error!("Invalid batch: {e}");
            exit(1)
        }
    };

    let hostname = match current_hostname() {
        Ok(hostname) => hostname,
        Err(e) => {
            error!("Unable to determine where submission starts from: {e}");
            exit(1)
        }
    };

    let mut executor = match Executors::load(config.submitter, config.executor, &hostname) {
        Ok(executor) => executor,
        Err(e) => {
            error!("Failed to load executor: {e}");
            exit(1)
        }
    };

    match executor.execute(&batch) {
        Ok(Submission::Local { jobs, peak_running }) => {
            info!("Done with {jobs} jobs, at most {peak_running} ran at once")
        }
        Ok(Submission::Remote { jobs, .. }) => info!("Handed {jobs} jobs to the scheduler"),
        Err(e) => {
            error!(error = ?e, "Submission failed: {e}");
            exit(1)
        }
    }
}
