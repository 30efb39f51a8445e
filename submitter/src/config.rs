use crate::job::{Batch, Job};
use serde::{Deserialize, Serialize};
use std::{fs, io, path::PathBuf};
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum ConfigErrors {
    #[error("No jobs were given")]
    EmptyBatch,
    #[error("Got {commands} commands but {labels} labels")]
    LabelCountMismatch { commands: usize, labels: usize },
    #[error("Label `{0}` is used by more than one job")]
    DuplicateLabel(String),
    #[error("Executor {0} requires a username")]
    MissingUsername(&'static str),
    #[error("Executor {0} requires a numeric user id")]
    MissingUserId(&'static str),
    #[error("Failed to read batch file")]
    Read(#[from] io::Error),
    #[error("Failed to parse batch file")]
    Parse(#[from] serde_yaml::Error),
    #[error("Batch file failed preflight checks")]
    Preflight,
}

/// Everything a single `batch-submit` call needs, as read from a YAML batch file
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct BatchConfig {
    #[serde(default)]
    pub submitter: SubmitterConfig,
    pub executor: ExecutorConfig,
    // jobs in submission order
    #[serde(default)]
    pub jobs: Vec<Job>,
}

/// Options shared by every executor
///
/// Immutable for the duration of one submission call. Two submissions must not share a
/// `job_dir`; nothing locks it.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SubmitterConfig {
    #[serde(default = "default_job_dir")]
    pub job_dir: PathBuf,
    // generate all artifacts, but never invoke a submission command
    #[serde(default)]
    pub dry: bool,
    // ceiling on concurrently active jobs, unbounded if unset
    pub max_jobs: Option<usize>,
    // seconds to wait between submissions
    #[serde(default)]
    pub delay: f64,
    // GB of memory to request per job
    pub memory: Option<f64>,
    pub ncpu: Option<u32>,
    // shell profile sourced by every wrapper, relative names resolve against $HOME
    #[serde(default = "default_env_script")]
    pub env_script: String,
    pub username: Option<String>,
    pub userid: Option<u32>,
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        Self {
            job_dir: default_job_dir(),
            dry: false,
            max_jobs: None,
            delay: 0.0,
            memory: None,
            ncpu: None,
            env_script: default_env_script(),
            username: None,
            userid: None,
        }
    }
}

/// Backend selection together with the extras only that backend understands
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "name", rename_all = "lowercase", deny_unknown_fields)]
pub enum ExecutorConfig {
    Serial,
    Local,
    Sge,
    Condor00 {
        requirements: Option<String>,
        #[serde(default)]
        blacklist: Vec<String>,
        max_per_interval: Option<u32>,
    },
    Npx4 {
        requirements: Option<String>,
        #[serde(default)]
        blacklist: Vec<String>,
        #[serde(default = "default_max_per_interval")]
        max_per_interval: Option<u32>,
    },
    Osg {
        // extra files on the submit host shipped along with the grid proxy
        #[serde(default)]
        transfers: Vec<String>,
        requirements: Option<String>,
        #[serde(default = "default_max_per_interval")]
        max_per_interval: Option<u32>,
    },
}

impl ExecutorConfig {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Serial => "serial",
            Self::Local => "local",
            Self::Sge => "sge",
            Self::Condor00 { .. } => "condor00",
            Self::Npx4 { .. } => "npx4",
            Self::Osg { .. } => "osg",
        }
    }
}

impl BatchConfig {
    pub fn load(path: &PathBuf) -> Result<Self, ConfigErrors> {
        let contents = fs::read_to_string(path)?;

        Ok(serde_yaml::from_str(&contents)?)
    }

    /// Fill in account details the batch file left out from the invoking process
    pub fn fill_from_environment(&mut self) {
        if self.submitter.username.is_none() {
            self.submitter.username = std::env::var("USER").ok();
        }

        if self.submitter.userid.is_none() {
            self.submitter.userid = Some(nix::unistd::getuid().as_raw());
        }
    }

    /// Report every problem at once instead of piece-by-piece, returns true if any were found
    pub fn preflight_checks(&self) -> bool {
        let mut contains_error = false;

        if self.jobs.is_empty() {
            error!("No jobs were defined, nothing to submit");
            contains_error = true;
        }

        for job in self.jobs.iter() {
            if job.command.trim().is_empty() {
                error!("Job {} has an empty command", job.label);
                contains_error = true;
            }
        }

        if self.submitter.max_jobs == Some(0) {
            error!("submitter.max_jobs cannot be 0, leave it unset for no limit");
            contains_error = true;
        }

        if self.submitter.delay < 0.0 {
            error!("submitter.delay cannot be negative");
            contains_error = true;
        }

        if self.submitter.ncpu == Some(0) {
            error!("submitter.ncpu cannot be 0, leave it unset to not request cpus");
            contains_error = true;
        }

        if let Some(memory) = self.submitter.memory {
            if memory <= 0.0 {
                error!("submitter.memory must be a positive number of GB");
                contains_error = true;
            }
        }

        match &self.executor {
            ExecutorConfig::Osg { .. } => {
                if self.submitter.username.is_none() {
                    error!("executor osg needs submitter.username to stage the job directory");
                    contains_error = true;
                }
            }
            ExecutorConfig::Serial | ExecutorConfig::Local => {
                if self.submitter.memory.is_some() || self.submitter.ncpu.is_some() {
                    warn!(
                        "submitter.memory and submitter.ncpu are ignored by the {} executor",
                        self.executor.name()
                    );
                }
            }
            _ => {}
        }

        contains_error
    }

    /// Split the loaded file into a validated batch
    pub fn batch(&self) -> Result<Batch, ConfigErrors> {
        Batch::from_jobs(self.jobs.clone(), self.submitter.job_dir.clone())
    }
}

fn default_job_dir() -> PathBuf {
    PathBuf::from("jobs/")
}

fn default_env_script() -> String {
    String::from(".bashrc_condor")
}

fn default_max_per_interval() -> Option<u32> {
    Some(50)
}
