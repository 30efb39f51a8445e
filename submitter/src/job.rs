use crate::config::ConfigErrors;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tracing::debug;

/// One unit of work: a shell command and the label naming its artifacts
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Job {
    pub label: String,
    pub command: String,
}

impl Job {
    pub fn new(label: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            command: command.into(),
        }
    }
}

/// An ordered set of jobs with uniquely labelled members, submitted by one call
///
/// `job_dir` belongs to a single submission. Running two batches against the same directory at
/// the same time is undefined: artifacts overwrite each other and the SGE guard counts foreign
/// marker files.
#[derive(Clone, Debug)]
pub struct Batch {
    jobs: Vec<Job>,
    job_dir: PathBuf,
}

impl Batch {
    /// Pair up commands with labels, in order
    pub fn new<C, L>(commands: C, labels: L, job_dir: impl Into<PathBuf>) -> Result<Self, ConfigErrors>
    where
        C: IntoIterator,
        C::Item: Into<String>,
        L: IntoIterator,
        L::Item: Into<String>,
    {
        let commands = commands.into_iter().map(Into::into).collect_vec();
        let labels = labels.into_iter().map(Into::into).collect_vec();

        if commands.len() != labels.len() {
            return Err(ConfigErrors::LabelCountMismatch {
                commands: commands.len(),
                labels: labels.len(),
            });
        }

        let jobs = labels
            .into_iter()
            .zip(commands)
            .map(|(label, command)| Job { label, command })
            .collect_vec();

        Self::from_jobs(jobs, job_dir)
    }

    pub fn from_jobs(jobs: Vec<Job>, job_dir: impl Into<PathBuf>) -> Result<Self, ConfigErrors> {
        if jobs.is_empty() {
            return Err(ConfigErrors::EmptyBatch);
        }

        if let Some(label) = jobs.iter().map(|job| &job.label).duplicates().next() {
            return Err(ConfigErrors::DuplicateLabel(label.clone()));
        }

        Ok(Self {
            jobs,
            job_dir: job_dir.into(),
        })
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn job_dir(&self) -> &Path {
        &self.job_dir
    }

    /// Create the job directory if needed and return its absolute path
    pub fn prepare_dir(&self) -> io::Result<PathBuf> {
        ensure_dir(&self.job_dir)?;
        fs::canonicalize(&self.job_dir)
    }
}

/// Make sure `path` exists and is a directory
///
/// An existing directory is fine, an existing file with that name is an error.
pub fn ensure_dir(path: &Path) -> io::Result<()> {
    if path.is_dir() {
        return Ok(());
    }

    debug!(path = ?path, "Creating directory");
    // fails with AlreadyExists if `path` is a file
    fs::create_dir_all(path)
}
