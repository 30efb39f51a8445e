pub mod condor;
pub mod local;
pub mod osg;
pub mod serial;
pub mod sge;

#[cfg(test)]
mod local_test;

use crate::{
    config::{ConfigErrors, ExecutorConfig, SubmitterConfig},
    dispatch::{classify_host, DispatchError, Dispatcher},
    job::Batch,
    script::ScriptError,
};
use std::{io, path::PathBuf};
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Job directory {0:?} exists but is not a directory")]
    JobDir(PathBuf, #[source] io::Error),
    #[error("Failed to write job files")]
    Io(#[from] io::Error),
    #[error("Failed to create wrapper script")]
    Script(#[from] ScriptError),
    #[error("Submission command failed")]
    Dispatch(#[from] DispatchError),
}

/// What a submission call did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// jobs ran on this host and have all exited
    Local { jobs: usize, peak_running: usize },
    /// jobs were handed to a scheduler with `command` (or would have been, when dry)
    Remote { jobs: usize, command: String },
}

pub trait Executor {
    /// generate all artifacts for `batch` and hand it off
    fn execute(&mut self, batch: &Batch) -> Result<Submission, ExecutorError>;
}

#[derive(Debug)]
pub enum Executors {
    Serial(serial::SerialExecutor),
    Local(local::LocalExecutor),
    Sge(sge::SgeExecutor),
    Condor(condor::CondorExecutor),
    Osg(osg::OsgExecutor),
}

impl Executors {
    /// Select the executor once for this call, `hostname` decides routing
    pub fn load(
        config: SubmitterConfig,
        executor: ExecutorConfig,
        hostname: &str,
    ) -> Result<Self, ConfigErrors> {
        let dispatcher = Dispatcher::new(config.dry);

        Self::load_with(config, executor, hostname, dispatcher)
    }

    pub fn load_with(
        mut config: SubmitterConfig,
        executor: ExecutorConfig,
        hostname: &str,
        dispatcher: Dispatcher,
    ) -> Result<Self, ConfigErrors> {
        let site = classify_host(hostname);
        if config.max_jobs == Some(0) {
            warn!("max_jobs of 0 means no limit");
            config.max_jobs = None;
        }

        Ok(match executor {
            ExecutorConfig::Serial => Self::Serial(serial::SerialExecutor::load(dispatcher)),
            ExecutorConfig::Local => Self::Local(local::LocalExecutor::load(config, dispatcher)),
            ExecutorConfig::Sge => Self::Sge(sge::SgeExecutor::load(config, site, dispatcher)),
            ExecutorConfig::Condor00 {
                requirements,
                blacklist,
                max_per_interval,
            } => Self::Condor(condor::CondorExecutor::load(
                config,
                condor::Pool::Condor00,
                condor::PoolOptions {
                    requirements,
                    blacklist,
                    max_per_interval,
                },
                site,
                dispatcher,
            )),
            ExecutorConfig::Npx4 {
                requirements,
                blacklist,
                max_per_interval,
            } => Self::Condor(condor::CondorExecutor::load(
                config,
                condor::Pool::Npx4,
                condor::PoolOptions {
                    requirements,
                    blacklist,
                    max_per_interval,
                },
                site,
                dispatcher,
            )),
            ExecutorConfig::Osg {
                transfers,
                requirements,
                max_per_interval,
            } => Self::Osg(osg::OsgExecutor::load(
                config,
                osg::GridOptions {
                    transfers,
                    requirements,
                    max_per_interval,
                },
                dispatcher,
            )?),
        })
    }

    pub fn execute(&mut self, batch: &Batch) -> Result<Submission, ExecutorError> {
        match self {
            Self::Serial(executor) => executor.execute(batch),
            Self::Local(executor) => executor.execute(batch),
            Self::Sge(executor) => executor.execute(batch),
            Self::Condor(executor) => executor.execute(batch),
            Self::Osg(executor) => executor.execute(batch),
        }
    }
}

/// Create the batch directory, returning its absolute path
pub(crate) fn prepare_job_dir(batch: &Batch) -> Result<PathBuf, ExecutorError> {
    batch.prepare_dir().map_err(|e| {
        error!(path = ?batch.job_dir(), error = ?e, "Failed to create job directory");

        match e.kind() {
            io::ErrorKind::AlreadyExists => ExecutorError::JobDir(batch.job_dir().to_path_buf(), e),
            _ => ExecutorError::Io(e),
        }
    })
}

/// `-maxjobs` flag for `condor_submit_dag`, empty without a ceiling
pub(crate) fn maxjobs_flag(max_jobs: Option<usize>) -> String {
    max_jobs
        .map(|max| format!("-maxjobs {max} "))
        .unwrap_or_default()
}
