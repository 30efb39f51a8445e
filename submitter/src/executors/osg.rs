use super::{maxjobs_flag, prepare_job_dir, Executor, ExecutorError, Submission};
use crate::{
    config::{ConfigErrors, SubmitterConfig},
    descriptor::GridJob,
    dispatch::{Dispatcher, Route, OSG_HOST},
    job::Batch,
    manifest::{file_name, DagManifest},
    script::{WrapperOptions, WrapperScript},
};
use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Per-user job area on the grid submit host
pub static SCRATCH_ROOT: Lazy<PathBuf> = Lazy::new(|| PathBuf::from("/scratch"));

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridOptions {
    pub transfers: Vec<String>,
    pub requirements: Option<String>,
    pub max_per_interval: Option<u32>,
}

/// Executor for the Open Science Grid
///
/// The batch is prepared locally, copied to `sub-1:/scratch/<user>/jobs/<job_dir name>` and
/// submitted from there. A grid proxy for `userid` must already exist on sub-1.
#[derive(Debug)]
pub struct OsgExecutor {
    config: SubmitterConfig,
    options: GridOptions,
    username: String,
    userid: u32,
    dispatcher: Dispatcher,
}

impl OsgExecutor {
    pub fn load(
        config: SubmitterConfig,
        options: GridOptions,
        dispatcher: Dispatcher,
    ) -> Result<Self, ConfigErrors> {
        let username = config
            .username
            .clone()
            .ok_or(ConfigErrors::MissingUsername("osg"))?;
        let userid = config.userid.ok_or(ConfigErrors::MissingUserId("osg"))?;

        Ok(Self {
            config,
            options,
            username,
            userid,
            dispatcher,
        })
    }

    /// Remote directory the jobs directory is synchronised into
    pub fn remote_jobs_dir(&self) -> PathBuf {
        SCRATCH_ROOT.join(&self.username).join("jobs")
    }

    pub fn stage_command(&self, job_dir: &Path) -> String {
        format!(
            "rsync -paq {} {}@{OSG_HOST}:{}",
            job_dir.display(),
            self.username,
            self.remote_jobs_dir().display()
        )
    }

    pub fn submit_command(&self, job_dir: &Path, manifest: &Path) -> String {
        let remote_dir = self.remote_jobs_dir().join(file_name(job_dir));

        Route::OneHop { host: OSG_HOST }.wrap(&format!(
            "cd {} && condor_submit_dag {}{}",
            remote_dir.display(),
            maxjobs_flag(self.config.max_jobs),
            file_name(manifest)
        ))
    }
}

impl Executor for OsgExecutor {
    #[instrument(skip_all, level = "info", fields(jobs = batch.len()))]
    fn execute(&mut self, batch: &Batch) -> Result<Submission, ExecutorError> {
        let job_dir = prepare_job_dir(batch)?;
        info!("Temporary job directory: {}", job_dir.display());

        let mut manifest =
            DagManifest::new(&job_dir, "osg", self.options.max_per_interval).relative();
        // grid nodes have no home directory with a profile in it
        let wrapper = WrapperOptions {
            directives: Vec::new(),
            skip_env: true,
        };

        for job in batch.jobs() {
            let script_name = format!("osg_{}.sh", job.label);
            let script_path = job_dir.join(&script_name);
            WrapperScript::render(job, &self.config, &wrapper)?.write(&script_path)?;

            let descriptor_name = format!("{script_name}.sub");
            GridJob {
                script_name: &script_name,
                userid: self.userid,
                transfers: &self.options.transfers,
                requirements: self.options.requirements.as_deref(),
                memory: self.config.memory,
            }
            .descriptor()
            .write(&job_dir.join(&descriptor_name))?;

            manifest.push(job.label.clone(), descriptor_name);
        }
        manifest.write()?;

        let stage = self.stage_command(&job_dir);
        let command = self.submit_command(&job_dir, manifest.path());
        let remote = format!(
            "{}@{OSG_HOST}:{}",
            self.username,
            self.remote_jobs_dir().join(file_name(&job_dir)).display()
        );

        if self.dispatcher.is_dry() {
            info!("Prepared {} jobs.", batch.len());
        } else {
            info!("Moving {} jobs to {remote}", batch.len());
        }
        self.dispatcher.run(&stage)?;

        if !self.dispatcher.is_dry() {
            info!("Submitting {} jobs from {remote}", batch.len());
        }
        self.dispatcher.run(&command)?;

        Ok(Submission::Remote {
            jobs: batch.len(),
            command,
        })
    }
}
