use super::{maxjobs_flag, prepare_job_dir, Executor, ExecutorError, Submission};
use crate::{
    config::SubmitterConfig,
    descriptor::CondorJob,
    dispatch::{
        Dispatcher, Route, Site, CONDOR00_HOST, ICECUBE_GATEWAY, NPX4_HOST, UMD_GATEWAY,
    },
    job::{ensure_dir, Batch},
    manifest::{dag_node, DagManifest},
    script::{WrapperOptions, WrapperScript},
};
use std::path::Path;
use tracing::{info, instrument};

/// The two Condor pools reachable with a shared filesystem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pool {
    Condor00,
    Npx4,
}

impl Pool {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Condor00 => "condor00",
            Self::Npx4 => "npx4",
        }
    }

    /// Where `condor_submit_dag` has to run from `site`
    pub fn route(&self, site: Site, username: Option<String>) -> Route {
        match (self, site) {
            (Self::Condor00, Site::Condor00) => Route::InPlace,
            (Self::Condor00, _) => Route::TwoHops {
                gateway: UMD_GATEWAY,
                host: CONDOR00_HOST,
                username,
            },
            (Self::Npx4, Site::IceCubeSubmit) => Route::InPlace,
            (Self::Npx4, Site::Cobalt) => Route::OneHop { host: NPX4_HOST },
            (Self::Npx4, _) => Route::TwoHops {
                gateway: ICECUBE_GATEWAY,
                host: NPX4_HOST,
                username,
            },
        }
    }
}

/// Per-batch knobs for a pool
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoolOptions {
    pub requirements: Option<String>,
    pub blacklist: Vec<String>,
    pub max_per_interval: Option<u32>,
}

/// Executor for Condor pools, submitting the batch as one DAG
///
/// Wrappers, descriptors and scheduler logs live in `<job_dir>/logs`, the manifest and its
/// config in `<job_dir>`. The job ceiling is handed to DAGMan with `-maxjobs`.
#[derive(Debug)]
pub struct CondorExecutor {
    config: SubmitterConfig,
    pool: Pool,
    options: PoolOptions,
    site: Site,
    dispatcher: Dispatcher,
}

impl CondorExecutor {
    pub fn load(
        config: SubmitterConfig,
        pool: Pool,
        options: PoolOptions,
        site: Site,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            config,
            pool,
            options,
            site,
            dispatcher,
        }
    }

    pub fn submit_command(&self, manifest: &Path) -> String {
        let submit = format!(
            "condor_submit_dag {}{}",
            maxjobs_flag(self.config.max_jobs),
            manifest.display()
        );

        self.pool
            .route(self.site, self.config.username.clone())
            .wrap(&submit)
    }
}

impl Executor for CondorExecutor {
    #[instrument(skip_all, level = "info", fields(pool = self.pool.prefix(), jobs = batch.len()))]
    fn execute(&mut self, batch: &Batch) -> Result<Submission, ExecutorError> {
        let job_dir = prepare_job_dir(batch)?;
        let log_dir = job_dir.join("logs");
        ensure_dir(&log_dir)?;

        let prefix = self.pool.prefix();
        let mut manifest = DagManifest::new(&job_dir, prefix, self.options.max_per_interval);
        let wrapper = WrapperOptions::default();
        let transfer_files = self.pool == Pool::Npx4 && self.site == Site::IceCubeSubmit;

        for job in batch.jobs() {
            let node = dag_node(prefix, &job.label);
            let script_path = log_dir.join(&node);
            WrapperScript::render(job, &self.config, &wrapper)?.write(&script_path)?;

            let descriptor_path = log_dir.join(format!("{node}.sub"));
            CondorJob {
                executable: &script_path,
                log_dir: &log_dir,
                node: &node,
                requirements: self.options.requirements.as_deref(),
                blacklist: &self.options.blacklist,
                memory: self.config.memory,
                ncpu: self.config.ncpu,
                transfer_files,
            }
            .descriptor()
            .write(&descriptor_path)?;

            manifest.push(node, descriptor_path.display().to_string());
        }
        manifest.write()?;

        let command = self.submit_command(manifest.path());
        if self.dispatcher.is_dry() {
            info!("Prepared {} jobs in {} .", batch.len(), job_dir.display());
        } else {
            info!("Submitting {} jobs from {} .", batch.len(), job_dir.display());
        }
        self.dispatcher.run(&command)?;

        Ok(Submission::Remote {
            jobs: batch.len(),
            command,
        })
    }
}
